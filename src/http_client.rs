use std::sync::Arc;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use reqwest::cookie::Jar;

use crate::config::ReviewConfig;

pub const SESSION_COOKIE: &str = "sessionid";

/// Shared blocking client plus the cookie jar it reads and writes.
#[derive(Debug, Clone)]
pub struct HttpSession {
    pub client: Client,
    pub jar: Arc<Jar>,
}

static SESSION: OnceCell<HttpSession> = OnceCell::new();

/// Process-wide session. The first caller's config wins.
pub fn http_session(config: &ReviewConfig) -> Result<&'static HttpSession> {
    SESSION.get_or_try_init(|| build_session(config))
}

pub fn build_session(config: &ReviewConfig) -> Result<HttpSession> {
    let jar = Arc::new(Jar::default());
    if let Some(session_id) = config.session_id.as_deref() {
        jar.add_cookie_str(&format!("{SESSION_COOKIE}={session_id}"), &config.base_url);
    }
    let client = Client::builder()
        .cookie_provider(jar.clone())
        .timeout(config.http_timeout)
        .build()
        .context("failed to build http client")?;
    Ok(HttpSession { client, jar })
}
