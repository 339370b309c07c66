use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Url;

use crate::adjustment::{FormOptions, UpdatePayload};
use crate::api::ClassifyPayload;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/";

#[derive(Debug, Clone, PartialEq)]
pub struct Endpoints {
    pub process_image: Url,
    pub render_pitch: Url,
    pub update_detections: Url,
    pub classify_offside: Url,
    pub store_offside: Url,
    pub csrf_page: Url,
    pub login: Url,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewConfig {
    pub base_url: Url,
    pub endpoints: Endpoints,
    pub csrf_token: Option<String>,
    pub session_id: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub http_timeout: Option<Duration>,
    pub toast_duration: Duration,
    pub form: FormOptions,
    pub classify_payload: ClassifyPayload,
}

/// Loads `.env.local` then `.env`; real environment variables win.
pub fn load_dotenv() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}

impl ReviewConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mut base = get("OFFSIDE_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url =
            Url::parse(&base).with_context(|| format!("invalid OFFSIDE_BASE_URL {base}"))?;

        let endpoint = |key: &str, default: &str| -> Result<Url> {
            let path = get(key).unwrap_or_else(|| default.to_string());
            base_url
                .join(&path)
                .with_context(|| format!("invalid {key} {path}"))
        };
        let endpoints = Endpoints {
            process_image: endpoint("OFFSIDE_PROCESS_IMAGE_PATH", "process_image/")?,
            render_pitch: endpoint("OFFSIDE_RENDER_PITCH_PATH", "render_pitch/")?,
            update_detections: endpoint("OFFSIDE_UPDATE_DETECTIONS_PATH", "update_detections/")?,
            classify_offside: endpoint("OFFSIDE_CLASSIFY_OFFSIDE_PATH", "classify_offside/")?,
            store_offside: endpoint("OFFSIDE_STORE_OFFSIDE_PATH", "store_offside/")?,
            csrf_page: endpoint("OFFSIDE_CSRF_PATH", "upload/")?,
            login: endpoint("OFFSIDE_LOGIN_PATH", "login/")?,
        };

        let http_timeout = get("OFFSIDE_HTTP_TIMEOUT_SECS")
            .and_then(|val| val.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);
        let toast_duration = Duration::from_millis(
            get("OFFSIDE_TOAST_MS")
                .and_then(|val| val.parse::<u64>().ok())
                .unwrap_or(3000)
                .clamp(500, 30_000),
        );

        let update_payload = match get("OFFSIDE_UPDATE_PAYLOAD").as_deref() {
            Some("players") | Some("players_detections") => UpdatePayload::PlayersDetectionsOnly,
            _ => UpdatePayload::FullSnapshot,
        };
        let goalkeeper_toggle = !matches!(
            get("OFFSIDE_GOALKEEPER_TOGGLE").as_deref(),
            Some("0") | Some("false") | Some("off")
        );
        let classify_payload = match get("OFFSIDE_CLASSIFY_PAYLOAD").as_deref() {
            Some("bare") => ClassifyPayload::Bare,
            _ => ClassifyPayload::Wrapped,
        };

        Ok(Self {
            base_url,
            endpoints,
            csrf_token: get("OFFSIDE_CSRF_TOKEN"),
            session_id: get("OFFSIDE_SESSION_ID"),
            username: get("OFFSIDE_USERNAME"),
            password: lookup("OFFSIDE_PASSWORD").filter(|v| !v.is_empty()),
            http_timeout,
            toast_duration,
            form: FormOptions {
                goalkeeper_toggle,
                update_payload,
            },
            classify_payload,
        })
    }

    /// Resolves a server-relative URL such as a redirect target.
    pub fn resolve(&self, url: &str) -> Result<Url> {
        self.base_url
            .join(url)
            .with_context(|| format!("invalid url {url}"))
    }
}
