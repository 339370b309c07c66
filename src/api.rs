use std::sync::Arc;
use std::sync::Mutex;

use anyhow::Result;
use reqwest::Url;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{CONTENT_TYPE, REFERER};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::adjustment::UpdatePayload;
use crate::config::ReviewConfig;
use crate::decision::{DecisionRecord, StoreResponse};
use crate::detection::{DetectionSnapshot, Team, parse_detection_json};
use crate::error::ApiError;
use crate::http_client::{HttpSession, SESSION_COOKIE, http_session};
use crate::upload::{DetectionForm, format_confidence};

const CSRF_HEADER: &str = "X-CSRFToken";
const CSRF_COOKIE: &str = "csrftoken";

/// Shape of the classification request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifyPayload {
    /// `{detection_data, defending_team}`
    Wrapped,
    /// The snapshot itself.
    Bare,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifyRequest {
    pub snapshot: DetectionSnapshot,
    pub defending_team: Option<Team>,
    pub payload: ClassifyPayload,
}

impl ClassifyRequest {
    pub fn body(&self) -> Result<Value, ApiError> {
        match self.payload {
            ClassifyPayload::Wrapped => Ok(serde_json::to_value(WrappedClassify {
                detection_data: &self.snapshot,
                defending_team: self.defending_team,
            })?),
            ClassifyPayload::Bare => Ok(serde_json::to_value(&self.snapshot)?),
        }
    }
}

#[derive(Serialize)]
struct WrappedClassify<'a> {
    detection_data: &'a DetectionSnapshot,
    defending_team: Option<Team>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPitch {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Debug, Deserialize)]
struct ClassifyResponse {
    #[serde(default)]
    redirect_url: Option<String>,
}

/// The server endpoints a review session talks to.
pub trait OffsideApi {
    fn process_image(&self, form: &DetectionForm) -> Result<DetectionSnapshot, ApiError>;
    fn render_pitch(&self, snapshot: &DetectionSnapshot) -> Result<RenderedPitch, ApiError>;
    fn update_detections(
        &self,
        snapshot: &DetectionSnapshot,
        payload: UpdatePayload,
    ) -> Result<(), ApiError>;
    /// Returns the redirect URL of the results page.
    fn classify_offside(&self, request: &ClassifyRequest) -> Result<String, ApiError>;
    fn results_page(&self, redirect_url: &str) -> Result<String, ApiError>;
    fn store_decision(&self, record: &DecisionRecord) -> Result<StoreResponse, ApiError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CsrfLookup {
    Unresolved,
    Found(String),
    /// The CSRF page was fetched and set no cookie. It is not fetched again.
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// No credentials configured.
    Skipped,
    LoggedIn,
}

pub struct HttpApi {
    client: Client,
    jar: Arc<Jar>,
    config: ReviewConfig,
    csrf: Mutex<CsrfLookup>,
}

impl HttpApi {
    pub fn new(config: ReviewConfig) -> Result<Self> {
        let session = http_session(&config)?;
        Ok(Self::with_session(config, session.clone()))
    }

    /// Uses `session` instead of the process-wide one.
    pub fn with_session(config: ReviewConfig, session: HttpSession) -> Self {
        let csrf = match config.csrf_token.clone() {
            Some(token) => CsrfLookup::Found(token),
            None => CsrfLookup::Unresolved,
        };
        Self {
            client: session.client,
            jar: session.jar,
            csrf: Mutex::new(csrf),
            config,
        }
    }

    fn cookie(&self, name: &str) -> Option<String> {
        let header = self.jar.cookies(&self.config.base_url)?;
        cookie_value(header.to_str().ok()?, name)
    }

    /// Token from config, the cookie jar, or a single GET of the CSRF page.
    fn csrf_token(&self) -> Option<String> {
        let mut guard = self.csrf.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let CsrfLookup::Found(token) = &*guard {
            return Some(token.clone());
        }
        let mut token = self.cookie(CSRF_COOKIE);
        if token.is_none() && *guard == CsrfLookup::Unresolved {
            match self.client.get(self.config.endpoints.csrf_page.clone()).send() {
                Ok(_) => token = self.cookie(CSRF_COOKIE),
                Err(err) => warn!("csrf page request failed: {err}"),
            }
            if token.is_none() {
                warn!("no csrf token available, sending requests without it");
            }
        }
        *guard = match &token {
            Some(token) => CsrfLookup::Found(token.clone()),
            None => CsrfLookup::Unavailable,
        };
        token
    }

    /// Signs in with the configured credentials so the session cookie lands
    /// in the shared jar.
    pub fn login(&self) -> Result<LoginOutcome, ApiError> {
        let (Some(username), Some(password)) = (
            self.config.username.as_deref(),
            self.config.password.as_deref(),
        ) else {
            return Ok(LoginOutcome::Skipped);
        };
        let url = &self.config.endpoints.login;

        // The login page sets the csrftoken cookie.
        ensure_success(self.client.get(url.clone()).send()?)?;
        let token = self.cookie(CSRF_COOKIE).or_else(|| self.config.csrf_token.clone());

        let mut fields = vec![("username", username), ("password", password)];
        if let Some(token) = token.as_deref() {
            fields.push(("csrfmiddlewaretoken", token));
        }
        debug!(%url, username, "POST login");
        let mut req = self
            .client
            .post(url.clone())
            .header(REFERER, url.as_str())
            .form(&fields);
        if let Some(token) = token.as_deref() {
            req = req.header(CSRF_HEADER, token);
        }
        ensure_success(req.send()?)?;

        if self.cookie(SESSION_COOKIE).is_none() {
            return Err(ApiError::LoginRejected {
                username: username.to_string(),
            });
        }
        // Django rotates the token on login.
        if let Some(token) = self.cookie(CSRF_COOKIE) {
            let mut guard = self.csrf.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            *guard = CsrfLookup::Found(token);
        }
        info!(username, "logged in");
        Ok(LoginOutcome::LoggedIn)
    }

    fn with_csrf(&self, req: RequestBuilder) -> RequestBuilder {
        match self.csrf_token() {
            Some(token) => req.header(CSRF_HEADER, token),
            None => req,
        }
    }

    fn post_json(&self, url: &Url, body: &impl Serialize) -> Result<Response, ApiError> {
        debug!(%url, "POST");
        let req = self.with_csrf(self.client.post(url.clone()).json(body));
        ensure_success(req.send()?)
    }
}

impl OffsideApi for HttpApi {
    fn process_image(&self, form: &DetectionForm) -> Result<DetectionSnapshot, ApiError> {
        let url = &self.config.endpoints.process_image;
        let part = Part::bytes(form.image.clone())
            .file_name(form.file_name.clone())
            .mime_str(form.mime)?;
        let mut multipart = Form::new().part("image", part);
        if let Some(confidence) = form.confidence {
            multipart = multipart.text("confidence", format_confidence(confidence));
        }
        debug!(%url, confidence = ?form.confidence, "POST image");
        let req = self.with_csrf(self.client.post(url.clone()).multipart(multipart));
        let body = ensure_success(req.send()?)?.text()?;
        parse_detection_json(&body).map_err(|err| ApiError::MalformedBody(format!("{err:#}")))
    }

    fn render_pitch(&self, snapshot: &DetectionSnapshot) -> Result<RenderedPitch, ApiError> {
        let resp = self.post_json(&self.config.endpoints.render_pitch, &snapshot.render_request())?;
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.starts_with("image/") {
            return Err(ApiError::UnexpectedContent(content_type));
        }
        let bytes = resp.bytes()?.to_vec();
        Ok(RenderedPitch {
            bytes,
            content_type,
        })
    }

    fn update_detections(
        &self,
        snapshot: &DetectionSnapshot,
        payload: UpdatePayload,
    ) -> Result<(), ApiError> {
        let url = &self.config.endpoints.update_detections;
        let resp = match payload {
            UpdatePayload::FullSnapshot => self.post_json(url, snapshot)?,
            UpdatePayload::PlayersDetectionsOnly => {
                self.post_json(url, &snapshot.players_detections)?
            }
        };
        // Body is not used.
        let _ = resp.text();
        Ok(())
    }

    fn classify_offside(&self, request: &ClassifyRequest) -> Result<String, ApiError> {
        let body = request.body()?;
        let resp = self.post_json(&self.config.endpoints.classify_offside, &body)?;
        let parsed: ClassifyResponse = serde_json::from_str(&resp.text()?)?;
        parsed
            .redirect_url
            .filter(|url| !url.trim().is_empty())
            .ok_or(ApiError::MissingRedirect)
    }

    fn results_page(&self, redirect_url: &str) -> Result<String, ApiError> {
        let url = self
            .config
            .resolve(redirect_url)
            .map_err(|err| ApiError::MalformedBody(format!("{err:#}")))?;
        debug!(%url, "GET results");
        Ok(ensure_success(self.client.get(url).send()?)?.text()?)
    }

    fn store_decision(&self, record: &DecisionRecord) -> Result<StoreResponse, ApiError> {
        let resp = self.post_json(&self.config.endpoints.store_offside, record)?;
        let raw = resp.text()?;
        if raw.trim().is_empty() {
            return Ok(StoreResponse::default());
        }
        Ok(serde_json::from_str(&raw)?)
    }
}

fn ensure_success(resp: Response) -> Result<Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().unwrap_or_default();
    Err(ApiError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Finds cookie `name` in a `Cookie` header value.
pub fn cookie_value(header: &str, name: &str) -> Option<String> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name && !value.is_empty()).then(|| value.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::PlayersDetections;

    #[test]
    fn cookie_is_found_among_others() {
        let header = "sessionid=abc; csrftoken=tok123; theme=dark";
        assert_eq!(cookie_value(header, CSRF_COOKIE).as_deref(), Some("tok123"));
        assert_eq!(cookie_value(header, SESSION_COOKIE).as_deref(), Some("abc"));
        assert_eq!(cookie_value("sessionid=abc", CSRF_COOKIE), None);
        assert_eq!(cookie_value("csrftoken=", CSRF_COOKIE), None);
    }

    #[test]
    fn wrapped_body_carries_defending_team_id() {
        let request = ClassifyRequest {
            snapshot: DetectionSnapshot {
                players_detections: PlayersDetections {
                    tracker_id: vec![4],
                    class_id: vec![1],
                    class_name: vec!["player".into()],
                    confidence: vec![0.9],
                    xyxy: None,
                },
                ..DetectionSnapshot::default()
            },
            defending_team: Some(Team::B),
            payload: ClassifyPayload::Wrapped,
        };
        let body = request.body().unwrap();
        assert_eq!(body["defending_team"], 1);
        assert_eq!(body["detection_data"]["players_detections"]["tracker_id"][0], 4);
    }

    #[test]
    fn wrapped_body_sends_null_without_prompt() {
        let request = ClassifyRequest {
            snapshot: DetectionSnapshot::default(),
            defending_team: None,
            payload: ClassifyPayload::Wrapped,
        };
        assert!(request.body().unwrap()["defending_team"].is_null());
    }

    #[test]
    fn bare_body_is_the_snapshot() {
        let request = ClassifyRequest {
            snapshot: DetectionSnapshot::default(),
            defending_team: Some(Team::A),
            payload: ClassifyPayload::Bare,
        };
        let body = request.body().unwrap();
        assert!(body.get("defending_team").is_none());
        assert!(body.get("players_detections").is_some());
    }
}
