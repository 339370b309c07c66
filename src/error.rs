use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("http {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    MalformedBody(String),

    #[error("expected an image response, got content type {0:?}")]
    UnexpectedContent(String),

    #[error("response did not include a redirect url")]
    MissingRedirect,

    #[error("login rejected for user {username}")]
    LoginRejected { username: String },

    #[error("an I/O error occurred: {0}")]
    Io(#[from] io::Error),
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::MalformedBody(err.to_string())
    }
}

/// Client-side refusals. None of these ever reach the network.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("Please select an image.")]
    NoImageSelected,

    #[error("Could not read image {path}: {reason}")]
    InvalidImage { path: String, reason: String },

    #[error(
        "Please pick a non-default value if you would like to run new detections, otherwise continue to Offside Detection."
    )]
    DefaultConfidence,

    #[error("Detection already in progress.")]
    DetectionInFlight,

    #[error("Offside classification already in progress.")]
    ClassificationInFlight,

    #[error("No detection data yet. Run detection first.")]
    NoSnapshot,

    #[error("Player list changed since the form was opened. Reopen the form.")]
    StaleForm,

    #[error("Defending team was not requested.")]
    NotAwaitingDefenders,

    #[error("No offside decision to review yet.")]
    NoDecision,

    #[error("Final decision already recorded.")]
    DecisionAlreadyRecorded,
}
