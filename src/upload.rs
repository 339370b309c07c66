use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::ImageFormat;

use crate::error::Rejection;

pub const DEFAULT_CONFIDENCE: f64 = 0.5;
pub const CONFIDENCE_STEP: f64 = 0.05;
pub const MIN_CONFIDENCE: f64 = 0.05;
pub const MAX_CONFIDENCE: f64 = 0.95;

/// A locally selected image, ready to preview and upload.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSelection {
    pub path: PathBuf,
    pub file_name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
    /// `data:` URL of the file contents.
    pub preview: String,
}

/// Multipart body for the detection endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionForm {
    pub file_name: String,
    pub mime: &'static str,
    pub image: Vec<u8>,
    pub confidence: Option<f64>,
}

impl ImageSelection {
    pub fn load(path: &Path) -> Result<Self, Rejection> {
        let bytes = fs::read(path).map_err(|err| Rejection::InvalidImage {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let mut selection = Self::from_bytes(&file_name, bytes)?;
        selection.path = path.to_path_buf();
        Ok(selection)
    }

    pub fn from_bytes(file_name: &str, bytes: Vec<u8>) -> Result<Self, Rejection> {
        let invalid = |reason: &str| Rejection::InvalidImage {
            path: file_name.to_string(),
            reason: reason.to_string(),
        };
        let mime = mime_for(file_name).ok_or_else(|| invalid("not an image file"))?;
        if bytes.is_empty() {
            return Err(invalid("file is empty"));
        }
        let preview = data_url(mime, &bytes);
        Ok(Self {
            path: PathBuf::from(file_name),
            file_name: file_name.to_string(),
            mime,
            bytes,
            preview,
        })
    }

    pub fn detection_form(&self, confidence: Option<f64>) -> DetectionForm {
        DetectionForm {
            file_name: self.file_name.clone(),
            mime: self.mime,
            image: self.bytes.clone(),
            confidence,
        }
    }
}

/// MIME type of an image file, judged by its extension.
pub fn mime_for(file_name: &str) -> Option<&'static str> {
    ImageFormat::from_path(file_name)
        .ok()
        .map(|f| f.to_mime_type())
}

pub fn data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Snaps a slider value onto the 0.05 grid inside the allowed range.
pub fn clamp_confidence(value: f64) -> f64 {
    let snapped = (value / CONFIDENCE_STEP).round() * CONFIDENCE_STEP;
    let rounded = (snapped * 100.0).round() / 100.0;
    rounded.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
}

pub fn is_default_confidence(value: f64) -> bool {
    (value - DEFAULT_CONFIDENCE).abs() < 1e-9
}

/// The string the slider would submit, e.g. `0.55`.
pub fn format_confidence(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded}")
}
