use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{ImageFormat, ImageReader};
use tracing::debug;

use crate::api::RenderedPitch;
use crate::error::ApiError;
use crate::persist::write_atomic;

/// A rendered pitch diagram stored on disk for display.
#[derive(Debug, Clone, PartialEq)]
pub struct PitchImage {
    pub path: PathBuf,
    pub content_type: String,
    pub format: Option<String>,
    pub dimensions: Option<(u32, u32)>,
    pub size: usize,
}

const FALLBACK_EXTENSION: &str = "img";

/// File extension for a response content type, parameters ignored.
pub fn extension_for(content_type: &str) -> &'static str {
    let mime = content_type.split(';').next().unwrap_or_default().trim();
    ImageFormat::from_mime_type(mime)
        .and_then(|format| format.extensions_str().first().copied())
        .unwrap_or(FALLBACK_EXTENSION)
}

/// Writes `rendered` to `<dir>/pitch-<seq>.<ext>` and reads its header.
/// An undecodable image is still stored; only its metadata is left empty.
pub fn store_pitch_image(
    rendered: &RenderedPitch,
    dir: &Path,
    seq: u32,
) -> Result<PitchImage, ApiError> {
    let path = dir.join(format!(
        "pitch-{seq:04}.{}",
        extension_for(&rendered.content_type)
    ));
    write_atomic(&path, &rendered.bytes)?;

    let reader = ImageReader::new(Cursor::new(&rendered.bytes)).with_guessed_format();
    let (format, dimensions) = match reader {
        Ok(reader) => {
            let format = reader.format().map(|f| format!("{f:?}"));
            (format, reader.into_dimensions().ok())
        }
        Err(_) => (None, None),
    };
    debug!(path = %path.display(), ?dimensions, "stored pitch image");

    Ok(PitchImage {
        path,
        content_type: rendered.content_type.clone(),
        format,
        dimensions,
        size: rendered.bytes.len(),
    })
}
