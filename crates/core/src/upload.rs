//! Screen image upload validation and storage naming.

use image::ImageFormat;
use uuid::Uuid;

use crate::error::CoreError;
use crate::types::DbId;

/// Default per-file upload cap (20 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Image formats accepted as screens.
const ACCEPTED_FORMATS: &[ImageFormat] = &[
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::Gif,
    ImageFormat::WebP,
];

/// A file that passed validation and is ready to be stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcceptedImage {
    /// Canonical MIME type derived from the file content.
    pub content_type: &'static str,
    /// File extension used for the storage key.
    pub extension: &'static str,
}

/// Why a single file was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RejectedUpload {
    #[error("{0} is not an image")]
    NotAnImage(String),

    #[error("{0} is empty")]
    Empty(String),

    #[error("{file_name} is too large ({size} bytes, maximum {max} bytes)")]
    TooLarge {
        file_name: String,
        size: usize,
        max: usize,
    },
}

/// Check one uploaded file.
///
/// The declared content type must start with `image/` and the bytes must be
/// recognised as one of the accepted formats; the declared type alone is
/// not trusted.
pub fn inspect_image(
    file_name: &str,
    declared_content_type: Option<&str>,
    bytes: &[u8],
    max_bytes: usize,
) -> Result<AcceptedImage, RejectedUpload> {
    if bytes.is_empty() {
        return Err(RejectedUpload::Empty(file_name.to_string()));
    }
    if bytes.len() > max_bytes {
        return Err(RejectedUpload::TooLarge {
            file_name: file_name.to_string(),
            size: bytes.len(),
            max: max_bytes,
        });
    }
    if !declared_content_type.is_some_and(|ct| ct.starts_with("image/")) {
        return Err(RejectedUpload::NotAnImage(file_name.to_string()));
    }

    let format = image::guess_format(bytes)
        .ok()
        .filter(|f| ACCEPTED_FORMATS.contains(f))
        .ok_or_else(|| RejectedUpload::NotAnImage(file_name.to_string()))?;

    Ok(AcceptedImage {
        content_type: format.to_mime_type(),
        extension: format.extensions_str().first().copied().unwrap_or("img"),
    })
}

/// Fail a batch in which no file was an image.
pub fn ensure_any_accepted(accepted: usize) -> Result<(), CoreError> {
    if accepted == 0 {
        return Err(CoreError::Validation("Please upload image files only".into()));
    }
    Ok(())
}

/// Storage key for a new screen image: `{project_id}/{random}.{ext}`.
pub fn storage_key(project_id: DbId, extension: &str) -> String {
    format!("{project_id}/{}.{extension}", Uuid::new_v4().simple())
}

/// Label for a screen that has no name yet: the last path segment of its
/// image location, or `Screen {n}` (1-based).
pub fn display_name_from_path(image_path: &str, index: usize) -> String {
    image_path
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("Screen {}", index + 1))
}
