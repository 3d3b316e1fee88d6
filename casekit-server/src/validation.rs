//! Input validation for untrusted uploads and identifiers.
//!
//! All user-supplied input is validated synchronously before any disk or
//! render work happens.

use thiserror::Error;

use casekit_renderer::image_io::SniffedFormat;

/// Maximum upload size for mockups and user images.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
/// Maximum length of a device-model label.
pub const MAX_MODEL_LEN: usize = 80;
/// Model label used when none is supplied.
pub const DEFAULT_MODEL: &str = "Inne";

/// Validation error types.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The upload had no bytes.
    #[error("no file was uploaded")]
    EmptyUpload,
    /// The upload exceeds [`MAX_UPLOAD_BYTES`].
    #[error("file too large (max {MAX_UPLOAD_BYTES} bytes)")]
    UploadTooLarge,
    /// The bytes are not a recognizable raster image.
    #[error("only image files are allowed")]
    NotAnImage,
    /// Mockup templates must be PNG.
    #[error("only PNG files can be uploaded as mockups")]
    NotPng,
    /// The model label is too long.
    #[error("model name too long (max {MAX_MODEL_LEN} chars)")]
    ModelTooLong,
}

/// Validate an uploaded image payload (any supported raster format).
///
/// # Errors
///
/// Returns the first failing check: emptiness, size, then content sniffing.
pub fn validate_image_upload(data: &[u8]) -> Result<(), ValidationError> {
    if data.is_empty() {
        return Err(ValidationError::EmptyUpload);
    }
    if data.len() > MAX_UPLOAD_BYTES {
        return Err(ValidationError::UploadTooLarge);
    }
    if !SniffedFormat::is_image(data) {
        return Err(ValidationError::NotAnImage);
    }
    Ok(())
}

/// Validate an uploaded mockup template (PNG only).
///
/// # Errors
///
/// Returns the first failing check; non-PNG images are rejected.
pub fn validate_mockup_upload(data: &[u8]) -> Result<(), ValidationError> {
    validate_image_upload(data)?;
    if SniffedFormat::from_magic_bytes(data) != SniffedFormat::Png {
        return Err(ValidationError::NotPng);
    }
    Ok(())
}

/// Sanitize a model label for display: keep alphanumerics, whitespace, `_`
/// and `-`; collapse an empty result to [`DEFAULT_MODEL`].
///
/// # Errors
///
/// Returns [`ValidationError::ModelTooLong`] when the input exceeds the
/// length limit.
pub fn sanitize_model(model: &str) -> Result<String, ValidationError> {
    if model.len() > MAX_MODEL_LEN {
        return Err(ValidationError::ModelTooLong);
    }
    let cleaned: String = model
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '_' || *c == '-')
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        Ok(DEFAULT_MODEL.to_string())
    } else {
        Ok(trimmed.to_string())
    }
}
