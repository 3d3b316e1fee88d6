//! Renderer error types.

use thiserror::Error;

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors that can occur while loading assets or compositing.
#[derive(Debug, Error)]
pub enum RenderError {
    /// An asset failed to fetch or decode. Carries the asset name so the
    /// user-facing message can point at the failing image.
    #[error("Failed to load {asset}: {reason}")]
    Resource {
        /// Which asset failed (path, data URI label, or "mockup").
        asset: String,
        /// Why it failed.
        reason: String,
    },

    /// The asset fan-in exceeded its deadline before every image finished.
    #[error("Timed out after {0:?} waiting for images to load")]
    Timeout(std::time::Duration),

    /// Composition failed (surface allocation, invalid target).
    #[error("Composition error: {0}")]
    Compose(String),

    /// PNG/JPEG encoding failed.
    #[error("Encoding failed: {0}")]
    Encode(String),
}

impl RenderError {
    /// Build a resource error for a named asset.
    #[must_use]
    pub fn resource(asset: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Resource {
            asset: asset.into(),
            reason: reason.to_string(),
        }
    }
}
