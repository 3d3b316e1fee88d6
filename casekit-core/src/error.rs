//! Error types for editor-state operations.

use thiserror::Error;

/// Result type for editor-state operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in editor-state operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Element index or id not present in the collection.
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// No element is currently active.
    #[error("No active element")]
    NoActiveElement,

    /// Invalid operation on the collection or selector.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Element-set or calibration serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Persistence backend failure (remote save/load/delete).
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Filesystem error while reading or writing local state.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
