//! API error type and its JSON envelope.
//!
//! Every failure surfaces as `{"success": false, "error": "..."}` with an
//! appropriate status code; handlers bubble errors with `?`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::library::LibraryError;
use crate::validation::ValidationError;

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors surfaced by the HTTP API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request was malformed or failed validation.
    #[error("{0}")]
    BadRequest(String),

    /// The referenced mockup or resource does not exist.
    #[error("{0}")]
    NotFound(String),

    /// An internal failure (disk, render pipeline).
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {self}");
        } else {
            tracing::debug!("request rejected: {self}");
        }
        let body = Json(serde_json::json!({
            "success": false,
            "error": self.to_string(),
        }));
        (status, body).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl From<LibraryError> for ApiError {
    fn from(e: LibraryError) -> Self {
        match e {
            LibraryError::NotFound(_) => Self::NotFound(e.to_string()),
            LibraryError::InvalidModel | LibraryError::InvalidId(_) => {
                Self::BadRequest(e.to_string())
            }
            LibraryError::Io(_) => Self::Internal(e.to_string()),
        }
    }
}

impl From<casekit_core::CoreError> for ApiError {
    fn from(e: casekit_core::CoreError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<casekit_renderer::RenderError> for ApiError {
    fn from(e: casekit_renderer::RenderError) -> Self {
        match e {
            casekit_renderer::RenderError::Resource { .. } => Self::BadRequest(e.to_string()),
            _ => Self::Internal(e.to_string()),
        }
    }
}

impl From<axum::extract::multipart::MultipartError> for ApiError {
    fn from(e: axum::extract::multipart::MultipartError) -> Self {
        Self::BadRequest(format!("invalid multipart body: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::BadRequest("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Internal("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_library_not_found_maps_to_404() {
        let err: ApiError = LibraryError::NotFound(42).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
