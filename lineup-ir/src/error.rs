//! Error types for lineup-ir
//!
//! **[IRE-ERR-010]** API error categorization and reporting

use crate::services::resolver::ResolveError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409) - e.g., capture cannot be re-evaluated
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Capture cannot be grouped (422) - no usable description
    #[error("Ungroupable: {0}")]
    Ungroupable(String),

    /// External collaborator failure (502)
    #[error("Upstream failure: {0}")]
    Upstream(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),

    /// lineup-common error
    #[error("Common error: {0}")]
    Common(#[from] lineup_common::Error),
}

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::CaptureNotFound(id) => {
                ApiError::NotFound(format!("Capture {} not found", id))
            }
            ResolveError::NoUsableDescription(id) => ApiError::Ungroupable(format!(
                "Capture {} has no usable description",
                id
            )),
            ResolveError::RepresentativeReevaluation(..) => ApiError::Conflict(err.to_string()),
            ResolveError::Describer(e) => ApiError::Upstream(e.to_string()),
            ResolveError::Verifier(e) => ApiError::Upstream(e.to_string()),
            ResolveError::Database(e) => ApiError::Internal(e.to_string()),
            ResolveError::Settings(e) => ApiError::Common(e),
            ResolveError::Storage(e) => ApiError::Other(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Ungroupable(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "UNGROUPABLE", msg)
            }
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", msg),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg,
            ),
            ApiError::Io(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "IO_ERROR",
                err.to_string(),
            ),
            ApiError::Other(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                err.to_string(),
            ),
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
