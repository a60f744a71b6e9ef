//! API error types for the Quantis server.
//!
//! Maps core domain errors to HTTP status codes and JSON error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// API error type for route handlers.
pub enum ApiError {
    /// Internal storage/database error.
    Storage(quantis_core::error::StorageError),
    /// Planner could not produce a pack (e.g. candidate pool infeasible).
    Orchestrator(quantis_core::error::OrchestratorError),
    /// Requested resource not found.
    NotFound(String),
    /// Bad request (missing header, invalid body, etc.).
    BadRequest(String),
    /// The requested state transition is not valid.
    Conflict(String),
}

impl From<quantis_core::error::StorageError> for ApiError {
    fn from(err: quantis_core::error::StorageError) -> Self {
        Self::Storage(err)
    }
}

impl From<quantis_core::error::OrchestratorError> for ApiError {
    fn from(err: quantis_core::error::OrchestratorError) -> Self {
        match err {
            quantis_core::error::OrchestratorError::InvalidTransition { .. } => {
                Self::Conflict(err.to_string())
            }
            quantis_core::error::OrchestratorError::UnknownQuestion { .. } => {
                Self::BadRequest(err.to_string())
            }
            other => Self::Orchestrator(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Storage(e) => {
                tracing::error!("storage error: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            Self::Orchestrator(e) => {
                tracing::error!("orchestrator error: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };

        let body = axum::Json(json!({ "error": message }));
        (status, body).into_response()
    }
}
