//! Shared utility functions for the HTTP API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::storage::StorageError;

/// Build a standard JSON error response.
pub fn api_error(status: StatusCode, message: impl Into<String>) -> Response {
    let body = serde_json::json!({ "error": message.into() });
    (status, axum::Json(body)).into_response()
}

/// Map a storage failure onto a response.  Missing rows are the caller's
/// 404; everything else is a server fault.
pub fn storage_error(err: StorageError) -> Response {
    match err {
        StorageError::NotFound(_) => api_error(StatusCode::NOT_FOUND, err.to_string()),
        StorageError::AlreadyExists(_) => api_error(StatusCode::CONFLICT, err.to_string()),
        other => api_error(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    }
}
