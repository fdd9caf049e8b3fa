use axum::{extract::rejection::JsonRejection, http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};
use uniconnect_core::ConnectError;

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Rejection produced by handlers
pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Map an engine error onto a status code and body
pub fn api_error(err: ConnectError) -> ApiError {
    let (status, kind) = match &err {
        ConnectError::Validation { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "validation"),
        ConnectError::ProfileNotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
        ConnectError::Timeout { .. } => (StatusCode::SERVICE_UNAVAILABLE, "timeout"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
    };
    (
        status,
        Json(ErrorResponse {
            error: kind.to_string(),
            message: err.to_string(),
        }),
    )
}

/// Malformed or incomplete request bodies are validation failures
pub fn rejection_error(rejection: JsonRejection) -> ApiError {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ErrorResponse {
            error: "validation".to_string(),
            message: rejection.body_text(),
        }),
    )
}
