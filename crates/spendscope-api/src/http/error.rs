//! Application error type mapping to HTTP status codes and envelope format.
//!
//! Internal detail (storage errors, upstream causes) is logged here and
//! never echoed to the client.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use spendscope_types::error::ChatError;

use crate::http::response::ApiResponse;

/// Fixed message returned when the model call fails or times out.
pub const UPSTREAM_UNAVAILABLE_MESSAGE: &str = "Failed to reach the assistant. Please try again.";

const INTERNAL_MESSAGE: &str = "Internal server error";

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Chat engine errors.
    Chat(ChatError),
    /// Authentication failure.
    Unauthorized(String),
    /// Malformed path or query input.
    Validation(String),
    /// Generic internal error.
    Internal(String),
}

impl From<ChatError> for AppError {
    fn from(e: ChatError) -> Self {
        AppError::Chat(e)
    }
}

impl AppError {
    /// Status code, machine-readable code, and client-facing message.
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Chat(ChatError::NotFound) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", "Session or message not found".to_string())
            }
            AppError::Chat(ChatError::InvalidState(msg)) => {
                (StatusCode::CONFLICT, "INVALID_STATE", msg.clone())
            }
            AppError::Chat(ChatError::InvalidRequest(msg)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::Chat(ChatError::PreconditionFailed(_)) => (
                StatusCode::PRECONDITION_FAILED,
                "PRECONDITION_FAILED",
                "The session changed while the reply was generated. Reload and try again."
                    .to_string(),
            ),
            AppError::Chat(ChatError::UpstreamUnavailable(_)) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "UPSTREAM_UNAVAILABLE",
                UPSTREAM_UNAVAILABLE_MESSAGE.to_string(),
            ),
            AppError::Chat(ChatError::Storage(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "STORAGE_ERROR",
                INTERNAL_MESSAGE.to_string(),
            ),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                INTERNAL_MESSAGE.to_string(),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = ?self, "Request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = ?self, "Request rejected");
        }

        let request_id = uuid::Uuid::now_v7().to_string();
        (status, Json(ApiResponse::<()>::error(code, &message, request_id, 0))).into_response()
    }
}
