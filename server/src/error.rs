//! HTTP error surface.
//!
//! Domain errors implement [`ErrorCode`]; handlers convert them into
//! [`ApiError`], which renders as `{ "error", "message", "code" }` with a
//! matching status.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Grepable error code and retryable flag for structured error bodies.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn status(&self) -> StatusCode;

    fn retryable(&self) -> bool {
        false
    }
}

/// JSON error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    /// Short status reason, e.g. "Payload Too Large".
    pub error: String,
    pub message: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub retryable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    pub fn from_code<E: ErrorCode + ?Sized>(err: &E) -> Self {
        let status = err.status();
        Self {
            status,
            body: ErrorBody {
                error: status.canonical_reason().unwrap_or("Error").to_owned(),
                message: err.to_string(),
                code: err.error_code(),
                retryable: err.retryable(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(code = self.body.code, message = %self.body.message, "request failed");
        } else {
            tracing::info!(code = self.body.code, message = %self.body.message, "request rejected");
        }
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
