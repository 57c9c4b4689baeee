//! Error-to-HTTP response conversion.
//!
//! Route handlers return `Result<T, AppError>`; registry errors convert via
//! `?` and are rendered as `{ "error": ..., "code": ... }`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use streamgate_common::Error;

/// Error returned from API handlers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The request itself was malformed.
    #[error("{0}")]
    BadRequest(String),
    /// The registry rejected the operation.
    #[error(transparent)]
    Stream(#[from] Error),
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Stream(e) => {
                StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let code = match &self {
            AppError::BadRequest(_) => "bad_request",
            AppError::Stream(e) => e.code(),
        };
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(status = %status, error = %message, "Server error in API handler");
        }

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
