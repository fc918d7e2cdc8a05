//! Error-to-HTTP response conversion.
//!
//! Implements `IntoResponse` for [`crate::error::Error`] so route handlers
//! can return `Result<T, ApiError>` and bubble failures with `?`. The body
//! is the standard `{ "ok": false, "error": ... }` envelope.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::error::Error;

/// Wrapper so the crate error can cross the axum response boundary.
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(status = %status, error = %self.0, "request failed");
        }

        let body = json!({
            "ok": false,
            "error": self.0.to_string(),
        });

        (status, axum::Json(body)).into_response()
    }
}
