//! HTTP error mapping for RecordError.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use recordit_core::error::RecordError;

/// Wrapper that turns a `RecordError` into a JSON error response.
#[derive(Debug)]
pub struct AppError(pub RecordError);

impl From<RecordError> for AppError {
    fn from(e: RecordError) -> Self {
        Self(e)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        Self(RecordError::Internal(e))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::debug!(error = %self.0, "request rejected");
        }
        let body = serde_json::json!({
            "error": self.0.message(),
            "status": status.as_u16(),
        });
        (status, Json(body)).into_response()
    }
}
