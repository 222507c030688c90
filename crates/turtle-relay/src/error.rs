//! Error types for the relay's HTTP surface.
//!
//! [`RelayError`] converts into an Axum response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Errors that can occur while serving relay requests.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The hub task has stopped and no longer accepts events.
    #[error("relay hub is not running")]
    HubUnavailable,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::HubUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        };

        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
