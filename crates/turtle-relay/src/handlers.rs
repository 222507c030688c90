//! Plain HTTP handlers served next to the `WebSocket` endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;

use crate::error::RelayError;
use crate::hub::StatusReport;
use crate::state::AppState;

/// Liveness probe.
///
/// # Route
///
/// `GET /health`
pub async fn health() -> &'static str {
    "ok"
}

/// Connection counts as seen by the hub.
///
/// # Route
///
/// `GET /api/status`
pub async fn status(State(state): State<Arc<AppState>>) -> Result<Json<StatusReport>, RelayError> {
    let report = state.gateway.status().await?;
    Ok(Json(report))
}
