//! Axum router construction for the relay.
//!
//! Assembles the `WebSocket` endpoint and the status routes into a single
//! [`Router`] with CORS enabled for cross-origin dashboards.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::gateway;
use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router.
///
/// The router includes:
/// - `GET /` -- `WebSocket` endpoint for turtles and dashboards
/// - `GET /health` -- liveness probe
/// - `GET /api/status` -- connection counts
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(gateway::ws_upgrade))
        .route("/health", get(handlers::health))
        .route("/api/status", get(handlers::status))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
