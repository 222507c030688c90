//! Shared application state for the relay's Axum routes.

use crate::gateway::Gateway;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`](std::sync::Arc) and injected via Axum's `State`
/// extractor. Every route talks to the hub through the gateway handle.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Handle to the running hub.
    pub gateway: Gateway,
}

impl AppState {
    /// State wrapping `gateway`.
    pub const fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }
}
