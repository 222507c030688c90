//! Stateful `WebSocket` relay between turtles and observer dashboards.
//!
//! Turtles stream telemetry (state, position, map, inventory, config) and
//! receive commands; dashboards follow individual turtles and issue those
//! commands. This crate provides:
//!
//! - **`WebSocket` endpoint** (`GET /`) shared by both roles; the first
//!   frame authenticates and decides the role
//! - **Per-turtle cache** with merge semantics for partial state updates
//! - **Subscription fan-out**: fleet digests to every dashboard, per-turtle
//!   deltas only to subscribers
//! - **Status routes** (`GET /health`, `GET /api/status`)
//!
//! # Architecture
//!
//! A single hub task owns the [`Registry`] and its [`StateCache`] and
//! handles connection events one at a time, so no locks guard relay
//! state. Connection tasks only forward frames to the hub and drain
//! their outbox back onto the socket.
//!
//! [`Registry`]: registry::Registry
//! [`StateCache`]: cache::StateCache

pub mod agent;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod hub;
pub mod observer;
pub mod registry;
pub mod relay;
pub mod router;
pub mod server;
pub mod session;
pub mod state;

// Re-export primary types for convenience.
pub use config::{ConfigError, RelayConfig};
pub use error::RelayError;
pub use gateway::Gateway;
pub use hub::{GatewayEvent, Hub, StatusReport};
pub use router::build_router;
pub use server::{ServerError, serve, start_server};
pub use state::AppState;
