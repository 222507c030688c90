//! Relay HTTP server lifecycle management.
//!
//! [`start_server`] binds the configured address and serves until
//! `Ctrl-C`. [`serve`] runs on an already bound listener with a caller
//! supplied shutdown future, which is what tests use.

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use crate::config::RelayConfig;
use crate::gateway::Gateway;
use crate::router::build_router;
use crate::state::AppState;

/// Start the relay server.
///
/// Binds to the configured address, starts the hub, and serves until
/// `Ctrl-C` is received.
///
/// # Errors
///
/// Returns an error if the address is invalid, the TCP listener cannot
/// bind, or the server encounters a fatal I/O error.
pub async fn start_server(config: &RelayConfig) -> Result<(), ServerError> {
    let addr = config
        .socket_addr()
        .map_err(|e| ServerError::Bind(e.to_string()))?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Bind(format!("bind failed on {addr}: {e}")))?;

    serve(listener, config, shutdown_signal()).await
}

/// Serve the relay on `listener` until `shutdown` resolves.
///
/// # Errors
///
/// Returns [`ServerError::Serve`] if the server encounters a fatal I/O
/// error.
pub async fn serve(
    listener: TcpListener,
    config: &RelayConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServerError> {
    let (gateway, _hub) = Gateway::spawn(config);
    let router = build_router(Arc::new(AppState::new(gateway)));

    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "relay listening");
    }

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ServerError::Serve(format!("serve error: {e}")))?;

    info!("relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}

/// Errors that can occur when starting or running the relay server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to the network address.
    #[error("bind error: {0}")]
    Bind(String),

    /// The server encountered a fatal error while serving.
    #[error("serve error: {0}")]
    Serve(String),
}
