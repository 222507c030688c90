//! `WebSocket` gateway: pumps frames between sockets and the hub.
//!
//! Each accepted socket is split. A writer task drains the connection's
//! outbox into the sink; the reader loop forwards every inbound frame to
//! the hub in arrival order. When either side finishes, the hub is told
//! the connection closed and the writer is stopped.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::hub::{GatewayEvent, Hub, StatusReport};
use crate::session::{ConnectionId, Outbound, Outbox};
use crate::state::AppState;

/// Cloneable handle for reporting connection events to the hub.
#[derive(Debug, Clone)]
pub struct Gateway {
    events: mpsc::UnboundedSender<GatewayEvent>,
    next_connection: Arc<AtomicU64>,
}

impl Gateway {
    /// Start a hub for `config` and return a handle to it.
    ///
    /// The hub stops once every clone of the returned handle is dropped.
    pub fn spawn(config: &RelayConfig) -> (Self, JoinHandle<()>) {
        let (events, inbox) = mpsc::unbounded_channel();
        let hub = Hub::new(config, events.downgrade());
        let task = tokio::spawn(hub.run(inbox));
        let gateway = Self {
            events,
            next_connection: Arc::new(AtomicU64::new(1)),
        };
        (gateway, task)
    }

    /// Announce a new connection and get the receiver its writer drains.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::HubUnavailable`] if the hub has stopped.
    pub fn connect(&self) -> Result<(ConnectionId, mpsc::UnboundedReceiver<Outbound>), RelayError> {
        let connection = ConnectionId(self.next_connection.fetch_add(1, Ordering::Relaxed));
        let (outbox, outbound) = Outbox::channel(connection);
        self.send(GatewayEvent::Connected { outbox })?;
        Ok((connection, outbound))
    }

    /// Forward a text frame from `connection`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::HubUnavailable`] if the hub has stopped.
    pub fn frame(&self, connection: ConnectionId, text: String) -> Result<(), RelayError> {
        self.send(GatewayEvent::Frame { connection, text })
    }

    /// Report that `connection` is gone.
    pub fn closed(&self, connection: ConnectionId) {
        if self.send(GatewayEvent::Closed { connection }).is_err() {
            debug!(conn = %connection, "hub already stopped");
        }
    }

    /// Ask the hub for its connection counts.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::HubUnavailable`] if the hub has stopped.
    pub async fn status(&self) -> Result<StatusReport, RelayError> {
        let (reply, report) = oneshot::channel();
        self.send(GatewayEvent::Status { reply })?;
        report.await.map_err(|_closed| RelayError::HubUnavailable)
    }

    fn send(&self, event: GatewayEvent) -> Result<(), RelayError> {
        self.events
            .send(event)
            .map_err(|_closed| RelayError::HubUnavailable)
    }
}

/// Upgrade an HTTP request to a relay `WebSocket`.
///
/// # Route
///
/// `GET /`
pub async fn ws_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let gateway = state.gateway.clone();
    ws.on_upgrade(move |socket| run_connection(socket, gateway))
}

/// Drive one `WebSocket` until either side closes it.
pub async fn run_connection(socket: WebSocket, gateway: Gateway) {
    let Ok((connection, mut outbound)) = gateway.connect() else {
        warn!("hub is not running, dropping connection");
        return;
    };
    debug!(conn = %connection, "WebSocket client connected");

    let (mut sink, mut stream) = socket.split();

    let mut writer = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            match frame {
                Outbound::Text(text) => {
                    if sink.send(Message::Text(text.to_string().into())).await.is_err() {
                        return;
                    }
                }
                Outbound::Close => {
                    let _ = sink.send(Message::Close(None)).await;
                    return;
                }
            }
        }
    });

    loop {
        tokio::select! {
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if gateway.frame(connection, text.to_string()).is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => {
                        if gateway.frame(connection, text).is_err() {
                            break;
                        }
                    }
                    Err(e) => debug!(conn = %connection, error = %e, "non-UTF-8 binary frame dropped"),
                },
                Some(Ok(Message::Close(_))) | None => break,
                // Pings are answered by the protocol layer.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(conn = %connection, error = %e, "WebSocket error");
                    break;
                }
            },
            _ = &mut writer => break,
        }
    }

    gateway.closed(connection);
    writer.abort();
    debug!(conn = %connection, "WebSocket client disconnected");
}
