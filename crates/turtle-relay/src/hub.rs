//! The hub: sole owner of the registry and the telemetry cache.
//!
//! Connection tasks never touch shared state. They report what happened
//! as [`GatewayEvent`]s on one inbox, and [`Hub::run`] handles those
//! events strictly one at a time. Everything a single event does,
//! including the multi-step cleanup when a turtle disconnects, therefore
//! happens atomically with respect to every other connection.
//!
//! # Connection lifecycle
//!
//! 1. `Connected` parks the connection's outbox as pending.
//! 2. The first `Frame` goes through the [`AuthGate`]. On success the
//!    session is registered and acknowledged; dashboards additionally get
//!    their first digest list after the configured delay. On failure a
//!    failure ack is queued and the connection is closed.
//! 3. Later frames are validated and handed to the role's handler.
//! 4. `Closed` deregisters the session. A departing turtle's subscribers
//!    are told it was removed, its cache record is purged, and every
//!    dashboard gets a fresh digest list.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use turtle_types::validate::{self, Rejection};
use turtle_types::{Role, ServerMessage, TurtleId};

use crate::agent::{self, AgentSession};
use crate::auth::{Admission, AuthGate};
use crate::config::RelayConfig;
use crate::observer;
use crate::registry::Registry;
use crate::relay;
use crate::session::{ConnectionId, Outbox, Session};

/// Something that happened on a connection, or a query for the hub.
#[derive(Debug)]
pub enum GatewayEvent {
    /// A `WebSocket` was accepted; it is unauthenticated until its first frame.
    Connected {
        /// Where frames for the connection go.
        outbox: Outbox,
    },
    /// A text frame arrived.
    Frame {
        /// Sending connection.
        connection: ConnectionId,
        /// Frame payload.
        text: String,
    },
    /// The connection is gone.
    Closed {
        /// Closed connection.
        connection: ConnectionId,
    },
    /// A dashboard's delayed first digest is due.
    DigestDue {
        /// The dashboard's connection.
        connection: ConnectionId,
    },
    /// Report current connection counts.
    Status {
        /// Where to send the report.
        reply: oneshot::Sender<StatusReport>,
    },
}

/// Point-in-time connection counts, served on `/api/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    /// Authenticated turtles.
    pub agents: usize,
    /// Authenticated dashboards.
    pub observers: usize,
    /// Connections still waiting for their auth frame.
    pub pending: usize,
    /// Connected turtle ids in registration order.
    pub turtles: Vec<TurtleId>,
}

/// Owner of all relay state.
#[derive(Debug)]
pub struct Hub {
    gate: AuthGate,
    registry: Registry,
    pending: BTreeMap<ConnectionId, Outbox>,
    digest_delay: Duration,
    inbox: mpsc::WeakUnboundedSender<GatewayEvent>,
}

impl Hub {
    /// A hub configured from `config`.
    ///
    /// `inbox` is a weak handle to the hub's own event channel, used to
    /// schedule delayed digests without keeping the channel open.
    pub fn new(config: &RelayConfig, inbox: mpsc::WeakUnboundedSender<GatewayEvent>) -> Self {
        Self {
            gate: AuthGate::new(config.turtle_key.clone(), config.web_key.clone()),
            registry: Registry::new(),
            pending: BTreeMap::new(),
            digest_delay: config.basic_states_delay,
            inbox,
        }
    }

    /// Handle events until every sender is dropped.
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<GatewayEvent>) {
        while let Some(event) = events.recv().await {
            self.handle(event);
        }
        info!("hub stopped: no more gateway handles");
    }

    /// Handle one event.
    pub fn handle(&mut self, event: GatewayEvent) {
        match event {
            GatewayEvent::Connected { outbox } => {
                debug!(conn = %outbox.connection(), "connection accepted");
                self.pending.insert(outbox.connection(), outbox);
            }
            GatewayEvent::Frame { connection, text } => self.on_frame(connection, &text),
            GatewayEvent::Closed { connection } => self.on_closed(connection),
            GatewayEvent::DigestDue { connection } => {
                if let Some(observer) = self.registry.observer(connection) {
                    relay::send_digest(&self.registry, observer.outbox());
                }
            }
            GatewayEvent::Status { reply } => {
                let _ = reply.send(self.status());
            }
        }
    }

    /// Current connection counts.
    pub fn status(&self) -> StatusReport {
        StatusReport {
            agents: self.registry.agents().len(),
            observers: self.registry.observers().len(),
            pending: self.pending.len(),
            turtles: self.registry.turtle_ids(),
        }
    }

    /// The registry, for inspection.
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    fn on_frame(&mut self, connection: ConnectionId, text: &str) {
        if let Some(outbox) = self.pending.remove(&connection) {
            self.authenticate(outbox, text);
            return;
        }

        match self.registry.role_of(connection) {
            Some(Role::Agent) => self.on_agent_frame(connection, text),
            Some(Role::Observer) => self.on_observer_frame(connection, text),
            None => debug!(conn = %connection, "frame from deregistered connection ignored"),
        }
    }

    fn authenticate(&mut self, outbox: Outbox, text: &str) {
        let connection = outbox.connection();
        let admission = match self.gate.classify(text) {
            Ok(admission) => admission,
            Err(failure) => {
                warn!(conn = %connection, error = %failure, "authentication failed");
                outbox.send(&ServerMessage::auth_rejected());
                outbox.close();
                return;
            }
        };

        match admission {
            Admission::Agent(turtle) => {
                if let Some(displaced) = self.registry.register_agent(turtle, outbox.clone()) {
                    warn!(
                        %turtle,
                        conn = %connection,
                        displaced = %displaced.outbox().connection(),
                        "turtle id reconnected, closing older session"
                    );
                    displaced.outbox().close();
                }
                outbox.send(&ServerMessage::auth_accepted(Role::Agent));
                info!(conn = %connection, %turtle, role = %Role::Agent, "authenticated");
            }
            Admission::Observer => {
                self.registry.register_observer(outbox.clone());
                outbox.send(&ServerMessage::auth_accepted(Role::Observer));
                info!(conn = %connection, role = %Role::Observer, "authenticated");
                self.schedule_digest(&outbox);
            }
        }
    }

    fn schedule_digest(&self, outbox: &Outbox) {
        if self.digest_delay.is_zero() {
            relay::send_digest(&self.registry, outbox);
            return;
        }

        let connection = outbox.connection();
        let delay = self.digest_delay;
        let inbox = self.inbox.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inbox) = inbox.upgrade() {
                let _ = inbox.send(GatewayEvent::DigestDue { connection });
            }
        });
    }

    fn on_agent_frame(&mut self, connection: ConnectionId, text: &str) {
        let Some(turtle) = self.registry.agent(connection).map(AgentSession::turtle_id) else {
            return;
        };
        let Some(message) = decode(connection, text, validate::turtle_message) else {
            return;
        };
        if message.id() != turtle {
            warn!(
                conn = %connection,
                %turtle,
                claimed = %message.id(),
                kind = message.kind(),
                "message for another turtle dropped"
            );
            return;
        }

        debug!(conn = %connection, %turtle, kind = message.kind(), "turtle message");
        let fanout = agent::apply(turtle, message, self.registry.cache_mut());
        relay::dispatch(&self.registry, turtle, fanout);
    }

    fn on_observer_frame(&mut self, connection: ConnectionId, text: &str) {
        if let Some(request) = decode(connection, text, validate::observer_request) {
            observer::handle_request(&mut self.registry, connection, request);
        }
    }

    fn on_closed(&mut self, connection: ConnectionId) {
        if self.pending.remove(&connection).is_some() {
            debug!(conn = %connection, "closed before authenticating");
            return;
        }

        match self.registry.remove(connection) {
            Some(Session::Agent(agent)) => {
                let turtle = agent.turtle_id();
                relay::broadcast_subscribed(
                    &self.registry,
                    turtle,
                    &ServerMessage::TurtleRemoved { id: turtle },
                );
                self.registry.cache_mut().purge(turtle);
                info!(conn = %connection, %turtle, "turtle disconnected");
                relay::broadcast_digest(&self.registry);
            }
            Some(Session::Observer(_)) => {
                info!(conn = %connection, "dashboard disconnected");
            }
            None => debug!(conn = %connection, "closed connection was already deregistered"),
        }
    }
}

/// Decode and validate a frame from an authenticated connection.
///
/// Undecodable frames are logged at `warn`, unrecognized shapes at
/// `debug`. Either way the frame is dropped and the connection stays open.
fn decode<T>(
    connection: ConnectionId,
    text: &str,
    accept: impl FnOnce(serde_json::Value) -> Result<T, Rejection>,
) -> Option<T> {
    let result = validate::decode_frame(text).and_then(accept);
    match result {
        Ok(message) => Some(message),
        Err(rejection) if rejection.is_decode() => {
            warn!(conn = %connection, error = %rejection, "undecodable frame dropped");
            None
        }
        Err(rejection) => {
            debug!(conn = %connection, error = %rejection, "rejected frame dropped");
            None
        }
    }
}
