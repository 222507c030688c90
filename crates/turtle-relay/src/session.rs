//! Connection handles shared by both session roles.
//!
//! Every accepted `WebSocket` gets a [`ConnectionId`] and an [`Outbox`]: the
//! sending half of an unbounded channel drained by that connection's
//! writer task. Sessions never touch the socket directly; they queue
//! frames and the writer delivers them in order.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tracing::warn;
use turtle_types::{Role, ServerMessage};

use crate::agent::AgentSession;
use crate::observer::ObserverSession;

/// Identifier assigned to each accepted connection, in accept order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(pub u64);

impl core::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A frame queued for a connection's writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// A JSON text frame, shared between recipients of the same fan-out.
    Text(Arc<str>),
    /// Send a close frame and stop writing.
    Close,
}

/// Sending side of one connection.
///
/// Cloning an outbox yields another handle to the same connection.
#[derive(Debug, Clone)]
pub struct Outbox {
    connection: ConnectionId,
    tx: mpsc::UnboundedSender<Outbound>,
    open: Arc<AtomicBool>,
}

impl Outbox {
    /// Wrap the sending half of a connection's frame channel.
    pub fn new(connection: ConnectionId, tx: mpsc::UnboundedSender<Outbound>) -> Self {
        Self {
            connection,
            tx,
            open: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Create an outbox together with the receiver its writer drains.
    pub fn channel(connection: ConnectionId) -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(connection, tx), rx)
    }

    /// The connection this outbox writes to.
    pub const fn connection(&self) -> ConnectionId {
        self.connection
    }

    /// Whether frames can still be delivered.
    ///
    /// False once [`Outbox::close`] was called or the writer task is gone.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire) && !self.tx.is_closed()
    }

    /// Queue an already encoded frame. Returns `false` if it was dropped.
    pub fn send_text(&self, text: Arc<str>) -> bool {
        self.is_open() && self.tx.send(Outbound::Text(text)).is_ok()
    }

    /// Encode and queue a message. Returns `false` if it was dropped.
    pub fn send(&self, message: &ServerMessage) -> bool {
        encode(message).is_some_and(|text| self.send_text(text))
    }

    /// Queue a close frame. Later sends are dropped.
    pub fn close(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            let _ = self.tx.send(Outbound::Close);
        }
    }
}

/// Serialize a message once so it can be shared across recipients.
pub fn encode(message: &ServerMessage) -> Option<Arc<str>> {
    serde_json::to_string(message)
        .inspect_err(|e| warn!(error = %e, "failed to serialize outbound message"))
        .ok()
        .map(Arc::from)
}

/// An authenticated connection in one of its two roles.
#[derive(Debug, Clone)]
pub enum Session {
    /// A turtle.
    Agent(AgentSession),
    /// A dashboard.
    Observer(ObserverSession),
}

impl Session {
    /// Which role the connection authenticated as.
    pub const fn role(&self) -> Role {
        match self {
            Self::Agent(_) => Role::Agent,
            Self::Observer(_) => Role::Observer,
        }
    }

    /// The connection's outbox.
    pub const fn outbox(&self) -> &Outbox {
        match self {
            Self::Agent(agent) => agent.outbox(),
            Self::Observer(observer) => observer.outbox(),
        }
    }

    /// The connection id.
    pub const fn connection(&self) -> ConnectionId {
        self.outbox().connection()
    }
}
