//! Dashboard sessions and their requests.

use tracing::debug;
use turtle_types::{ObserverRequest, ServerMessage, TurtleId};

use crate::registry::Registry;
use crate::relay;
use crate::session::{ConnectionId, Outbox};

/// An authenticated dashboard connection and the turtles it follows.
#[derive(Debug, Clone)]
pub struct ObserverSession {
    outbox: Outbox,
    subscriptions: Vec<TurtleId>,
}

impl ObserverSession {
    /// A session with no subscriptions.
    pub const fn new(outbox: Outbox) -> Self {
        Self {
            outbox,
            subscriptions: Vec::new(),
        }
    }

    /// The connection's outbox.
    pub const fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    /// Follow `turtle`. Returns `false` if it was already followed.
    pub fn subscribe(&mut self, turtle: TurtleId) -> bool {
        if self.is_subscribed(turtle) {
            return false;
        }
        self.subscriptions.push(turtle);
        true
    }

    /// Stop following `turtle`. Returns `false` if it was not followed.
    pub fn unsubscribe(&mut self, turtle: TurtleId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|id| *id != turtle);
        self.subscriptions.len() != before
    }

    /// Whether `turtle` is followed.
    pub fn is_subscribed(&self, turtle: TurtleId) -> bool {
        self.subscriptions.contains(&turtle)
    }

    /// Followed turtles, in subscription order.
    pub fn subscriptions(&self) -> &[TurtleId] {
        &self.subscriptions
    }
}

/// Handle a validated request from the dashboard on `connection`.
pub fn handle_request(registry: &mut Registry, connection: ConnectionId, request: ObserverRequest) {
    match request {
        ObserverRequest::Subscribe { id } => {
            let Some(observer) = registry.observer_mut(connection) else {
                return;
            };
            observer.subscribe(id);
            let outbox = observer.outbox().clone();
            debug!(conn = %connection, turtle = %id, "subscribed");

            if let Some(turtle) = registry.cache().snapshot(id) {
                outbox.send(&ServerMessage::TurtleFull { of: id, turtle });
            }
        }
        ObserverRequest::Unsubscribe { id } => {
            let removed = registry
                .observer_mut(connection)
                .is_some_and(|observer| observer.unsubscribe(id));
            if removed {
                debug!(conn = %connection, turtle = %id, "unsubscribed");
            }
        }
        ObserverRequest::Command { id, command, data } => {
            relay::forward_command(registry, id, command, data);
        }
    }
}
