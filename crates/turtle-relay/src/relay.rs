//! Fan-out of derived messages to registered sessions.
//!
//! Nothing here keeps state. Each function takes the registry, picks its
//! recipients, serializes the message once, and queues the shared frame
//! on every recipient's outbox in registration order. Delivery is best
//! effort: a closed outbox just drops the frame.

use serde_json::Value;
use tracing::debug;
use turtle_types::{ServerMessage, TurtleId};

use crate::agent::Fanout;
use crate::registry::Registry;
use crate::session::{Outbox, encode};

/// Digest list covering every connected turtle with both state and config.
pub fn digest_list(registry: &Registry) -> ServerMessage {
    let cache = registry.cache();
    let turtle_states = registry
        .agents()
        .iter()
        .filter_map(|agent| cache.digest(agent.turtle_id()))
        .collect();
    ServerMessage::BasicStates { turtle_states }
}

/// Send `message` to every dashboard. Returns how many accepted it.
pub fn broadcast_all(registry: &Registry, message: &ServerMessage) -> usize {
    let Some(frame) = encode(message) else {
        return 0;
    };
    registry
        .observers()
        .iter()
        .filter(|observer| observer.outbox().send_text(frame.clone()))
        .count()
}

/// Send `message` to dashboards subscribed to `turtle`. Returns how many
/// accepted it.
pub fn broadcast_subscribed(registry: &Registry, turtle: TurtleId, message: &ServerMessage) -> usize {
    let mut recipients = registry
        .observers()
        .iter()
        .filter(|observer| observer.is_subscribed(turtle))
        .peekable();
    if recipients.peek().is_none() {
        return 0;
    }
    let Some(frame) = encode(message) else {
        return 0;
    };
    recipients
        .filter(|observer| observer.outbox().send_text(frame.clone()))
        .count()
}

/// Push the current digest list to every dashboard.
pub fn broadcast_digest(registry: &Registry) -> usize {
    broadcast_all(registry, &digest_list(registry))
}

/// Push the current digest list to one dashboard.
pub fn send_digest(registry: &Registry, outbox: &Outbox) -> bool {
    outbox.send(&digest_list(registry))
}

/// Deliver what [`crate::agent::apply`] produced for `turtle`.
///
/// A state change refreshes every dashboard's digest list before the
/// merged state reaches the turtle's subscribers.
pub fn dispatch(registry: &Registry, turtle: TurtleId, fanout: Fanout) {
    match fanout {
        Fanout::Nothing => {}
        Fanout::Subscribers(message) => {
            broadcast_subscribed(registry, turtle, &message);
        }
        Fanout::StateChanged(message) => {
            broadcast_digest(registry);
            broadcast_subscribed(registry, turtle, &message);
        }
    }
}

/// Forward a dashboard command to `turtle` if it is connected.
///
/// Missing `data` is sent as an empty object. Returns `false` when the
/// turtle is not connected or its connection is closing.
pub fn forward_command(
    registry: &Registry,
    turtle: TurtleId,
    command: String,
    data: Option<Value>,
) -> bool {
    let Some(agent) = registry.agent_for(turtle) else {
        debug!(%turtle, %command, "command for unconnected turtle dropped");
        return false;
    };
    if !agent.outbox().is_open() {
        debug!(%turtle, %command, "command for closing turtle dropped");
        return false;
    }

    let data = match data {
        Some(Value::Null) | None => Value::Object(serde_json::Map::new()),
        Some(data) => data,
    };
    agent.outbox().send(&ServerMessage::Command {
        id: turtle,
        command,
        data,
    })
}
