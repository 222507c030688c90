//! Turtle sessions and their telemetry handling.
//!
//! [`apply`] folds one validated turtle message into that turtle's cache
//! record and reports what, if anything, has to be relayed. It never
//! touches another turtle's record.

use tracing::debug;
use turtle_types::{ServerMessage, TurtleId, TurtleMessage};

use crate::cache::StateCache;
use crate::session::Outbox;

/// An authenticated turtle connection.
#[derive(Debug, Clone)]
pub struct AgentSession {
    turtle: TurtleId,
    outbox: Outbox,
}

impl AgentSession {
    /// A session for `turtle` writing to `outbox`.
    pub const fn new(turtle: TurtleId, outbox: Outbox) -> Self {
        Self { turtle, outbox }
    }

    /// The id the turtle authenticated with.
    pub const fn turtle_id(&self) -> TurtleId {
        self.turtle
    }

    /// The connection's outbox.
    pub const fn outbox(&self) -> &Outbox {
        &self.outbox
    }
}

/// What has to be relayed after a turtle message was applied.
#[derive(Debug, Clone, PartialEq)]
pub enum Fanout {
    /// Nothing to send.
    Nothing,
    /// Send the message to the turtle's subscribers only.
    Subscribers(ServerMessage),
    /// The digest may have changed: broadcast the digest list to every
    /// dashboard, then send the message to the turtle's subscribers.
    StateChanged(ServerMessage),
}

/// Apply a message from `turtle` to its cache record.
pub fn apply(turtle: TurtleId, message: TurtleMessage, cache: &mut StateCache) -> Fanout {
    match message {
        TurtleMessage::State(update) => {
            let merged = cache.entry(turtle).merge_state(turtle, update).clone();
            Fanout::StateChanged(ServerMessage::TurtleState {
                of: turtle,
                turtle_state: merged,
            })
        }
        TurtleMessage::Position(update) => {
            let Some(state) = cache.state_mut(turtle) else {
                debug!(%turtle, "position before any state, ignoring");
                return Fanout::Nothing;
            };
            state.position = Some(update.position);
            state.facing = Some(update.facing);
            Fanout::Subscribers(ServerMessage::TurtlePos {
                of: turtle,
                position: update.position,
                facing: update.facing,
            })
        }
        TurtleMessage::Map(update) => {
            cache.entry(turtle).map = Some(update.map.clone());
            Fanout::Subscribers(ServerMessage::TurtleMap {
                of: turtle,
                map: update.map,
            })
        }
        TurtleMessage::Inventory(update) => {
            cache.entry(turtle).inventory = Some(update.inventory.clone());
            Fanout::Subscribers(ServerMessage::TurtleInventory {
                of: turtle,
                inventory: update.inventory,
            })
        }
        TurtleMessage::Config(update) => {
            // Picked up by the next digest broadcast.
            cache.entry(turtle).config = Some(update.config);
            Fanout::Nothing
        }
        TurtleMessage::Yields(report) => {
            debug!(%turtle, items = report.items, seeds = ?report.seeds, "yields reported");
            Fanout::Nothing
        }
    }
}
