//! Wire messages exchanged over the relay's `WebSocket` connections.
//!
//! Every frame is a JSON object with a `type` discriminator. Inbound
//! messages are split by sender role ([`AuthRequest`] for the first frame,
//! then [`TurtleMessage`] or [`ObserverRequest`]); everything the relay
//! sends is a [`ServerMessage`].

use serde::{Deserialize, Deserializer, Serialize};
use ts_rs::TS;
use validator::Validate;

use crate::enums::{Facing, FuelAmount, Role};
use crate::ids::TurtleId;
use crate::structs::{
    BasicState, FullState, Inventory, StringList, TurtleConfig, TurtleMap, TurtleSnapshot, Vec2,
    Vec3,
};

// ---------------------------------------------------------------------------
// Authentication (first frame of every connection)
// ---------------------------------------------------------------------------

/// Body of the first frame of every connection (`type: "auth"`).
///
/// Turtles must include their `id`; dashboards omit it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AuthRequest {
    /// Shared secret for the connecting role.
    #[validate(length(min = 1))]
    pub key: String,
    /// Turtle id, required when authenticating as a turtle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TurtleId>,
}

// ---------------------------------------------------------------------------
// Turtle -> relay
// ---------------------------------------------------------------------------

/// A telemetry message from an authenticated turtle.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum TurtleMessage {
    /// Partial or full state update, merged field by field.
    #[serde(rename = "turtle_state")]
    State(StateUpdate),
    /// High-frequency position update.
    #[serde(rename = "turtle_pos")]
    Position(PositionUpdate),
    /// Replacement map snapshot.
    #[serde(rename = "turtle_map")]
    Map(MapUpdate),
    /// Replacement inventory snapshot.
    #[serde(rename = "turtle_inventory")]
    Inventory(InventoryUpdate),
    /// Replacement working configuration.
    #[serde(rename = "turtle_config")]
    Config(ConfigUpdate),
    /// Harvest accounting.
    #[serde(rename = "turtle_yields")]
    Yields(YieldsReport),
}

impl TurtleMessage {
    /// The turtle id carried in the message body.
    pub const fn id(&self) -> TurtleId {
        match self {
            Self::State(m) => m.id,
            Self::Position(m) => m.id,
            Self::Map(m) => m.id,
            Self::Inventory(m) => m.id,
            Self::Config(m) => m.id,
            Self::Yields(m) => m.id,
        }
    }

    /// The wire discriminator of the message.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::State(_) => "turtle_state",
            Self::Position(_) => "turtle_pos",
            Self::Map(_) => "turtle_map",
            Self::Inventory(_) => "turtle_inventory",
            Self::Config(_) => "turtle_config",
            Self::Yields(_) => "turtle_yields",
        }
    }
}

/// Deserialize a field that distinguishes "absent" from "explicitly null".
///
/// Absent yields `None` (via `#[serde(default)]`), `null` yields
/// `Some(None)`, and a value yields `Some(Some(value))`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Body of `turtle_state`. Absent fields leave the cached value untouched.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateUpdate {
    /// Sending turtle.
    pub id: TurtleId,
    /// Display label.
    #[serde(default)]
    pub name: Option<String>,
    /// Block position.
    #[serde(default)]
    pub position: Option<Vec3>,
    /// Orientation.
    #[serde(default)]
    pub facing: Option<Facing>,
    /// Movement target; `null` clears it.
    #[serde(default, deserialize_with = "double_option")]
    pub target: Option<Option<Vec3>>,
    /// Home position.
    #[serde(default)]
    pub home: Option<Vec3>,
    /// Working-area corner.
    #[serde(default)]
    pub top_left: Option<Vec3>,
    /// Working-area extent.
    #[serde(default)]
    pub bounds_size: Option<Vec2>,
    /// Fuel level.
    #[serde(default)]
    pub fuel: Option<FuelAmount>,
    /// Status line.
    #[serde(rename = "state", default)]
    pub status: Option<String>,
    /// Active warnings.
    #[serde(default)]
    pub warnings: Option<StringList>,
    /// Pause flag.
    #[serde(default)]
    pub paused: Option<bool>,
}

impl StateUpdate {
    /// An update for `id` that changes nothing.
    pub const fn new(id: TurtleId) -> Self {
        Self {
            id,
            name: None,
            position: None,
            facing: None,
            target: None,
            home: None,
            top_left: None,
            bounds_size: None,
            fuel: None,
            status: None,
            warnings: None,
            paused: None,
        }
    }
}

/// Body of `turtle_pos`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PositionUpdate {
    /// Sending turtle.
    pub id: TurtleId,
    /// Block position.
    pub position: Vec3,
    /// Orientation.
    pub facing: Facing,
}

/// Body of `turtle_map`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MapUpdate {
    /// Sending turtle.
    pub id: TurtleId,
    /// Scanned cells.
    pub map: TurtleMap,
}

/// Body of `turtle_inventory`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Validate)]
pub struct InventoryUpdate {
    /// Sending turtle.
    pub id: TurtleId,
    /// Slots in order, `null` for empty.
    #[validate(length(max = 16))]
    pub inventory: Inventory,
}

/// Body of `turtle_config`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConfigUpdate {
    /// Sending turtle.
    pub id: TurtleId,
    /// The new configuration.
    pub config: TurtleConfig,
}

/// Body of `turtle_yields`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct YieldsReport {
    /// Sending turtle.
    pub id: TurtleId,
    /// Items harvested since the last report.
    pub items: u32,
    /// Seeds collected since the last report.
    #[serde(default)]
    pub seeds: Option<u32>,
}

// ---------------------------------------------------------------------------
// Dashboard -> relay
// ---------------------------------------------------------------------------

/// A request from an authenticated dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ObserverRequest {
    /// Start receiving per-turtle updates.
    Subscribe {
        /// Turtle to follow.
        id: TurtleId,
    },
    /// Stop receiving per-turtle updates.
    Unsubscribe {
        /// Turtle to stop following.
        id: TurtleId,
    },
    /// Forward a command to a connected turtle.
    Command {
        /// Target turtle.
        id: TurtleId,
        /// Command name.
        command: String,
        /// Command arguments; forwarded as `{}` when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<serde_json::Value>,
    },
}

// ---------------------------------------------------------------------------
// Relay -> turtles and dashboards
// ---------------------------------------------------------------------------

/// Every message the relay sends.
///
/// Turtles only ever receive [`ServerMessage::Auth`] and
/// [`ServerMessage::Command`]; all other variants go to dashboards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ServerMessage {
    /// Auth acknowledgement.
    Auth {
        /// Whether the connection was accepted.
        success: bool,
        /// The accepted role; absent on failure.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<Role>,
    },
    /// Fleet digest list.
    BasicStates {
        /// One digest per turtle with both state and config.
        #[serde(rename = "turtleStates")]
        turtle_states: Vec<BasicState>,
    },
    /// Snapshot sent in reply to a subscribe.
    TurtleFull {
        /// The turtle described.
        of: TurtleId,
        /// Cached data; unreported groups omitted.
        turtle: TurtleSnapshot,
    },
    /// Merged state after a `turtle_state`.
    TurtleState {
        /// The turtle described.
        of: TurtleId,
        /// The full merged state.
        #[serde(rename = "turtleState")]
        turtle_state: FullState,
    },
    /// Position delta.
    TurtlePos {
        /// The turtle described.
        of: TurtleId,
        /// Block position.
        position: Vec3,
        /// Orientation.
        facing: Facing,
    },
    /// Map replacement.
    TurtleMap {
        /// The turtle described.
        of: TurtleId,
        /// Scanned cells.
        map: TurtleMap,
    },
    /// Inventory replacement.
    TurtleInventory {
        /// The turtle described.
        of: TurtleId,
        /// Slots in order.
        inventory: Inventory,
    },
    /// The turtle disconnected and its cached data was dropped.
    TurtleRemoved {
        /// The departed turtle.
        id: TurtleId,
    },
    /// Command forwarded from a dashboard to a turtle.
    Command {
        /// Target turtle.
        id: TurtleId,
        /// Command name.
        command: String,
        /// Command arguments.
        data: serde_json::Value,
    },
}

impl ServerMessage {
    /// Successful auth acknowledgement for `role`.
    pub const fn auth_accepted(role: Role) -> Self {
        Self::Auth {
            success: true,
            message: Some(role),
        }
    }

    /// Failed auth acknowledgement, sent right before the connection closes.
    pub const fn auth_rejected() -> Self {
        Self::Auth {
            success: false,
            message: None,
        }
    }
}
