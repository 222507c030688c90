//! Telemetry structs cached per turtle and relayed to dashboards.
//!
//! Covers the full turtle state, map and inventory snapshots, the
//! mode-tagged farming configuration, and the derived fleet digest.

use serde::{Deserialize, Deserializer, Serialize};
use ts_rs::TS;

use crate::enums::{Facing, FuelAmount};
use crate::ids::TurtleId;

/// A block position `[x, y, z]`.
pub type Vec3 = [i32; 3];

/// A horizontal extent `[width, depth]`.
pub type Vec2 = [i32; 2];

/// Latest map snapshot: an ordered list of scanned cells.
pub type TurtleMap = Vec<MapCell>;

/// Latest inventory snapshot: up to 16 slots, `None` for an empty slot.
pub type Inventory = Vec<Option<InventorySlot>>;

/// Maximum number of slots in a turtle inventory.
pub const INVENTORY_SLOTS: usize = 16;

// ---------------------------------------------------------------------------
// Lua-friendly string lists
// ---------------------------------------------------------------------------

/// A list of strings that also accepts an empty JSON object.
///
/// `textutils.serialiseJSON` encodes an empty Lua table as `{}`, so a turtle
/// with no warnings sends `"warnings": {}`. Any object decodes as an empty
/// list; serialization always produces an array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, TS)]
#[serde(transparent)]
#[ts(export, export_to = "bindings/")]
pub struct StringList(pub Vec<String>);

impl StringList {
    /// Whether the list holds no strings.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the strings in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl From<Vec<String>> for StringList {
    fn from(items: Vec<String>) -> Self {
        Self(items)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawStringList {
    List(Vec<String>),
    Table(serde_json::Map<String, serde_json::Value>),
}

impl<'de> Deserialize<'de> for StringList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawStringList::deserialize(deserializer)? {
            RawStringList::List(items) => Self(items),
            RawStringList::Table(_) => Self::default(),
        })
    }
}

// ---------------------------------------------------------------------------
// Full state
// ---------------------------------------------------------------------------

/// Everything a turtle has reported about itself.
///
/// Every field except `id` is optional: turtles may send partial updates
/// and the relay merges them field by field, so a cached state only holds
/// what has been reported so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct FullState {
    /// The turtle this state belongs to.
    pub id: TurtleId,
    /// Display label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Current block position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Vec3>,
    /// Current orientation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facing: Option<Facing>,
    /// Where the turtle is currently heading, if anywhere.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Vec3>,
    /// Home position (chest / refuel point).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home: Option<Vec3>,
    /// Corner of the working area.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_left: Option<Vec3>,
    /// Extent of the working area.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds_size: Option<Vec2>,
    /// Current fuel level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuel: Option<FuelAmount>,
    /// Free-form status line (`"harvesting"`, `"refueling"`, ...).
    #[serde(rename = "state", default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Active warnings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<StringList>,
    /// Whether the operator paused the turtle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused: Option<bool>,
}

impl FullState {
    /// An empty state for `id` with no fields reported yet.
    pub const fn empty(id: TurtleId) -> Self {
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

    /// True when at least one warning string is active.
    pub fn has_warning(&self) -> bool {
        self.warnings.as_ref().is_some_and(|w| !w.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Map and inventory
// ---------------------------------------------------------------------------

/// One scanned cell of the working area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MapCell {
    /// X coordinate.
    pub x: i32,
    /// Z coordinate.
    pub z: i32,
    /// Block name (`minecraft:wheat`).
    pub b: String,
    /// Crop age, when the block is a crop.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub a: Option<u32>,
}

/// A non-empty inventory slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct InventorySlot {
    /// Number of items in the slot.
    pub count: u32,
    /// Item name.
    pub name: String,
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// The item a turtle harvests or keeps stocked, with stock thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ItemTarget {
    /// Item name.
    pub name: String,
    /// Lower stock threshold.
    pub min: u32,
    /// Upper stock threshold.
    pub max: u32,
}

/// Which seed a planting turtle replants with.
///
/// When `same_as_item` is true the harvested item is replanted and the
/// remaining fields are absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct SeedPolicy {
    /// Replant with the harvested item itself.
    pub same_as_item: bool,
    /// Seed item name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Lower stock threshold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<u32>,
    /// Upper stock threshold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<u32>,
}

/// The block a turtle works on and the age at which it is ready.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BlockTarget {
    /// Block name.
    pub name: String,
    /// Crop age at which the block is harvested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
}

/// Axis-aligned working bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Bounds {
    /// Maximum corner.
    pub max: Vec3,
    /// Minimum corner.
    pub min: Vec3,
}

/// Settings for a turtle that harvests and replants crops.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct PlantConfig {
    /// Harvested item and its stock thresholds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<ItemTarget>,
    /// Replanting policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<SeedPolicy>,
    /// Crop block and harvest age.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<BlockTarget>,
    /// Home position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home: Option<Vec3>,
    /// Working bounds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Bounds>,
    /// Fuel level that triggers a refuel trip.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refuel_level: Option<u32>,
    /// Fuel level below which the turtle raises a warning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dangerous_fuel_level: Option<u32>,
    /// Items dumped instead of stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waste_items: Option<StringList>,
    /// Maximum fuel to take on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuel_limit: Option<FuelAmount>,
    /// Turtle program version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Settings for a turtle that breaks blocks without replanting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct SmashConfig {
    /// Block to break and the age at which it is ready.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<BlockTarget>,
    /// Home position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home: Option<Vec3>,
    /// Working bounds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Bounds>,
    /// Fuel level that triggers a refuel trip.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refuel_level: Option<u32>,
    /// Fuel level below which the turtle raises a warning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dangerous_fuel_level: Option<u32>,
    /// Items dumped instead of stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waste_items: Option<StringList>,
    /// Maximum fuel to take on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuel_limit: Option<FuelAmount>,
    /// Turtle program version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// A turtle's working configuration, tagged by `mode`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "mode", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum TurtleConfig {
    /// Harvest and replant.
    Plant(PlantConfig),
    /// Break blocks.
    Smash(SmashConfig),
}

impl TurtleConfig {
    /// The configured block, in either mode.
    pub const fn block(&self) -> Option<&BlockTarget> {
        match self {
            Self::Plant(config) => config.block.as_ref(),
            Self::Smash(config) => config.block.as_ref(),
        }
    }

    /// Name of the configured block, if one is set.
    pub fn block_name(&self) -> Option<&str> {
        self.block().map(|block| block.name.as_str())
    }
}

// ---------------------------------------------------------------------------
// Derived views
// ---------------------------------------------------------------------------

/// Compact fleet-overview record broadcast to every dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct BasicState {
    /// The turtle.
    pub id: TurtleId,
    /// True when the turtle reports at least one warning.
    pub has_warning: bool,
    /// Display label, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Name of the configured block, if set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<String>,
}

impl BasicState {
    /// Build the digest for a turtle from its state and config.
    pub fn digest(state: &FullState, config: &TurtleConfig) -> Self {
        Self {
            id: state.id,
            has_warning: state.has_warning(),
            name: state.name.clone(),
            block: config.block_name().map(str::to_owned),
        }
    }
}

/// Everything cached about one turtle, sent when a dashboard subscribes.
///
/// Field groups the turtle has not reported yet are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TurtleSnapshot {
    /// Merged full state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<FullState>,
    /// Latest map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map: Option<TurtleMap>,
    /// Latest inventory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory: Option<Inventory>,
    /// Latest config.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<TurtleConfig>,
}
