//! Shared wire types for the turtle relay.
//!
//! This crate is the single source of truth for every message exchanged
//! between turtles, the relay, and observer dashboards. Dashboard-facing
//! types flow downstream to `TypeScript` via `ts-rs`.
//!
//! # Modules
//!
//! - [`ids`] -- Integer id wrapper for turtles
//! - [`enums`] -- Facing, connection role, fuel amounts
//! - [`structs`] -- Cached telemetry (state, map, inventory, config) and digests
//! - [`messages`] -- Inbound and outbound message envelopes
//! - [`validate`] -- Decoding and shape validation of inbound frames

pub mod enums;
pub mod ids;
pub mod messages;
pub mod structs;
pub mod validate;

// Re-export all public types at crate root for convenience.
pub use enums::{Facing, FuelAmount, Role, Unlimited};
pub use ids::TurtleId;
pub use messages::{
    AuthRequest, ConfigUpdate, InventoryUpdate, MapUpdate, ObserverRequest, PositionUpdate,
    ServerMessage, StateUpdate, TurtleMessage, YieldsReport,
};
pub use structs::{
    BasicState, BlockTarget, Bounds, FullState, INVENTORY_SLOTS, Inventory, InventorySlot,
    ItemTarget, MapCell, PlantConfig, SeedPolicy, SmashConfig, StringList, TurtleConfig,
    TurtleMap, TurtleSnapshot, Vec2, Vec3,
};
pub use validate::Rejection;
