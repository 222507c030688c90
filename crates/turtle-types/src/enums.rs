//! Enumeration types shared by turtles, the relay, and dashboards.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Orientation
// ---------------------------------------------------------------------------

/// Cardinal direction a turtle is facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum Facing {
    /// Towards negative Z.
    North,
    /// Towards positive X.
    East,
    /// Towards positive Z.
    South,
    /// Towards negative X.
    West,
}

// ---------------------------------------------------------------------------
// Connection roles
// ---------------------------------------------------------------------------

/// The role a connection authenticated as.
///
/// Serialized as the wire names used in the auth acknowledgement:
/// `"turtle"` for field agents and `"web"` for dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Role {
    /// A field agent reporting telemetry and receiving commands.
    #[serde(rename = "turtle")]
    Agent,
    /// A dashboard subscribing to agents and issuing commands.
    #[serde(rename = "web")]
    Observer,
}

impl Role {
    /// Wire name of the role.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Agent => "turtle",
            Self::Observer => "web",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Fuel
// ---------------------------------------------------------------------------

/// Marker for the literal string `"unlimited"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Unlimited {
    /// The only accepted value.
    #[serde(rename = "unlimited")]
    Unlimited,
}

/// A fuel quantity: either a number of units or `"unlimited"`.
///
/// Turtles report `"unlimited"` when the server disables fuel, and the
/// same spelling is used for the configured fuel limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(untagged)]
#[ts(export, export_to = "bindings/")]
pub enum FuelAmount {
    /// A concrete number of fuel units.
    Units(u32),
    /// No fuel limit applies.
    Unlimited(Unlimited),
}

impl FuelAmount {
    /// Whether this amount is the `"unlimited"` keyword.
    pub const fn is_unlimited(self) -> bool {
        matches!(self, Self::Unlimited(_))
    }
}
