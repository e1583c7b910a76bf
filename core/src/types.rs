//! Shared primitive types used across the entire core.

use serde::{Deserialize, Serialize};

/// A simulation tick, supplied by an external clock.
pub type Tick = u64;

/// A stable identifier for any simulation object (realm, caravan, bank, chest).
/// Chain-compatible ids exceed 64 bits, so this is 128 bits wide.
pub type EntityId = u128;

/// A resource quantity. Balances never go negative.
pub type Amount = u128;

/// Net units accrued per tick. Negative rates model net consumption.
pub type Rate = i128;

/// The small integer enum identifying a resource kind.
pub type ResourceType = u8;

/// The canonical run identifier.
pub type RunId = String;

/// Resource ids with fixed meaning.
pub mod resource_ids {
    use super::ResourceType;

    pub const WHEAT: ResourceType = 254;
    pub const FISH: ResourceType = 255;

    /// The two resources reported together as "food".
    pub const FOOD: [ResourceType; 2] = [WHEAT, FISH];
}

/// A cell on the offset hex grid. Several entities may share one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub col: i64,
    pub row: i64,
}

impl Position {
    pub const fn new(col: i64, row: i64) -> Self {
        Self { col, row }
    }
}

/// A typed amount of one resource.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceAmount {
    pub resource_type: ResourceType,
    #[serde(with = "crate::serde_u128_string")]
    pub amount: Amount,
}

impl ResourceAmount {
    pub const fn new(resource_type: ResourceType, amount: Amount) -> Self {
        Self { resource_type, amount }
    }
}
