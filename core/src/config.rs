//! Run configuration, loaded from `{data_dir}/world.json`.
//!
//! Every section has defaults, so a file only needs the keys it changes.

use crate::{hex::WorldExtent, types::ResourceType};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub extent: WorldExtent,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            extent: WorldExtent { min_col: 0, max_col: 63, min_row: 0, max_row: 63 },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlementConfig {
    pub enabled: bool,
    /// Upper bound on submissions committed per step; the rest wait.
    pub max_per_step: usize,
    /// Reject offloads where sender and receiver are on different hexes.
    pub require_colocation: bool,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self { enabled: true, max_per_step: 256, require_colocation: true }
    }
}

/// Parameters for the seeded demo world.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub realm_count:      usize,
    pub bank_count:       usize,
    pub caravan_count:    usize,
    pub resource_types:   Vec<ResourceType>,
    /// Production rates are drawn from [0, max_rate].
    pub max_rate:         u64,
    pub starting_balance: u64,
    /// Per-entry chest amounts are drawn from [1, max_chest_amount].
    pub max_chest_amount: u64,
    /// Caravans arrive within this many ticks of the start.
    pub max_travel_ticks: u64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            realm_count:      12,
            bank_count:       2,
            caravan_count:    8,
            resource_types:   vec![1, 2, 3, 254, 255],
            max_rate:         5,
            starting_balance: 1_000,
            max_chest_amount: 200,
            max_travel_ticks: 20,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub world:      WorldConfig,
    pub settlement: SettlementConfig,
    pub scenario:   ScenarioConfig,
}

impl SimConfig {
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/world.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: SimConfig = serde_json::from_str(&content)?;
        if config.scenario.resource_types.is_empty() {
            anyhow::bail!("{path}: scenario.resource_types must not be empty");
        }
        Ok(config)
    }
}
