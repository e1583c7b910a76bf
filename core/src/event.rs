//! Domain events — every state change the core makes is described here.
//!
//! Services return the events their mutations produced; the engine
//! persists them to the event log in emission order.

use crate::types::{Amount, EntityId, Rate, ResourceAmount, ResourceType, RunId, Tick};
use serde::{Deserialize, Serialize};

/// Every event emitted by the core.
/// Variants are appended only — never removed or reordered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    // ── Engine events ──────────────────────────────
    StepStarted {
        tick: Tick,
    },
    StepCompleted {
        tick: Tick,
    },
    RunInitialized {
        run_id: RunId,
        seed: u64,
    },

    // ── Ledger events ──────────────────────────────
    /// A checkpoint was written: `accrued` is the balance computed up to
    /// `tick`, `balance` the stored value after the mutation.
    BalanceCheckpointed {
        tick: Tick,
        #[serde(with = "crate::serde_u128_string")]
        entity_id: EntityId,
        resource_type: ResourceType,
        #[serde(with = "crate::serde_u128_string")]
        accrued: Amount,
        #[serde(with = "crate::serde_u128_string")]
        balance: Amount,
    },
    ProductionRateSet {
        tick: Tick,
        #[serde(with = "crate::serde_u128_string")]
        entity_id: EntityId,
        resource_type: ResourceType,
        #[serde(with = "crate::serde_u128_string::signed")]
        rate: Rate,
    },

    // ── Chest events ───────────────────────────────
    ChestPacked {
        tick: Tick,
        #[serde(with = "crate::serde_u128_string")]
        carrier_id: EntityId,
        #[serde(with = "crate::serde_u128_string")]
        chest_id: EntityId,
        slot_index: u32,
        resources: Vec<ResourceAmount>,
    },
    ChestOffloaded {
        tick: Tick,
        #[serde(with = "crate::serde_u128_string")]
        receiver_id: EntityId,
        #[serde(with = "crate::serde_u128_string")]
        sender_id: EntityId,
        slot_index: u32,
        #[serde(with = "crate::serde_u128_string")]
        chest_id: EntityId,
        resources: Vec<ResourceAmount>,
    },
    /// Slot had no live chest; treated as already settled.
    SlotSkipped {
        tick: Tick,
        #[serde(with = "crate::serde_u128_string")]
        sender_id: EntityId,
        slot_index: u32,
    },

    // ── Submission events ──────────────────────────
    OffloadRequested {
        tick: Tick,
        handle: String,
        #[serde(with = "crate::serde_u128_string")]
        receiver_id: EntityId,
        #[serde(with = "crate::serde_u128_string")]
        sender_id: EntityId,
        indices: Vec<u32>,
    },
    OffloadSettled {
        tick: Tick,
        handle: String,
        offloaded: Vec<u32>,
        skipped: Vec<u32>,
    },
    OffloadRejected {
        tick: Tick,
        handle: String,
        reason: String,
    },
}

impl SimEvent {
    /// Stable string name, used for the event_type column in event_log.
    pub fn type_name(&self) -> &'static str {
        match self {
            SimEvent::StepStarted { .. }         => "step_started",
            SimEvent::StepCompleted { .. }       => "step_completed",
            SimEvent::RunInitialized { .. }      => "run_initialized",
            SimEvent::BalanceCheckpointed { .. } => "balance_checkpointed",
            SimEvent::ProductionRateSet { .. }   => "production_rate_set",
            SimEvent::ChestPacked { .. }         => "chest_packed",
            SimEvent::ChestOffloaded { .. }      => "chest_offloaded",
            SimEvent::SlotSkipped { .. }         => "slot_skipped",
            SimEvent::OffloadRequested { .. }    => "offload_requested",
            SimEvent::OffloadSettled { .. }      => "offload_settled",
            SimEvent::OffloadRejected { .. }     => "offload_rejected",
        }
    }
}

/// The event log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id: Option<i64>,
    pub run_id: RunId,
    pub tick: Tick,
    pub subsystem: String,
    pub event_type: String,
    pub payload: String, // JSON-serialized SimEvent
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_round_trips_through_the_type_tag() {
        let event = SimEvent::ProductionRateSet {
            tick: 4,
            entity_id: u128::MAX,
            resource_type: 254,
            rate: -7,
        };
        let json = serde_json::to_string(&event).expect("serialize");
        assert!(json.contains(r#""rate":"-7""#), "{json}");
        let back: SimEvent = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, event);
    }
}
