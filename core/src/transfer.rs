//! Resource chest transfer — moving sealed bundles between entities.
//!
//! A transport departs with a chest packed from its source's ledger
//! ([`ResourceChestTransfer::pack_chest`]) and, once it stands on the
//! receiver's hex, the chest is emptied into the receiver's ledger
//! ([`ResourceChestTransfer::offload`]). Each chest is read exactly once:
//! offload marks it consumed and clears the slot in the same atomic section.

use crate::{
    attribute::AttributeKind,
    error::SimResult,
    event::SimEvent,
    ledger::ProductionLedger,
    store::SimStore,
    types::{EntityId, ResourceAmount, Tick},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OffloadReport {
    /// Slot indices whose chests were emptied, in processing order.
    pub offloaded: Vec<u32>,
    /// Slot indices with no live chest, left untouched.
    pub skipped:   Vec<u32>,
    /// Everything credited to the receiver, one entry per chest entry.
    pub received:  Vec<ResourceAmount>,
    pub events:    Vec<SimEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackReport {
    #[serde(with = "crate::serde_u128_string")]
    pub chest_id:   EntityId,
    pub slot_index: u32,
    pub events:     Vec<SimEvent>,
}

pub struct ResourceChestTransfer<'a> {
    store: &'a SimStore,
}

impl<'a> ResourceChestTransfer<'a> {
    pub fn new(store: &'a SimStore) -> Self {
        Self { store }
    }

    /// Empty the sender's chests at `indices` into the receiver's ledger.
    ///
    /// Indices are processed in the order given. A slot that is empty or
    /// whose chest is already consumed is skipped without error. Any failure
    /// rolls back the whole call.
    pub fn offload(
        &self,
        receiver: EntityId,
        sender: EntityId,
        indices: &[u32],
        tick: Tick,
    ) -> SimResult<OffloadReport> {
        self.store.atomic(|| {
            let ledger = ProductionLedger::new(self.store);
            let mut report = OffloadReport::default();

            for &index in indices {
                let chest = match self.store.slot_chest(sender, index)? {
                    Some(chest_id) => self.store.chest(chest_id)?,
                    None => None,
                };
                let chest = match chest {
                    Some(c) if !c.consumed => c,
                    _ => {
                        log::debug!("tick={tick} sender={sender} slot {index} has no live chest");
                        report.skipped.push(index);
                        report.events.push(SimEvent::SlotSkipped { tick, sender_id: sender, slot_index: index });
                        continue;
                    }
                };

                for entry in &chest.entries {
                    let event = ledger.credit(receiver, entry.resource_type, entry.amount, tick)?;
                    report.events.push(event);
                    report.received.push(*entry);
                }
                self.store.mark_chest_consumed(chest.chest_id)?;
                self.store.remove_slot(sender, index)?;

                report.offloaded.push(index);
                report.events.push(SimEvent::ChestOffloaded {
                    tick,
                    receiver_id: receiver,
                    sender_id: sender,
                    slot_index: index,
                    chest_id: chest.chest_id,
                    resources: chest.entries.clone(),
                });
            }

            if !report.offloaded.is_empty()
                && self.store.attribute(sender, AttributeKind::Inventory)?.is_some()
            {
                let remaining = self
                    .store
                    .items_count(sender)?
                    .saturating_sub(report.offloaded.len() as u32);
                self.store.set_items_count(sender, remaining)?;
            }

            log::info!(
                "tick={tick} offload {sender} -> {receiver}: {} chest(s) emptied, {} skipped",
                report.offloaded.len(),
                report.skipped.len()
            );
            Ok(report)
        })
    }

    /// Debit `resources` from `source` and seal them into a new chest in the
    /// carrier's next inventory slot. Nothing is written if any debit fails.
    pub fn pack_chest(
        &self,
        carrier: EntityId,
        source: EntityId,
        resources: &[ResourceAmount],
        tick: Tick,
    ) -> SimResult<PackReport> {
        if resources.is_empty() {
            return Err(anyhow::anyhow!("cannot pack an empty chest for carrier {carrier}").into());
        }

        self.store.atomic(|| {
            let ledger = ProductionLedger::new(self.store);
            let mut events = Vec::new();
            for r in resources {
                events.push(ledger.debit(source, r.resource_type, r.amount, tick)?);
            }

            let chest_id = self.store.allocate_entity_id()?;
            self.store.insert_chest(chest_id, resources, tick)?;

            let slot_index = self
                .store
                .slot_indices(carrier)?
                .last()
                .map_or(0, |last| last + 1);
            self.store.put_slot(carrier, slot_index, chest_id)?;
            let items_count = self.store.items_count(carrier)?;
            self.store.set_items_count(carrier, items_count + 1)?;

            log::debug!("tick={tick} packed chest {chest_id} into {carrier} slot {slot_index}");
            events.push(SimEvent::ChestPacked {
                tick,
                carrier_id: carrier,
                chest_id,
                slot_index,
                resources: resources.to_vec(),
            });
            Ok(PackReport { chest_id, slot_index, events })
        })
    }
}
