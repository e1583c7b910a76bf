//! Resource query service — aggregate questions over the ledger, the
//! spatial index and inventories, plus dispatch of offload requests.
//!
//! Everything here reads; the only outward action is `request_offload`,
//! which hands the request to a [`MutationGateway`] and returns at once.

use crate::{
    attribute::{Attribute, AttributeKind, Query},
    error::SimResult,
    gateway::{MutationGateway, SubmissionHandle},
    ledger::ProductionLedger,
    spatial::SpatialIndex,
    store::{SimStore, SubmissionStatus},
    types::{Amount, EntityId, ResourceAmount, ResourceType, Tick},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Totals carried across a transport's contiguous slot prefix.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CarriedResources {
    /// Summed by resource type, ascending.
    pub resources: Vec<ResourceAmount>,
    /// Slot indices that were scanned, ascending from zero.
    pub indices:   Vec<u32>,
}

impl CarriedResources {
    pub fn amount_of(&self, resource_type: ResourceType) -> Amount {
        self.resources
            .iter()
            .find(|r| r.resource_type == resource_type)
            .map_or(0, |r| r.amount)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RealmHolding {
    #[serde(with = "crate::serde_u128_string")]
    pub realm_entity_id: EntityId,
    #[serde(with = "crate::serde_u128_string")]
    pub realm_id:        u128,
    #[serde(with = "crate::serde_u128_string")]
    pub amount:          Amount,
}

fn into_sorted(totals: BTreeMap<ResourceType, Amount>) -> Vec<ResourceAmount> {
    totals
        .into_iter()
        .map(|(rt, amount)| ResourceAmount::new(rt, amount))
        .collect()
}

pub struct ResourceQueryService<'a> {
    store:   &'a SimStore,
    gateway: &'a dyn MutationGateway,
}

impl<'a> ResourceQueryService<'a> {
    pub fn new(store: &'a SimStore, gateway: &'a dyn MutationGateway) -> Self {
        Self { store, gateway }
    }

    pub fn balance(
        &self,
        entity_id: EntityId,
        resource_type: ResourceType,
        tick: Tick,
    ) -> SimResult<Amount> {
        ProductionLedger::new(self.store).balance(entity_id, resource_type, tick)
    }

    pub fn food_balances(&self, entity_id: EntityId, tick: Tick) -> SimResult<[ResourceAmount; 2]> {
        ProductionLedger::new(self.store).food_balances(entity_id, tick)
    }

    /// Sum the chests in slots 0, 1, 2, ... stopping at the first slot
    /// without a live chest. Chests beyond a gap are not counted.
    pub fn resources_carried_by(&self, entity_id: EntityId) -> SimResult<CarriedResources> {
        let mut totals: BTreeMap<ResourceType, Amount> = BTreeMap::new();
        let mut indices = Vec::new();

        for index in 0u32.. {
            let chest = match self.store.slot_chest(entity_id, index)? {
                Some(chest_id) => self.store.chest(chest_id)?,
                None => None,
            };
            let Some(chest) = chest.filter(|c| !c.consumed) else {
                break;
            };
            for entry in &chest.entries {
                let total = totals.entry(entry.resource_type).or_insert(0);
                *total = total.saturating_add(entry.amount);
            }
            indices.push(index);
        }

        Ok(CarriedResources { resources: into_sorted(totals), indices })
    }

    /// Sum chest contents by id, stopping at the first id without a live chest.
    pub fn resources_in_chests(&self, chest_ids: &[EntityId]) -> SimResult<Vec<ResourceAmount>> {
        let mut totals: BTreeMap<ResourceType, Amount> = BTreeMap::new();
        for &chest_id in chest_ids {
            let Some(chest) = self.store.chest(chest_id)?.filter(|c| !c.consumed) else {
                break;
            };
            for entry in &chest.entries {
                let total = totals.entry(entry.resource_type).or_insert(0);
                *total = total.saturating_add(entry.amount);
            }
        }
        Ok(into_sorted(totals))
    }

    pub fn chest_id_at_index(&self, entity_id: EntityId, index: u32) -> SimResult<Option<EntityId>> {
        self.store.slot_chest(entity_id, index)
    }

    /// The first `count` cost rows of a cost bundle. Missing rows are left out.
    pub fn resource_costs(&self, cost_id: u128, count: u32) -> SimResult<Vec<ResourceAmount>> {
        let mut costs = Vec::new();
        for index in 0..count {
            if let Some(cost) = self.store.resource_cost(cost_id, index)? {
                costs.push(cost);
            }
        }
        Ok(costs)
    }

    /// Realms holding strictly more than `min_amount` of a resource at `tick`.
    /// Scans every realm.
    pub fn realms_above_threshold(
        &self,
        resource_type: ResourceType,
        min_amount: Amount,
        tick: Tick,
    ) -> SimResult<Vec<RealmHolding>> {
        let ledger = ProductionLedger::new(self.store);
        let mut holdings = Vec::new();
        for realm_entity_id in self.store.run_query(&Query::new().has(AttributeKind::Realm))? {
            let Some(Attribute::Realm { realm_id }) =
                self.store.attribute(realm_entity_id, AttributeKind::Realm)?
            else {
                continue;
            };
            let amount = ledger.balance(realm_entity_id, resource_type, tick)?;
            if amount > min_amount {
                holdings.push(RealmHolding { realm_entity_id, realm_id, amount });
            }
        }
        Ok(holdings)
    }

    /// Transports standing on the observer's hex that still carry cargo.
    pub fn arrivals_carrying_cargo(&self, observer: EntityId) -> SimResult<Vec<EntityId>> {
        match self.store.position(observer)? {
            Some(position) => SpatialIndex::new(self.store).arrivals_with_cargo_at(position),
            None => Ok(Vec::new()),
        }
    }

    /// Fire-and-forget: the handle says the request was queued, nothing more.
    pub fn request_offload(
        &self,
        signer: &str,
        receiver: EntityId,
        sender: EntityId,
        indices: &[u32],
    ) -> SimResult<SubmissionHandle> {
        self.gateway.submit_offload(signer, receiver, sender, indices)
    }

    /// Outcome of an earlier request, or `None` for a handle never queued.
    pub fn submission_status(&self, handle: &SubmissionHandle) -> SimResult<Option<SubmissionStatus>> {
        Ok(self.store.submission(&handle.0)?.map(|row| row.status))
    }
}
