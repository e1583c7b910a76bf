//! Arrival subsystem — requests offloads for transports that have reached
//! a realm with cargo aboard.
//!
//! Each step every realm looks at its own hex for arrivals carrying cargo.
//! A transport whose `arrives_at` has passed gets one offload request
//! covering its contiguous slot prefix. Requests go through the
//! [`MutationGateway`]; the settlement subsystem commits them.
//!
//! A sender is requested at most once per lifetime of the subsystem. If the
//! request is rejected, it stays rejected.

use crate::{
    attribute::{Attribute, AttributeKind, Query},
    error::SimResult,
    event::SimEvent,
    gateway::QueuedGateway,
    query::ResourceQueryService,
    rng::SubsystemRng,
    store::SimStore,
    subsystem::SimSubsystem,
    types::{EntityId, RunId, Tick},
};
use std::collections::BTreeSet;

pub struct ArrivalSubsystem {
    run_id:    RunId,
    requested: BTreeSet<EntityId>,
}

impl ArrivalSubsystem {
    pub fn new(run_id: RunId) -> Self {
        Self { run_id, requested: BTreeSet::new() }
    }

    /// Senders an offload has already been requested for.
    pub fn requested(&self) -> &BTreeSet<EntityId> {
        &self.requested
    }

    fn has_arrived(store: &SimStore, entity_id: EntityId, tick: Tick) -> SimResult<bool> {
        Ok(match store.attribute(entity_id, AttributeKind::ArrivalTime)? {
            Some(Attribute::ArrivalTime { arrives_at }) => arrives_at <= tick,
            _ => true,
        })
    }
}

impl SimSubsystem for ArrivalSubsystem {
    fn name(&self) -> &'static str {
        "arrival"
    }

    fn update(
        &mut self,
        tick: Tick,
        store: &SimStore,
        _events_in: &[SimEvent],
        _rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>> {
        let gateway = QueuedGateway::new(store, self.run_id.clone());
        let service = ResourceQueryService::new(store, &gateway);
        let mut out = Vec::new();

        for realm in store.run_query(&Query::new().has(AttributeKind::Realm))? {
            let signer = match store.attribute(realm, AttributeKind::Owner)? {
                Some(Attribute::Owner { address }) => address,
                _ => String::new(),
            };

            for sender in service.arrivals_carrying_cargo(realm)? {
                if self.requested.contains(&sender) || !Self::has_arrived(store, sender, tick)? {
                    continue;
                }
                let carried = service.resources_carried_by(sender)?;
                if carried.indices.is_empty() {
                    continue;
                }

                let handle = service.request_offload(&signer, realm, sender, &carried.indices)?;
                self.requested.insert(sender);
                log::debug!(
                    "tick={tick} {sender} arrived at realm {realm}, requested offload {handle}"
                );
                out.push(SimEvent::OffloadRequested {
                    tick,
                    handle: handle.0,
                    receiver_id: realm,
                    sender_id: sender,
                    indices: carried.indices,
                });
            }
        }
        Ok(out)
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
