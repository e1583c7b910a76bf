//! Observable index — live queries that learn when they go stale.
//!
//! Callers subscribe a predicate query (or a single entity) and get a
//! handle back. Each write the store journals is matched against the
//! subscriptions; those that depend on the written table are flagged stale
//! and reported once. Re-evaluating clears the flag.
//!
//! Accrual is a function of the tick, not a write, so a balance that grows
//! with time never invalidates anything by itself.

use crate::{
    attribute::Query,
    error::SimResult,
    store::{SimStore, StateTable, StateWrite},
    types::EntityId,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct SubscriptionId(pub u64);

/// What a subscription watches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Watch {
    /// Membership of a predicate query.
    Query(Query),
    /// Any write touching one entity: attributes, ledger rows, slots.
    Entity(EntityId),
}

impl Watch {
    fn is_affected_by(&self, write: &StateWrite) -> bool {
        match self {
            Watch::Entity(id) => *id == write.entity_id,
            Watch::Query(query) => match write.table {
                // An empty query lists every entity, and any attribute
                // write can register a new one.
                StateTable::Attribute(_) if query.predicates.is_empty() => true,
                StateTable::Attribute(kind) => query.depends_on(kind),
                _ => false,
            },
        }
    }
}

#[derive(Default)]
pub struct ObservableIndex {
    next_id:       u64,
    subscriptions: BTreeMap<SubscriptionId, Watch>,
    stale:         BTreeSet<SubscriptionId>,
}

impl ObservableIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, query: Query) -> SubscriptionId {
        self.watch(Watch::Query(query))
    }

    pub fn subscribe_entity(&mut self, entity_id: EntityId) -> SubscriptionId {
        self.watch(Watch::Entity(entity_id))
    }

    fn watch(&mut self, watch: Watch) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscriptions.insert(id, watch);
        id
    }

    /// Returns whether the subscription existed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.stale.remove(&id);
        self.subscriptions.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Flag subscriptions affected by `writes`. Returns the ones that became
    /// stale with this call, ascending; already-stale ones are not repeated.
    pub fn apply_writes(&mut self, writes: &[StateWrite]) -> Vec<SubscriptionId> {
        let mut newly_stale = Vec::new();
        for (id, watch) in &self.subscriptions {
            if self.stale.contains(id) {
                continue;
            }
            if writes.iter().any(|w| watch.is_affected_by(w)) {
                newly_stale.push(*id);
            }
        }
        self.stale.extend(newly_stale.iter().copied());
        newly_stale
    }

    /// Drain the store's write journal and apply it.
    pub fn sync(&mut self, store: &SimStore) -> Vec<SubscriptionId> {
        let writes = store.drain_writes();
        self.apply_writes(&writes)
    }

    pub fn is_stale(&self, id: SubscriptionId) -> bool {
        self.stale.contains(&id)
    }

    pub fn stale_ids(&self) -> Vec<SubscriptionId> {
        self.stale.iter().copied().collect()
    }

    /// Re-run a query subscription and clear its stale flag.
    /// `None` for unknown ids and for entity watches.
    pub fn evaluate(&mut self, store: &SimStore, id: SubscriptionId) -> SimResult<Option<Vec<EntityId>>> {
        let Some(Watch::Query(query)) = self.subscriptions.get(&id) else {
            self.stale.remove(&id);
            return Ok(None);
        };
        let result = store.run_query(query)?;
        self.stale.remove(&id);
        Ok(Some(result))
    }

    /// Clear the stale flag without re-running anything.
    pub fn acknowledge(&mut self, id: SubscriptionId) {
        self.stale.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::{Attribute, AttributeKind};
    use crate::types::Position;

    fn write(entity_id: EntityId, table: StateTable) -> StateWrite {
        StateWrite { entity_id, table }
    }

    #[test]
    fn query_goes_stale_only_on_dependent_kinds() {
        let mut index = ObservableIndex::new();
        let banks = index.subscribe(
            Query::new()
                .has(AttributeKind::Bank)
                .has_value(Attribute::Position(Position::new(0, 0))),
        );

        let hit = index.apply_writes(&[write(1, StateTable::Attribute(AttributeKind::Realm))]);
        assert!(hit.is_empty());

        let hit = index.apply_writes(&[write(1, StateTable::Attribute(AttributeKind::Position))]);
        assert_eq!(hit, vec![banks]);
        assert!(index.is_stale(banks));

        // Still stale: not reported twice.
        let hit = index.apply_writes(&[write(2, StateTable::Attribute(AttributeKind::Bank))]);
        assert!(hit.is_empty());

        index.acknowledge(banks);
        assert!(!index.is_stale(banks));
    }

    #[test]
    fn entity_watch_sees_ledger_writes() {
        let mut index = ObservableIndex::new();
        let realm = index.subscribe_entity(7);
        assert!(index.apply_writes(&[write(8, StateTable::Resource(254))]).is_empty());
        assert_eq!(index.apply_writes(&[write(7, StateTable::Resource(254))]), vec![realm]);
    }

    #[test]
    fn unsubscribe_forgets_handle() {
        let mut index = ObservableIndex::new();
        let id = index.subscribe(Query::new());
        assert!(index.unsubscribe(id));
        assert!(!index.unsubscribe(id));
        assert!(index.is_empty());
    }
}
