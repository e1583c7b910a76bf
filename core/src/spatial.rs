//! Spatial index — who occupies a hex, composed from attribute predicates.
//!
//! Every call reads the store as it is at call time. Keeping results fresh
//! across writes is the job of [`crate::observe::ObservableIndex`].

use crate::{
    attribute::{Attribute, AttributeKind, Query},
    error::SimResult,
    hex::{self, Direction},
    store::SimStore,
    types::{EntityId, Position},
};
use serde::{Deserialize, Serialize};

/// What occupies a hex. A bank outranks a realm on the same cell.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HexType {
    Bank,
    Realm,
    Empty,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct NeighborOccupancy {
    pub position:  Position,
    pub direction: Direction,
    pub hex_type:  HexType,
}

/// The realm standing on a hex.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RealmAt {
    #[serde(with = "crate::serde_u128_string")]
    pub realm_entity_id: EntityId,
    #[serde(with = "crate::serde_u128_string")]
    pub realm_id:        u128,
}

// ── Query shapes ───────────────────────────────────────────────

pub fn at_position(position: Position) -> Query {
    Query::new().has_value(Attribute::Position(position))
}

/// Owned by `address`, stationary, and neither a bank nor a realm.
pub fn bank_accounts_query(address: &str, position: Position) -> Query {
    Query::new()
        .has_value(Attribute::Owner { address: address.to_string() })
        .not(AttributeKind::Movable)
        .not(AttributeKind::Bank)
        .not(AttributeKind::Realm)
        .has_value(Attribute::Position(position))
}

pub fn owned_entities_query(address: &str, position: Position) -> Query {
    Query::new()
        .has_value(Attribute::Owner { address: address.to_string() })
        .not(AttributeKind::Movable)
        .has_value(Attribute::Position(position))
}

/// Owned transports at a hex with a non-empty inventory and an arrival time.
pub fn arrivals_with_cargo_query(position: Position) -> Query {
    Query::new()
        .has(AttributeKind::EntityOwner)
        .has(AttributeKind::Inventory)
        .not_value(Attribute::Inventory { items_count: 0 })
        .has_value(Attribute::Position(position))
        .has(AttributeKind::ArrivalTime)
}

pub struct SpatialIndex<'a> {
    store: &'a SimStore,
}

impl<'a> SpatialIndex<'a> {
    pub fn new(store: &'a SimStore) -> Self {
        Self { store }
    }

    pub fn run(&self, query: &Query) -> SimResult<Vec<EntityId>> {
        self.store.run_query(query)
    }

    /// Every entity standing on `position`.
    pub fn entities_at(&self, position: Position) -> SimResult<Vec<EntityId>> {
        self.run(&at_position(position))
    }

    pub fn classify_occupancy(&self, position: Position) -> SimResult<HexType> {
        let banks = self.run(&at_position(position).has(AttributeKind::Bank))?;
        if !banks.is_empty() {
            return Ok(HexType::Bank);
        }
        let realms = self.run(&at_position(position).has(AttributeKind::Realm))?;
        if !realms.is_empty() {
            return Ok(HexType::Realm);
        }
        Ok(HexType::Empty)
    }

    /// The realm on a hex, lowest entity id first if several share it.
    pub fn realm_at(&self, position: Position) -> SimResult<Option<RealmAt>> {
        let realms = self.run(&at_position(position).has(AttributeKind::Realm))?;
        for realm_entity_id in realms {
            if let Some(Attribute::Realm { realm_id }) =
                self.store.attribute(realm_entity_id, AttributeKind::Realm)?
            {
                return Ok(Some(RealmAt { realm_entity_id, realm_id }));
            }
        }
        Ok(None)
    }

    pub fn bank_accounts_at(&self, address: &str, position: Position) -> SimResult<Vec<EntityId>> {
        self.run(&bank_accounts_query(address, position))
    }

    pub fn owned_entities_at(&self, address: &str, position: Position) -> SimResult<Vec<EntityId>> {
        self.run(&owned_entities_query(address, position))
    }

    pub fn arrivals_with_cargo_at(&self, position: Position) -> SimResult<Vec<EntityId>> {
        self.run(&arrivals_with_cargo_query(position))
    }

    /// Occupancy of the six neighbors of `position`, in direction order.
    pub fn neighbor_occupancy(&self, position: Position) -> SimResult<Vec<NeighborOccupancy>> {
        hex::neighbors(position.col, position.row)
            .into_iter()
            .map(|n| {
                Ok(NeighborOccupancy {
                    position:  n.position(),
                    direction: n.direction,
                    hex_type:  self.classify_occupancy(n.position())?,
                })
            })
            .collect()
    }
}
