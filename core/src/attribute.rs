//! Attribute model — entities carry optional, typed attribute records.
//!
//! An entity is just an id; what it *is* (realm, bank, caravan, chest holder)
//! follows from which attributes it has. Queries are conjunctions of
//! presence, equality and absence predicates over those attributes.

use crate::types::{EntityId, Position, Tick};
use serde::{Deserialize, Serialize};

/// The attribute tables an entity may appear in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    Position,
    Owner,
    EntityOwner,
    Realm,
    Bank,
    Movable,
    ArrivalTime,
    Inventory,
}

impl AttributeKind {
    pub const ALL: [AttributeKind; 8] = [
        AttributeKind::Position,
        AttributeKind::Owner,
        AttributeKind::EntityOwner,
        AttributeKind::Realm,
        AttributeKind::Bank,
        AttributeKind::Movable,
        AttributeKind::ArrivalTime,
        AttributeKind::Inventory,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Position    => "position",
            Self::Owner       => "owner",
            Self::EntityOwner => "entity_owner",
            Self::Realm       => "realm",
            Self::Bank        => "bank",
            Self::Movable     => "movable",
            Self::ArrivalTime => "arrival_time",
            Self::Inventory   => "inventory",
        }
    }
}

/// A single attribute value attached to an entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Attribute {
    Position(Position),
    /// Player address owning the entity.
    Owner { address: String },
    /// Entity (usually a realm) that owns a transport.
    EntityOwner {
        #[serde(with = "crate::serde_u128_string")]
        owner: EntityId,
    },
    Realm {
        #[serde(with = "crate::serde_u128_string")]
        realm_id: u128,
    },
    Bank,
    Movable,
    /// Tick at which a travelling entity reaches its position.
    ArrivalTime { arrives_at: Tick },
    /// Number of inventory slots ever pushed for this entity.
    Inventory { items_count: u32 },
}

impl Attribute {
    pub fn kind(&self) -> AttributeKind {
        match self {
            Attribute::Position(_)        => AttributeKind::Position,
            Attribute::Owner { .. }       => AttributeKind::Owner,
            Attribute::EntityOwner { .. } => AttributeKind::EntityOwner,
            Attribute::Realm { .. }       => AttributeKind::Realm,
            Attribute::Bank               => AttributeKind::Bank,
            Attribute::Movable            => AttributeKind::Movable,
            Attribute::ArrivalTime { .. } => AttributeKind::ArrivalTime,
            Attribute::Inventory { .. }   => AttributeKind::Inventory,
        }
    }
}

/// One conjunct of a [`Query`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Predicate {
    /// Entity has the attribute, any value.
    Has { kind: AttributeKind },
    /// Entity has the attribute with exactly this value.
    HasValue { value: Attribute },
    /// Entity lacks the attribute.
    Not { kind: AttributeKind },
    /// Entity does not carry this exact value (lacking the attribute counts).
    NotValue { value: Attribute },
}

impl Predicate {
    pub fn kind(&self) -> AttributeKind {
        match self {
            Predicate::Has { kind } | Predicate::Not { kind } => *kind,
            Predicate::HasValue { value } | Predicate::NotValue { value } => value.kind(),
        }
    }
}

/// A conjunction of predicates. An empty query matches every known entity.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Query {
    pub predicates: Vec<Predicate>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(mut self, kind: AttributeKind) -> Self {
        self.predicates.push(Predicate::Has { kind });
        self
    }

    pub fn has_value(mut self, value: Attribute) -> Self {
        self.predicates.push(Predicate::HasValue { value });
        self
    }

    pub fn not(mut self, kind: AttributeKind) -> Self {
        self.predicates.push(Predicate::Not { kind });
        self
    }

    pub fn not_value(mut self, value: Attribute) -> Self {
        self.predicates.push(Predicate::NotValue { value });
        self
    }

    /// Attribute kinds this query depends on, deduplicated and sorted.
    pub fn kinds(&self) -> Vec<AttributeKind> {
        let mut kinds: Vec<AttributeKind> = self.predicates.iter().map(Predicate::kind).collect();
        kinds.sort();
        kinds.dedup();
        kinds
    }

    pub fn depends_on(&self, kind: AttributeKind) -> bool {
        self.predicates.iter().any(|p| p.kind() == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_kinds_are_deduplicated() {
        let q = Query::new()
            .has(AttributeKind::Bank)
            .has_value(Attribute::Position(Position::new(1, 2)))
            .not(AttributeKind::Bank);
        assert_eq!(q.kinds(), vec![AttributeKind::Position, AttributeKind::Bank]);
        assert!(q.depends_on(AttributeKind::Position));
        assert!(!q.depends_on(AttributeKind::Realm));
    }

    #[test]
    fn attribute_json_is_tagged() {
        let json = serde_json::to_string(&Attribute::Inventory { items_count: 3 }).unwrap();
        assert_eq!(json, r#"{"kind":"inventory","items_count":3}"#);
    }
}
