//! Attribute tables and predicate queries over them.

use super::{column_u128, id_sql, parse_u128, SimStore, StateTable};
use crate::{
    attribute::{Attribute, AttributeKind, Predicate, Query},
    error::SimResult,
    types::{EntityId, Position},
};
use rusqlite::{params, params_from_iter, types::Value, OptionalExtension};

fn table(kind: AttributeKind) -> &'static str {
    match kind {
        AttributeKind::Position    => "position",
        AttributeKind::Owner       => "owner",
        AttributeKind::EntityOwner => "entity_owner",
        AttributeKind::Realm       => "realm",
        AttributeKind::Bank        => "bank",
        AttributeKind::Movable     => "movable",
        AttributeKind::ArrivalTime => "arrival_time",
        AttributeKind::Inventory   => "inventory",
    }
}

/// Value columns of an attribute, in table order. Flag attributes have none.
fn columns(attr: &Attribute) -> Vec<(&'static str, Value)> {
    match attr {
        Attribute::Position(p) => vec![("x", Value::Integer(p.col)), ("y", Value::Integer(p.row))],
        Attribute::Owner { address } => vec![("address", Value::Text(address.clone()))],
        Attribute::EntityOwner { owner } => {
            vec![("owner_entity_id", Value::Text(id_sql(*owner)))]
        }
        Attribute::Realm { realm_id } => vec![("realm_id", Value::Text(id_sql(*realm_id)))],
        Attribute::Bank | Attribute::Movable => Vec::new(),
        Attribute::ArrivalTime { arrives_at } => {
            vec![("arrives_at", Value::Integer(*arrives_at as i64))]
        }
        Attribute::Inventory { items_count } => {
            vec![("items_count", Value::Integer(i64::from(*items_count)))]
        }
    }
}

/// `EXISTS (...)` clause matching `e.entity_id` against an attribute table,
/// optionally constrained to an exact value.
fn exists_clause(kind: AttributeKind, value: Option<&Attribute>, params: &mut Vec<Value>) -> String {
    let t = table(kind);
    let mut sql = format!("EXISTS (SELECT 1 FROM {t} a WHERE a.entity_id = e.entity_id");
    if let Some(attr) = value {
        for (col, v) in columns(attr) {
            params.push(v);
            sql.push_str(&format!(" AND a.{col} = ?{}", params.len()));
        }
    }
    sql.push(')');
    sql
}

impl SimStore {
    // ── Writes ─────────────────────────────────────────────────

    /// Attach or replace an attribute on an entity. Registers the entity.
    pub fn set_attribute(&self, entity_id: EntityId, attr: &Attribute) -> SimResult<()> {
        let id = id_sql(entity_id);
        self.conn.execute(
            "INSERT OR IGNORE INTO entity (entity_id) VALUES (?1)",
            params![id],
        )?;

        let cols = columns(attr);
        let names: Vec<&str> = std::iter::once("entity_id")
            .chain(cols.iter().map(|(c, _)| *c))
            .collect();
        let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT OR REPLACE INTO {} ({}) VALUES ({})",
            table(attr.kind()),
            names.join(", "),
            placeholders.join(", "),
        );
        let values: Vec<Value> = std::iter::once(Value::Text(id))
            .chain(cols.into_iter().map(|(_, v)| v))
            .collect();
        self.conn.execute(&sql, params_from_iter(values.iter()))?;

        self.record_write(entity_id, StateTable::Attribute(attr.kind()));
        Ok(())
    }

    /// Detach an attribute. Removing an absent attribute is a no-op.
    pub fn remove_attribute(&self, entity_id: EntityId, kind: AttributeKind) -> SimResult<()> {
        let removed = self.conn.execute(
            &format!("DELETE FROM {} WHERE entity_id = ?1", table(kind)),
            params![id_sql(entity_id)],
        )?;
        if removed > 0 {
            self.record_write(entity_id, StateTable::Attribute(kind));
        }
        Ok(())
    }

    // ── Reads ──────────────────────────────────────────────────

    pub fn attribute(&self, entity_id: EntityId, kind: AttributeKind) -> SimResult<Option<Attribute>> {
        let id = id_sql(entity_id);
        let attr = match kind {
            AttributeKind::Position => self
                .conn
                .query_row(
                    "SELECT x, y FROM position WHERE entity_id = ?1",
                    params![id],
                    |r| Ok(Attribute::Position(Position::new(r.get(0)?, r.get(1)?))),
                )
                .optional()?,
            AttributeKind::Owner => self
                .conn
                .query_row(
                    "SELECT address FROM owner WHERE entity_id = ?1",
                    params![id],
                    |r| Ok(Attribute::Owner { address: r.get(0)? }),
                )
                .optional()?,
            AttributeKind::EntityOwner => self
                .conn
                .query_row(
                    "SELECT owner_entity_id FROM entity_owner WHERE entity_id = ?1",
                    params![id],
                    |r| Ok(Attribute::EntityOwner { owner: column_u128(r, 0)? }),
                )
                .optional()?,
            AttributeKind::Realm => self
                .conn
                .query_row(
                    "SELECT realm_id FROM realm WHERE entity_id = ?1",
                    params![id],
                    |r| Ok(Attribute::Realm { realm_id: column_u128(r, 0)? }),
                )
                .optional()?,
            AttributeKind::Bank => self
                .conn
                .query_row("SELECT 1 FROM bank WHERE entity_id = ?1", params![id], |_| {
                    Ok(Attribute::Bank)
                })
                .optional()?,
            AttributeKind::Movable => self
                .conn
                .query_row("SELECT 1 FROM movable WHERE entity_id = ?1", params![id], |_| {
                    Ok(Attribute::Movable)
                })
                .optional()?,
            AttributeKind::ArrivalTime => self
                .conn
                .query_row(
                    "SELECT arrives_at FROM arrival_time WHERE entity_id = ?1",
                    params![id],
                    |r| Ok(Attribute::ArrivalTime { arrives_at: r.get::<_, i64>(0)? as u64 }),
                )
                .optional()?,
            AttributeKind::Inventory => self
                .conn
                .query_row(
                    "SELECT items_count FROM inventory WHERE entity_id = ?1",
                    params![id],
                    |r| Ok(Attribute::Inventory { items_count: r.get::<_, i64>(0)? as u32 }),
                )
                .optional()?,
        };
        Ok(attr)
    }

    pub fn position(&self, entity_id: EntityId) -> SimResult<Option<Position>> {
        Ok(match self.attribute(entity_id, AttributeKind::Position)? {
            Some(Attribute::Position(p)) => Some(p),
            _ => None,
        })
    }

    /// Every attribute an entity currently carries, in [`AttributeKind::ALL`] order.
    pub fn attributes_of(&self, entity_id: EntityId) -> SimResult<Vec<Attribute>> {
        let mut attrs = Vec::new();
        for kind in AttributeKind::ALL {
            if let Some(a) = self.attribute(entity_id, kind)? {
                attrs.push(a);
            }
        }
        Ok(attrs)
    }

    /// Evaluate a conjunctive predicate query against current table state.
    /// Results are in ascending numeric id order.
    pub fn run_query(&self, query: &Query) -> SimResult<Vec<EntityId>> {
        let mut values: Vec<Value> = Vec::new();
        let mut clauses: Vec<String> = Vec::new();
        for predicate in &query.predicates {
            let clause = match predicate {
                Predicate::Has { kind } => exists_clause(*kind, None, &mut values),
                Predicate::HasValue { value } => exists_clause(value.kind(), Some(value), &mut values),
                Predicate::Not { kind } => format!("NOT {}", exists_clause(*kind, None, &mut values)),
                Predicate::NotValue { value } => {
                    format!("NOT {}", exists_clause(value.kind(), Some(value), &mut values))
                }
            };
            clauses.push(clause);
        }

        let mut sql = String::from("SELECT e.entity_id FROM entity e");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        // Canonical decimals order numerically by (length, text).
        sql.push_str(" ORDER BY length(e.entity_id), e.entity_id");

        let mut stmt = self.conn.prepare(&sql)?;
        let raw = stmt
            .query_map(params_from_iter(values.iter()), |r| r.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        raw.iter().map(|s| parse_u128(s)).collect()
    }
}
