//! Resource checkpoints, production rates and resource cost rows.

use super::{column_u128, id_sql, parse_i128, SimStore, StateTable};
use crate::{
    error::SimResult,
    types::{Amount, EntityId, Rate, ResourceAmount, ResourceType, Tick},
};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

/// A stored checkpoint: the balance as of `last_update_tick`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceRow {
    #[serde(with = "crate::serde_u128_string")]
    pub entity_id:        EntityId,
    pub resource_type:    ResourceType,
    #[serde(with = "crate::serde_u128_string")]
    pub balance:          Amount,
    pub last_update_tick: Tick,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductionRow {
    #[serde(with = "crate::serde_u128_string")]
    pub entity_id:     EntityId,
    pub resource_type: ResourceType,
    #[serde(with = "crate::serde_u128_string::signed")]
    pub rate:          Rate,
}

impl SimStore {
    // ── Resource checkpoints ───────────────────────────────────

    pub fn resource_row(
        &self,
        entity_id: EntityId,
        resource_type: ResourceType,
    ) -> SimResult<Option<ResourceRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT balance, last_update_tick FROM resource
                 WHERE entity_id = ?1 AND resource_type = ?2",
                params![id_sql(entity_id), resource_type],
                |r| {
                    Ok(ResourceRow {
                        entity_id,
                        resource_type,
                        balance: column_u128(r, 0)?,
                        last_update_tick: r.get::<_, i64>(1)? as u64,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Insert or overwrite a checkpoint.
    pub fn put_resource_row(&self, row: &ResourceRow) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO resource (entity_id, resource_type, balance, last_update_tick)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (entity_id, resource_type)
             DO UPDATE SET balance = excluded.balance, last_update_tick = excluded.last_update_tick",
            params![
                id_sql(row.entity_id),
                row.resource_type,
                row.balance.to_string(),
                row.last_update_tick as i64,
            ],
        )?;
        self.record_write(row.entity_id, StateTable::Resource(row.resource_type));
        Ok(())
    }

    // ── Production rates ───────────────────────────────────────

    pub fn production_rate(
        &self,
        entity_id: EntityId,
        resource_type: ResourceType,
    ) -> SimResult<Option<Rate>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT rate FROM production WHERE entity_id = ?1 AND resource_type = ?2",
                params![id_sql(entity_id), resource_type],
                |r| r.get(0),
            )
            .optional()?;
        raw.as_deref().map(parse_i128).transpose()
    }

    /// Rates change only through `ProductionLedger::set_rate`, which
    /// checkpoints the balance first.
    pub(crate) fn put_production_rate(&self, row: &ProductionRow) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO production (entity_id, resource_type, rate) VALUES (?1, ?2, ?3)
             ON CONFLICT (entity_id, resource_type) DO UPDATE SET rate = excluded.rate",
            params![id_sql(row.entity_id), row.resource_type, row.rate.to_string()],
        )?;
        self.record_write(row.entity_id, StateTable::Production(row.resource_type));
        Ok(())
    }

    // ── Resource costs ─────────────────────────────────────────

    pub fn insert_resource_cost(
        &self,
        cost_id: u128,
        index: u32,
        cost: ResourceAmount,
    ) -> SimResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO resource_cost (cost_id, cost_index, resource_type, amount)
             VALUES (?1, ?2, ?3, ?4)",
            params![id_sql(cost_id), index, cost.resource_type, cost.amount.to_string()],
        )?;
        Ok(())
    }

    pub fn resource_cost(&self, cost_id: u128, index: u32) -> SimResult<Option<ResourceAmount>> {
        let cost = self
            .conn
            .query_row(
                "SELECT resource_type, amount FROM resource_cost
                 WHERE cost_id = ?1 AND cost_index = ?2",
                params![id_sql(cost_id), index],
                |r| Ok(ResourceAmount::new(r.get(0)?, column_u128(r, 1)?)),
            )
            .optional()?;
        Ok(cost)
    }
}
