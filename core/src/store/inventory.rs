//! Inventory slots and resource chests.

use super::{column_u128, id_sql, SimStore, StateTable};
use crate::{
    attribute::{Attribute, AttributeKind},
    error::SimResult,
    types::{EntityId, ResourceAmount, Tick},
};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

/// A chest and its fixed contents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChestRow {
    #[serde(with = "crate::serde_u128_string")]
    pub chest_id:     EntityId,
    pub entries:      Vec<ResourceAmount>,
    pub consumed:     bool,
    pub created_tick: Tick,
}

/// First id handed out by [`SimStore::allocate_entity_id`]. Externally
/// created entities are expected to sit below it.
pub const ALLOCATED_ID_BASE: EntityId = 1 << 64;

impl SimStore {
    /// Next id from the store's own sequence, for entities the core creates.
    pub fn allocate_entity_id(&self) -> SimResult<EntityId> {
        self.atomic(|| {
            let current: Option<u128> = self
                .conn
                .query_row(
                    "SELECT next FROM id_sequence WHERE name = 'entity'",
                    [],
                    |r| column_u128(r, 0),
                )
                .optional()?;
            let id = current.unwrap_or(ALLOCATED_ID_BASE);
            self.conn.execute(
                "INSERT INTO id_sequence (name, next) VALUES ('entity', ?1)
                 ON CONFLICT (name) DO UPDATE SET next = excluded.next",
                params![id_sql(id + 1)],
            )?;
            Ok(id)
        })
    }

    // ── Chests ─────────────────────────────────────────────────

    /// Create a chest. Contents are immutable from here on.
    pub fn insert_chest(
        &self,
        chest_id: EntityId,
        entries: &[ResourceAmount],
        tick: Tick,
    ) -> SimResult<()> {
        let id = id_sql(chest_id);
        self.conn.execute(
            "INSERT INTO resource_chest (chest_id, resources_count, consumed, created_tick)
             VALUES (?1, ?2, 0, ?3)",
            params![id, entries.len() as i64, tick as i64],
        )?;
        for (i, entry) in entries.iter().enumerate() {
            self.conn.execute(
                "INSERT INTO chest_entry (chest_id, entry_index, resource_type, amount)
                 VALUES (?1, ?2, ?3, ?4)",
                params![id, i as i64, entry.resource_type, entry.amount.to_string()],
            )?;
        }
        self.record_write(chest_id, StateTable::Chest);
        Ok(())
    }

    pub fn chest(&self, chest_id: EntityId) -> SimResult<Option<ChestRow>> {
        let id = id_sql(chest_id);
        let header: Option<(i64, bool, i64)> = self
            .conn
            .query_row(
                "SELECT resources_count, consumed, created_tick FROM resource_chest
                 WHERE chest_id = ?1",
                params![id],
                |r| Ok((r.get(0)?, r.get::<_, i32>(1)? != 0, r.get(2)?)),
            )
            .optional()?;
        let Some((resources_count, consumed, created_tick)) = header else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT resource_type, amount FROM chest_entry
             WHERE chest_id = ?1 AND entry_index < ?2
             ORDER BY entry_index ASC",
        )?;
        let entries = stmt
            .query_map(params![id, resources_count], |r| {
                Ok(ResourceAmount::new(r.get(0)?, column_u128(r, 1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(ChestRow {
            chest_id,
            entries,
            consumed,
            created_tick: created_tick as u64,
        }))
    }

    pub fn mark_chest_consumed(&self, chest_id: EntityId) -> SimResult<()> {
        self.conn.execute(
            "UPDATE resource_chest SET consumed = 1 WHERE chest_id = ?1",
            params![id_sql(chest_id)],
        )?;
        self.record_write(chest_id, StateTable::Chest);
        Ok(())
    }

    // ── Inventory slots ────────────────────────────────────────

    /// Chest referenced by `entity_id`'s slot at `index`, if occupied.
    pub fn slot_chest(&self, entity_id: EntityId, index: u32) -> SimResult<Option<EntityId>> {
        let chest = self
            .conn
            .query_row(
                "SELECT chest_id FROM inventory_slot WHERE entity_id = ?1 AND slot_index = ?2",
                params![id_sql(entity_id), index],
                |r| column_u128(r, 0),
            )
            .optional()?;
        Ok(chest)
    }

    pub fn put_slot(&self, entity_id: EntityId, index: u32, chest_id: EntityId) -> SimResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO inventory_slot (entity_id, slot_index, chest_id)
             VALUES (?1, ?2, ?3)",
            params![id_sql(entity_id), index, id_sql(chest_id)],
        )?;
        self.record_write(entity_id, StateTable::InventorySlot);
        Ok(())
    }

    /// Remove a slot entry. Returns whether one existed.
    pub fn remove_slot(&self, entity_id: EntityId, index: u32) -> SimResult<bool> {
        let removed = self.conn.execute(
            "DELETE FROM inventory_slot WHERE entity_id = ?1 AND slot_index = ?2",
            params![id_sql(entity_id), index],
        )?;
        if removed > 0 {
            self.record_write(entity_id, StateTable::InventorySlot);
        }
        Ok(removed > 0)
    }

    /// Occupied slot indices, ascending. Gaps are visible here.
    pub fn slot_indices(&self, entity_id: EntityId) -> SimResult<Vec<u32>> {
        let mut stmt = self.conn.prepare(
            "SELECT slot_index FROM inventory_slot WHERE entity_id = ?1 ORDER BY slot_index ASC",
        )?;
        let indices = stmt
            .query_map(params![id_sql(entity_id)], |r| r.get::<_, u32>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(indices)
    }

    /// The entity's inventory counter, zero when it has no inventory.
    pub fn items_count(&self, entity_id: EntityId) -> SimResult<u32> {
        Ok(match self.attribute(entity_id, AttributeKind::Inventory)? {
            Some(Attribute::Inventory { items_count }) => items_count,
            _ => 0,
        })
    }

    pub fn set_items_count(&self, entity_id: EntityId, items_count: u32) -> SimResult<()> {
        self.set_attribute(entity_id, &Attribute::Inventory { items_count })
    }
}
