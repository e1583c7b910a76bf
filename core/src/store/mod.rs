//! SQLite persistence layer — the explicit state store.
//!
//! RULE: Only store/ talks to the database.
//! Services call store methods — they never execute SQL directly.
//!
//! One `SimStore` is constructed per world and passed by reference into
//! every service. The connection is not `Sync`, so each store has exactly
//! one writer; multi-statement mutations run under [`SimStore::atomic`].

use crate::{
    attribute::AttributeKind,
    error::{SimError, SimResult},
    event::EventLogEntry,
    types::{EntityId, ResourceType, Tick},
};
use rusqlite::{params, Connection};
use std::cell::RefCell;

mod attributes;
mod inventory;
mod ledger;
mod submission;

pub use inventory::{ChestRow, ALLOCATED_ID_BASE};
pub use ledger::{ProductionRow, ResourceRow};
pub use submission::{SubmissionRow, SubmissionStatus};

/// Which part of the state a write touched. Drained by observers to
/// decide which live queries are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateTable {
    Attribute(AttributeKind),
    Resource(ResourceType),
    Production(ResourceType),
    InventorySlot,
    Chest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateWrite {
    pub entity_id: EntityId,
    pub table:     StateTable,
}

pub struct SimStore {
    conn:    Connection,
    journal: RefCell<Vec<StateWrite>>,
}

impl SimStore {
    pub fn open(path: &str) -> SimResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, journal: RefCell::new(Vec::new()) })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> SimResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, journal: RefCell::new(Vec::new()) })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> SimResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_attributes.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/003_ledger.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/004_inventory.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/005_offload_submissions.sql"))?;
        Ok(())
    }

    /// Run `f` inside a savepoint. Errors roll back every write `f` made.
    /// Savepoints nest, so atomic sections may call each other. Journal
    /// entries recorded by a rolled-back section are discarded with it.
    pub fn atomic<T>(&self, f: impl FnOnce() -> SimResult<T>) -> SimResult<T> {
        let journal_mark = self.journal.borrow().len();
        self.conn.execute_batch("SAVEPOINT sim_atomic;")?;
        match f() {
            Ok(value) => {
                self.conn.execute_batch("RELEASE sim_atomic;")?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = self
                    .conn
                    .execute_batch("ROLLBACK TO sim_atomic; RELEASE sim_atomic;")
                {
                    log::error!("rollback after '{e}' failed: {rollback}");
                }
                self.journal.borrow_mut().truncate(journal_mark);
                Err(e)
            }
        }
    }

    /// Take every write recorded since the last drain.
    pub fn drain_writes(&self) -> Vec<StateWrite> {
        std::mem::take(&mut *self.journal.borrow_mut())
    }

    fn record_write(&self, entity_id: EntityId, table: StateTable) {
        self.journal.borrow_mut().push(StateWrite { entity_id, table });
    }

    // ── Run ────────────────────────────────────────────────────

    pub fn insert_run(&self, run_id: &str, seed: u64, version: &str) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO run (run_id, seed, version, started_at) VALUES (?1, ?2, ?3, ?4)",
            params![run_id, seed as i64, version, 0i64],
        )?;
        Ok(())
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(&self, entry: &EventLogEntry) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO event_log (run_id, tick, subsystem, event_type, payload, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.run_id,
                entry.tick as i64,
                entry.subsystem,
                entry.event_type,
                entry.payload,
                entry.tick as i64,
            ],
        )?;
        Ok(())
    }

    pub fn events_for_tick(&self, run_id: &str, tick: Tick) -> SimResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, run_id, tick, subsystem, event_type, payload
             FROM event_log WHERE run_id = ?1 AND tick = ?2
             ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map(params![run_id, tick as i64], |row| {
                Ok(EventLogEntry {
                    id: Some(row.get(0)?),
                    run_id: row.get(1)?,
                    tick: row.get::<_, i64>(2)? as u64,
                    subsystem: row.get(3)?,
                    event_type: row.get(4)?,
                    payload: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn event_count(&self, run_id: &str, event_type: &str) -> SimResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM event_log WHERE run_id = ?1 AND event_type = ?2",
            params![run_id, event_type],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

// ── Numeric encoding ───────────────────────────────────────────
//
// SQLite integers are 64-bit, so 128-bit ids, balances and rates are
// stored as canonical decimal TEXT.

pub(crate) fn id_sql(id: u128) -> String {
    id.to_string()
}

pub(crate) fn parse_u128(raw: &str) -> SimResult<u128> {
    raw.parse::<u128>()
        .map_err(|_| SimError::InvalidNumber { raw: raw.to_string() })
}

pub(crate) fn parse_i128(raw: &str) -> SimResult<i128> {
    raw.parse::<i128>()
        .map_err(|_| SimError::InvalidNumber { raw: raw.to_string() })
}

/// Row-mapper variant of [`parse_u128`] for use inside `query_map` closures.
pub(crate) fn column_u128(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<u128> {
    let raw: String = row.get(idx)?;
    raw.parse::<u128>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
