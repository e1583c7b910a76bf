//! Queued offload submissions.

use super::{column_u128, id_sql, SimStore};
use crate::{
    error::{SimError, SimResult},
    types::{EntityId, Tick},
};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    Settled,
    Rejected,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending  => "pending",
            Self::Settled  => "settled",
            Self::Rejected => "rejected",
        }
    }

    fn parse(raw: &str) -> SimResult<Self> {
        match raw {
            "pending"  => Ok(Self::Pending),
            "settled"  => Ok(Self::Settled),
            "rejected" => Ok(Self::Rejected),
            other => Err(anyhow::anyhow!("unknown submission status '{other}'").into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmissionRow {
    pub handle:       String,
    pub run_id:       String,
    pub signer:       String,
    #[serde(with = "crate::serde_u128_string")]
    pub receiver_id:  EntityId,
    #[serde(with = "crate::serde_u128_string")]
    pub sender_id:    EntityId,
    pub indices:      Vec<u32>,
    pub status:       SubmissionStatus,
    pub submitted_at: String,
    pub settled_tick: Option<Tick>,
    pub detail:       Option<String>,
}

const SUBMISSION_COLUMNS: &str = "handle, run_id, signer, receiver_id, sender_id, indices,
                                  status, submitted_at, settled_tick, detail";

fn map_submission(r: &rusqlite::Row<'_>) -> rusqlite::Result<(SubmissionRow, String, String)> {
    Ok((
        SubmissionRow {
            handle:       r.get(0)?,
            run_id:       r.get(1)?,
            signer:       r.get(2)?,
            receiver_id:  column_u128(r, 3)?,
            sender_id:    column_u128(r, 4)?,
            indices:      Vec::new(),
            status:       SubmissionStatus::Pending,
            submitted_at: r.get(7)?,
            settled_tick: r.get::<_, Option<i64>>(8)?.map(|t| t as u64),
            detail:       r.get(9)?,
        },
        r.get(5)?,
        r.get(6)?,
    ))
}

fn finish(raw: (SubmissionRow, String, String)) -> SimResult<SubmissionRow> {
    let (mut row, indices, status) = raw;
    row.indices = serde_json::from_str(&indices)?;
    row.status = SubmissionStatus::parse(&status)?;
    Ok(row)
}

impl SimStore {
    pub fn insert_submission(&self, row: &SubmissionRow) -> SimResult<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO offload_submission ({SUBMISSION_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
            ),
            params![
                row.handle,
                row.run_id,
                row.signer,
                id_sql(row.receiver_id),
                id_sql(row.sender_id),
                serde_json::to_string(&row.indices)?,
                row.status.as_str(),
                row.submitted_at,
                row.settled_tick.map(|t| t as i64),
                row.detail,
            ],
        )?;
        Ok(())
    }

    pub fn submission(&self, handle: &str) -> SimResult<Option<SubmissionRow>> {
        let raw = self
            .conn
            .query_row(
                &format!("SELECT {SUBMISSION_COLUMNS} FROM offload_submission WHERE handle = ?1"),
                params![handle],
                map_submission,
            )
            .optional()?;
        raw.map(finish).transpose()
    }

    /// Pending submissions for a run, oldest first.
    pub fn pending_submissions(&self, run_id: &str) -> SimResult<Vec<SubmissionRow>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM offload_submission
             WHERE run_id = ?1 AND status = 'pending'
             ORDER BY rowid ASC"
        ))?;
        let raw = stmt
            .query_map(params![run_id], map_submission)?
            .collect::<Result<Vec<_>, _>>()?;
        raw.into_iter().map(finish).collect()
    }

    /// Close a pending submission with its outcome.
    pub fn resolve_submission(
        &self,
        handle: &str,
        status: SubmissionStatus,
        tick: Tick,
        detail: Option<&str>,
    ) -> SimResult<()> {
        let updated = self.conn.execute(
            "UPDATE offload_submission SET status = ?1, settled_tick = ?2, detail = ?3
             WHERE handle = ?4",
            params![status.as_str(), tick as i64, detail, handle],
        )?;
        if updated == 0 {
            return Err(SimError::SubmissionNotFound { handle: handle.to_string() });
        }
        Ok(())
    }

    pub fn submission_count(&self, run_id: &str, status: SubmissionStatus) -> SimResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM offload_submission WHERE run_id = ?1 AND status = ?2",
            params![run_id, status.as_str()],
            |r| r.get(0),
        )?;
        Ok(count)
    }
}
