//! Mutation gateway — the seam through which the core requests state changes
//! it does not commit itself.
//!
//! Submitting only enqueues. Whether the mutation landed is observed later,
//! either through [`crate::store::SimStore::submission`] or simply by
//! re-reading ledger and inventory state. There is no retry policy here.

use crate::{
    error::SimResult,
    store::{SimStore, SubmissionRow, SubmissionStatus},
    types::{EntityId, RunId},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque receipt for a submitted mutation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct SubmissionHandle(pub String);

impl std::fmt::Display for SubmissionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub trait MutationGateway {
    /// Request that `sender`'s chests at `indices` be emptied into `receiver`.
    fn submit_offload(
        &self,
        signer: &str,
        receiver: EntityId,
        sender: EntityId,
        indices: &[u32],
    ) -> SimResult<SubmissionHandle>;
}

/// Gateway that queues submissions in the store for the settlement step.
pub struct QueuedGateway<'a> {
    store:  &'a SimStore,
    run_id: RunId,
}

impl<'a> QueuedGateway<'a> {
    pub fn new(store: &'a SimStore, run_id: RunId) -> Self {
        Self { store, run_id }
    }
}

impl MutationGateway for QueuedGateway<'_> {
    fn submit_offload(
        &self,
        signer: &str,
        receiver: EntityId,
        sender: EntityId,
        indices: &[u32],
    ) -> SimResult<SubmissionHandle> {
        let handle = SubmissionHandle(Uuid::new_v4().to_string());
        self.store.insert_submission(&SubmissionRow {
            handle:       handle.0.clone(),
            run_id:       self.run_id.clone(),
            signer:       signer.to_string(),
            receiver_id:  receiver,
            sender_id:    sender,
            indices:      indices.to_vec(),
            status:       SubmissionStatus::Pending,
            submitted_at: chrono::Utc::now().to_rfc3339(),
            settled_tick: None,
            detail:       None,
        })?;
        log::debug!("queued offload {handle}: {sender} -> {receiver} slots {indices:?}");
        Ok(handle)
    }
}
