//! Offload settlement subsystem — the authoritative commit step for queued
//! offload submissions.
//!
//! Every step it takes pending submissions oldest first and either commits
//! them through [`ResourceChestTransfer::offload`] or rejects them. A
//! rejected submission leaves ledger and inventory state untouched, which
//! is all a submitter ever gets to see of the failure.
//!
//! Rejection reasons:
//!   - the sender has not arrived yet (`arrives_at > tick`)
//!   - sender and receiver do not stand on the same hex
//!   - the offload itself failed and was rolled back

use crate::{
    attribute::{Attribute, AttributeKind},
    config::SettlementConfig,
    error::SimResult,
    event::SimEvent,
    rng::SubsystemRng,
    store::{SimStore, SubmissionRow, SubmissionStatus},
    subsystem::SimSubsystem,
    transfer::ResourceChestTransfer,
    types::{RunId, Tick},
};

pub struct OffloadSettlementSubsystem {
    run_id: RunId,
    config: SettlementConfig,
    /// Submissions settled over the subsystem's lifetime.
    pub settled_total:  u64,
    pub rejected_total: u64,
}

impl OffloadSettlementSubsystem {
    pub fn new(run_id: RunId, config: SettlementConfig) -> Self {
        Self { run_id, config, settled_total: 0, rejected_total: 0 }
    }

    /// Why a submission cannot be committed at `tick`, if it cannot.
    fn precondition_failure(
        &self,
        store: &SimStore,
        sub: &SubmissionRow,
        tick: Tick,
    ) -> SimResult<Option<String>> {
        if let Some(Attribute::ArrivalTime { arrives_at }) =
            store.attribute(sub.sender_id, AttributeKind::ArrivalTime)?
        {
            if arrives_at > tick {
                return Ok(Some(format!(
                    "sender {} arrives at tick {arrives_at}",
                    sub.sender_id
                )));
            }
        }

        if self.config.require_colocation {
            let sender_pos = store.position(sub.sender_id)?;
            let receiver_pos = store.position(sub.receiver_id)?;
            if sender_pos.is_none() || sender_pos != receiver_pos {
                return Ok(Some(format!(
                    "sender {} at {sender_pos:?} is not on receiver {} at {receiver_pos:?}",
                    sub.sender_id, sub.receiver_id
                )));
            }
        }
        Ok(None)
    }

    fn settle_one(
        &mut self,
        store: &SimStore,
        sub: &SubmissionRow,
        tick: Tick,
    ) -> SimResult<Vec<SimEvent>> {
        if let Some(reason) = self.precondition_failure(store, sub, tick)? {
            return self.reject(store, sub, tick, reason);
        }

        let transfer = ResourceChestTransfer::new(store);
        let committed = store.atomic(|| {
            let report = transfer.offload(sub.receiver_id, sub.sender_id, &sub.indices, tick)?;
            store.resolve_submission(&sub.handle, SubmissionStatus::Settled, tick, None)?;
            Ok(report)
        });
        match committed {
            Ok(report) => {
                self.settled_total += 1;
                let mut events = report.events;
                events.push(SimEvent::OffloadSettled {
                    tick,
                    handle: sub.handle.clone(),
                    offloaded: report.offloaded,
                    skipped: report.skipped,
                });
                Ok(events)
            }
            Err(e) => self.reject(store, sub, tick, e.to_string()),
        }
    }

    fn reject(
        &mut self,
        store: &SimStore,
        sub: &SubmissionRow,
        tick: Tick,
        reason: String,
    ) -> SimResult<Vec<SimEvent>> {
        log::warn!("tick={tick} offload {} rejected: {reason}", sub.handle);
        store.resolve_submission(&sub.handle, SubmissionStatus::Rejected, tick, Some(&reason))?;
        self.rejected_total += 1;
        Ok(vec![SimEvent::OffloadRejected {
            tick,
            handle: sub.handle.clone(),
            reason,
        }])
    }
}

impl SimSubsystem for OffloadSettlementSubsystem {
    fn name(&self) -> &'static str {
        "offload_settlement"
    }

    fn update(
        &mut self,
        tick: Tick,
        store: &SimStore,
        _events_in: &[SimEvent],
        _rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>> {
        let mut out = Vec::new();
        if !self.config.enabled {
            return Ok(out);
        }

        let pending = store.pending_submissions(&self.run_id)?;
        for sub in pending.iter().take(self.config.max_per_step) {
            out.extend(self.settle_one(store, sub, tick)?);
        }

        if !pending.is_empty() {
            log::debug!(
                "tick={tick} settlement: {} pending, settled_total={} rejected_total={}",
                pending.len(),
                self.settled_total,
                self.rejected_total
            );
        }
        Ok(out)
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
