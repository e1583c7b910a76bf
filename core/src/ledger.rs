//! Production ledger — lazily accrued resource balances.
//!
//! A balance is never advanced by a timer. It is derived at query time:
//!
//!   balance = stored_balance + rate_per_tick * max(0, tick - last_update_tick)
//!
//! Every mutation checkpoints first: it computes the accrued balance at the
//! mutation tick, applies its delta, and moves `last_update_tick` to that
//! tick, all inside one atomic section.

use crate::{
    error::{SimError, SimResult},
    event::SimEvent,
    store::{ProductionRow, ResourceRow, SimStore},
    types::{resource_ids, Amount, EntityId, Rate, ResourceAmount, ResourceType, Tick},
};

/// Balance accrued from a checkpoint. Negative rates floor at zero.
pub fn accrue(stored: Amount, rate: Rate, last_update_tick: Tick, tick: Tick) -> Amount {
    let elapsed = u128::from(tick.saturating_sub(last_update_tick));
    let change = rate.unsigned_abs().saturating_mul(elapsed);
    if rate >= 0 {
        stored.saturating_add(change)
    } else {
        stored.saturating_sub(change)
    }
}

#[derive(Debug, Clone, Copy)]
enum Delta {
    None,
    Credit(Amount),
    Debit(Amount),
}

pub struct ProductionLedger<'a> {
    store: &'a SimStore,
}

impl<'a> ProductionLedger<'a> {
    pub fn new(store: &'a SimStore) -> Self {
        Self { store }
    }

    /// Current balance at `tick`. Side-effect free; absent rows read as zero.
    pub fn balance(
        &self,
        entity_id: EntityId,
        resource_type: ResourceType,
        tick: Tick,
    ) -> SimResult<Amount> {
        let Some(row) = self.store.resource_row(entity_id, resource_type)? else {
            return Ok(0);
        };
        let rate = self
            .store
            .production_rate(entity_id, resource_type)?
            .unwrap_or(0);
        Ok(accrue(row.balance, rate, row.last_update_tick, tick))
    }

    pub fn resource_balances(
        &self,
        entity_id: EntityId,
        resource_types: &[ResourceType],
        tick: Tick,
    ) -> SimResult<Vec<ResourceAmount>> {
        resource_types
            .iter()
            .map(|&rt| Ok(ResourceAmount::new(rt, self.balance(entity_id, rt, tick)?)))
            .collect()
    }

    /// Wheat and fish, in that order.
    pub fn food_balances(&self, entity_id: EntityId, tick: Tick) -> SimResult<[ResourceAmount; 2]> {
        let [wheat, fish] = resource_ids::FOOD;
        Ok([
            ResourceAmount::new(wheat, self.balance(entity_id, wheat, tick)?),
            ResourceAmount::new(fish, self.balance(entity_id, fish, tick)?),
        ])
    }

    /// Fold accrual up to `tick` into the stored balance.
    pub fn checkpoint(
        &self,
        entity_id: EntityId,
        resource_type: ResourceType,
        tick: Tick,
    ) -> SimResult<SimEvent> {
        self.apply(entity_id, resource_type, tick, Delta::None)
    }

    pub fn credit(
        &self,
        entity_id: EntityId,
        resource_type: ResourceType,
        amount: Amount,
        tick: Tick,
    ) -> SimResult<SimEvent> {
        self.apply(entity_id, resource_type, tick, Delta::Credit(amount))
    }

    /// Fails with `InsufficientBalance` and writes nothing when `amount`
    /// exceeds the accrued balance.
    pub fn debit(
        &self,
        entity_id: EntityId,
        resource_type: ResourceType,
        amount: Amount,
        tick: Tick,
    ) -> SimResult<SimEvent> {
        self.apply(entity_id, resource_type, tick, Delta::Debit(amount))
    }

    /// Entrypoint for building/upgrade logic. Checkpoints under the old rate
    /// before switching, so past ticks keep accruing at the rate they had.
    pub fn set_rate(
        &self,
        entity_id: EntityId,
        resource_type: ResourceType,
        rate: Rate,
        tick: Tick,
    ) -> SimResult<Vec<SimEvent>> {
        self.store.atomic(|| {
            let checkpoint = self.apply(entity_id, resource_type, tick, Delta::None)?;
            self.store.put_production_rate(&ProductionRow { entity_id, resource_type, rate })?;
            log::debug!("tick={tick} entity={entity_id} resource={resource_type} rate -> {rate}");
            Ok(vec![
                checkpoint,
                SimEvent::ProductionRateSet { tick, entity_id, resource_type, rate },
            ])
        })
    }

    fn apply(
        &self,
        entity_id: EntityId,
        resource_type: ResourceType,
        tick: Tick,
        delta: Delta,
    ) -> SimResult<SimEvent> {
        self.store.atomic(|| {
            if let Some(row) = self.store.resource_row(entity_id, resource_type)? {
                if tick < row.last_update_tick {
                    return Err(SimError::TickRegression {
                        entity_id,
                        checkpoint: row.last_update_tick,
                        tick,
                    });
                }
            }

            let accrued = self.balance(entity_id, resource_type, tick)?;
            let balance = match delta {
                Delta::None => accrued,
                Delta::Credit(amount) => accrued.saturating_add(amount),
                Delta::Debit(amount) if amount > accrued => {
                    return Err(SimError::InsufficientBalance {
                        entity_id,
                        resource_type,
                        available: accrued,
                        requested: amount,
                    });
                }
                Delta::Debit(amount) => accrued - amount,
            };

            self.store.put_resource_row(&ResourceRow {
                entity_id,
                resource_type,
                balance,
                last_update_tick: tick,
            })?;
            log::debug!(
                "tick={tick} entity={entity_id} resource={resource_type} {delta:?}: {accrued} -> {balance}"
            );

            Ok(SimEvent::BalanceCheckpointed {
                tick,
                entity_id,
                resource_type,
                accrued,
                balance,
            })
        })
    }
}
