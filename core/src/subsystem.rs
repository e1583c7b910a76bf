//! Subsystem trait.
//!
//! RULE: Every subsystem implements SimSubsystem.
//! The engine calls update() on each registered subsystem
//! in registration order, every step.

use crate::{
    error::SimResult,
    event::SimEvent,
    rng::SubsystemRng,
    store::SimStore,
    types::Tick,
};
use std::any::Any;

/// The contract every subsystem must fulfill.
pub trait SimSubsystem: Send {
    /// Unique stable name for this subsystem.
    fn name(&self) -> &'static str;

    /// Called once per step by the engine.
    ///
    /// - `tick`:      the externally supplied tick for this step
    /// - `store`:     the world state store
    /// - `events_in`: events emitted by earlier subsystems this step
    /// - `rng`:       this subsystem's deterministic RNG for this step
    ///
    /// Returns a vec of new events to add to the step's event log.
    fn update(
        &mut self,
        tick: Tick,
        store: &SimStore,
        events_in: &[SimEvent],
        rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>>;

    /// For downcasting in tests and tooling only.
    fn as_any(&self) -> &dyn Any;
}
