//! The simulation engine — drives subsystems over an externally supplied tick.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Scenario subsystem    (seeds the world on the first step)
//!   2. Arrival subsystem     (requests offloads for arrived transports)
//!   3. Settlement subsystem  (commits or rejects queued offloads)
//!
//! RULES:
//!   - Subsystems execute in registration order, every step.
//!   - The tick is an argument. The engine never invents one.
//!   - All randomness flows through the RngBank.
//!   - All state changes are recorded in the event log.
//!   - After every step the store's write journal is fed to the
//!     observable index.

use crate::{
    arrival_subsystem::ArrivalSubsystem,
    clock::SimClock,
    config::SimConfig,
    error::SimResult,
    event::{EventLogEntry, SimEvent},
    observe::{ObservableIndex, SubscriptionId},
    rng::{RngBank, SubsystemSlot},
    scenario_subsystem::{ScenarioSubsystem, SeededWorld},
    settlement_subsystem::OffloadSettlementSubsystem,
    store::SimStore,
    subsystem::SimSubsystem,
    types::{EntityId, RunId, Tick},
};

pub struct SimEngine {
    pub run_id:    RunId,
    pub clock:     SimClock,
    pub rng_bank:  RngBank,
    pub observers: ObservableIndex,
    seed:          u64,
    subsystems:    Vec<(SubsystemSlot, Box<dyn SimSubsystem>)>,
    store:         SimStore,
    initialized:   bool,
}

impl SimEngine {
    pub fn new(run_id: RunId, seed: u64, store: SimStore) -> Self {
        Self {
            clock:       SimClock::new(run_id.clone()),
            rng_bank:    RngBank::new(seed),
            observers:   ObservableIndex::new(),
            seed,
            subsystems:  Vec::new(),
            store,
            initialized: false,
            run_id,
        }
    }

    /// Build a fully wired engine with all subsystems registered.
    /// Call this instead of new() + manual register() calls.
    pub fn build(run_id: RunId, seed: u64, store: SimStore, config: &SimConfig) -> Self {
        let mut engine = SimEngine::new(run_id.clone(), seed, store);

        // EXECUTION ORDER — fixed, documented, never reordered.
        engine.register(
            SubsystemSlot::Scenario,
            Box::new(ScenarioSubsystem::new(config.scenario.clone(), config.world.extent)),
        );
        engine.register(SubsystemSlot::Arrival, Box::new(ArrivalSubsystem::new(run_id.clone())));
        engine.register(
            SubsystemSlot::Settlement,
            Box::new(OffloadSettlementSubsystem::new(run_id, config.settlement.clone())),
        );
        engine
    }

    /// In-memory, migrated, default-configured engine for tests.
    pub fn build_test(run_id: RunId, seed: u64) -> SimResult<Self> {
        let store = SimStore::in_memory()?;
        store.migrate()?;
        store.insert_run(&run_id, seed, env!("CARGO_PKG_VERSION"))?;
        Ok(Self::build(run_id, seed, store, &SimConfig::default()))
    }

    /// Register a subsystem. Call in the documented execution order.
    pub fn register(&mut self, slot: SubsystemSlot, subsystem: Box<dyn SimSubsystem>) {
        self.subsystems.push((slot, subsystem));
    }

    pub fn store(&self) -> &SimStore {
        &self.store
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Run one step at `tick`. This is the core simulation step.
    pub fn step(&mut self, tick: Tick) -> SimResult<Vec<SimEvent>> {
        if !self.initialized {
            let init_event = SimEvent::RunInitialized {
                run_id: self.run_id.clone(),
                seed:   self.seed,
            };
            persist(&self.store, &self.run_id, tick, "engine", &init_event)?;
            self.initialized = true;
        }

        let mut step_events: Vec<SimEvent> = vec![SimEvent::StepStarted { tick }];

        // Each subsystem sees all events emitted so far this step.
        for (slot, subsystem) in &mut self.subsystems {
            let mut rng = self.rng_bank.for_subsystem(*slot);
            let new_events = subsystem.update(tick, &self.store, &step_events, &mut rng)?;

            for event in &new_events {
                persist(&self.store, &self.run_id, tick, subsystem.name(), event)?;
            }

            step_events.extend(new_events);
        }

        step_events.push(SimEvent::StepCompleted { tick });

        let stale = self.observers.sync(&self.store);
        if !stale.is_empty() {
            log::debug!("tick={tick} {} subscription(s) went stale", stale.len());
        }
        Ok(step_events)
    }

    /// Advance the clock `n` times, stepping at each new tick.
    pub fn run_ticks(&mut self, n: u64) -> SimResult<()> {
        self.clock.resume();
        for _ in 0..n {
            let tick = self.clock.advance();
            self.step(tick)?;
        }
        self.clock.pause();
        Ok(())
    }

    /// Re-run a query subscription against the engine's store.
    pub fn evaluate(&mut self, id: SubscriptionId) -> SimResult<Option<Vec<EntityId>>> {
        self.observers.evaluate(&self.store, id)
    }

    /// Subscriptions that were flagged stale and not yet re-evaluated.
    pub fn stale_subscriptions(&self) -> Vec<SubscriptionId> {
        self.observers.stale_ids()
    }

    /// Query events for a specific tick from the store.
    /// Used by the determinism test and replay tooling.
    pub fn store_events_for_tick(
        &self,
        run_id: &str,
        tick: Tick,
    ) -> SimResult<Vec<EventLogEntry>> {
        self.store.events_for_tick(run_id, tick)
    }

    /// The world the scenario subsystem seeded, if it has run.
    pub fn seeded_world(&self) -> Option<&SeededWorld> {
        self.subsystems.iter().find_map(|(_, sub)| {
            sub.as_any()
                .downcast_ref::<ScenarioSubsystem>()
                .map(|s| &s.world)
        })
    }

    /// Lifetime (settled, rejected) counts of the settlement subsystem.
    pub fn settlement_totals(&self) -> Option<(u64, u64)> {
        self.subsystems.iter().find_map(|(_, sub)| {
            sub.as_any()
                .downcast_ref::<OffloadSettlementSubsystem>()
                .map(|s| (s.settled_total, s.rejected_total))
        })
    }
}

fn persist(
    store: &SimStore,
    run_id: &RunId,
    tick: Tick,
    subsystem: &str,
    event: &SimEvent,
) -> SimResult<()> {
    let entry = EventLogEntry {
        id:         None,
        run_id:     run_id.clone(),
        tick,
        subsystem:  subsystem.to_string(),
        event_type: event.type_name().to_string(),
        payload:    serde_json::to_string(event)?,
    };
    store.append_event(&entry)
}
