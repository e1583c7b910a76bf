//! Scenario subsystem — seeds a demo world on the first step.
//!
//! Realms and banks get distinct hexes inside the world extent. Every realm
//! gets a production rate and a starting balance per configured resource.
//! Caravans are packed at a source realm and placed on a destination
//! realm's hex with a future arrival tick, so the arrival and settlement
//! subsystems have something to move.
//!
//! All draws come from the scenario RNG slot: the same seed builds the
//! same world.

use crate::{
    attribute::Attribute,
    config::ScenarioConfig,
    error::{SimError, SimResult},
    event::SimEvent,
    hex::WorldExtent,
    ledger::ProductionLedger,
    rng::SubsystemRng,
    store::SimStore,
    subsystem::SimSubsystem,
    transfer::ResourceChestTransfer,
    types::{EntityId, Position, ResourceAmount, Tick},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

const MAX_PLACEMENT_ATTEMPTS: usize = 256;
const MAX_CHESTS_PER_CARAVAN: u64 = 3;

/// Cost bundle seeded for every scenario: what a granary upgrade costs.
pub const GRANARY_COST_ID: u128 = 1;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeededWorld {
    #[serde(with = "crate::serde_u128_string::vec")]
    pub realms:   Vec<EntityId>,
    #[serde(with = "crate::serde_u128_string::vec")]
    pub banks:    Vec<EntityId>,
    #[serde(with = "crate::serde_u128_string::vec")]
    pub caravans: Vec<EntityId>,
}

/// Free-hex picker over the world extent.
struct Placer<'a> {
    extent: &'a WorldExtent,
    taken:  BTreeSet<Position>,
}

impl<'a> Placer<'a> {
    fn new(extent: &'a WorldExtent) -> Self {
        Self { extent, taken: BTreeSet::new() }
    }

    fn place(&mut self, rng: &mut SubsystemRng) -> SimResult<Position> {
        let cols = (self.extent.max_col - self.extent.min_col + 1) as u64;
        let rows = (self.extent.max_row - self.extent.min_row + 1) as u64;
        for _ in 0..MAX_PLACEMENT_ATTEMPTS {
            let position = Position::new(
                self.extent.min_col + rng.next_u64_below(cols) as i64,
                self.extent.min_row + rng.next_u64_below(rows) as i64,
            );
            if self.taken.insert(position) {
                return Ok(position);
            }
        }
        Err(SimError::Other(anyhow::anyhow!(
            "no free hex found in {:?} after {MAX_PLACEMENT_ATTEMPTS} attempts",
            self.extent
        )))
    }
}

fn address(rng: &mut SubsystemRng) -> String {
    format!("0x{:016x}{:016x}", rng.next_u64(), rng.next_u64())
}

/// Build the demo world into `store` at `tick`.
pub fn seed_world(
    store: &SimStore,
    config: &ScenarioConfig,
    extent: &WorldExtent,
    rng: &mut SubsystemRng,
    tick: Tick,
) -> SimResult<(SeededWorld, Vec<SimEvent>)> {
    if config.resource_types.is_empty() {
        return Err(anyhow::anyhow!("scenario needs at least one resource type").into());
    }
    if config.caravan_count > 0 && config.realm_count < 2 {
        return Err(anyhow::anyhow!("caravans need at least two realms").into());
    }

    store.atomic(|| {
        let ledger = ProductionLedger::new(store);
        let transfer = ResourceChestTransfer::new(store);
        let mut placer = Placer::new(extent);
        let mut world = SeededWorld::default();
        let mut events = Vec::new();
        let mut realm_positions = Vec::with_capacity(config.realm_count);

        for i in 0..config.realm_count {
            let realm = store.allocate_entity_id()?;
            let position = placer.place(rng)?;
            store.set_attribute(realm, &Attribute::Position(position))?;
            store.set_attribute(realm, &Attribute::Owner { address: address(rng) })?;
            store.set_attribute(realm, &Attribute::Realm { realm_id: i as u128 + 1 })?;

            for &resource_type in &config.resource_types {
                let rate = rng.next_u64_between(0, config.max_rate);
                events.extend(ledger.set_rate(realm, resource_type, i128::from(rate), tick)?);
                events.push(ledger.credit(
                    realm,
                    resource_type,
                    u128::from(config.starting_balance),
                    tick,
                )?);
            }
            world.realms.push(realm);
            realm_positions.push(position);
        }

        for _ in 0..config.bank_count {
            let bank = store.allocate_entity_id()?;
            store.set_attribute(bank, &Attribute::Position(placer.place(rng)?))?;
            store.set_attribute(bank, &Attribute::Owner { address: address(rng) })?;
            store.set_attribute(bank, &Attribute::Bank)?;
            world.banks.push(bank);
        }

        for _ in 0..config.caravan_count {
            let realm_count = world.realms.len() as u64;
            let source_idx = rng.next_u64_below(realm_count) as usize;
            let dest_idx = (source_idx + 1 + rng.next_u64_below(realm_count - 1) as usize)
                % world.realms.len();
            let source = world.realms[source_idx];

            let caravan = store.allocate_entity_id()?;
            store.set_attribute(caravan, &Attribute::Position(realm_positions[dest_idx]))?;
            store.set_attribute(caravan, &Attribute::Movable)?;
            store.set_attribute(caravan, &Attribute::EntityOwner { owner: source })?;
            store.set_attribute(
                caravan,
                &Attribute::ArrivalTime {
                    arrives_at: tick + rng.next_u64_between(1, config.max_travel_ticks.max(1)),
                },
            )?;
            store.set_attribute(caravan, &Attribute::Inventory { items_count: 0 })?;

            for _ in 0..rng.next_u64_between(1, MAX_CHESTS_PER_CARAVAN) {
                let mut entries = Vec::new();
                for &resource_type in &config.resource_types {
                    if !rng.chance(0.5) {
                        continue;
                    }
                    let wanted = u128::from(rng.next_u64_between(1, config.max_chest_amount.max(1)));
                    let amount = wanted.min(ledger.balance(source, resource_type, tick)?);
                    if amount > 0 {
                        entries.push(ResourceAmount::new(resource_type, amount));
                    }
                }
                if entries.is_empty() {
                    continue;
                }
                events.extend(transfer.pack_chest(caravan, source, &entries, tick)?.events);
            }
            world.caravans.push(caravan);
        }

        for (index, &resource_type) in config.resource_types.iter().take(2).enumerate() {
            store.insert_resource_cost(
                GRANARY_COST_ID,
                index as u32,
                ResourceAmount::new(resource_type, 100 * (index as u128 + 1)),
            )?;
        }

        log::info!(
            "tick={tick} seeded {} realms, {} banks, {} caravans",
            world.realms.len(),
            world.banks.len(),
            world.caravans.len()
        );
        Ok((world, events))
    })
}

pub struct ScenarioSubsystem {
    config:      ScenarioConfig,
    extent:      WorldExtent,
    initialized: bool,
    pub world:   SeededWorld,
}

impl ScenarioSubsystem {
    pub fn new(config: ScenarioConfig, extent: WorldExtent) -> Self {
        Self { config, extent, initialized: false, world: SeededWorld::default() }
    }
}

impl SimSubsystem for ScenarioSubsystem {
    fn name(&self) -> &'static str {
        "scenario"
    }

    fn update(
        &mut self,
        tick: Tick,
        store: &SimStore,
        _events_in: &[SimEvent],
        rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>> {
        if self.initialized {
            return Ok(Vec::new());
        }
        let (world, events) = seed_world(store, &self.config, &self.extent, rng, tick)?;
        self.world = world;
        self.initialized = true;
        Ok(events)
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
