//! Integration tests for offload settlement and the engine step.
//!
//! Submissions are queued through the gateway and committed (or rejected)
//! by the settlement subsystem on the next engine step.

use realm_core::{
    attribute::{Attribute, AttributeKind, Query},
    config::SettlementConfig,
    engine::SimEngine,
    event::SimEvent,
    gateway::{MutationGateway, QueuedGateway},
    ledger::ProductionLedger,
    query::ResourceQueryService,
    rng::SubsystemSlot,
    settlement_subsystem::OffloadSettlementSubsystem,
    spatial::arrivals_with_cargo_query,
    store::{SimStore, SubmissionStatus},
    types::{resource_ids::WHEAT, EntityId, Position, ResourceAmount},
};

const REALM: EntityId = 1;
const CARAVAN: EntityId = 2;
const HOME: Position = Position::new(10, 10);

fn settlement_engine(run_id: &str, config: SettlementConfig) -> SimEngine {
    let store = SimStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store.insert_run(run_id, 7, "test").expect("insert run");
    let mut engine = SimEngine::new(run_id.to_string(), 7, store);
    engine.register(
        SubsystemSlot::Settlement,
        Box::new(OffloadSettlementSubsystem::new(run_id.to_string(), config)),
    );
    engine
}

/// A realm at HOME and a caravan carrying one chest of 10 wheat.
fn seed_caravan(store: &SimStore, caravan_at: Position, arrives_at: u64) {
    store.set_attribute(REALM, &Attribute::Position(HOME)).unwrap();
    store.set_attribute(REALM, &Attribute::Realm { realm_id: 1 }).unwrap();
    store.set_attribute(CARAVAN, &Attribute::Position(caravan_at)).unwrap();
    store.set_attribute(CARAVAN, &Attribute::EntityOwner { owner: REALM }).unwrap();
    store.set_attribute(CARAVAN, &Attribute::ArrivalTime { arrives_at }).unwrap();
    store.set_attribute(CARAVAN, &Attribute::Inventory { items_count: 1 }).unwrap();
    let chest_id = store.allocate_entity_id().unwrap();
    store.insert_chest(chest_id, &[ResourceAmount::new(WHEAT, 10)], 0).unwrap();
    store.put_slot(CARAVAN, 0, chest_id).unwrap();
}

fn submit(engine: &SimEngine, run_id: &str) -> String {
    QueuedGateway::new(engine.store(), run_id.to_string())
        .submit_offload("0xabc", REALM, CARAVAN, &[0])
        .unwrap()
        .0
}

fn status(engine: &SimEngine, handle: &str) -> SubmissionStatus {
    engine.store().submission(handle).unwrap().expect("submission exists").status
}

#[test]
fn arrived_colocated_offload_settles() {
    let run_id = "settle-t1";
    let mut engine = settlement_engine(run_id, SettlementConfig::default());
    seed_caravan(engine.store(), HOME, 3);
    let handle = submit(&engine, run_id);

    let events = engine.step(3).unwrap();

    assert_eq!(status(&engine, &handle), SubmissionStatus::Settled);
    let row = engine.store().submission(&handle).unwrap().unwrap();
    assert_eq!(row.settled_tick, Some(3));
    assert_eq!(ProductionLedger::new(engine.store()).balance(REALM, WHEAT, 3).unwrap(), 10);
    assert!(events.iter().any(|e| matches!(
        e,
        SimEvent::OffloadSettled { offloaded, .. } if offloaded == &vec![0]
    )));
    assert_eq!(engine.store().event_count(run_id, "chest_offloaded").unwrap(), 1);
    assert_eq!(engine.settlement_totals(), Some((1, 0)));
}

#[test]
fn offload_before_arrival_is_rejected_without_side_effects() {
    let run_id = "settle-t2";
    let mut engine = settlement_engine(run_id, SettlementConfig::default());
    seed_caravan(engine.store(), HOME, 9);
    let handle = submit(&engine, run_id);

    engine.step(5).unwrap();

    assert_eq!(status(&engine, &handle), SubmissionStatus::Rejected);
    assert_eq!(ProductionLedger::new(engine.store()).balance(REALM, WHEAT, 5).unwrap(), 0);
    assert!(engine.store().slot_chest(CARAVAN, 0).unwrap().is_some());
    assert_eq!(engine.store().event_count(run_id, "offload_rejected").unwrap(), 1);
}

#[test]
fn offload_from_another_hex_is_rejected() {
    let run_id = "settle-t3";
    let mut engine = settlement_engine(run_id, SettlementConfig::default());
    seed_caravan(engine.store(), Position::new(11, 10), 0);
    let handle = submit(&engine, run_id);

    engine.step(1).unwrap();
    assert_eq!(status(&engine, &handle), SubmissionStatus::Rejected);
    let detail = engine.store().submission(&handle).unwrap().unwrap().detail;
    assert!(detail.is_some_and(|d| d.contains("not on receiver")));
}

#[test]
fn colocation_check_can_be_disabled() {
    let run_id = "settle-t4";
    let config = SettlementConfig { require_colocation: false, ..SettlementConfig::default() };
    let mut engine = settlement_engine(run_id, config);
    seed_caravan(engine.store(), Position::new(40, 2), 0);
    let handle = submit(&engine, run_id);

    engine.step(1).unwrap();
    assert_eq!(status(&engine, &handle), SubmissionStatus::Settled);
}

#[test]
fn max_per_step_defers_the_rest() {
    let run_id = "settle-t5";
    let config = SettlementConfig { max_per_step: 1, ..SettlementConfig::default() };
    let mut engine = settlement_engine(run_id, config);
    seed_caravan(engine.store(), HOME, 0);
    let first = submit(&engine, run_id);
    let second = submit(&engine, run_id);

    engine.step(1).unwrap();
    assert_eq!(status(&engine, &first), SubmissionStatus::Settled);
    assert_eq!(status(&engine, &second), SubmissionStatus::Pending);

    // the slot is already empty: settling again is a no-op, not a failure
    let events = engine.step(2).unwrap();
    assert_eq!(status(&engine, &second), SubmissionStatus::Settled);
    assert!(events.iter().any(|e| matches!(
        e,
        SimEvent::OffloadSettled { skipped, .. } if skipped == &vec![0]
    )));
    assert_eq!(ProductionLedger::new(engine.store()).balance(REALM, WHEAT, 2).unwrap(), 10);
}

#[test]
fn disabled_settlement_leaves_submissions_pending() {
    let run_id = "settle-t6";
    let config = SettlementConfig { enabled: false, ..SettlementConfig::default() };
    let mut engine = settlement_engine(run_id, config);
    seed_caravan(engine.store(), HOME, 0);
    let handle = submit(&engine, run_id);

    engine.step(1).unwrap();
    assert_eq!(status(&engine, &handle), SubmissionStatus::Pending);
}

#[test]
fn settled_offload_marks_live_queries_stale() {
    let run_id = "settle-t7";
    let mut engine = settlement_engine(run_id, SettlementConfig::default());
    seed_caravan(engine.store(), HOME, 0);
    engine.step(0).unwrap();

    let arrivals = engine.observers.subscribe(arrivals_with_cargo_query(HOME));
    let banks = engine.observers.subscribe(Query::new().has(AttributeKind::Bank));
    let caravan = engine.observers.subscribe_entity(CARAVAN);
    assert_eq!(engine.evaluate(arrivals).unwrap(), Some(vec![CARAVAN]));

    submit(&engine, run_id);
    engine.step(1).unwrap();

    assert!(engine.observers.is_stale(arrivals));
    assert!(engine.observers.is_stale(caravan));
    assert!(!engine.observers.is_stale(banks));
    assert_eq!(engine.evaluate(arrivals).unwrap(), Some(vec![]));
    assert!(!engine.observers.is_stale(arrivals));
}

#[test]
fn seeded_world_settles_every_arrival() {
    let run_id = "settle-world";
    let mut engine = SimEngine::build_test(run_id.to_string(), 1234).unwrap();

    // default scenario: every caravan arrives within 20 ticks of the seed step
    engine.run_ticks(25).unwrap();

    let world = engine.seeded_world().expect("scenario ran").clone();
    assert_eq!(world.realms.len(), 12);
    assert_eq!(world.banks.len(), 2);
    assert_eq!(world.caravans.len(), 8);

    let store = engine.store();
    assert_eq!(store.submission_count(run_id, SubmissionStatus::Pending).unwrap(), 0);
    assert_eq!(store.submission_count(run_id, SubmissionStatus::Rejected).unwrap(), 0);
    assert_eq!(
        store.event_count(run_id, "chest_packed").unwrap(),
        store.event_count(run_id, "chest_offloaded").unwrap()
    );

    let gateway = QueuedGateway::new(store, run_id.to_string());
    let service = ResourceQueryService::new(store, &gateway);
    for caravan in world.caravans {
        assert!(
            service.resources_carried_by(caravan).unwrap().indices.is_empty(),
            "caravan {caravan} still carries cargo"
        );
    }
}
