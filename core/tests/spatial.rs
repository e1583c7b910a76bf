//! Integration tests for the spatial index and attribute predicates.

use realm_core::{
    attribute::{Attribute, AttributeKind, Query},
    hex::{self, Direction},
    spatial::{HexType, SpatialIndex},
    store::SimStore,
    types::{EntityId, Position},
};

fn store() -> SimStore {
    let store = SimStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store
}

fn spawn(store: &SimStore, id: EntityId, attrs: &[Attribute]) {
    for attr in attrs {
        store.set_attribute(id, attr).expect("set attribute");
    }
}

#[test]
fn empty_hex_classifies_as_empty() {
    let store = store();
    let index = SpatialIndex::new(&store);
    assert_eq!(index.classify_occupancy(Position::new(3, 3)).unwrap(), HexType::Empty);
    assert!(index.entities_at(Position::new(3, 3)).unwrap().is_empty());
    assert!(index.realm_at(Position::new(3, 3)).unwrap().is_none());
}

#[test]
fn bank_outranks_realm_on_shared_hex() {
    let store = store();
    let p = Position::new(4, 7);
    spawn(&store, 1, &[Attribute::Position(p), Attribute::Realm { realm_id: 9 }]);
    assert_eq!(SpatialIndex::new(&store).classify_occupancy(p).unwrap(), HexType::Realm);

    spawn(&store, 2, &[Attribute::Position(p), Attribute::Bank]);
    assert_eq!(SpatialIndex::new(&store).classify_occupancy(p).unwrap(), HexType::Bank);
}

#[test]
fn realm_at_reports_realm_id() {
    let store = store();
    let p = Position::new(0, 1);
    spawn(&store, 77, &[Attribute::Position(p), Attribute::Realm { realm_id: 5 }]);

    let realm = SpatialIndex::new(&store).realm_at(p).unwrap().expect("realm present");
    assert_eq!(realm.realm_entity_id, 77);
    assert_eq!(realm.realm_id, 5);
}

#[test]
fn bank_accounts_exclude_movable_banks_and_realms() {
    let store = store();
    let p = Position::new(2, 2);
    let owner = "0xfeed";
    spawn(&store, 10, &[Attribute::Position(p), Attribute::Owner { address: owner.into() }]);
    spawn(&store, 11, &[
        Attribute::Position(p),
        Attribute::Owner { address: owner.into() },
        Attribute::Movable,
    ]);
    spawn(&store, 12, &[
        Attribute::Position(p),
        Attribute::Owner { address: owner.into() },
        Attribute::Bank,
    ]);
    spawn(&store, 13, &[
        Attribute::Position(p),
        Attribute::Owner { address: owner.into() },
        Attribute::Realm { realm_id: 1 },
    ]);
    spawn(&store, 14, &[Attribute::Position(p), Attribute::Owner { address: "0xother".into() }]);

    let index = SpatialIndex::new(&store);
    assert_eq!(index.bank_accounts_at(owner, p).unwrap(), vec![10]);
    assert_eq!(index.owned_entities_at(owner, p).unwrap(), vec![10, 12, 13]);
}

#[test]
fn not_value_matches_missing_attribute() {
    let store = store();
    spawn(&store, 1, &[Attribute::Movable]);
    spawn(&store, 2, &[Attribute::Movable, Attribute::Inventory { items_count: 0 }]);
    spawn(&store, 3, &[Attribute::Movable, Attribute::Inventory { items_count: 2 }]);

    let query = Query::new()
        .has(AttributeKind::Movable)
        .not_value(Attribute::Inventory { items_count: 0 });
    assert_eq!(store.run_query(&query).unwrap(), vec![1, 3]);
}

#[test]
fn arrivals_with_cargo_need_every_predicate() {
    let store = store();
    let p = Position::new(6, 6);
    let full = [
        Attribute::Position(p),
        Attribute::EntityOwner { owner: 500 },
        Attribute::Inventory { items_count: 1 },
        Attribute::ArrivalTime { arrives_at: 3 },
    ];
    spawn(&store, 20, &full);
    // empty inventory
    spawn(&store, 21, &[
        Attribute::Position(p),
        Attribute::EntityOwner { owner: 500 },
        Attribute::Inventory { items_count: 0 },
        Attribute::ArrivalTime { arrives_at: 3 },
    ]);
    // no arrival time
    spawn(&store, 22, &full[..3]);
    // elsewhere
    spawn(&store, 23, &[
        Attribute::Position(Position::new(6, 7)),
        Attribute::EntityOwner { owner: 500 },
        Attribute::Inventory { items_count: 1 },
        Attribute::ArrivalTime { arrives_at: 3 },
    ]);

    assert_eq!(SpatialIndex::new(&store).arrivals_with_cargo_at(p).unwrap(), vec![20]);
}

#[test]
fn large_ids_sort_numerically() {
    let store = store();
    let p = Position::new(1, 1);
    let big = u128::MAX;
    spawn(&store, big, &[Attribute::Position(p)]);
    spawn(&store, 9, &[Attribute::Position(p)]);
    spawn(&store, 10, &[Attribute::Position(p)]);

    assert_eq!(SpatialIndex::new(&store).entities_at(p).unwrap(), vec![9, 10, big]);
}

#[test]
fn neighbor_occupancy_follows_direction_order() {
    let store = store();
    let center = Position::new(5, 10);
    let east = hex::neighbor(5, 10, Direction::East);
    let south_west = hex::neighbor(5, 10, Direction::SouthWest);
    spawn(&store, 1, &[Attribute::Position(east), Attribute::Bank]);
    spawn(&store, 2, &[Attribute::Position(south_west), Attribute::Realm { realm_id: 3 }]);

    let around = SpatialIndex::new(&store).neighbor_occupancy(center).unwrap();
    let dirs: Vec<Direction> = around.iter().map(|n| n.direction).collect();
    assert_eq!(dirs, Direction::ALL.to_vec());
    assert_eq!(around[0].position, Position::new(6, 10));
    assert_eq!(around[0].hex_type, HexType::Bank);
    assert_eq!(around[4].position, Position::new(5, 9));
    assert_eq!(around[4].hex_type, HexType::Realm);
    assert!(around[1..4].iter().all(|n| n.hex_type == HexType::Empty));
    assert_eq!(around[5].hex_type, HexType::Empty);
}

#[test]
fn removing_position_takes_entity_off_the_hex() {
    let store = store();
    let p = Position::new(8, 8);
    spawn(&store, 4, &[Attribute::Position(p), Attribute::Realm { realm_id: 1 }]);
    store.remove_attribute(4, AttributeKind::Position).unwrap();

    let index = SpatialIndex::new(&store);
    assert_eq!(index.classify_occupancy(p).unwrap(), HexType::Empty);
    assert_eq!(store.attributes_of(4).unwrap(), vec![Attribute::Realm { realm_id: 1 }]);
}
