//! SQLite store and the SQLite-backed desk.

use caseload_core::{
    backend::{SqliteBackend, WorkloadBackend},
    clock::ManualClock,
    config::DeskConfig,
    desk::Desk,
    error::DeskError,
    event::LedgerEvent,
    specialization::{Category, PriorityLevel, Specialization},
    store::DeskStore,
    validation::SpecializationDraft,
};
use std::sync::Arc;

fn migrated() -> DeskStore {
    let store = DeskStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store
}

fn temp_db(name: &str) -> String {
    let path = std::env::temp_dir().join(format!("caseload-{name}-{}.db", std::process::id()));
    let _ = std::fs::remove_file(&path);
    path.to_string_lossy().into_owned()
}

#[test]
fn specialization_round_trips() {
    let store = migrated();
    let spec = Specialization::new("ana", "housing", PriorityLevel::Backup, 7)
        .with_workload(2)
        .with_rating(None);
    store.insert_specialization(&spec).unwrap();

    let loaded = store.get_specialization("ana", "housing").unwrap().unwrap();
    assert_eq!(loaded, spec);
    assert!(store.get_specialization("ana", "financial").unwrap().is_none());
}

#[test]
fn duplicate_specialization_is_rejected() {
    let store = migrated();
    let spec = Specialization::new("ana", "housing", PriorityLevel::Primary, 5);
    store.insert_specialization(&spec).unwrap();

    let err = store.insert_specialization(&spec).unwrap_err();
    assert!(matches!(err, DeskError::DuplicateSpecialization { .. }), "got {err:?}");
}

#[test]
fn unknown_tier_in_database_loads_as_unrecognized() {
    let store = migrated();
    let spec = Specialization::new("ana", "housing", PriorityLevel::Unrecognized, 5);
    store.insert_specialization(&spec).unwrap();
    let loaded = store.get_specialization("ana", "housing").unwrap().unwrap();
    assert_eq!(loaded.priority_level, PriorityLevel::Unrecognized);
}

/// The conditional UPDATE refuses once capacity is used up.
#[test]
fn conditional_increment_respects_capacity() {
    let store = migrated();
    store
        .insert_specialization(&Specialization::new("ana", "housing", PriorityLevel::Primary, 2))
        .unwrap();

    assert!(store.try_increment_workload("ana", "housing").unwrap());
    assert!(store.try_increment_workload("ana", "housing").unwrap());
    assert!(!store.try_increment_workload("ana", "housing").unwrap(), "third claim must fail");
    assert!(store.force_increment_workload("ana", "housing").unwrap());
    assert_eq!(store.get_specialization("ana", "housing").unwrap().unwrap().current_workload, 3);
}

#[test]
fn decrement_floors_at_zero() {
    let store = migrated();
    store
        .insert_specialization(&Specialization::new("ana", "housing", PriorityLevel::Primary, 2))
        .unwrap();
    assert!(store.decrement_workload("ana", "housing").unwrap());
    assert_eq!(store.get_specialization("ana", "housing").unwrap().unwrap().current_workload, 0);
    assert!(!store.decrement_workload("nobody", "housing").unwrap());
}

#[test]
fn categories_upsert() {
    let store = migrated();
    store.upsert_category(&Category::new("housing", "Housing")).unwrap();
    let mut edited = Category::new("housing", "Housing & Residence");
    edited.auto_assign = false;
    store.upsert_category(&edited).unwrap();

    assert_eq!(store.get_category("housing").unwrap(), edited);
    assert_eq!(store.list_categories().unwrap().len(), 1);
    assert!(matches!(
        store.get_category("parking").unwrap_err(),
        DeskError::CategoryNotFound { .. }
    ));
}

#[test]
fn sqlite_backend_refuses_opted_out_rows() {
    let store = migrated();
    store
        .insert_specialization(
            &Specialization::new("ana", "housing", PriorityLevel::Primary, 2).with_availability(false),
        )
        .unwrap();
    let backend = SqliteBackend::new(store);
    assert!(!backend.persist_reservation("ana", "housing").unwrap());
}

#[test]
fn sqlite_desk_persists_reservations_and_events() {
    let config = DeskConfig::default_test();
    let desk = Desk::build_sqlite(migrated(), &config, Arc::new(ManualClock::epoch())).unwrap();

    let (ticket, result) = desk.open_ticket("housing").unwrap();
    assert_eq!(ticket.counselor_id(), Some("ana"));
    assert_eq!(result.score, Some(100));

    // A fresh load from the store sees the reservation.
    desk.ledger.load_category("housing").unwrap();
    assert_eq!(desk.ledger.get("ana", "housing").unwrap().current_workload, 1);

    let reserved = desk
        .ledger
        .events()
        .into_iter()
        .filter(|e| matches!(e, LedgerEvent::WorkloadReserved { .. }))
        .count();
    assert_eq!(reserved, 1);
}

/// A second desk over the same file picks up state instead of reseeding.
#[test]
fn reopened_database_is_loaded_not_reseeded() {
    let path = temp_db("reopen");
    let config = DeskConfig::default_test();
    {
        let store = DeskStore::open(&path).unwrap();
        store.migrate().unwrap();
        let desk = Desk::build_sqlite(store, &config, Arc::new(ManualClock::epoch())).unwrap();
        desk.allocator.assign("housing").unwrap();
        desk.allocator.assign("housing").unwrap();
    }

    let store = DeskStore::open(&path).unwrap();
    store.migrate().unwrap();
    let events_before = store.event_count("workload_reserved").unwrap();
    assert_eq!(events_before, 2);

    let desk = Desk::build_sqlite(store, &config, Arc::new(ManualClock::epoch())).unwrap();
    assert_eq!(desk.ledger.len(), 5);
    assert_eq!(desk.ledger.get("ana", "housing").unwrap().current_workload, 2);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn ledger_events_are_persisted_in_order() {
    let config = DeskConfig::default_test();
    let backend = Arc::new(SqliteBackend::new(migrated()));
    let desk = Desk::new(backend.clone(), Arc::new(ManualClock::epoch()), config.categories.clone());
    config.seed_ledger(&desk.ledger).unwrap();
    desk.allocator.assign("housing").unwrap();
    desk.ledger.reset_all().unwrap();

    let stored: Vec<LedgerEvent> = backend
        .with_store(|s| s.events())
        .unwrap()
        .iter()
        .map(|entry| entry.decode().unwrap())
        .collect();
    assert_eq!(stored, desk.ledger.events());
    assert_eq!(backend.with_store(|s| s.event_count("specialization_added")).unwrap(), 5);
    assert_eq!(backend.with_store(|s| s.event_count("workload_reset")).unwrap(), 1);
}

fn open_desk(path: &str, config: &DeskConfig) -> Desk {
    let store = DeskStore::open(path).unwrap();
    store.migrate().unwrap();
    Desk::build_sqlite(store, config, Arc::new(ManualClock::epoch())).unwrap()
}

/// Two desks share one database. The second one's mirror is behind, so
/// its first pick loses at the database; the retry reloads and moves on.
#[test]
fn lost_race_between_desks_reloads_and_retries() {
    let path = temp_db("two-desks");
    let config = DeskConfig {
        categories: vec![Category::new("housing", "Housing")],
        specializations: vec![
            SpecializationDraft::new("ana", "housing").priority("primary").capacity(1).rating(5),
            SpecializationDraft::new("ben", "housing").priority("secondary").capacity(10).rating(5),
        ],
        simulation: Default::default(),
    };
    let front = open_desk(&path, &config);
    let back = open_desk(&path, &config);

    let first = front.allocator.assign("housing").unwrap();
    assert_eq!(first.selected_counselor_id.as_deref(), Some("ana"));
    assert_eq!(back.ledger.get("ana", "housing").unwrap().current_workload, 0, "mirror is stale");

    let second = back.allocator.assign("housing").unwrap();
    assert!(!second.fallback_required, "ben had free slots: {second:?}");
    assert_eq!(second.selected_counselor_id.as_deref(), Some("ben"));
    assert_eq!(second.attempts, 2);
    assert_eq!(back.ledger.get("ana", "housing").unwrap().current_workload, 1);

    let third = back.allocator.assign("housing").unwrap();
    assert_eq!(third.selected_counselor_id.as_deref(), Some("ben"));
    assert_eq!(third.attempts, 1);

    let _ = std::fs::remove_file(&path);
}

/// A specialization removed by another desk disappears on reload.
#[test]
fn removal_by_another_desk_is_a_lost_pass() {
    let path = temp_db("removed-elsewhere");
    let config = DeskConfig::default_test();
    let front = open_desk(&path, &config);
    let back = open_desk(&path, &config);

    front.ledger.remove_specialization("ana", "housing").unwrap();

    let result = back.allocator.assign("housing").unwrap();
    assert_eq!(result.selected_counselor_id.as_deref(), Some("ben"));
    assert_eq!(result.attempts, 2);
    assert!(back.ledger.get("ana", "housing").is_none());

    let _ = std::fs::remove_file(&path);
}
