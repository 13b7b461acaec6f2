//! Allocation Effector: pick, reserve, retry once, else manual.
//!
//! Uses the fixed test desk:
//!   housing:   ana (primary, 10, rating 5)  -> 100
//!              ben (secondary, 10, rating 5) -> 80
//!              cy  (backup, 5, unrated)      -> 36
//!   financial: ana (secondary, 5, rating 4)  -> 64
//!              dee (primary, 3, unavailable) -> 0

use caseload_core::{
    backend::MemoryBackend,
    desk::Desk,
    error::DeskError,
    event::LedgerEvent,
    validation::SpecializationUpdate,
};
use std::sync::Arc;

fn build() -> Desk {
    Desk::build_test().expect("build test desk")
}

#[test]
fn picks_highest_score_and_reserves() {
    let desk = build();
    let result = desk.allocator.assign("housing").unwrap();

    assert_eq!(result.selected_counselor_id.as_deref(), Some("ana"));
    assert_eq!(result.score, Some(100));
    assert!(!result.fallback_required);
    assert_eq!(result.attempts, 1);
    assert_eq!(desk.ledger.get("ana", "housing").unwrap().current_workload, 1);
}

/// ana drops 10 points per ticket; at 80 she ties ben and wins on tier,
/// at 70 ben takes over.
#[test]
fn load_spreads_as_scores_fall() {
    let desk = build();
    let picks: Vec<String> = (0..4)
        .map(|_| desk.allocator.assign("housing").unwrap().selected_counselor_id.unwrap())
        .collect();
    assert_eq!(picks, vec!["ana", "ana", "ana", "ben"]);
}

#[test]
fn unavailable_primary_is_skipped() {
    let desk = build();
    let result = desk.allocator.assign("financial").unwrap();
    assert_eq!(result.selected_counselor_id.as_deref(), Some("ana"));
    assert_eq!(result.score, Some(64));
}

/// No candidate is a value, not an error.
#[test]
fn empty_category_needs_manual_assignment() {
    let desk = build();
    let result = desk.allocator.assign("wellbeing").unwrap();
    assert!(result.fallback_required);
    assert_eq!(result.selected_counselor_id, None);
    assert_eq!(result.score, None);
    assert_eq!(result.attempts, 0);
}

#[test]
fn exhausted_category_needs_manual_assignment() {
    let desk = build();
    // financial: ana has 5 slots, dee is off.
    for _ in 0..5 {
        assert!(!desk.allocator.assign("financial").unwrap().fallback_required);
    }
    let result = desk.allocator.assign("financial").unwrap();
    assert!(result.fallback_required, "sixth ticket should fall back: {result:?}");
    assert_eq!(desk.ledger.get("ana", "financial").unwrap().current_workload, 5);
}

/// One lost race: re-rank and try again.
#[test]
fn single_lost_race_is_retried() {
    let backend = Arc::new(MemoryBackend::new());
    let desk = Desk::build_test_with(Arc::clone(&backend)).unwrap();
    backend.reject_next_reservations(1);

    let result = desk.allocator.assign("housing").unwrap();
    assert_eq!(result.selected_counselor_id.as_deref(), Some("ana"));
    assert_eq!(result.attempts, 2);
    assert_eq!(desk.ledger.get("ana", "housing").unwrap().current_workload, 1);
}

/// Two lost races: give up and ask for a person, without looping.
#[test]
fn second_lost_race_falls_back() {
    let backend = Arc::new(MemoryBackend::new());
    let desk = Desk::build_test_with(Arc::clone(&backend)).unwrap();
    backend.reject_next_reservations(5);

    let result = desk.allocator.assign("housing").unwrap();
    assert!(result.fallback_required);
    assert_eq!(result.attempts, 2);
    assert_eq!(backend.reservations_persisted(), 0);

    let rejections = desk
        .ledger
        .events()
        .iter()
        .filter(|e| matches!(e, LedgerEvent::ReservationRejected { .. }))
        .count();
    assert_eq!(rejections, 2, "exactly one retry");
}

#[test]
fn backend_failure_is_not_a_fallback() {
    let backend = Arc::new(MemoryBackend::new());
    let desk = Desk::build_test_with(Arc::clone(&backend)).unwrap();
    backend.fail_with("timeout talking to counselor service");

    let err = desk.allocator.assign("housing").unwrap_err();
    assert!(matches!(err, DeskError::Backend(_)), "got {err:?}");
}

/// Ranking is read-only.
#[test]
fn rank_does_not_reserve() {
    let desk = build();
    let ranked = desk.allocator.rank("housing");
    let scores: Vec<u32> = ranked.iter().map(|c| c.score).collect();
    assert_eq!(scores, vec![100, 80, 36]);
    assert!(desk.ledger.snapshot("housing").iter().all(|s| s.current_workload == 0));
}

/// An administrator edit changes the very next decision.
#[test]
fn edits_apply_to_next_assignment() {
    let desk = build();
    desk.ledger
        .update_specialization(
            "ana",
            "housing",
            &SpecializationUpdate { is_available: Some(false), ..Default::default() },
        )
        .unwrap();
    let result = desk.allocator.assign("housing").unwrap();
    assert_eq!(result.selected_counselor_id.as_deref(), Some("ben"));
}
