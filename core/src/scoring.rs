//! Availability filter and assignment score.
//!
//! Both are pure functions over a Specialization snapshot: no clock, no
//! randomness, no ledger access. A score is only a hint; capacity is
//! re-checked by `WorkloadLedger::reserve` before anything is committed.
//!
//! The score is multiplicative:
//!   availability × priority weight × expertise weight × 100
//! so a factor at its floor drags the whole score down with it.

use crate::specialization::{Specialization, MAX_EXPERTISE_RATING};

/// True iff the counselor opted in and has at least one free slot.
pub fn can_take_ticket(spec: &Specialization) -> bool {
    spec.is_available && spec.current_workload < spec.max_workload
}

/// Share of declared capacity in use, as a percentage rounded to one decimal.
pub fn utilization_rate(current_workload: u32, max_workload: u32) -> f64 {
    if max_workload == 0 {
        return 0.0;
    }
    let pct = f64::from(current_workload) / f64::from(max_workload) * 100.0;
    (pct * 10.0).round() / 10.0
}

/// Composite score in [0, 100]. Zero whenever `can_take_ticket` is false.
pub fn assignment_score(spec: &Specialization) -> u32 {
    if !can_take_ticket(spec) {
        return 0;
    }
    let availability = (100.0 - utilization_rate(spec.current_workload, spec.max_workload)) / 100.0;
    let priority = spec.priority_level.weight();
    let expertise = f64::from(spec.expertise()) / f64::from(MAX_EXPERTISE_RATING);

    let raw = (availability * priority * expertise * 100.0).round();
    raw.clamp(0.0, 100.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::specialization::PriorityLevel;

    fn spec(priority: PriorityLevel, max: u32, current: u32, rating: u8) -> Specialization {
        Specialization::new("c-1", "housing", priority, max)
            .with_workload(current)
            .with_rating(Some(rating))
    }

    #[test]
    fn idle_primary_expert_scores_full() {
        assert_eq!(assignment_score(&spec(PriorityLevel::Primary, 10, 0, 5)), 100);
    }

    #[test]
    fn half_loaded_primary_scores_fifty() {
        assert_eq!(utilization_rate(5, 10), 50.0);
        assert_eq!(assignment_score(&spec(PriorityLevel::Primary, 10, 5, 5)), 50);
    }

    #[test]
    fn half_loaded_backup_scores_thirty() {
        assert_eq!(assignment_score(&spec(PriorityLevel::Backup, 10, 5, 5)), 30);
    }

    #[test]
    fn opted_out_counselor_scores_zero() {
        let s = spec(PriorityLevel::Primary, 10, 0, 5).with_availability(false);
        assert!(!can_take_ticket(&s));
        assert_eq!(assignment_score(&s), 0);
    }

    #[test]
    fn full_capacity_is_not_available() {
        let s = spec(PriorityLevel::Primary, 3, 3, 5);
        assert!(!can_take_ticket(&s));
        assert_eq!(assignment_score(&s), 0);
    }

    #[test]
    fn over_capacity_scores_zero() {
        assert_eq!(assignment_score(&spec(PriorityLevel::Primary, 3, 7, 5)), 0);
    }

    #[test]
    fn unrated_counts_as_three() {
        let unrated = spec(PriorityLevel::Primary, 10, 0, 5).with_rating(None);
        let zero = spec(PriorityLevel::Primary, 10, 0, 5).with_rating(Some(0));
        assert_eq!(assignment_score(&unrated), 60);
        assert_eq!(assignment_score(&zero), 60);
    }

    #[test]
    fn unrecognized_tier_weighs_half() {
        assert_eq!(assignment_score(&spec(PriorityLevel::Unrecognized, 10, 0, 5)), 50);
    }

    #[test]
    fn utilization_rounds_to_one_decimal() {
        assert_eq!(utilization_rate(1, 3), 33.3);
        assert_eq!(utilization_rate(2, 3), 66.7);
        assert_eq!(utilization_rate(4, 0), 0.0);
    }
}
