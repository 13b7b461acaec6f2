//! Candidate ranking for a single category.
//!
//! Ordering is total and reproducible:
//!   1. score, descending
//!   2. priority tier (primary, secondary, backup, unrecognized)
//!   3. current_workload, ascending
//!   4. counselor_id, ascending
//!
//! Priority is a soft weight inside the score, not a hard key ahead of
//! it: a well-rested secondary can outrank a swamped primary.

use crate::{
    scoring::assignment_score,
    specialization::Specialization,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub specialization: Specialization,
    pub score: u32,
}

impl RankedCandidate {
    pub fn counselor_id(&self) -> &str {
        &self.specialization.counselor_id
    }
}

/// Rank every specialization of `category_id` found in `specs`.
/// Specializations of other categories are ignored.
pub fn rank_candidates(specs: &[Specialization], category_id: &str) -> Vec<RankedCandidate> {
    let mut ranked: Vec<RankedCandidate> = specs
        .iter()
        .filter(|s| s.category_id == category_id)
        .map(|s| RankedCandidate {
            score: assignment_score(s),
            specialization: s.clone(),
        })
        .collect();
    ranked.sort_by(compare_candidates);
    ranked
}

/// First ranked candidate with a positive score, if any.
pub fn best_available(specs: &[Specialization], category_id: &str) -> Option<RankedCandidate> {
    rank_candidates(specs, category_id)
        .into_iter()
        .next()
        .filter(|c| c.score > 0)
}

fn compare_candidates(a: &RankedCandidate, b: &RankedCandidate) -> Ordering {
    let (sa, sb) = (&a.specialization, &b.specialization);
    b.score
        .cmp(&a.score)
        .then_with(|| sa.priority_level.rank().cmp(&sb.priority_level.rank()))
        .then_with(|| sa.current_workload.cmp(&sb.current_workload))
        .then_with(|| sa.counselor_id.cmp(&sb.counselor_id))
}
