//! Allocation Effector. Turns a ranking into a reservation.
//!
//! A ranked score is only valid for the snapshot it came from. The
//! reservation goes back through the ledger, which re-checks capacity
//! under the specialization lock. One lost race earns one re-rank;
//! a second loss ends in manual assignment instead of a retry loop.
//!
//! Callers who abandon a successful result must release the reservation
//! themselves.

use crate::{
    error::{DeskError, DeskResult},
    ledger::{ReserveOutcome, WorkloadLedger},
    ranker::{best_available, rank_candidates, RankedCandidate},
    types::CounselorId,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Ranking passes per `assign` call: the first plus one retry.
pub const MAX_RANKING_PASSES: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentResult {
    pub selected_counselor_id: Option<CounselorId>,
    pub score: Option<u32>,
    /// True when no counselor could be reserved; a person must assign.
    pub fallback_required: bool,
    /// Ranking passes used (0 when nothing was ever ranked).
    pub attempts: u32,
}

impl AssignmentResult {
    fn selected(candidate: &RankedCandidate, attempts: u32) -> Self {
        Self {
            selected_counselor_id: Some(candidate.counselor_id().to_string()),
            score: Some(candidate.score),
            fallback_required: false,
            attempts,
        }
    }

    pub fn manual(attempts: u32) -> Self {
        Self {
            selected_counselor_id: None,
            score: None,
            fallback_required: true,
            attempts,
        }
    }
}

pub struct Allocator {
    ledger: Arc<WorkloadLedger>,
}

impl Allocator {
    pub fn new(ledger: Arc<WorkloadLedger>) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &WorkloadLedger {
        &self.ledger
    }

    /// Ranked view of a category from the current snapshot. Read-only.
    pub fn rank(&self, category_id: &str) -> Vec<RankedCandidate> {
        rank_candidates(&self.ledger.snapshot(category_id), category_id)
    }

    /// Pick and reserve the best available counselor for `category_id`.
    pub fn assign(&self, category_id: &str) -> DeskResult<AssignmentResult> {
        let mut attempts = 0;
        while attempts < MAX_RANKING_PASSES {
            let snapshot = self.ledger.snapshot(category_id);
            let Some(candidate) = best_available(&snapshot, category_id) else {
                break;
            };
            attempts += 1;

            if self.try_reserve(&candidate, category_id)? {
                log::debug!(
                    "assigned {category_id} to {} (score {}, pass {attempts})",
                    candidate.counselor_id(),
                    candidate.score
                );
                return Ok(AssignmentResult::selected(&candidate, attempts));
            }
        }

        log::info!("no counselor available for {category_id}; manual assignment required");
        Ok(AssignmentResult::manual(attempts))
    }

    /// Reserve a ranked candidate. `Ok(false)` is a lost pass: the slot
    /// filled, the counselor opted out, or the specialization was removed
    /// after the snapshot was taken.
    ///
    /// A backend refusal means the mirror is behind another writer, so
    /// the category is reloaded before the next pass ranks it again.
    fn try_reserve(&self, candidate: &RankedCandidate, category_id: &str) -> DeskResult<bool> {
        let counselor_id = candidate.counselor_id();
        match self.ledger.reserve(counselor_id, category_id) {
            Ok(outcome) if outcome.is_reserved() => Ok(true),
            Ok(ReserveOutcome::Rejected) => {
                log::debug!("lost reservation for {counselor_id} in {category_id}; reloading");
                self.ledger.load_category(category_id)?;
                Ok(false)
            }
            Ok(outcome) => {
                log::debug!("lost reservation for {counselor_id} in {category_id}: {outcome:?}");
                Ok(false)
            }
            Err(DeskError::SpecializationNotFound { .. }) => {
                log::debug!("{counselor_id} left {category_id} before the reservation");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}
