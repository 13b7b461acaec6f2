//! Workload aggregates for the admin dashboards.
//!
//! Pure functions over ledger snapshots.

use crate::{
    ranker::best_available,
    scoring::{can_take_ticket, utilization_rate},
    specialization::Specialization,
    types::{CategoryId, CounselorId},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One counselor's load summed over every category they cover.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounselorWorkload {
    pub counselor_id:     CounselorId,
    pub categories:       usize,
    pub current_workload: u32,
    pub max_workload:     u32,
    pub utilization_rate: f64,
}

/// How well a category is staffed right now.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCoverage {
    pub category_id:         CategoryId,
    pub counselors:          usize,
    pub available_counselors: usize,
    pub remaining_capacity:  u32,
    pub best_score:          Option<u32>,
}

/// Per-counselor totals, ordered by counselor id.
pub fn workload_overview(specs: &[Specialization]) -> Vec<CounselorWorkload> {
    let mut by_counselor: BTreeMap<&str, (usize, u32, u32)> = BTreeMap::new();
    for spec in specs {
        let entry = by_counselor.entry(spec.counselor_id.as_str()).or_default();
        entry.0 += 1;
        entry.1 += spec.current_workload;
        entry.2 += spec.max_workload;
    }
    by_counselor
        .into_iter()
        .map(|(id, (categories, current, max))| CounselorWorkload {
            counselor_id: id.to_string(),
            categories,
            current_workload: current,
            max_workload: max,
            utilization_rate: utilization_rate(current, max),
        })
        .collect()
}

pub fn category_coverage(category_id: &str, specs: &[Specialization]) -> CategoryCoverage {
    let in_category: Vec<&Specialization> =
        specs.iter().filter(|s| s.category_id == category_id).collect();
    let available: Vec<&&Specialization> =
        in_category.iter().filter(|s| can_take_ticket(s)).collect();

    CategoryCoverage {
        category_id: category_id.to_string(),
        counselors: in_category.len(),
        available_counselors: available.len(),
        remaining_capacity: available.iter().map(|s| s.remaining_capacity()).sum(),
        best_score: best_available(specs, category_id).map(|c| c.score),
    }
}
