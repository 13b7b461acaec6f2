//! Load simulation. Replays synthetic ticket traffic through the real
//! allocator and ledger to see how load spreads across counselors.
//!
//! Each tick, in this order:
//!   1. Open tickets resolve with `resolve_probability` (oldest first).
//!   2. `arrivals_per_tick` tickets arrive, each in a uniformly drawn
//!      category, and go through auto-assignment.
//!   3. The clock advances one hour.
//!
//! Tickets that need manual assignment are counted and dropped; nobody
//! is at the desk to pick them up.

use crate::{
    allocation::Allocator,
    clock::ManualClock,
    config::SimulationConfig,
    error::DeskResult,
    ledger::{ReleaseOutcome, WorkloadLedger},
    reporting::CounselorWorkload,
    rng::{RngStream, SimRng},
    specialization::Category,
    ticket::TicketAssignment,
    types::{CounselorId, Tick},
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::Arc};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub ticks: Tick,
    pub created: u64,
    pub assigned: u64,
    pub fallbacks: u64,
    pub released: u64,
    pub still_open: u64,
    /// Auto-assignments per counselor over the whole run.
    pub assignments_by_counselor: BTreeMap<CounselorId, u64>,
    pub final_workload: Vec<CounselorWorkload>,
}

pub struct LoadSimulation {
    allocator: Allocator,
    clock: Arc<ManualClock>,
    categories: Vec<Category>,
    config: SimulationConfig,
    arrivals: SimRng,
    resolutions: SimRng,
}

impl LoadSimulation {
    /// `ledger` should have been built with `clock` so event timestamps
    /// follow simulated time.
    pub fn new(
        ledger: Arc<WorkloadLedger>,
        clock: Arc<ManualClock>,
        categories: Vec<Category>,
        config: SimulationConfig,
    ) -> Self {
        Self {
            allocator: Allocator::new(ledger),
            clock,
            categories,
            arrivals: SimRng::new(config.seed, RngStream::Arrivals),
            resolutions: SimRng::new(config.seed, RngStream::Resolutions),
            config,
        }
    }

    pub fn run(&mut self) -> DeskResult<SimulationReport> {
        let mut report = SimulationReport {
            ticks: self.config.ticks,
            created: 0,
            assigned: 0,
            fallbacks: 0,
            released: 0,
            still_open: 0,
            assignments_by_counselor: BTreeMap::new(),
            final_workload: Vec::new(),
        };
        let mut open: Vec<TicketAssignment> = Vec::new();

        for tick in 1..=self.config.ticks {
            self.resolve_tickets(&mut open, &mut report)?;
            self.admit_tickets(tick, &mut open, &mut report)?;
            self.clock.advance(chrono::Duration::hours(1));
        }

        report.still_open = open.len() as u64;
        report.final_workload = self.allocator.ledger().workload_overview();
        log::info!(
            "simulation: created={} assigned={} fallbacks={} released={} open={}",
            report.created,
            report.assigned,
            report.fallbacks,
            report.released,
            report.still_open,
        );
        Ok(report)
    }

    fn resolve_tickets(
        &mut self,
        open: &mut Vec<TicketAssignment>,
        report: &mut SimulationReport,
    ) -> DeskResult<()> {
        let mut still_open = Vec::with_capacity(open.len());
        for mut ticket in open.drain(..) {
            if !self.resolutions.chance(self.config.resolve_probability) {
                still_open.push(ticket);
                continue;
            }
            if let ReleaseOutcome::Released { .. } = ticket.release(self.allocator.ledger())? {
                report.released += 1;
            }
        }
        *open = still_open;
        Ok(())
    }

    fn admit_tickets(
        &mut self,
        tick: Tick,
        open: &mut Vec<TicketAssignment>,
        report: &mut SimulationReport,
    ) -> DeskResult<()> {
        if self.categories.is_empty() {
            return Ok(());
        }
        for n in 0..self.config.arrivals_per_tick {
            let idx = self.arrivals.next_u64_below(self.categories.len() as u64) as usize;
            let category = &self.categories[idx];
            let mut ticket =
                TicketAssignment::new(format!("tkt-{tick:06}-{n:03}"), category.category_id.clone());
            report.created += 1;

            let result = ticket.auto_assign(&self.allocator, category)?;
            match result.selected_counselor_id {
                Some(counselor_id) => {
                    report.assigned += 1;
                    *report.assignments_by_counselor.entry(counselor_id).or_default() += 1;
                    open.push(ticket);
                }
                None => report.fallbacks += 1,
            }
        }
        Ok(())
    }
}
