//! Assignment lifecycle of a single ticket.
//!
//!   Unassigned ──auto──▶ Assigned ──release──▶ Released
//!        │                  ▲
//!        └──▶ ManualAssignmentRequired ──manual──┘
//!
//! Released is terminal for that reservation. Reassigning a ticket is a
//! release followed by a new TicketAssignment.

use crate::{
    allocation::{AssignmentResult, Allocator},
    error::{DeskError, DeskResult},
    ledger::{ReleaseOutcome, WorkloadLedger},
    specialization::Category,
    types::{CategoryId, CounselorId, TicketId},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AssignmentState {
    Unassigned,
    ManualAssignmentRequired,
    Assigned { counselor_id: CounselorId },
    Released { counselor_id: CounselorId },
}

impl AssignmentState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unassigned               => "unassigned",
            Self::ManualAssignmentRequired => "manual_assignment_required",
            Self::Assigned { .. }          => "assigned",
            Self::Released { .. }          => "released",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketAssignment {
    pub ticket_id:   TicketId,
    pub category_id: CategoryId,
    pub state:       AssignmentState,
}

impl TicketAssignment {
    pub fn new(ticket_id: impl Into<TicketId>, category_id: impl Into<CategoryId>) -> Self {
        Self {
            ticket_id: ticket_id.into(),
            category_id: category_id.into(),
            state: AssignmentState::Unassigned,
        }
    }

    /// New ticket with a random id.
    pub fn open(category_id: impl Into<CategoryId>) -> Self {
        Self::new(Uuid::new_v4().to_string(), category_id)
    }

    pub fn counselor_id(&self) -> Option<&str> {
        match &self.state {
            AssignmentState::Assigned { counselor_id } => Some(counselor_id),
            _ => None,
        }
    }

    /// Run the scoring pipeline on a freshly created ticket. Categories
    /// with auto-assignment switched off skip straight to manual.
    pub fn auto_assign(&mut self, allocator: &Allocator, category: &Category) -> DeskResult<AssignmentResult> {
        self.expect_state(matches!(self.state, AssignmentState::Unassigned), "auto-assign")?;

        let result = if category.auto_assign {
            allocator.assign(&self.category_id)?
        } else {
            log::debug!("category {} has auto-assign off", category.category_id);
            AssignmentResult::manual(0)
        };

        self.state = match &result.selected_counselor_id {
            Some(counselor_id) => AssignmentState::Assigned { counselor_id: counselor_id.clone() },
            None => AssignmentState::ManualAssignmentRequired,
        };
        Ok(result)
    }

    /// Administrator picks a counselor. Allowed from Unassigned too, for
    /// tickets created while auto-assignment was off.
    pub fn assign_manually(&mut self, ledger: &WorkloadLedger, counselor_id: &str) -> DeskResult<()> {
        self.expect_state(
            matches!(
                self.state,
                AssignmentState::Unassigned | AssignmentState::ManualAssignmentRequired
            ),
            "assign manually",
        )?;
        ledger.reserve_manual(counselor_id, &self.category_id)?;
        self.state = AssignmentState::Assigned { counselor_id: counselor_id.to_string() };
        Ok(())
    }

    /// Ticket resolved, closed or handed to someone else.
    pub fn release(&mut self, ledger: &WorkloadLedger) -> DeskResult<ReleaseOutcome> {
        let AssignmentState::Assigned { counselor_id } = &self.state else {
            return Err(self.invalid("release"));
        };
        let counselor_id = counselor_id.clone();
        let outcome = ledger.release(&counselor_id, &self.category_id)?;
        self.state = AssignmentState::Released { counselor_id };
        Ok(outcome)
    }

    fn expect_state(&self, ok: bool, action: &'static str) -> DeskResult<()> {
        if ok {
            Ok(())
        } else {
            Err(self.invalid(action))
        }
    }

    fn invalid(&self, action: &'static str) -> DeskError {
        DeskError::InvalidTransition {
            ticket_id: self.ticket_id.clone(),
            from: self.state.name().to_string(),
            action,
        }
    }
}
