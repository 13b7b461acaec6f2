//! Ledger events: the audit trail of every mutation the WorkloadLedger
//! performs.
//!
//! RULE: Every mutation of a specialization records exactly one event.
//! Variants are appended, never removed or reordered.

use crate::{
    specialization::PriorityLevel,
    types::{CategoryId, CounselorId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    // ── Administration ─────────────────────────────
    SpecializationAdded {
        at: DateTime<Utc>,
        counselor_id: CounselorId,
        category_id: CategoryId,
        priority_level: PriorityLevel,
        max_workload: u32,
    },
    SpecializationUpdated {
        at: DateTime<Utc>,
        counselor_id: CounselorId,
        category_id: CategoryId,
    },
    SpecializationRemoved {
        at: DateTime<Utc>,
        counselor_id: CounselorId,
        category_id: CategoryId,
        open_workload: u32,
    },

    // ── Workload ───────────────────────────────────
    WorkloadReserved {
        at: DateTime<Utc>,
        counselor_id: CounselorId,
        category_id: CategoryId,
        current_workload: u32,
    },
    WorkloadReleased {
        at: DateTime<Utc>,
        counselor_id: CounselorId,
        category_id: CategoryId,
        current_workload: u32,
    },
    ReleaseUnderflow {
        at: DateTime<Utc>,
        counselor_id: CounselorId,
        category_id: CategoryId,
    },
    ReservationRejected {
        at: DateTime<Utc>,
        counselor_id: CounselorId,
        category_id: CategoryId,
    },
    WorkloadReset {
        at: DateTime<Utc>,
        specializations: usize,
    },
    ManualOverCapacity {
        at: DateTime<Utc>,
        counselor_id: CounselorId,
        category_id: CategoryId,
        current_workload: u32,
        max_workload: u32,
    },
}

impl LedgerEvent {
    /// Stable name, used for the event_type column in ledger_event.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::SpecializationAdded { .. }   => "specialization_added",
            Self::SpecializationUpdated { .. } => "specialization_updated",
            Self::SpecializationRemoved { .. } => "specialization_removed",
            Self::WorkloadReserved { .. }      => "workload_reserved",
            Self::WorkloadReleased { .. }      => "workload_released",
            Self::ReleaseUnderflow { .. }      => "release_underflow",
            Self::ReservationRejected { .. }   => "reservation_rejected",
            Self::WorkloadReset { .. }         => "workload_reset",
            Self::ManualOverCapacity { .. }    => "manual_over_capacity",
        }
    }

    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Self::SpecializationAdded { at, .. }
            | Self::SpecializationUpdated { at, .. }
            | Self::SpecializationRemoved { at, .. }
            | Self::WorkloadReserved { at, .. }
            | Self::WorkloadReleased { at, .. }
            | Self::ReleaseUnderflow { at, .. }
            | Self::ReservationRejected { at, .. }
            | Self::WorkloadReset { at, .. }
            | Self::ManualOverCapacity { at, .. } => *at,
        }
    }
}

/// One persisted row of the ledger_event table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id:          Option<i64>,
    pub event_type:  String,
    pub recorded_at: String,
    pub payload:     String,
}

impl EventLogEntry {
    pub fn from_event(event: &LedgerEvent) -> serde_json::Result<Self> {
        Ok(Self {
            id:          None,
            event_type:  event.type_name().to_string(),
            recorded_at: event.at().to_rfc3339(),
            payload:     serde_json::to_string(event)?,
        })
    }

    pub fn decode(&self) -> serde_json::Result<LedgerEvent> {
        serde_json::from_str(&self.payload)
    }
}
