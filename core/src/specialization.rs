//! Specialization records: the binding between one counselor and one
//! ticket category, with the capacity/priority/rating metadata used to
//! pick who gets the next ticket.
//!
//! RULE: current_workload is only mutated through the WorkloadLedger.

use crate::types::{CategoryId, CounselorId};
use serde::{Deserialize, Serialize};

/// Expertise assumed for counselors who were never rated.
pub const DEFAULT_EXPERTISE_RATING: u8 = 3;
pub const MIN_EXPERTISE_RATING: u8 = 1;
pub const MAX_EXPERTISE_RATING: u8 = 5;

pub const MIN_MAX_WORKLOAD: u32 = 1;
pub const MAX_MAX_WORKLOAD: u32 = 50;

/// Declared preference tier of a counselor within a category.
///
/// Records coming back from the backend may carry a tier this build does
/// not know; those deserialize to `Unrecognized` and score with the lowest
/// weight. Administrator input never produces it (see validation.rs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityLevel {
    Primary,
    Secondary,
    Backup,
    #[serde(other)]
    Unrecognized,
}

impl PriorityLevel {
    /// Multiplicative weight applied by the assignment score.
    pub fn weight(&self) -> f64 {
        match self {
            Self::Primary      => 1.0,
            Self::Secondary    => 0.8,
            Self::Backup       => 0.6,
            Self::Unrecognized => 0.5,
        }
    }

    /// Tie-break order among equal scores. Lower ranks first.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Primary      => 0,
            Self::Secondary    => 1,
            Self::Backup       => 2,
            Self::Unrecognized => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary      => "primary",
            Self::Secondary    => "secondary",
            Self::Backup       => "backup",
            Self::Unrecognized => "unrecognized",
        }
    }

    /// Strict parse for administrator input. Unknown tiers are rejected
    /// rather than mapped to `Unrecognized`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "primary"   => Some(Self::Primary),
            "secondary" => Some(Self::Secondary),
            "backup"    => Some(Self::Backup),
            _           => None,
        }
    }

    /// Lenient decode for persisted rows.
    pub fn from_stored(raw: &str) -> Self {
        Self::parse(raw).unwrap_or(Self::Unrecognized)
    }
}

impl std::fmt::Display for PriorityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Specialization {
    pub counselor_id:     CounselorId,
    pub category_id:      CategoryId,
    pub priority_level:   PriorityLevel,
    pub max_workload:     u32,
    pub current_workload: u32,
    pub is_available:     bool,
    /// `None` (or a stored 0) means unrated; see `expertise()`.
    #[serde(default)]
    pub expertise_rating: Option<u8>,
}

impl Specialization {
    pub fn new(
        counselor_id: impl Into<CounselorId>,
        category_id: impl Into<CategoryId>,
        priority_level: PriorityLevel,
        max_workload: u32,
    ) -> Self {
        Self {
            counselor_id: counselor_id.into(),
            category_id: category_id.into(),
            priority_level,
            max_workload,
            current_workload: 0,
            is_available: true,
            expertise_rating: Some(DEFAULT_EXPERTISE_RATING),
        }
    }

    pub fn with_workload(mut self, current_workload: u32) -> Self {
        self.current_workload = current_workload;
        self
    }

    pub fn with_rating(mut self, rating: Option<u8>) -> Self {
        self.expertise_rating = rating;
        self
    }

    pub fn with_availability(mut self, is_available: bool) -> Self {
        self.is_available = is_available;
        self
    }

    /// Effective expertise rating. Unrated counselors count as average.
    pub fn expertise(&self) -> u8 {
        self.expertise_rating
            .filter(|r| *r > 0)
            .unwrap_or(DEFAULT_EXPERTISE_RATING)
    }

    pub fn remaining_capacity(&self) -> u32 {
        self.max_workload.saturating_sub(self.current_workload)
    }

    pub fn key(&self) -> SpecializationKey {
        SpecializationKey::new(&self.counselor_id, &self.category_id)
    }
}

/// Uniqueness key: a counselor holds at most one specialization per category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpecializationKey {
    pub counselor_id: CounselorId,
    pub category_id:  CategoryId,
}

impl SpecializationKey {
    pub fn new(counselor_id: &str, category_id: &str) -> Self {
        Self {
            counselor_id: counselor_id.to_string(),
            category_id:  category_id.to_string(),
        }
    }
}

/// A ticket category as owned by the help/ticket subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub category_id: CategoryId,
    pub name: String,
    /// Whether scoring runs automatically when a ticket is created.
    #[serde(default = "default_auto_assign")]
    pub auto_assign: bool,
    /// Carried for round-tripping only; crisis detection is not handled here.
    #[serde(default)]
    pub crisis_detection_enabled: bool,
}

fn default_auto_assign() -> bool {
    true
}

impl Category {
    pub fn new(category_id: impl Into<CategoryId>, name: impl Into<String>) -> Self {
        Self {
            category_id: category_id.into(),
            name: name.into(),
            auto_assign: true,
            crisis_detection_enabled: false,
        }
    }
}
