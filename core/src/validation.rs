//! Validation of administrator input.
//!
//! RULE: Nothing reaches the ledger (or the scoring function) without
//! passing through here first. All problems are collected, not just the
//! first one, so a form can show every field-level message at once.

use crate::{
    error::FieldError,
    specialization::{
        PriorityLevel, Specialization, DEFAULT_EXPERTISE_RATING, MAX_EXPERTISE_RATING,
        MAX_MAX_WORKLOAD, MIN_EXPERTISE_RATING, MIN_MAX_WORKLOAD,
    },
};
use serde::{Deserialize, Serialize};

/// Default capacity offered by the assignment form.
pub const DEFAULT_MAX_WORKLOAD: u32 = 10;

/// Raw "assign counselor to category" input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpecializationDraft {
    #[serde(default)]
    pub counselor_id: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub priority_level: Option<String>,
    #[serde(default)]
    pub max_workload: Option<i64>,
    #[serde(default)]
    pub expertise_rating: Option<i64>,
    #[serde(default)]
    pub is_available: Option<bool>,
}

impl SpecializationDraft {
    pub fn new(counselor_id: &str, category_id: &str) -> Self {
        Self {
            counselor_id: Some(counselor_id.to_string()),
            category_id: Some(category_id.to_string()),
            ..Self::default()
        }
    }

    pub fn priority(mut self, level: &str) -> Self {
        self.priority_level = Some(level.to_string());
        self
    }

    pub fn capacity(mut self, max_workload: i64) -> Self {
        self.max_workload = Some(max_workload);
        self
    }

    pub fn rating(mut self, rating: i64) -> Self {
        self.expertise_rating = Some(rating);
        self
    }

    pub fn available(mut self, is_available: bool) -> Self {
        self.is_available = Some(is_available);
        self
    }

    /// Check every field and build a fresh specialization with zero load.
    pub fn validate(&self) -> Result<Specialization, Vec<FieldError>> {
        let mut errors = Vec::new();

        let counselor_id = required_id(&mut errors, "counselor_id", self.counselor_id.as_deref());
        let category_id = required_id(&mut errors, "category_id", self.category_id.as_deref());
        let priority_level = match self.priority_level.as_deref() {
            None => PriorityLevel::Primary,
            Some(raw) => check_priority(&mut errors, raw).unwrap_or(PriorityLevel::Primary),
        };
        let max_workload = match self.max_workload {
            None => DEFAULT_MAX_WORKLOAD,
            Some(raw) => check_max_workload(&mut errors, raw).unwrap_or(DEFAULT_MAX_WORKLOAD),
        };
        let expertise_rating = match self.expertise_rating {
            None => DEFAULT_EXPERTISE_RATING,
            Some(raw) => check_rating(&mut errors, raw).unwrap_or(DEFAULT_EXPERTISE_RATING),
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Specialization {
            counselor_id,
            category_id,
            priority_level,
            max_workload,
            current_workload: 0,
            is_available: self.is_available.unwrap_or(true),
            expertise_rating: Some(expertise_rating),
        })
    }
}

/// Partial administrator edit of an existing specialization.
/// Workload itself is never editable here; use the ledger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpecializationUpdate {
    #[serde(default)]
    pub priority_level: Option<String>,
    #[serde(default)]
    pub max_workload: Option<i64>,
    #[serde(default)]
    pub is_available: Option<bool>,
    #[serde(default)]
    pub expertise_rating: Option<i64>,
}

impl SpecializationUpdate {
    pub fn is_empty(&self) -> bool {
        self.priority_level.is_none()
            && self.max_workload.is_none()
            && self.is_available.is_none()
            && self.expertise_rating.is_none()
    }

    /// Returns the edited record, leaving `current` untouched.
    pub fn apply_to(&self, current: &Specialization) -> Result<Specialization, Vec<FieldError>> {
        let mut errors = Vec::new();
        let mut next = current.clone();

        if let Some(raw) = self.priority_level.as_deref() {
            if let Some(level) = check_priority(&mut errors, raw) {
                next.priority_level = level;
            }
        }
        if let Some(raw) = self.max_workload {
            if let Some(max) = check_max_workload(&mut errors, raw) {
                next.max_workload = max;
            }
        }
        if let Some(raw) = self.expertise_rating {
            if let Some(rating) = check_rating(&mut errors, raw) {
                next.expertise_rating = Some(rating);
            }
        }
        if let Some(flag) = self.is_available {
            next.is_available = flag;
        }

        if errors.is_empty() {
            Ok(next)
        } else {
            Err(errors)
        }
    }
}

fn required_id(errors: &mut Vec<FieldError>, field: &str, raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => {
            errors.push(FieldError::new(field, "is required"));
            String::new()
        }
    }
}

fn check_priority(errors: &mut Vec<FieldError>, raw: &str) -> Option<PriorityLevel> {
    let level = PriorityLevel::parse(raw);
    if level.is_none() {
        errors.push(FieldError::new(
            "priority_level",
            format!("'{raw}' is not one of primary, secondary, backup"),
        ));
    }
    level
}

fn check_max_workload(errors: &mut Vec<FieldError>, raw: i64) -> Option<u32> {
    let range = i64::from(MIN_MAX_WORKLOAD)..=i64::from(MAX_MAX_WORKLOAD);
    if range.contains(&raw) {
        Some(raw as u32)
    } else {
        errors.push(FieldError::new(
            "max_workload",
            format!("must be between {MIN_MAX_WORKLOAD} and {MAX_MAX_WORKLOAD}, got {raw}"),
        ));
        None
    }
}

fn check_rating(errors: &mut Vec<FieldError>, raw: i64) -> Option<u8> {
    let range = i64::from(MIN_EXPERTISE_RATING)..=i64::from(MAX_EXPERTISE_RATING);
    if range.contains(&raw) {
        Some(raw as u8)
    } else {
        errors.push(FieldError::new(
            "expertise_rating",
            format!("must be between {MIN_EXPERTISE_RATING} and {MAX_EXPERTISE_RATING}, got {raw}"),
        ));
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_every_field_error() {
        let draft = SpecializationDraft {
            counselor_id: Some("  ".into()),
            category_id: None,
            priority_level: Some("lead".into()),
            max_workload: Some(51),
            expertise_rating: Some(0),
            is_available: None,
        };
        let errors = draft.validate().unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["counselor_id", "category_id", "priority_level", "max_workload", "expertise_rating"]
        );
    }

    #[test]
    fn draft_defaults_match_assignment_form() {
        let spec = SpecializationDraft::new("c-1", "housing").validate().unwrap();
        assert_eq!(spec.priority_level, PriorityLevel::Primary);
        assert_eq!(spec.max_workload, DEFAULT_MAX_WORKLOAD);
        assert_eq!(spec.expertise_rating, Some(DEFAULT_EXPERTISE_RATING));
        assert!(spec.is_available);
        assert_eq!(spec.current_workload, 0);
    }

    #[test]
    fn capacity_bounds_are_inclusive() {
        assert!(SpecializationDraft::new("c", "k").capacity(1).validate().is_ok());
        assert!(SpecializationDraft::new("c", "k").capacity(50).validate().is_ok());
        assert!(SpecializationDraft::new("c", "k").capacity(0).validate().is_err());
    }

    #[test]
    fn update_keeps_workload_and_rejects_bad_rating() {
        let current = Specialization::new("c-1", "housing", PriorityLevel::Primary, 10).with_workload(4);
        let edit = SpecializationUpdate {
            priority_level: Some("Backup".into()),
            max_workload: Some(3),
            ..Default::default()
        };
        let next = edit.apply_to(&current).unwrap();
        assert_eq!(next.priority_level, PriorityLevel::Backup);
        assert_eq!(next.max_workload, 3);
        assert_eq!(next.current_workload, 4);

        let bad = SpecializationUpdate { expertise_rating: Some(9), ..Default::default() };
        assert_eq!(bad.apply_to(&current).unwrap_err()[0].field, "expertise_rating");
    }
}
