use crate::types::{CategoryId, CounselorId, TicketId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One field-level validation message for administrator input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field:   String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self { field: field.to_string(), message: message.into() }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Error, Debug)]
pub enum DeskError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Validation failed: {}", join_fields(.0))]
    Validation(Vec<FieldError>),

    #[error("No specialization for counselor '{counselor_id}' in category '{category_id}'")]
    SpecializationNotFound { counselor_id: CounselorId, category_id: CategoryId },

    #[error("Counselor '{counselor_id}' already holds a specialization in category '{category_id}'")]
    DuplicateSpecialization { counselor_id: CounselorId, category_id: CategoryId },

    #[error("Category '{category_id}' not found")]
    CategoryNotFound { category_id: CategoryId },

    #[error("Ticket '{ticket_id}' cannot {action} while {from}")]
    InvalidTransition { ticket_id: TicketId, from: String, action: &'static str },

    /// Failures reported by the persistence collaborator, passed through as-is.
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

fn join_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type DeskResult<T> = Result<T, DeskError>;
