//! Shared primitive types used across the assignment core.

/// Identifier of a staff member (counselor or advisor).
pub type CounselorId = String;

/// Identifier of a ticket category.
pub type CategoryId = String;

/// Identifier of a help ticket.
pub type TicketId = String;

/// A load-simulation tick. One tick = one arrival/resolution round.
pub type Tick = u64;
