//! # tribunal-calendar — Time Negotiation
//!
//! Availability search and reschedule negotiation for hearings:
//!
//! - **Error** ([`error`]): Structured error hierarchy for the calendar
//!   subsystem.
//!
//! - **Rule** ([`rule`]): The scheduling rules consulted by search and
//!   negotiation, covering the working calendar, spacing, and limits.
//!
//! - **Allocator** ([`allocator`]): Grid-based availability search with
//!   hard constraints and soft ranking.
//!
//! - **Negotiation** ([`negotiation`]): The reschedule request lifecycle
//!   from opening through single-shot resolution.

pub mod allocator;
pub mod error;
pub mod negotiation;
pub mod rule;

// Re-export primary types for ergonomic imports.

// Error types
pub use error::ScheduleError;

// Rules
pub use rule::ScheduleRule;

// Availability search
pub use allocator::{
    find_slots, score_slot, slot_is_offered, BusyInterval, SlotCandidate, SlotQuery,
    SCORE_LUNCH_OVERLAP, SCORE_OUTSIDE_HOURS, SCORE_PREFERRED,
};

// Negotiation
pub use negotiation::{RescheduleRequest, RescheduleRequestId, RescheduleStatus};
