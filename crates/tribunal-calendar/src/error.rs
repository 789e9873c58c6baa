//! Error types for the calendar subsystem.

use thiserror::Error;
use uuid::Uuid;

/// Errors produced by availability search and reschedule negotiation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScheduleError {
    /// A hearing already has an open reschedule request.
    #[error("hearing {hearing_id} already has a pending reschedule request")]
    PendingRequestExists {
        /// The hearing with the open request.
        hearing_id: String,
    },

    /// The request was already resolved.
    #[error("reschedule request already processed with status {status}")]
    AlreadyProcessed {
        /// The status the request settled in.
        status: String,
    },

    /// The hearing chain has been rescheduled too many times.
    #[error("reschedule limit reached ({count} of {max})")]
    RescheduleLimit {
        /// Reschedules already performed.
        count: u32,
        /// The configured maximum.
        max: u32,
    },

    /// The request arrived too close to the scheduled time.
    #[error("too close to the scheduled time, at least {required_hours}h notice required")]
    NoticeTooShort {
        /// Minimum notice in hours.
        required_hours: i64,
    },

    /// Approval requires a proposed slot matching an available one.
    #[error("no valid slot proposed")]
    SlotNotProposed,

    /// The proposed slot is no longer free.
    #[error("slot is no longer available")]
    SlotUnavailable,

    /// No candidate slot satisfies the scheduling rules.
    #[error("no slot available within the search window")]
    NoSlotAvailable,

    /// The caller may not perform this action on the request.
    #[error("actor {actor_id} may not {action}")]
    NotPermitted {
        /// The offending caller.
        actor_id: Uuid,
        /// The attempted action.
        action: String,
    },

    /// A supplied value failed validation.
    #[error("invalid value: {0}")]
    InvalidValue(String),
}
