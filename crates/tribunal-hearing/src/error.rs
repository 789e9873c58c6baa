//! # Hearing Error Types
//!
//! Structured error hierarchy for the hearing subsystem. Every fallible
//! domain operation returns one of these variants; the HTTP layer maps them
//! onto the API error taxonomy (state violations become conflicts, role
//! violations become forbidden, bounds violations become validation errors).

use thiserror::Error;
use uuid::Uuid;

/// Errors produced by hearing lifecycle, floor control, questions,
/// statements, and attendance operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HearingError {
    /// A status transition was requested that the state machine forbids.
    #[error("invalid transition from {from} to {to}: {reason}")]
    InvalidTransition {
        from: String,
        to: String,
        reason: String,
    },

    /// The hearing is in a terminal state and accepts no further transitions.
    #[error("hearing {hearing_id} is in terminal state {state}")]
    TerminalState { hearing_id: String, state: String },

    /// An operation requires a particular non-terminal state.
    #[error("hearing {hearing_id} is {state}; cannot {action}")]
    WrongState {
        hearing_id: String,
        state: String,
        action: String,
    },

    /// The actor lacks the role or ownership required for the operation.
    #[error("actor {actor_id} may not {action}")]
    NotPermitted { actor_id: Uuid, action: String },

    /// The floor setting does not admit content from this role right now.
    #[error("floor is {setting}; role {role} may not post")]
    FloorClosed { setting: String, role: String },

    /// The user is not on the hearing's roster.
    #[error("user {user_id} is not a participant of hearing {hearing_id}")]
    UnknownParticipant { hearing_id: String, user_id: Uuid },

    /// The question has already been answered or cancelled.
    #[error("question is {status}; {reason}")]
    QuestionNotPending { status: String, reason: String },

    /// The author already published the per-type statement quota.
    #[error("statement limit reached: at most {limit} {statement_type} statements per author")]
    StatementLimit {
        statement_type: String,
        limit: usize,
    },

    /// Redaction is one-way; the statement was already redacted.
    #[error("statement is already redacted")]
    AlreadyRedacted,

    /// Scheduling notice is shorter than policy allows.
    #[error("scheduled time must be at least {required_hours}h in the future")]
    NoticeTooShort { required_hours: i64 },

    /// Start was attempted too far ahead of the scheduled time.
    #[error("hearing cannot start more than {limit} minutes before the scheduled time")]
    TooEarly { limit: i64 },

    /// A field failed bounds or format validation.
    #[error("invalid value: {0}")]
    InvalidValue(String),
}
