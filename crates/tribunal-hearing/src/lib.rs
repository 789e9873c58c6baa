//! # tribunal-hearing — Hearing Domain
//!
//! Domain model for moderated dispute-resolution hearings:
//!
//! - **Error** ([`error`]): Structured error hierarchy for the hearing
//!   subsystem.
//!
//! - **Lifecycle** ([`lifecycle`]): Hearing scheduling and the state
//!   machine through live session, conclusion, cancellation, and
//!   reschedule supersession.
//!
//! - **Participant** ([`participant`]): Roster entries with roles,
//!   confirmation, and presence tracking.
//!
//! - **Speaker** ([`speaker`]): Floor-control settings, the role gate, and
//!   grace windows for in-flight content across setting changes.
//!
//! - **Statement** ([`statement`]): The append-only transcript with
//!   per-type posting quotas and moderator redaction.
//!
//! - **Question** ([`question`]): Directed moderator questions with answer
//!   deadlines and overdue flagging.
//!
//! - **Attendance** ([`attendance`]): Post-session attendance
//!   classification from presence records.
//!
//! - **Policy** ([`policy`]): Fixed scheduling and conduct thresholds.

pub mod attendance;
pub mod error;
pub mod lifecycle;
pub mod participant;
pub mod policy;
pub mod question;
pub mod speaker;
pub mod statement;

// Re-export primary types for ergonomic imports.

// Error types
pub use error::HearingError;

// Hearing lifecycle
pub use lifecycle::{
    Actor, ActorRole, Hearing, HearingId, HearingStatus, HearingTier, TransitionRecord,
};

// Roster
pub use participant::{AttendanceStatus, Participant, ParticipantRole};

// Floor control
pub use speaker::{
    can_speak, can_speak_with_grace, control_for_target, GraceWindow, SpeakerControl,
};

// Transcript
pub use statement::{ensure_within_limit, Statement, StatementId, StatementType};

// Questions
pub use question::{Question, QuestionId, QuestionStatus};

// Attendance
pub use attendance::{classify, required_online_minutes};
