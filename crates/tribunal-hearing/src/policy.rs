//! # Hearing Policy Constants
//!
//! Numeric policy knobs for the hearing lifecycle. These mirror the
//! operational defaults the tribunal operates under; deployment-specific
//! overrides (grace window length, default question deadline) live in the
//! API configuration layer.

/// Minimum notice, in hours, between scheduling a hearing and its start.
pub const MIN_NOTICE_HOURS: i64 = 24;

/// Minimum notice for emergency hearings, in hours.
pub const EMERGENCY_MIN_NOTICE_HOURS: i64 = 1;

/// How many minutes before the scheduled time a hearing may be started.
pub const EARLY_START_BUFFER_MINUTES: i64 = 15;

/// Maximum published statements per author per statement type.
pub const MAX_STATEMENTS_PER_TYPE: usize = 3;

/// Minimum fraction of the hearing a participant must be online to avoid
/// a no-show classification.
pub const MIN_ATTENDANCE_RATIO: f64 = 0.5;

/// Lateness boundary, in minutes, between `Late` and `VeryLate`.
pub const LATE_THRESHOLD_MINUTES: i64 = 15;

/// Lower clamp bound for question answer deadlines, in minutes.
pub const QUESTION_DEADLINE_MIN_MINUTES: i64 = 1;

/// Upper clamp bound for question answer deadlines, in minutes.
pub const QUESTION_DEADLINE_MAX_MINUTES: i64 = 60;

/// Default speaker-control grace window, in seconds.
pub const GRACE_WINDOW_DEFAULT_SECONDS: u64 = 5;

/// Maximum configurable speaker-control grace window, in seconds.
pub const GRACE_WINDOW_MAX_SECONDS: u64 = 10;
