//! # Hearing Participants
//!
//! Roster entries for a hearing: role assignment, attendance confirmation,
//! live presence, and the attendance classification computed at conclusion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Roles ──────────────────────────────────────────────────────────────

/// The role a participant holds within one hearing.
///
/// Roles are fixed once the hearing starts. The floor-control gate in
/// [`crate::speaker`] matches exhaustively over this enum, so adding a role
/// forces a review of every gating rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParticipantRole {
    /// Runs the session: controls the floor, asks questions, concludes.
    Moderator,
    /// The party that raised the dispute.
    Raiser,
    /// The party the dispute was raised against.
    Defendant,
    /// Gives testimony when the floor permits.
    Witness,
    /// May watch but never posts content.
    Observer,
}

impl ParticipantRole {
    /// All roles as a slice.
    pub fn all() -> &'static [ParticipantRole] {
        &[
            Self::Moderator,
            Self::Raiser,
            Self::Defendant,
            Self::Witness,
            Self::Observer,
        ]
    }

    /// The canonical string name of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Moderator => "MODERATOR",
            Self::Raiser => "RAISER",
            Self::Defendant => "DEFENDANT",
            Self::Witness => "WITNESS",
            Self::Observer => "OBSERVER",
        }
    }
}

impl std::fmt::Display for ParticipantRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ── Attendance classification ──────────────────────────────────────────

/// Per-participant attendance verdict, assigned when the hearing concludes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendanceStatus {
    /// Joined at or before the session start.
    OnTime,
    /// Joined within the lateness threshold after start.
    Late,
    /// Joined beyond the lateness threshold.
    VeryLate,
    /// Never joined, or was online for less than the required fraction.
    NoShow,
    /// The hearing never reached `IN_PROGRESS`.
    NotStarted,
}

impl AttendanceStatus {
    /// The canonical string name of this classification.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnTime => "ON_TIME",
            Self::Late => "LATE",
            Self::VeryLate => "VERY_LATE",
            Self::NoShow => "NO_SHOW",
            Self::NotStarted => "NOT_STARTED",
        }
    }
}

impl std::fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ── Participant ────────────────────────────────────────────────────────

/// A roster entry on one hearing.
///
/// Presence fields (`online`, `joined_at`, `last_seen_at`,
/// `total_online_minutes`) are maintained by the hearing aggregate while the
/// session is live; `attendance` is written exactly once at conclusion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    /// The user this entry belongs to.
    pub user_id: Uuid,
    /// Role within the hearing.
    pub role: ParticipantRole,
    /// Whether the participant confirmed they will attend.
    pub confirmed: bool,
    /// When attendance was confirmed.
    pub confirmed_at: Option<DateTime<Utc>>,
    /// Whether the participant is currently in the session room.
    pub online: bool,
    /// First join timestamp, if the participant ever joined.
    pub joined_at: Option<DateTime<Utc>>,
    /// Last presence change timestamp.
    pub last_seen_at: Option<DateTime<Utc>>,
    /// Accumulated online time across paired join/leave intervals.
    pub total_online_minutes: i64,
    /// Attendance verdict, set when the hearing concludes.
    pub attendance: Option<AttendanceStatus>,
}

impl Participant {
    /// Create a fresh roster entry with no presence history.
    pub fn new(user_id: Uuid, role: ParticipantRole) -> Self {
        Self {
            user_id,
            role,
            confirmed: false,
            confirmed_at: None,
            online: false,
            joined_at: None,
            last_seen_at: None,
            total_online_minutes: 0,
            attendance: None,
        }
    }
}
