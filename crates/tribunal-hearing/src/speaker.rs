//! # Floor Control
//!
//! The speaker-control gate decides, for the hearing's current floor setting
//! and a participant's role, whether that participant may post content right
//! now. The gate is a pure exhaustive match; there is no string comparison
//! anywhere in the admission path.
//!
//! A floor change may open a short *grace window* during which the previous
//! setting's permissions still apply, so a message composed under the old
//! rule is not rejected a moment after the floor moves. The window is
//! server-enforced and bounded; server-assigned timestamps still order all
//! accepted content.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::participant::ParticipantRole;

// ── Setting ────────────────────────────────────────────────────────────

/// The floor-control setting of a hearing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpeakerControl {
    /// Everyone may post.
    All,
    /// Only the moderator may post.
    ModeratorOnly,
    /// Only the raising party may post.
    RaiserOnly,
    /// Only the defending party may post.
    DefendantOnly,
    /// Nobody may post.
    MutedAll,
}

impl SpeakerControl {
    /// All settings as a slice.
    pub fn all() -> &'static [SpeakerControl] {
        &[
            Self::All,
            Self::ModeratorOnly,
            Self::RaiserOnly,
            Self::DefendantOnly,
            Self::MutedAll,
        ]
    }

    /// The canonical string name of this setting.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::ModeratorOnly => "MODERATOR_ONLY",
            Self::RaiserOnly => "RAISER_ONLY",
            Self::DefendantOnly => "DEFENDANT_ONLY",
            Self::MutedAll => "MUTED_ALL",
        }
    }
}

impl std::fmt::Display for SpeakerControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ── Gate ───────────────────────────────────────────────────────────────

/// Whether `role` may post content under `setting`.
///
/// Exclusive settings admit exactly the named role; the moderator regains
/// the floor by changing the setting, not by bypassing it. The match is
/// exhaustive on both axes: adding a role or a setting will not compile
/// until every combination is decided.
pub fn can_speak(setting: SpeakerControl, role: ParticipantRole) -> bool {
    match setting {
        SpeakerControl::All => true,
        SpeakerControl::ModeratorOnly => matches!(role, ParticipantRole::Moderator),
        SpeakerControl::RaiserOnly => matches!(role, ParticipantRole::Raiser),
        SpeakerControl::DefendantOnly => matches!(role, ParticipantRole::Defendant),
        SpeakerControl::MutedAll => false,
    }
}

// ── Grace window ───────────────────────────────────────────────────────

/// A transitional permission window opened by a floor change.
///
/// While active, content admitted under the *previous* setting is still
/// accepted. Expiry is checked against the server clock on every admission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GraceWindow {
    /// The setting in force before the change.
    pub previous: SpeakerControl,
    /// When the window closes.
    pub expires_at: DateTime<Utc>,
}

impl GraceWindow {
    /// Whether the window is still open at `now`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Gate check honoring an optional grace window.
///
/// Accepts when the current setting admits the role, or when an active
/// window's previous setting would have admitted it.
pub fn can_speak_with_grace(
    setting: SpeakerControl,
    grace: Option<&GraceWindow>,
    role: ParticipantRole,
    now: DateTime<Utc>,
) -> bool {
    if can_speak(setting, role) {
        return true;
    }
    match grace {
        Some(window) if window.is_active(now) => can_speak(window.previous, role),
        _ => false,
    }
}

/// The floor setting that hands the target of a moderator question the floor.
///
/// Witnesses are questioned under an open floor; the main parties get an
/// exclusive setting so the answer is not talked over. Moderators and
/// observers are not valid question targets.
pub fn control_for_target(role: ParticipantRole) -> Option<SpeakerControl> {
    match role {
        ParticipantRole::Raiser => Some(SpeakerControl::RaiserOnly),
        ParticipantRole::Defendant => Some(SpeakerControl::DefendantOnly),
        ParticipantRole::Witness => Some(SpeakerControl::All),
        ParticipantRole::Moderator | ParticipantRole::Observer => None,
    }
}
