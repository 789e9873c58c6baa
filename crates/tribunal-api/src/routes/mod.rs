//! # API Route Modules
//!
//! Route modules for the Tribunal API surface:
//!
//! - `hearings` — Hearing scheduling and lifecycle transitions, floor
//!   control, attendance confirmation, and presence signals.
//! - `statements` — Transcript entries gated by the floor setting, and
//!   moderator redaction.
//! - `questions` — Directed moderator questions with answer deadlines.
//! - `reschedule` — Reschedule request negotiation and resolution.
//! - `calendar` — Availability search over moderator calendars and the
//!   active scheduling rules.

pub mod calendar;
pub mod hearings;
pub mod questions;
pub mod reschedule;
pub mod statements;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use tribunal_calendar::BusyInterval;
use tribunal_hearing::{Actor, ActorRole, HearingStatus, ParticipantRole, SpeakerControl};

use crate::error::AppError;
use crate::state::AppState;

/// Parse a system role from its wire form.
pub(crate) fn parse_actor_role(s: &str) -> Result<ActorRole, AppError> {
    match s {
        "admin" => Ok(ActorRole::Admin),
        "staff" => Ok(ActorRole::Staff),
        "member" => Ok(ActorRole::Member),
        other => Err(AppError::Validation(format!(
            "unknown actor role: '{other}'"
        ))),
    }
}

/// Build the acting user from request fields.
pub(crate) fn parse_actor(actor_id: Uuid, actor_role: &str) -> Result<Actor, AppError> {
    Ok(Actor::new(actor_id, parse_actor_role(actor_role)?))
}

/// Parse a hearing role from its wire form.
pub(crate) fn parse_participant_role(s: &str) -> Result<ParticipantRole, AppError> {
    match s {
        "moderator" => Ok(ParticipantRole::Moderator),
        "raiser" => Ok(ParticipantRole::Raiser),
        "defendant" => Ok(ParticipantRole::Defendant),
        "witness" => Ok(ParticipantRole::Witness),
        "observer" => Ok(ParticipantRole::Observer),
        other => Err(AppError::Validation(format!(
            "unknown participant role: '{other}'"
        ))),
    }
}

/// Parse a floor-control setting from its wire form.
pub(crate) fn parse_speaker_control(s: &str) -> Result<SpeakerControl, AppError> {
    match s {
        "all" => Ok(SpeakerControl::All),
        "moderator_only" => Ok(SpeakerControl::ModeratorOnly),
        "raiser_only" => Ok(SpeakerControl::RaiserOnly),
        "defendant_only" => Ok(SpeakerControl::DefendantOnly),
        "muted_all" => Ok(SpeakerControl::MutedAll),
        other => Err(AppError::Validation(format!(
            "unknown speaker control setting: '{other}'"
        ))),
    }
}

/// Moderator commitments derived from the hearing stores.
///
/// Every non-terminal hearing blocks its moderator for its scheduled
/// interval. `exclude` drops the hearing currently being moved so its own
/// slot does not block the reschedule.
pub(crate) fn busy_intervals(state: &AppState, exclude: Option<Uuid>) -> Vec<BusyInterval> {
    state
        .hearings
        .filter(|h| {
            matches!(
                h.status,
                HearingStatus::Scheduled | HearingStatus::InProgress
            ) && Some(*h.id.as_uuid()) != exclude
        })
        .into_iter()
        .map(|h| BusyInterval {
            staff_id: h.moderator_id,
            start: h.scheduled_at,
            end: h.scheduled_at + Duration::minutes(h.duration_minutes),
        })
        .collect()
}

/// Render a timestamp in the API's wire format.
pub(crate) fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339()
}
