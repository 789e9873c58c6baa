//! # Hearing Lifecycle
//!
//! Manages hearing scheduling and lifecycle stages through the state
//! machine: `Scheduled → InProgress → Concluded`, with `Cancelled` and
//! `Rescheduled` as terminal side-paths from `Scheduled`.
//!
//! ## Design Choice: Validated Enum over Typestate
//!
//! The hearing is stored, listed, and mutated behind an HTTP surface where
//! its state is never known at compile time, so a runtime-checked enum with
//! typed transition methods is used rather than typestate. Each transition
//! method enforces its own precondition and returns
//! [`HearingError::InvalidTransition`] on violation, and every accepted
//! transition is appended to an audit log.
//!
//! ## Transition Graph
//!
//! ```text
//! Scheduled ──start()──▶ InProgress ──conclude()──▶ Concluded
//!     │
//!     ├─cancel()─────────▶ Cancelled
//!     └─mark_rescheduled()▶ Rescheduled ─(successor hearing)─▶ Scheduled
//! ```
//!
//! Rescheduling never rewrites a hearing in place: the old record enters the
//! terminal `Rescheduled` state and a successor carries
//! `previous_hearing_id` for the audit trail.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::attendance;
use crate::error::HearingError;
use crate::participant::{Participant, ParticipantRole};
use crate::policy::{
    EARLY_START_BUFFER_MINUTES, EMERGENCY_MIN_NOTICE_HOURS, MIN_NOTICE_HOURS,
};
use crate::speaker::{can_speak_with_grace, GraceWindow, SpeakerControl};

// ── Identifiers ────────────────────────────────────────────────────────

/// A unique identifier for a hearing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HearingId(Uuid);

impl HearingId {
    /// Create a new random hearing identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a hearing identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for HearingId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for HearingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "hearing:{}", self.0)
    }
}

// ── Actor ──────────────────────────────────────────────────────────────

/// System-level role of the caller invoking an operation.
///
/// Every operation receives the acting user explicitly; nothing is inferred
/// from ambient request state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActorRole {
    /// Platform administrator: schedules and may override any moderator.
    Admin,
    /// Tribunal staff member.
    Staff,
    /// Ordinary platform member (disputing parties, witnesses).
    Member,
}

impl ActorRole {
    /// The canonical string name of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Staff => "STAFF",
            Self::Member => "MEMBER",
        }
    }
}

impl std::fmt::Display for ActorRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The caller of a domain operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// User identifier.
    pub id: Uuid,
    /// System-level role.
    pub role: ActorRole,
}

impl Actor {
    /// Construct an actor.
    pub fn new(id: Uuid, role: ActorRole) -> Self {
        Self { id, role }
    }

    /// Whether this actor holds administrative privileges.
    pub fn is_admin(&self) -> bool {
        matches!(self.role, ActorRole::Admin)
    }
}

// ── Status ─────────────────────────────────────────────────────────────

/// The lifecycle status of a hearing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HearingStatus {
    /// Scheduled for a future time; the session has not begun.
    Scheduled,
    /// The live session is running.
    InProgress,
    /// The session finished. Terminal state.
    Concluded,
    /// Called off before it began. Terminal state.
    Cancelled,
    /// Superseded by a successor hearing at a new time. Terminal state.
    Rescheduled,
}

impl HearingStatus {
    /// The canonical string name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "SCHEDULED",
            Self::InProgress => "IN_PROGRESS",
            Self::Concluded => "CONCLUDED",
            Self::Cancelled => "CANCELLED",
            Self::Rescheduled => "RESCHEDULED",
        }
    }

    /// Whether this status is terminal (no further transitions allowed).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Concluded | Self::Cancelled | Self::Rescheduled)
    }

    /// Valid target statuses from this status.
    pub fn valid_transitions(&self) -> &'static [HearingStatus] {
        match self {
            Self::Scheduled => &[Self::InProgress, Self::Cancelled, Self::Rescheduled],
            Self::InProgress => &[Self::Concluded],
            Self::Concluded | Self::Cancelled | Self::Rescheduled => &[],
        }
    }
}

impl std::fmt::Display for HearingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ── Tier ───────────────────────────────────────────────────────────────

/// Hearing tier within the dispute process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HearingTier {
    /// First hearing convened for the dispute.
    FirstInstance,
    /// Escalated re-hearing after a contested first instance.
    Escalated,
}

impl HearingTier {
    /// The canonical string name of this tier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstInstance => "FIRST_INSTANCE",
            Self::Escalated => "ESCALATED",
        }
    }
}

impl std::fmt::Display for HearingTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ── Transition record ──────────────────────────────────────────────────

/// One entry in a hearing's append-only transition log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Status before the transition.
    pub from_status: HearingStatus,
    /// Status after the transition.
    pub to_status: HearingStatus,
    /// The user that triggered the transition.
    pub actor_id: Uuid,
    /// Optional free-text note (cancel reason, conclusion summary ref).
    pub note: Option<String>,
    /// When the transition was accepted (UTC, server clock).
    pub occurred_at: DateTime<Utc>,
}

// ── The Hearing ────────────────────────────────────────────────────────

/// A moderated dispute-resolution session, managed through its lifecycle.
///
/// Created via [`Hearing::schedule`], then advanced by transition methods
/// that each enforce role and state preconditions. The aggregate owns the
/// participant roster and the floor-control state; all of its mutations must
/// be serialized by the caller (the API layer holds one write lock per
/// hearing store operation) so that floor checks read the setting the same
/// critical section writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hearing {
    /// Unique hearing identifier.
    pub id: HearingId,
    /// The dispute this hearing belongs to.
    pub dispute_id: Uuid,
    /// First-instance or escalated.
    pub tier: HearingTier,
    /// The assigned moderator.
    pub moderator_id: Uuid,
    /// Current lifecycle status.
    pub status: HearingStatus,
    /// Scheduled start time (UTC).
    pub scheduled_at: DateTime<Utc>,
    /// Estimated duration in minutes.
    pub duration_minutes: i64,
    /// Optional agenda text.
    pub agenda: Option<String>,
    /// Optional external meeting reference.
    pub meeting_url: Option<String>,
    /// Whether this was scheduled under the emergency notice rule.
    pub emergency: bool,
    /// Current floor-control setting.
    pub speaker_control: SpeakerControl,
    /// Transitional permission window from the last floor change, if open.
    pub grace_window: Option<GraceWindow>,
    /// Whether the session chat accepts content.
    pub chat_active: bool,
    /// Roster: moderator, parties, witnesses, observers.
    pub participants: Vec<Participant>,
    /// When the session actually started.
    pub started_at: Option<DateTime<Utc>>,
    /// When the session ended.
    pub ended_at: Option<DateTime<Utc>>,
    /// Conclusion summary.
    pub summary: Option<String>,
    /// Reason given on cancellation.
    pub cancel_reason: Option<String>,
    /// The hearing this one replaced, when created by a reschedule.
    pub previous_hearing_id: Option<HearingId>,
    /// How many times this hearing chain has been rescheduled.
    pub reschedule_count: u32,
    /// When the hearing was created (UTC).
    pub created_at: DateTime<Utc>,
    /// When the hearing was last updated (UTC).
    pub updated_at: DateTime<Utc>,
    /// Complete transition history for audit purposes.
    pub transition_log: Vec<TransitionRecord>,
}

impl Hearing {
    /// Schedule a new hearing, creating it in the
    /// [`Scheduled`](HearingStatus::Scheduled) state.
    ///
    /// Only administrators schedule hearings. The roster is supplied as
    /// `(user, role)` pairs for the non-moderator participants; it must
    /// contain exactly the dispute's raiser and defendant plus any witnesses
    /// and observers. The moderator is added to the roster automatically.
    ///
    /// Notice is enforced against `now`: at least 24 hours, or 1 hour when
    /// `emergency` is set.
    ///
    /// # Errors
    ///
    /// [`HearingError::NotPermitted`] for non-admin actors,
    /// [`HearingError::NoticeTooShort`] when scheduled too soon, and
    /// [`HearingError::InvalidValue`] for roster or duration problems.
    #[allow(clippy::too_many_arguments)]
    pub fn schedule(
        dispute_id: Uuid,
        tier: HearingTier,
        moderator_id: Uuid,
        scheduled_at: DateTime<Utc>,
        duration_minutes: i64,
        agenda: Option<String>,
        meeting_url: Option<String>,
        emergency: bool,
        roster: Vec<(Uuid, ParticipantRole)>,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Self, HearingError> {
        if !actor.is_admin() {
            return Err(HearingError::NotPermitted {
                actor_id: actor.id,
                action: "schedule a hearing".to_string(),
            });
        }
        if duration_minutes <= 0 {
            return Err(HearingError::InvalidValue(
                "duration_minutes must be positive".to_string(),
            ));
        }

        let required_hours = if emergency {
            EMERGENCY_MIN_NOTICE_HOURS
        } else {
            MIN_NOTICE_HOURS
        };
        if scheduled_at - now < Duration::hours(required_hours) {
            return Err(HearingError::NoticeTooShort { required_hours });
        }

        Self::validate_roster(moderator_id, &roster)?;

        let mut participants = vec![Participant::new(moderator_id, ParticipantRole::Moderator)];
        participants.extend(
            roster
                .into_iter()
                .map(|(user_id, role)| Participant::new(user_id, role)),
        );

        Ok(Self {
            id: HearingId::new(),
            dispute_id,
            tier,
            moderator_id,
            status: HearingStatus::Scheduled,
            scheduled_at,
            duration_minutes,
            agenda,
            meeting_url,
            emergency,
            speaker_control: SpeakerControl::MutedAll,
            grace_window: None,
            chat_active: false,
            participants,
            started_at: None,
            ended_at: None,
            summary: None,
            cancel_reason: None,
            previous_hearing_id: None,
            reschedule_count: 0,
            created_at: now,
            updated_at: now,
            transition_log: vec![TransitionRecord {
                from_status: HearingStatus::Scheduled,
                to_status: HearingStatus::Scheduled,
                actor_id: actor.id,
                note: None,
                occurred_at: now,
            }],
        })
    }

    /// Transition Scheduled → InProgress.
    ///
    /// Opens the session: records `started_at`, activates the chat, and sets
    /// the floor to [`SpeakerControl::All`]. May be invoked from 15 minutes
    /// before the scheduled time onward.
    ///
    /// # Errors
    ///
    /// [`HearingError::NotPermitted`] unless the actor is the assigned
    /// moderator or an admin; [`HearingError::InvalidTransition`] when not
    /// Scheduled; [`HearingError::TooEarly`] before the start buffer.
    pub fn start(&mut self, actor: &Actor, now: DateTime<Utc>) -> Result<(), HearingError> {
        self.require_moderator_capable(actor, "start the hearing")?;
        self.require_state(HearingStatus::Scheduled, HearingStatus::InProgress)?;
        if now < self.scheduled_at - Duration::minutes(EARLY_START_BUFFER_MINUTES) {
            return Err(HearingError::TooEarly {
                limit: EARLY_START_BUFFER_MINUTES,
            });
        }

        self.started_at = Some(now);
        self.chat_active = true;
        self.speaker_control = SpeakerControl::All;
        self.grace_window = None;
        self.record_transition(
            HearingStatus::Scheduled,
            HearingStatus::InProgress,
            actor.id,
            None,
            now,
        );
        self.status = HearingStatus::InProgress;
        Ok(())
    }

    /// Transition Scheduled → Cancelled. Terminal.
    ///
    /// # Errors
    ///
    /// [`HearingError::NotPermitted`] unless the actor is the moderator or
    /// an admin; [`HearingError::InvalidTransition`] when not Scheduled;
    /// [`HearingError::InvalidValue`] for an empty reason.
    pub fn cancel(
        &mut self,
        actor: &Actor,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<(), HearingError> {
        self.require_moderator_capable(actor, "cancel the hearing")?;
        if reason.trim().is_empty() {
            return Err(HearingError::InvalidValue(
                "a cancellation reason is required".to_string(),
            ));
        }
        self.require_state(HearingStatus::Scheduled, HearingStatus::Cancelled)?;

        self.cancel_reason = Some(reason.to_string());
        self.record_transition(
            HearingStatus::Scheduled,
            HearingStatus::Cancelled,
            actor.id,
            Some(reason.to_string()),
            now,
        );
        self.status = HearingStatus::Cancelled;
        Ok(())
    }

    /// Transition InProgress → Concluded. Terminal.
    ///
    /// Closes the session: records `ended_at`, deactivates chat, mutes the
    /// floor, closes every open presence interval at `ended_at`, and writes
    /// the attendance classification for each roster entry. The caller
    /// cancels any still-pending questions when `force` is set.
    ///
    /// # Errors
    ///
    /// [`HearingError::NotPermitted`] unless moderator or admin;
    /// [`HearingError::InvalidTransition`] when not InProgress.
    pub fn conclude(
        &mut self,
        actor: &Actor,
        summary: Option<String>,
        force: bool,
        now: DateTime<Utc>,
    ) -> Result<(), HearingError> {
        self.require_moderator_capable(actor, "conclude the hearing")?;
        self.require_state(HearingStatus::InProgress, HearingStatus::Concluded)?;

        self.ended_at = Some(now);
        self.chat_active = false;
        self.speaker_control = SpeakerControl::MutedAll;
        self.grace_window = None;
        self.summary = summary;

        let started_at = self.started_at;
        let duration = self.duration_minutes;
        for participant in &mut self.participants {
            if participant.online {
                if let Some(last_seen) = participant.last_seen_at {
                    let minutes = (now - last_seen).num_minutes().max(0);
                    participant.total_online_minutes += minutes;
                }
                participant.online = false;
                participant.last_seen_at = Some(now);
            }
            participant.attendance = Some(attendance::classify(participant, started_at, duration));
        }

        let note = force.then(|| "forced conclusion".to_string());
        self.record_transition(
            HearingStatus::InProgress,
            HearingStatus::Concluded,
            actor.id,
            note,
            now,
        );
        self.status = HearingStatus::Concluded;
        Ok(())
    }

    /// Transition Scheduled → Rescheduled. Terminal.
    ///
    /// Marks this hearing as superseded. The successor is built with
    /// [`Hearing::reschedule_successor`] before this is called, so the audit
    /// note can reference it.
    ///
    /// # Errors
    ///
    /// [`HearingError::NotPermitted`] for non-admin actors;
    /// [`HearingError::InvalidTransition`] when not Scheduled.
    pub fn mark_rescheduled(
        &mut self,
        actor: &Actor,
        successor: &HearingId,
        now: DateTime<Utc>,
    ) -> Result<(), HearingError> {
        if !actor.is_admin() {
            return Err(HearingError::NotPermitted {
                actor_id: actor.id,
                action: "reschedule the hearing".to_string(),
            });
        }
        self.require_state(HearingStatus::Scheduled, HearingStatus::Rescheduled)?;

        self.record_transition(
            HearingStatus::Scheduled,
            HearingStatus::Rescheduled,
            actor.id,
            Some(format!("superseded by {successor}")),
            now,
        );
        self.status = HearingStatus::Rescheduled;
        Ok(())
    }

    /// Build the successor hearing for an approved reschedule.
    ///
    /// Copies the dispute linkage, tier, moderator, duration, agenda, and
    /// roster roles; presence history starts fresh. Carries
    /// `previous_hearing_id` and an incremented reschedule count.
    ///
    /// # Errors
    ///
    /// [`HearingError::NotPermitted`] for non-admin actors;
    /// [`HearingError::WrongState`] unless this hearing is Scheduled.
    pub fn reschedule_successor(
        &self,
        new_start: DateTime<Utc>,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Hearing, HearingError> {
        if !actor.is_admin() {
            return Err(HearingError::NotPermitted {
                actor_id: actor.id,
                action: "reschedule the hearing".to_string(),
            });
        }
        if self.status != HearingStatus::Scheduled {
            return Err(HearingError::WrongState {
                hearing_id: self.id.to_string(),
                state: self.status.as_str().to_string(),
                action: "reschedule".to_string(),
            });
        }

        let participants = self
            .participants
            .iter()
            .map(|p| Participant::new(p.user_id, p.role))
            .collect();

        Ok(Hearing {
            id: HearingId::new(),
            dispute_id: self.dispute_id,
            tier: self.tier,
            moderator_id: self.moderator_id,
            status: HearingStatus::Scheduled,
            scheduled_at: new_start,
            duration_minutes: self.duration_minutes,
            agenda: self.agenda.clone(),
            meeting_url: self.meeting_url.clone(),
            emergency: self.emergency,
            speaker_control: SpeakerControl::MutedAll,
            grace_window: None,
            chat_active: false,
            participants,
            started_at: None,
            ended_at: None,
            summary: None,
            cancel_reason: None,
            previous_hearing_id: Some(self.id.clone()),
            reschedule_count: self.reschedule_count + 1,
            created_at: now,
            updated_at: now,
            transition_log: vec![TransitionRecord {
                from_status: HearingStatus::Scheduled,
                to_status: HearingStatus::Scheduled,
                actor_id: actor.id,
                note: Some(format!("rescheduled from {}", self.id)),
                occurred_at: now,
            }],
        })
    }

    /// Change the floor-control setting.
    ///
    /// Returns `true` when the setting actually changed. A change opens a
    /// grace window of `grace_seconds` (0 disables) preserving the previous
    /// setting's permissions for in-flight content.
    ///
    /// # Errors
    ///
    /// [`HearingError::NotPermitted`] unless the actor is the assigned
    /// moderator or an admin; [`HearingError::WrongState`] when the session
    /// is not live.
    pub fn set_speaker_control(
        &mut self,
        actor: &Actor,
        setting: SpeakerControl,
        grace_seconds: u64,
        now: DateTime<Utc>,
    ) -> Result<bool, HearingError> {
        self.require_moderator_capable(actor, "change the floor setting")?;
        if self.status != HearingStatus::InProgress {
            return Err(HearingError::WrongState {
                hearing_id: self.id.to_string(),
                state: self.status.as_str().to_string(),
                action: "change the floor setting".to_string(),
            });
        }
        if self.speaker_control == setting {
            return Ok(false);
        }

        let previous = self.speaker_control;
        self.grace_window = (grace_seconds > 0).then(|| GraceWindow {
            previous,
            expires_at: now + Duration::seconds(grace_seconds as i64),
        });
        self.speaker_control = setting;
        self.updated_at = now;
        Ok(true)
    }

    /// Record a participant's attendance confirmation.
    ///
    /// # Errors
    ///
    /// [`HearingError::WrongState`] unless Scheduled;
    /// [`HearingError::UnknownParticipant`] for users not on the roster.
    pub fn confirm(&mut self, user_id: Uuid, now: DateTime<Utc>) -> Result<(), HearingError> {
        if self.status != HearingStatus::Scheduled {
            return Err(HearingError::WrongState {
                hearing_id: self.id.to_string(),
                state: self.status.as_str().to_string(),
                action: "confirm attendance".to_string(),
            });
        }
        let hearing_id = self.id.to_string();
        let participant = self
            .participants
            .iter_mut()
            .find(|p| p.user_id == user_id)
            .ok_or(HearingError::UnknownParticipant {
                hearing_id,
                user_id,
            })?;
        participant.confirmed = true;
        participant.confirmed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Record a join or leave signal for a participant.
    ///
    /// A join stamps `joined_at` on first occurrence; a leave closes the
    /// open interval and adds it to `total_online_minutes`. Signals are only
    /// accepted while the session is live.
    ///
    /// # Errors
    ///
    /// [`HearingError::WrongState`] unless InProgress;
    /// [`HearingError::UnknownParticipant`] for users not on the roster.
    pub fn record_presence(
        &mut self,
        user_id: Uuid,
        online: bool,
        now: DateTime<Utc>,
    ) -> Result<(), HearingError> {
        if self.status != HearingStatus::InProgress {
            return Err(HearingError::WrongState {
                hearing_id: self.id.to_string(),
                state: self.status.as_str().to_string(),
                action: "record presence".to_string(),
            });
        }
        let hearing_id = self.id.to_string();
        let participant = self
            .participants
            .iter_mut()
            .find(|p| p.user_id == user_id)
            .ok_or(HearingError::UnknownParticipant {
                hearing_id,
                user_id,
            })?;

        if online {
            if participant.joined_at.is_none() {
                participant.joined_at = Some(now);
            }
            participant.online = true;
            participant.last_seen_at = Some(now);
        } else if participant.online {
            if let Some(last_seen) = participant.last_seen_at {
                participant.total_online_minutes += (now - last_seen).num_minutes().max(0);
            }
            participant.online = false;
            participant.last_seen_at = Some(now);
        }
        self.updated_at = now;
        Ok(())
    }

    /// Look up a roster entry by user.
    pub fn participant(&self, user_id: Uuid) -> Option<&Participant> {
        self.participants.iter().find(|p| p.user_id == user_id)
    }

    /// Whether the actor may exercise moderator powers on this hearing.
    pub fn is_moderator_capable(&self, actor: &Actor) -> bool {
        actor.is_admin() || actor.id == self.moderator_id
    }

    fn require_moderator_capable(&self, actor: &Actor, action: &str) -> Result<(), HearingError> {
        if self.is_moderator_capable(actor) {
            Ok(())
        } else {
            Err(HearingError::NotPermitted {
                actor_id: actor.id,
                action: action.to_string(),
            })
        }
    }

    /// Check that `user_id` may post content right now, returning their role.
    ///
    /// Evaluates session liveness, roster membership, chat state, and the
    /// floor gate (with any active grace window). Must be called under the
    /// same lock that serializes floor-setting updates.
    ///
    /// # Errors
    ///
    /// [`HearingError::WrongState`] when the session is not live;
    /// [`HearingError::UnknownParticipant`] for non-members;
    /// [`HearingError::FloorClosed`] when the gate rejects the role.
    pub fn ensure_may_post(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ParticipantRole, HearingError> {
        if self.status != HearingStatus::InProgress {
            return Err(HearingError::WrongState {
                hearing_id: self.id.to_string(),
                state: self.status.as_str().to_string(),
                action: "post content".to_string(),
            });
        }
        let participant =
            self.participant(user_id)
                .ok_or_else(|| HearingError::UnknownParticipant {
                    hearing_id: self.id.to_string(),
                    user_id,
                })?;
        let role = participant.role;
        if !self.chat_active
            || !can_speak_with_grace(self.speaker_control, self.grace_window.as_ref(), role, now)
        {
            return Err(HearingError::FloorClosed {
                setting: self.speaker_control.as_str().to_string(),
                role: role.as_str().to_string(),
            });
        }
        Ok(role)
    }

    fn validate_roster(
        moderator_id: Uuid,
        roster: &[(Uuid, ParticipantRole)],
    ) -> Result<(), HearingError> {
        let mut seen = Vec::with_capacity(roster.len());
        let mut raisers = 0usize;
        let mut defendants = 0usize;
        for (user_id, role) in roster {
            if *user_id == moderator_id {
                return Err(HearingError::InvalidValue(
                    "the moderator cannot also appear in the roster".to_string(),
                ));
            }
            if seen.contains(user_id) {
                return Err(HearingError::InvalidValue(format!(
                    "duplicate roster entry for user {user_id}"
                )));
            }
            seen.push(*user_id);
            match role {
                ParticipantRole::Moderator => {
                    return Err(HearingError::InvalidValue(
                        "the roster may not assign the moderator role".to_string(),
                    ));
                }
                ParticipantRole::Raiser => raisers += 1,
                ParticipantRole::Defendant => defendants += 1,
                ParticipantRole::Witness | ParticipantRole::Observer => {}
            }
        }
        if raisers != 1 || defendants != 1 {
            return Err(HearingError::InvalidValue(
                "the roster needs exactly one raiser and one defendant".to_string(),
            ));
        }
        Ok(())
    }

    /// Check that the hearing is in the expected state for a transition.
    fn require_state(
        &self,
        expected: HearingStatus,
        target: HearingStatus,
    ) -> Result<(), HearingError> {
        if self.status.is_terminal() {
            return Err(HearingError::TerminalState {
                hearing_id: self.id.to_string(),
                state: self.status.as_str().to_string(),
            });
        }
        if self.status != expected {
            return Err(HearingError::InvalidTransition {
                from: self.status.as_str().to_string(),
                to: target.as_str().to_string(),
                reason: format!("expected state {}, got {}", expected, self.status),
            });
        }
        Ok(())
    }

    /// Record a transition in the audit log.
    fn record_transition(
        &mut self,
        from: HearingStatus,
        to: HearingStatus,
        actor_id: Uuid,
        note: Option<String>,
        now: DateTime<Utc>,
    ) {
        self.transition_log.push(TransitionRecord {
            from_status: from,
            to_status: to,
            actor_id,
            note,
            occurred_at: now,
        });
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> Actor {
        Actor::new(Uuid::new_v4(), ActorRole::Admin)
    }

    fn roster() -> (Uuid, Uuid, Vec<(Uuid, ParticipantRole)>) {
        let raiser = Uuid::new_v4();
        let defendant = Uuid::new_v4();
        let roster = vec![
            (raiser, ParticipantRole::Raiser),
            (defendant, ParticipantRole::Defendant),
        ];
        (raiser, defendant, roster)
    }

    fn schedule_hearing() -> (Hearing, Actor, DateTime<Utc>) {
        let actor = admin();
        let now = Utc::now();
        let (_, _, roster) = roster();
        let hearing = Hearing::schedule(
            Uuid::new_v4(),
            HearingTier::FirstInstance,
            Uuid::new_v4(),
            now + Duration::hours(48),
            60,
            Some("opening statements".to_string()),
            None,
            false,
            roster,
            &actor,
            now,
        )
        .unwrap();
        (hearing, actor, now)
    }

    fn started_hearing() -> (Hearing, Actor, DateTime<Utc>) {
        let (mut hearing, actor, now) = schedule_hearing();
        let start_time = hearing.scheduled_at;
        hearing.start(&actor, start_time).unwrap();
        (hearing, actor, start_time)
    }

    #[test]
    fn schedule_creates_scheduled_hearing() {
        let (hearing, _, _) = schedule_hearing();
        assert_eq!(hearing.status, HearingStatus::Scheduled);
        assert_eq!(hearing.speaker_control, SpeakerControl::MutedAll);
        assert!(!hearing.chat_active);
        assert_eq!(hearing.participants.len(), 3);
        assert_eq!(
            hearing.participants[0].role,
            ParticipantRole::Moderator
        );
        assert_eq!(hearing.transition_log.len(), 1);
        assert_eq!(hearing.reschedule_count, 0);
    }

    #[test]
    fn schedule_rejects_non_admin() {
        let actor = Actor::new(Uuid::new_v4(), ActorRole::Member);
        let now = Utc::now();
        let (_, _, roster) = roster();
        let err = Hearing::schedule(
            Uuid::new_v4(),
            HearingTier::FirstInstance,
            Uuid::new_v4(),
            now + Duration::hours(48),
            60,
            None,
            None,
            false,
            roster,
            &actor,
            now,
        )
        .unwrap_err();
        assert!(matches!(err, HearingError::NotPermitted { .. }));
    }

    #[test]
    fn schedule_enforces_minimum_notice() {
        let actor = admin();
        let now = Utc::now();
        let (_, _, roster) = roster();
        let err = Hearing::schedule(
            Uuid::new_v4(),
            HearingTier::FirstInstance,
            Uuid::new_v4(),
            now + Duration::hours(23),
            60,
            None,
            None,
            false,
            roster,
            &actor,
            now,
        )
        .unwrap_err();
        assert_eq!(err, HearingError::NoticeTooShort { required_hours: 24 });
    }

    #[test]
    fn emergency_hearing_allows_one_hour_notice() {
        let actor = admin();
        let now = Utc::now();
        let (_, _, roster) = roster();
        let hearing = Hearing::schedule(
            Uuid::new_v4(),
            HearingTier::FirstInstance,
            Uuid::new_v4(),
            now + Duration::hours(2),
            60,
            None,
            None,
            true,
            roster,
            &actor,
            now,
        )
        .unwrap();
        assert!(hearing.emergency);
    }

    #[test]
    fn schedule_rejects_roster_without_both_parties() {
        let actor = admin();
        let now = Utc::now();
        let roster = vec![(Uuid::new_v4(), ParticipantRole::Raiser)];
        let err = Hearing::schedule(
            Uuid::new_v4(),
            HearingTier::FirstInstance,
            Uuid::new_v4(),
            now + Duration::hours(48),
            60,
            None,
            None,
            false,
            roster,
            &actor,
            now,
        )
        .unwrap_err();
        assert!(matches!(err, HearingError::InvalidValue(_)));
    }

    #[test]
    fn schedule_rejects_duplicate_roster_entries() {
        let actor = admin();
        let now = Utc::now();
        let user = Uuid::new_v4();
        let roster = vec![
            (user, ParticipantRole::Raiser),
            (user, ParticipantRole::Defendant),
        ];
        let err = Hearing::schedule(
            Uuid::new_v4(),
            HearingTier::FirstInstance,
            Uuid::new_v4(),
            now + Duration::hours(48),
            60,
            None,
            None,
            false,
            roster,
            &actor,
            now,
        )
        .unwrap_err();
        assert!(matches!(err, HearingError::InvalidValue(_)));
    }

    #[test]
    fn start_opens_the_session() {
        let (hearing, _, _) = started_hearing();
        assert_eq!(hearing.status, HearingStatus::InProgress);
        assert!(hearing.chat_active);
        assert_eq!(hearing.speaker_control, SpeakerControl::All);
        assert!(hearing.started_at.is_some());
        assert_eq!(hearing.transition_log.len(), 2);
    }

    #[test]
    fn start_twice_is_invalid_transition() {
        let (mut hearing, actor, _) = started_hearing();
        let err = hearing.start(&actor, Utc::now()).unwrap_err();
        assert!(matches!(err, HearingError::InvalidTransition { .. }));
    }

    #[test]
    fn start_within_early_buffer_is_allowed() {
        let (mut hearing, actor, _) = schedule_hearing();
        let start_time = hearing.scheduled_at - Duration::minutes(15);
        assert!(hearing.start(&actor, start_time).is_ok());
    }

    #[test]
    fn start_too_early_is_rejected() {
        let (mut hearing, actor, _) = schedule_hearing();
        let start_time = hearing.scheduled_at - Duration::minutes(16);
        let err = hearing.start(&actor, start_time).unwrap_err();
        assert_eq!(err, HearingError::TooEarly { limit: 15 });
    }

    #[test]
    fn moderator_may_start() {
        let (mut hearing, _, _) = schedule_hearing();
        let moderator = Actor::new(hearing.moderator_id, ActorRole::Staff);
        assert!(hearing.start(&moderator, hearing.scheduled_at).is_ok());
    }

    #[test]
    fn stranger_may_not_start() {
        let (mut hearing, _, _) = schedule_hearing();
        let stranger = Actor::new(Uuid::new_v4(), ActorRole::Member);
        let err = hearing.start(&stranger, hearing.scheduled_at).unwrap_err();
        assert!(matches!(err, HearingError::NotPermitted { .. }));
    }

    #[test]
    fn moderator_gate_names_the_offending_actor() {
        let (mut hearing, _, now) = schedule_hearing();
        let stranger = Actor::new(Uuid::new_v4(), ActorRole::Member);

        let err = hearing.cancel(&stranger, "not mine", now).unwrap_err();
        assert_eq!(
            err,
            HearingError::NotPermitted {
                actor_id: stranger.id,
                action: "cancel the hearing".to_string(),
            }
        );

        let (mut live, _, started) = started_hearing();
        let err = live
            .conclude(&stranger, None, false, started + Duration::minutes(30))
            .unwrap_err();
        assert!(matches!(err, HearingError::NotPermitted { .. }));
        let err = live
            .set_speaker_control(&stranger, SpeakerControl::MutedAll, 5, started)
            .unwrap_err();
        assert!(matches!(err, HearingError::NotPermitted { .. }));
    }

    #[test]
    fn cancel_from_scheduled_is_terminal() {
        let (mut hearing, actor, now) = schedule_hearing();
        hearing.cancel(&actor, "parties settled", now).unwrap();
        assert_eq!(hearing.status, HearingStatus::Cancelled);
        assert_eq!(hearing.cancel_reason.as_deref(), Some("parties settled"));
        assert!(hearing.status.is_terminal());
    }

    #[test]
    fn cancel_requires_reason() {
        let (mut hearing, actor, now) = schedule_hearing();
        let err = hearing.cancel(&actor, "  ", now).unwrap_err();
        assert!(matches!(err, HearingError::InvalidValue(_)));
    }

    #[test]
    fn cancel_after_start_is_invalid() {
        let (mut hearing, actor, _) = started_hearing();
        let err = hearing.cancel(&actor, "too late", Utc::now()).unwrap_err();
        assert!(matches!(err, HearingError::InvalidTransition { .. }));
    }

    #[test]
    fn conclude_closes_the_session() {
        let (mut hearing, actor, started) = started_hearing();
        let ended = started + Duration::minutes(60);
        hearing
            .conclude(&actor, Some("resolved".to_string()), false, ended)
            .unwrap();
        assert_eq!(hearing.status, HearingStatus::Concluded);
        assert!(!hearing.chat_active);
        assert_eq!(hearing.speaker_control, SpeakerControl::MutedAll);
        assert_eq!(hearing.ended_at, Some(ended));
        for p in &hearing.participants {
            assert!(p.attendance.is_some());
        }
    }

    #[test]
    fn conclude_closes_open_presence_intervals() {
        let (mut hearing, actor, started) = started_hearing();
        let raiser_id = hearing
            .participants
            .iter()
            .find(|p| p.role == ParticipantRole::Raiser)
            .unwrap()
            .user_id;
        hearing.record_presence(raiser_id, true, started).unwrap();
        let ended = started + Duration::minutes(60);
        hearing.conclude(&actor, None, false, ended).unwrap();

        let raiser = hearing.participant(raiser_id).unwrap();
        assert!(!raiser.online);
        assert_eq!(raiser.total_online_minutes, 60);
        assert_eq!(raiser.attendance, Some(crate::AttendanceStatus::OnTime));
    }

    #[test]
    fn conclude_before_start_is_invalid() {
        let (mut hearing, actor, now) = schedule_hearing();
        let err = hearing.conclude(&actor, None, false, now).unwrap_err();
        assert!(matches!(err, HearingError::InvalidTransition { .. }));
    }

    #[test]
    fn terminal_hearing_rejects_everything() {
        let (mut hearing, actor, now) = schedule_hearing();
        hearing.cancel(&actor, "done", now).unwrap();
        let err = hearing.start(&actor, now).unwrap_err();
        assert!(matches!(err, HearingError::TerminalState { .. }));
    }

    #[test]
    fn speaker_control_change_opens_grace_window() {
        let (mut hearing, actor, started) = started_hearing();
        let changed = hearing
            .set_speaker_control(&actor, SpeakerControl::ModeratorOnly, 5, started)
            .unwrap();
        assert!(changed);
        assert_eq!(hearing.speaker_control, SpeakerControl::ModeratorOnly);
        let window = hearing.grace_window.unwrap();
        assert_eq!(window.previous, SpeakerControl::All);
        assert_eq!(window.expires_at, started + Duration::seconds(5));
    }

    #[test]
    fn speaker_control_noop_keeps_existing_window_closed() {
        let (mut hearing, actor, started) = started_hearing();
        let changed = hearing
            .set_speaker_control(&actor, SpeakerControl::All, 5, started)
            .unwrap();
        assert!(!changed);
        assert!(hearing.grace_window.is_none());
    }

    #[test]
    fn speaker_control_zero_grace_disables_window() {
        let (mut hearing, actor, started) = started_hearing();
        hearing
            .set_speaker_control(&actor, SpeakerControl::MutedAll, 0, started)
            .unwrap();
        assert!(hearing.grace_window.is_none());
    }

    #[test]
    fn speaker_control_requires_live_session() {
        let (mut hearing, actor, now) = schedule_hearing();
        let err = hearing
            .set_speaker_control(&actor, SpeakerControl::All, 5, now)
            .unwrap_err();
        assert!(matches!(err, HearingError::WrongState { .. }));
    }

    #[test]
    fn ensure_may_post_respects_floor_setting() {
        let (mut hearing, actor, started) = started_hearing();
        let raiser_id = hearing
            .participants
            .iter()
            .find(|p| p.role == ParticipantRole::Raiser)
            .unwrap()
            .user_id;

        // Open floor admits the raiser.
        assert!(hearing.ensure_may_post(raiser_id, started).is_ok());

        // Muted floor with no grace rejects.
        hearing
            .set_speaker_control(&actor, SpeakerControl::ModeratorOnly, 0, started)
            .unwrap();
        let err = hearing.ensure_may_post(raiser_id, started).unwrap_err();
        assert!(matches!(err, HearingError::FloorClosed { .. }));
    }

    #[test]
    fn ensure_may_post_honors_grace_window() {
        let (mut hearing, actor, started) = started_hearing();
        let raiser_id = hearing
            .participants
            .iter()
            .find(|p| p.role == ParticipantRole::Raiser)
            .unwrap()
            .user_id;

        hearing
            .set_speaker_control(&actor, SpeakerControl::ModeratorOnly, 5, started)
            .unwrap();
        // Inside the window the previous ALL setting still admits the raiser.
        assert!(hearing
            .ensure_may_post(raiser_id, started + Duration::seconds(3))
            .is_ok());
        // After expiry the new setting governs.
        assert!(hearing
            .ensure_may_post(raiser_id, started + Duration::seconds(6))
            .is_err());
    }

    #[test]
    fn ensure_may_post_rejects_non_participant() {
        let (hearing, _, started) = started_hearing();
        let err = hearing.ensure_may_post(Uuid::new_v4(), started).unwrap_err();
        assert!(matches!(err, HearingError::UnknownParticipant { .. }));
    }

    #[test]
    fn confirm_marks_participant() {
        let (mut hearing, _, now) = schedule_hearing();
        let raiser_id = hearing
            .participants
            .iter()
            .find(|p| p.role == ParticipantRole::Raiser)
            .unwrap()
            .user_id;
        hearing.confirm(raiser_id, now).unwrap();
        let p = hearing.participant(raiser_id).unwrap();
        assert!(p.confirmed);
        assert_eq!(p.confirmed_at, Some(now));
    }

    #[test]
    fn presence_accumulates_online_minutes() {
        let (mut hearing, _, started) = started_hearing();
        let raiser_id = hearing
            .participants
            .iter()
            .find(|p| p.role == ParticipantRole::Raiser)
            .unwrap()
            .user_id;

        hearing.record_presence(raiser_id, true, started).unwrap();
        hearing
            .record_presence(raiser_id, false, started + Duration::minutes(20))
            .unwrap();
        hearing
            .record_presence(raiser_id, true, started + Duration::minutes(30))
            .unwrap();
        hearing
            .record_presence(raiser_id, false, started + Duration::minutes(45))
            .unwrap();

        let p = hearing.participant(raiser_id).unwrap();
        assert_eq!(p.total_online_minutes, 35);
        assert_eq!(p.joined_at, Some(started));
        assert!(!p.online);
    }

    #[test]
    fn presence_rejected_before_start() {
        let (mut hearing, _, now) = schedule_hearing();
        let raiser_id = hearing.participants[1].user_id;
        let err = hearing.record_presence(raiser_id, true, now).unwrap_err();
        assert!(matches!(err, HearingError::WrongState { .. }));
    }

    #[test]
    fn reschedule_successor_links_previous_hearing() {
        let (hearing, actor, now) = schedule_hearing();
        let new_start = hearing.scheduled_at + Duration::days(2);
        let successor = hearing.reschedule_successor(new_start, &actor, now).unwrap();
        assert_eq!(successor.previous_hearing_id, Some(hearing.id.clone()));
        assert_eq!(successor.reschedule_count, 1);
        assert_eq!(successor.scheduled_at, new_start);
        assert_eq!(successor.participants.len(), hearing.participants.len());
        assert_eq!(successor.status, HearingStatus::Scheduled);
    }

    #[test]
    fn mark_rescheduled_is_terminal() {
        let (mut hearing, actor, now) = schedule_hearing();
        let successor_id = HearingId::new();
        hearing.mark_rescheduled(&actor, &successor_id, now).unwrap();
        assert_eq!(hearing.status, HearingStatus::Rescheduled);
        assert!(hearing.status.is_terminal());
        let err = hearing.start(&actor, now).unwrap_err();
        assert!(matches!(err, HearingError::TerminalState { .. }));
    }

    #[test]
    fn status_strings_and_transitions() {
        assert_eq!(HearingStatus::Scheduled.as_str(), "SCHEDULED");
        assert_eq!(HearingStatus::InProgress.as_str(), "IN_PROGRESS");
        assert_eq!(HearingStatus::Concluded.as_str(), "CONCLUDED");
        assert_eq!(HearingStatus::Cancelled.as_str(), "CANCELLED");
        assert_eq!(HearingStatus::Rescheduled.as_str(), "RESCHEDULED");
        assert_eq!(
            HearingStatus::Scheduled.valid_transitions(),
            &[
                HearingStatus::InProgress,
                HearingStatus::Cancelled,
                HearingStatus::Rescheduled
            ]
        );
        assert!(HearingStatus::InProgress.valid_transitions().len() == 1);
        assert!(HearingStatus::Concluded.valid_transitions().is_empty());
    }

    #[test]
    fn hearing_serializes_round_trip() {
        let (hearing, _, _) = schedule_hearing();
        let json = serde_json::to_string(&hearing).unwrap();
        let back: Hearing = serde_json::from_str(&json).unwrap();
        assert_eq!(hearing, back);
    }

    #[test]
    fn hearing_id_display_is_prefixed() {
        let id = HearingId::new();
        assert!(id.to_string().starts_with("hearing:"));
    }
}
