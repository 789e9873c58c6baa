// SPDX-License-Identifier: BUSL-1.1
//! # Hearing API Routes
//!
//! HTTP surface for the hearing lifecycle. Exposes endpoints to schedule
//! hearings, advance through the state machine (Scheduled → InProgress →
//! Concluded, with Cancelled and Rescheduled side-paths), control the
//! floor, and track confirmation and presence.
//!
//! ## Lifecycle Transitions
//!
//! Every transition carries the acting user explicitly; the HTTP layer
//! parses the actor and delegates to `tribunal_hearing::Hearing` methods
//! which enforce the state machine and role rules.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use tribunal_hearing::{Hearing, HearingTier, Participant, QuestionStatus};

use crate::error::AppError;
use crate::events::{SessionEvent, SessionEventKind};
use crate::routes::questions::{question_to_response, QuestionResponse};
use crate::routes::statements::{statement_to_response, StatementResponse};
use crate::routes::{parse_actor, parse_participant_role, parse_speaker_control, rfc3339};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

/// Request to schedule a new hearing.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ScheduleHearingRequest {
    /// The dispute the hearing belongs to.
    pub dispute_id: Uuid,
    /// Hearing tier: `first_instance` or `escalated`.
    pub tier: String,
    /// The assigned moderator.
    pub moderator_id: Uuid,
    /// Scheduled start (RFC 3339).
    pub scheduled_at: DateTime<Utc>,
    /// Estimated duration in minutes.
    pub duration_minutes: i64,
    /// Optional agenda text.
    pub agenda: Option<String>,
    /// Optional external meeting reference.
    pub meeting_url: Option<String>,
    /// Schedule under the emergency notice rule.
    #[serde(default)]
    pub emergency: bool,
    /// Non-moderator roster entries.
    pub participants: Vec<RosterEntryRequest>,
    /// Acting user.
    pub actor_id: Uuid,
    /// Acting user's system role.
    pub actor_role: String,
}

/// One roster entry in a schedule request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RosterEntryRequest {
    /// Participant user.
    pub user_id: Uuid,
    /// Hearing role: `raiser`, `defendant`, `witness`, or `observer`.
    pub role: String,
}

/// Generic actor-only request body for transitions.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ActorRequest {
    /// Acting user.
    pub actor_id: Uuid,
    /// Acting user's system role.
    pub actor_role: String,
}

/// Cancellation request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CancelRequest {
    /// Acting user.
    pub actor_id: Uuid,
    /// Acting user's system role.
    pub actor_role: String,
    /// Why the hearing is called off.
    pub reason: String,
}

/// Conclusion request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ConcludeRequest {
    /// Acting user.
    pub actor_id: Uuid,
    /// Acting user's system role.
    pub actor_role: String,
    /// Conclusion summary.
    pub summary: Option<String>,
    /// Cancel still-pending questions instead of refusing.
    #[serde(default)]
    pub force: bool,
}

/// Floor-control change request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SpeakerControlRequest {
    /// Acting user.
    pub actor_id: Uuid,
    /// Acting user's system role.
    pub actor_role: String,
    /// Target setting: `all`, `moderator_only`, `raiser_only`,
    /// `defendant_only`, or `muted_all`.
    pub setting: String,
    /// Grace window in seconds. Defaults to the configured value and is
    /// clamped to the supported maximum.
    pub grace_seconds: Option<u64>,
}

/// Attendance confirmation request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ConfirmRequest {
    /// Confirming participant.
    pub user_id: Uuid,
}

/// Presence signal request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PresenceRequest {
    /// The participant joining or leaving.
    pub user_id: Uuid,
    /// `true` on join, `false` on leave.
    pub online: bool,
}

/// Hearing summary in API responses.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HearingResponse {
    pub hearing_id: String,
    pub dispute_id: String,
    pub tier: String,
    pub status: String,
    pub moderator_id: String,
    pub scheduled_at: String,
    pub duration_minutes: i64,
    pub agenda: Option<String>,
    pub meeting_url: Option<String>,
    pub emergency: bool,
    pub speaker_control: String,
    pub grace_expires_at: Option<String>,
    pub chat_active: bool,
    pub participant_count: usize,
    pub reschedule_count: u32,
    pub previous_hearing_id: Option<String>,
    pub started_at: Option<String>,
    pub ended_at: Option<String>,
    pub summary: Option<String>,
    pub cancel_reason: Option<String>,
    pub transition_count: usize,
    pub valid_transitions: Vec<String>,
}

/// One roster entry in attendance responses.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ParticipantResponse {
    pub user_id: String,
    pub role: String,
    pub confirmed: bool,
    pub online: bool,
    pub joined_at: Option<String>,
    pub total_online_minutes: i64,
    pub attendance: Option<String>,
}

/// One entry in a hearing's transition timeline.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TransitionResponse {
    pub from_status: String,
    pub to_status: String,
    pub actor_id: String,
    pub note: Option<String>,
    pub occurred_at: String,
}

/// Aggregate room view: the hearing plus everything that happened in it.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RoomResponse {
    pub hearing: HearingResponse,
    pub participants: Vec<ParticipantResponse>,
    pub statements: Vec<StatementResponse>,
    pub questions: Vec<QuestionResponse>,
    pub timeline: Vec<TransitionResponse>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the hearing lifecycle router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/hearings", post(schedule_hearing).get(list_hearings))
        .route("/v1/hearings/:id", get(get_hearing))
        .route("/v1/hearings/:id/start", post(start_hearing))
        .route("/v1/hearings/:id/cancel", post(cancel_hearing))
        .route("/v1/hearings/:id/conclude", post(conclude_hearing))
        .route("/v1/hearings/:id/speaker-control", post(set_speaker_control))
        .route("/v1/hearings/:id/confirm", post(confirm_attendance))
        .route("/v1/hearings/:id/presence", post(record_presence))
        .route("/v1/hearings/:id/attendance", get(get_attendance))
        .route("/v1/hearings/:id/room", get(get_room))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_tier(s: &str) -> Result<HearingTier, AppError> {
    match s {
        "first_instance" => Ok(HearingTier::FirstInstance),
        "escalated" => Ok(HearingTier::Escalated),
        other => Err(AppError::Validation(format!(
            "unknown hearing tier: '{other}'"
        ))),
    }
}

fn participant_to_response(p: &Participant) -> ParticipantResponse {
    ParticipantResponse {
        user_id: p.user_id.to_string(),
        role: p.role.as_str().to_string(),
        confirmed: p.confirmed,
        online: p.online,
        joined_at: p.joined_at.map(rfc3339),
        total_online_minutes: p.total_online_minutes,
        attendance: p.attendance.map(|a| a.as_str().to_string()),
    }
}

pub(crate) fn hearing_to_response(h: &Hearing) -> HearingResponse {
    HearingResponse {
        hearing_id: h.id.as_uuid().to_string(),
        dispute_id: h.dispute_id.to_string(),
        tier: h.tier.as_str().to_string(),
        status: h.status.as_str().to_string(),
        moderator_id: h.moderator_id.to_string(),
        scheduled_at: rfc3339(h.scheduled_at),
        duration_minutes: h.duration_minutes,
        agenda: h.agenda.clone(),
        meeting_url: h.meeting_url.clone(),
        emergency: h.emergency,
        speaker_control: h.speaker_control.as_str().to_string(),
        grace_expires_at: h.grace_window.as_ref().map(|w| rfc3339(w.expires_at)),
        chat_active: h.chat_active,
        participant_count: h.participants.len(),
        reschedule_count: h.reschedule_count,
        previous_hearing_id: h
            .previous_hearing_id
            .as_ref()
            .map(|id| id.as_uuid().to_string()),
        started_at: h.started_at.map(rfc3339),
        ended_at: h.ended_at.map(rfc3339),
        summary: h.summary.clone(),
        cancel_reason: h.cancel_reason.clone(),
        transition_count: h.transition_log.len(),
        valid_transitions: h
            .status
            .valid_transitions()
            .iter()
            .map(|s| s.as_str().to_string())
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /v1/hearings — Schedule a new hearing.
#[utoipa::path(
    post,
    path = "/v1/hearings",
    request_body = ScheduleHearingRequest,
    responses(
        (status = 201, description = "Hearing scheduled", body = HearingResponse),
        (status = 403, description = "Actor may not schedule"),
        (status = 409, description = "Dispute already has an open hearing"),
        (status = 422, description = "Validation error"),
    ),
    tag = "hearings"
)]
async fn schedule_hearing(
    State(state): State<AppState>,
    Json(req): Json<ScheduleHearingRequest>,
) -> Result<(axum::http::StatusCode, Json<HearingResponse>), AppError> {
    let actor = parse_actor(req.actor_id, &req.actor_role)?;
    let tier = parse_tier(&req.tier)?;

    let open = state
        .hearings
        .filter(|h| h.dispute_id == req.dispute_id && !h.status.is_terminal());
    if let Some(existing) = open.first() {
        return Err(AppError::Conflict(format!(
            "dispute {} already has an open hearing ({})",
            req.dispute_id, existing.id
        )));
    }

    let mut roster = Vec::with_capacity(req.participants.len());
    for entry in &req.participants {
        roster.push((entry.user_id, parse_participant_role(&entry.role)?));
    }

    let hearing = Hearing::schedule(
        req.dispute_id,
        tier,
        req.moderator_id,
        req.scheduled_at,
        req.duration_minutes,
        req.agenda.clone(),
        req.meeting_url.clone(),
        req.emergency,
        roster,
        &actor,
        Utc::now(),
    )?;

    let response = hearing_to_response(&hearing);
    let id = *hearing.id.as_uuid();
    state.hearings.insert(id, hearing);
    state.events.publish(SessionEvent::now(
        SessionEventKind::HearingScheduled,
        id,
        json!({ "scheduled_at": response.scheduled_at }),
    ));

    Ok((axum::http::StatusCode::CREATED, Json(response)))
}

/// GET /v1/hearings — List all hearings.
#[utoipa::path(
    get,
    path = "/v1/hearings",
    responses(
        (status = 200, description = "List of hearings", body = Vec<HearingResponse>),
    ),
    tag = "hearings"
)]
async fn list_hearings(
    State(state): State<AppState>,
) -> Result<Json<Vec<HearingResponse>>, AppError> {
    let mut all = state.hearings.list();
    all.sort_by_key(|h| h.scheduled_at);
    let responses: Vec<HearingResponse> = all.iter().map(hearing_to_response).collect();
    Ok(Json(responses))
}

/// GET /v1/hearings/:id — Get hearing details.
#[utoipa::path(
    get,
    path = "/v1/hearings/{id}",
    params(("id" = String, Path, description = "Hearing UUID")),
    responses(
        (status = 200, description = "Hearing details", body = HearingResponse),
        (status = 404, description = "Hearing not found"),
    ),
    tag = "hearings"
)]
async fn get_hearing(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<HearingResponse>, AppError> {
    let hearing = state
        .hearings
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("hearing {id} not found")))?;
    Ok(Json(hearing_to_response(&hearing)))
}

/// POST /v1/hearings/:id/start — Scheduled → InProgress.
#[utoipa::path(
    post,
    path = "/v1/hearings/{id}/start",
    params(("id" = String, Path, description = "Hearing UUID")),
    request_body = ActorRequest,
    responses(
        (status = 200, description = "Session started", body = HearingResponse),
        (status = 404, description = "Not found"),
        (status = 409, description = "Invalid transition"),
    ),
    tag = "hearings"
)]
async fn start_hearing(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ActorRequest>,
) -> Result<Json<HearingResponse>, AppError> {
    let actor = parse_actor(req.actor_id, &req.actor_role)?;

    let result = state.hearings.try_update(&id, |hearing| {
        hearing
            .start(&actor, Utc::now())
            .map(|()| hearing_to_response(hearing))
    });

    match result {
        Some(Ok(resp)) => {
            state.events.publish(SessionEvent::now(
                SessionEventKind::HearingStarted,
                id,
                json!({ "actor_id": actor.id }),
            ));
            Ok(Json(resp))
        }
        Some(Err(e)) => Err(e.into()),
        None => Err(AppError::NotFound(format!("hearing {id} not found"))),
    }
}

/// POST /v1/hearings/:id/cancel — Scheduled → Cancelled.
#[utoipa::path(
    post,
    path = "/v1/hearings/{id}/cancel",
    params(("id" = String, Path, description = "Hearing UUID")),
    request_body = CancelRequest,
    responses(
        (status = 200, description = "Hearing cancelled", body = HearingResponse),
        (status = 404, description = "Not found"),
        (status = 409, description = "Invalid transition"),
    ),
    tag = "hearings"
)]
async fn cancel_hearing(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CancelRequest>,
) -> Result<Json<HearingResponse>, AppError> {
    let actor = parse_actor(req.actor_id, &req.actor_role)?;

    let result = state.hearings.try_update(&id, |hearing| {
        hearing
            .cancel(&actor, &req.reason, Utc::now())
            .map(|()| hearing_to_response(hearing))
    });

    match result {
        Some(Ok(resp)) => {
            state.events.publish(SessionEvent::now(
                SessionEventKind::HearingCancelled,
                id,
                json!({ "reason": req.reason }),
            ));
            state.events.close(&id);
            Ok(Json(resp))
        }
        Some(Err(e)) => Err(e.into()),
        None => Err(AppError::NotFound(format!("hearing {id} not found"))),
    }
}

/// POST /v1/hearings/:id/conclude — InProgress → Concluded.
///
/// Refuses while questions are still pending unless `force` is set, in
/// which case the pending questions are cancelled with the session.
#[utoipa::path(
    post,
    path = "/v1/hearings/{id}/conclude",
    params(("id" = String, Path, description = "Hearing UUID")),
    request_body = ConcludeRequest,
    responses(
        (status = 200, description = "Session concluded", body = HearingResponse),
        (status = 404, description = "Not found"),
        (status = 409, description = "Invalid transition or pending questions"),
    ),
    tag = "hearings"
)]
async fn conclude_hearing(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ConcludeRequest>,
) -> Result<Json<HearingResponse>, AppError> {
    let actor = parse_actor(req.actor_id, &req.actor_role)?;
    let now = Utc::now();

    // The pending-question gate runs under the hearing lock, so a question
    // posed while this handler is deciding cannot slip past the check.
    let result = state.hearings.try_update(&id, |hearing| {
        let pending = state
            .questions
            .filter(|q| *q.hearing_id.as_uuid() == id && q.status == QuestionStatus::Pending);
        if !pending.is_empty() && !req.force {
            return Err(AppError::Conflict(format!(
                "{} question(s) still pending; conclude with force to cancel them",
                pending.len()
            )));
        }
        hearing
            .conclude(&actor, req.summary.clone(), req.force, now)
            .map_err(AppError::from)?;
        Ok((hearing_to_response(hearing), pending))
    });

    match result {
        Some(Ok((resp, pending))) => {
            for question in &pending {
                let cancelled = state.questions.try_update(question.id.as_uuid(), |q| {
                    q.cancel(Some("hearing concluded".to_string()), now)
                });
                match cancelled {
                    Some(Ok(())) => {}
                    Some(Err(e)) => tracing::warn!(
                        question_id = %question.id,
                        "question not cancelled at conclusion: {e}"
                    ),
                    None => tracing::warn!(
                        question_id = %question.id,
                        "question vanished before cancellation at conclusion"
                    ),
                }
            }
            state.events.publish(SessionEvent::now(
                SessionEventKind::HearingConcluded,
                id,
                json!({ "cancelled_questions": pending.len() }),
            ));
            state.events.close(&id);
            Ok(Json(resp))
        }
        Some(Err(e)) => Err(e),
        None => Err(AppError::NotFound(format!("hearing {id} not found"))),
    }
}

/// POST /v1/hearings/:id/speaker-control — Change the floor setting.
#[utoipa::path(
    post,
    path = "/v1/hearings/{id}/speaker-control",
    params(("id" = String, Path, description = "Hearing UUID")),
    request_body = SpeakerControlRequest,
    responses(
        (status = 200, description = "Floor setting applied", body = HearingResponse),
        (status = 403, description = "Actor may not control the floor"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Session not live"),
    ),
    tag = "hearings"
)]
async fn set_speaker_control(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SpeakerControlRequest>,
) -> Result<Json<HearingResponse>, AppError> {
    let actor = parse_actor(req.actor_id, &req.actor_role)?;
    let setting = parse_speaker_control(&req.setting)?;
    let grace_seconds = req
        .grace_seconds
        .unwrap_or(state.config.grace_seconds)
        .min(tribunal_hearing::policy::GRACE_WINDOW_MAX_SECONDS);

    let result = state.hearings.try_update(&id, |hearing| {
        hearing
            .set_speaker_control(&actor, setting, grace_seconds, Utc::now())
            .map(|changed| (changed, hearing_to_response(hearing)))
    });

    match result {
        Some(Ok((changed, resp))) => {
            if changed {
                state.events.publish(SessionEvent::now(
                    SessionEventKind::SpeakerControlChanged,
                    id,
                    json!({ "setting": resp.speaker_control, "grace_seconds": grace_seconds }),
                ));
            }
            Ok(Json(resp))
        }
        Some(Err(e)) => Err(e.into()),
        None => Err(AppError::NotFound(format!("hearing {id} not found"))),
    }
}

/// POST /v1/hearings/:id/confirm — Confirm attendance.
#[utoipa::path(
    post,
    path = "/v1/hearings/{id}/confirm",
    params(("id" = String, Path, description = "Hearing UUID")),
    request_body = ConfirmRequest,
    responses(
        (status = 200, description = "Attendance confirmed", body = HearingResponse),
        (status = 403, description = "Not a participant"),
        (status = 404, description = "Not found"),
    ),
    tag = "hearings"
)]
async fn confirm_attendance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ConfirmRequest>,
) -> Result<Json<HearingResponse>, AppError> {
    let result = state.hearings.try_update(&id, |hearing| {
        hearing
            .confirm(req.user_id, Utc::now())
            .map(|()| hearing_to_response(hearing))
    });

    match result {
        Some(Ok(resp)) => {
            state.events.publish(SessionEvent::now(
                SessionEventKind::AttendanceConfirmed,
                id,
                json!({ "user_id": req.user_id }),
            ));
            Ok(Json(resp))
        }
        Some(Err(e)) => Err(e.into()),
        None => Err(AppError::NotFound(format!("hearing {id} not found"))),
    }
}

/// POST /v1/hearings/:id/presence — Record a join or leave signal.
#[utoipa::path(
    post,
    path = "/v1/hearings/{id}/presence",
    params(("id" = String, Path, description = "Hearing UUID")),
    request_body = PresenceRequest,
    responses(
        (status = 200, description = "Presence recorded", body = HearingResponse),
        (status = 403, description = "Not a participant"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Session not live"),
    ),
    tag = "hearings"
)]
async fn record_presence(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<PresenceRequest>,
) -> Result<Json<HearingResponse>, AppError> {
    let result = state.hearings.try_update(&id, |hearing| {
        hearing
            .record_presence(req.user_id, req.online, Utc::now())
            .map(|()| hearing_to_response(hearing))
    });

    match result {
        Some(Ok(resp)) => {
            state.events.publish(SessionEvent::now(
                SessionEventKind::PresenceChanged,
                id,
                json!({ "user_id": req.user_id, "online": req.online }),
            ));
            Ok(Json(resp))
        }
        Some(Err(e)) => Err(e.into()),
        None => Err(AppError::NotFound(format!("hearing {id} not found"))),
    }
}

/// GET /v1/hearings/:id/attendance — Roster with attendance detail.
#[utoipa::path(
    get,
    path = "/v1/hearings/{id}/attendance",
    params(("id" = String, Path, description = "Hearing UUID")),
    responses(
        (status = 200, description = "Roster with attendance", body = Vec<ParticipantResponse>),
        (status = 404, description = "Not found"),
    ),
    tag = "hearings"
)]
async fn get_attendance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ParticipantResponse>>, AppError> {
    let hearing = state
        .hearings
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("hearing {id} not found")))?;

    let roster = hearing
        .participants
        .iter()
        .map(participant_to_response)
        .collect();
    Ok(Json(roster))
}

/// GET /v1/hearings/:id/room — The full room view.
///
/// Combines the hearing with its roster, the visible transcript, the
/// questions, and the transition timeline in one response, so a session
/// client needs a single round trip to render the room.
#[utoipa::path(
    get,
    path = "/v1/hearings/{id}/room",
    params(("id" = String, Path, description = "Hearing UUID")),
    responses(
        (status = 200, description = "Aggregate room view", body = RoomResponse),
        (status = 404, description = "Not found"),
    ),
    tag = "hearings"
)]
async fn get_room(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RoomResponse>, AppError> {
    let hearing = state
        .hearings
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("hearing {id} not found")))?;
    let now = Utc::now();

    let mut statements = state
        .statements
        .filter(|s| *s.hearing_id.as_uuid() == id && !s.draft);
    statements.sort_by_key(|s| s.posted_at);
    let mut questions = state.questions.filter(|q| *q.hearing_id.as_uuid() == id);
    questions.sort_by_key(|q| q.asked_at);

    let timeline = hearing
        .transition_log
        .iter()
        .map(|t| TransitionResponse {
            from_status: t.from_status.as_str().to_string(),
            to_status: t.to_status.as_str().to_string(),
            actor_id: t.actor_id.to_string(),
            note: t.note.clone(),
            occurred_at: rfc3339(t.occurred_at),
        })
        .collect();

    Ok(Json(RoomResponse {
        participants: hearing
            .participants
            .iter()
            .map(participant_to_response)
            .collect(),
        statements: statements.iter().map(statement_to_response).collect(),
        questions: questions
            .iter()
            .map(|q| question_to_response(q, now))
            .collect(),
        timeline,
        hearing: hearing_to_response(&hearing),
    }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
