// SPDX-License-Identifier: BUSL-1.1
//! # Question API Routes
//!
//! Moderator-posed questions with answer deadlines. A question is posed to
//! one non-moderator roster member during a live session; the addressee
//! answers within the deadline, or late with the answer flagged as overdue.
//! Posing a question also steers the floor toward the addressee's side so
//! they can respond in the transcript.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use tribunal_hearing::{control_for_target, HearingStatus, ParticipantRole, Question};

use crate::error::AppError;
use crate::events::{SessionEvent, SessionEventKind};
use crate::routes::{parse_actor, rfc3339};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

/// Request to pose a question to a participant.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PoseQuestionRequest {
    /// Acting user.
    pub actor_id: Uuid,
    /// Acting user's system role.
    pub actor_role: String,
    /// The roster member who must answer.
    pub addressee: Uuid,
    /// Question text.
    pub text: String,
    /// Answer deadline in minutes, clamped to the supported range. Absent
    /// leaves the question without a deadline.
    pub deadline_minutes: Option<i64>,
}

/// Request to answer a question.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AnswerQuestionRequest {
    /// The answering user. Must be the addressee.
    pub user_id: Uuid,
    /// Answer text.
    pub text: String,
}

/// Request to cancel a pending question.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CancelQuestionRequest {
    /// Acting user.
    pub actor_id: Uuid,
    /// Acting user's system role.
    pub actor_role: String,
    /// Why the question is being withdrawn.
    pub reason: Option<String>,
}

/// Question state in API responses.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QuestionResponse {
    pub question_id: String,
    pub hearing_id: String,
    pub asked_by: String,
    pub addressee: String,
    pub text: String,
    pub deadline_minutes: Option<i64>,
    pub asked_at: String,
    pub deadline_at: Option<String>,
    pub status: String,
    pub answer: Option<String>,
    pub answered_at: Option<String>,
    pub cancel_reason: Option<String>,
    /// True once the deadline has passed without an answer, or when the
    /// answer arrived late.
    pub overdue: bool,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the question router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/hearings/:id/questions",
            post(pose_question).get(list_questions),
        )
        .route("/v1/questions/:id/answer", post(answer_question))
        .route("/v1/questions/:id/cancel", post(cancel_question))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub(crate) fn question_to_response(q: &Question, now: chrono::DateTime<Utc>) -> QuestionResponse {
    QuestionResponse {
        question_id: q.id.as_uuid().to_string(),
        hearing_id: q.hearing_id.as_uuid().to_string(),
        asked_by: q.asked_by.to_string(),
        addressee: q.addressee.to_string(),
        text: q.text.clone(),
        deadline_minutes: q.deadline_minutes,
        asked_at: rfc3339(q.asked_at),
        deadline_at: q.deadline_at.map(rfc3339),
        status: q.status.as_str().to_string(),
        answer: q.answer.clone(),
        answered_at: q.answered_at.map(rfc3339),
        cancel_reason: q.cancel_reason.clone(),
        overdue: q.overdue || q.is_past_deadline(now),
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /v1/hearings/:id/questions — Pose a question during a live session.
#[utoipa::path(
    post,
    path = "/v1/hearings/{id}/questions",
    params(("id" = String, Path, description = "Hearing UUID")),
    request_body = PoseQuestionRequest,
    responses(
        (status = 201, description = "Question posed", body = QuestionResponse),
        (status = 403, description = "Actor may not pose questions"),
        (status = 404, description = "Hearing not found"),
        (status = 409, description = "Session not live"),
        (status = 422, description = "Validation error"),
    ),
    tag = "questions"
)]
async fn pose_question(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<PoseQuestionRequest>,
) -> Result<(axum::http::StatusCode, Json<QuestionResponse>), AppError> {
    let actor = parse_actor(req.actor_id, &req.actor_role)?;
    let now = Utc::now();

    let hearing = state
        .hearings
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("hearing {id} not found")))?;
    if !hearing.is_moderator_capable(&actor) {
        return Err(AppError::Forbidden(format!(
            "user {} may not pose questions in this hearing",
            actor.id
        )));
    }
    if hearing.status != HearingStatus::InProgress {
        return Err(AppError::Conflict(format!(
            "questions can only be posed while the session is live, not in {}",
            hearing.status
        )));
    }
    let addressee = hearing.participant(req.addressee).ok_or_else(|| {
        AppError::Validation(format!(
            "addressee {} is not on the hearing roster",
            req.addressee
        ))
    })?;
    if addressee.role == ParticipantRole::Moderator {
        return Err(AppError::Validation(
            "questions cannot be addressed to the moderator".to_string(),
        ));
    }
    let addressee_role = addressee.role;

    let question = Question::pose(
        hearing.id.clone(),
        actor.id,
        req.addressee,
        &req.text,
        req.deadline_minutes,
        now,
    )?;

    let response = question_to_response(&question, now);
    state.questions.insert(*question.id.as_uuid(), question);
    state.events.publish(SessionEvent::now(
        SessionEventKind::QuestionPosed,
        id,
        json!({
            "question_id": response.question_id,
            "addressee": req.addressee,
            "deadline_at": response.deadline_at,
        }),
    ));

    // Hand the floor to the addressee's side so they can answer on record.
    if let Some(floor) = control_for_target(addressee_role) {
        let changed = state.hearings.try_update(&id, |hearing| {
            hearing.set_speaker_control(&actor, floor, state.config.grace_seconds, now)
        });
        if let Some(Ok(true)) = changed {
            state.events.publish(SessionEvent::now(
                SessionEventKind::SpeakerControlChanged,
                id,
                json!({ "setting": floor.as_str(), "trigger": "question" }),
            ));
        }
    }

    Ok((axum::http::StatusCode::CREATED, Json(response)))
}

/// GET /v1/hearings/:id/questions — Questions for a hearing, oldest first.
#[utoipa::path(
    get,
    path = "/v1/hearings/{id}/questions",
    params(("id" = String, Path, description = "Hearing UUID")),
    responses(
        (status = 200, description = "Questions for the hearing", body = Vec<QuestionResponse>),
        (status = 404, description = "Hearing not found"),
    ),
    tag = "questions"
)]
async fn list_questions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<QuestionResponse>>, AppError> {
    if !state.hearings.contains(&id) {
        return Err(AppError::NotFound(format!("hearing {id} not found")));
    }
    let now = Utc::now();
    let mut questions = state.questions.filter(|q| *q.hearing_id.as_uuid() == id);
    questions.sort_by_key(|q| q.asked_at);
    let responses = questions
        .iter()
        .map(|q| question_to_response(q, now))
        .collect();
    Ok(Json(responses))
}

/// POST /v1/questions/:id/answer — Answer a pending question.
///
/// An answer past the deadline is still recorded, with the question
/// flagged overdue.
#[utoipa::path(
    post,
    path = "/v1/questions/{id}/answer",
    params(("id" = String, Path, description = "Question UUID")),
    request_body = AnswerQuestionRequest,
    responses(
        (status = 200, description = "Answer recorded", body = QuestionResponse),
        (status = 403, description = "Only the addressee may answer"),
        (status = 404, description = "Question not found"),
        (status = 409, description = "Question no longer pending"),
    ),
    tag = "questions"
)]
async fn answer_question(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AnswerQuestionRequest>,
) -> Result<Json<QuestionResponse>, AppError> {
    let now = Utc::now();
    let result = state.questions.try_update(&id, |question| {
        question
            .answer(req.user_id, &req.text, now)
            .map(|()| (*question.hearing_id.as_uuid(), question_to_response(question, now)))
    });

    match result {
        Some(Ok((hearing_uuid, resp))) => {
            state.events.publish(SessionEvent::now(
                SessionEventKind::QuestionAnswered,
                hearing_uuid,
                json!({ "question_id": resp.question_id, "overdue": resp.overdue }),
            ));
            Ok(Json(resp))
        }
        Some(Err(e)) => Err(e.into()),
        None => Err(AppError::NotFound(format!("question {id} not found"))),
    }
}

/// POST /v1/questions/:id/cancel — Withdraw a pending question.
#[utoipa::path(
    post,
    path = "/v1/questions/{id}/cancel",
    params(("id" = String, Path, description = "Question UUID")),
    request_body = CancelQuestionRequest,
    responses(
        (status = 200, description = "Question cancelled", body = QuestionResponse),
        (status = 403, description = "Actor may not cancel"),
        (status = 404, description = "Question not found"),
        (status = 409, description = "Question no longer pending"),
    ),
    tag = "questions"
)]
async fn cancel_question(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CancelQuestionRequest>,
) -> Result<Json<QuestionResponse>, AppError> {
    let actor = parse_actor(req.actor_id, &req.actor_role)?;

    let question = state
        .questions
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("question {id} not found")))?;
    let hearing = state
        .hearings
        .get(question.hearing_id.as_uuid())
        .ok_or_else(|| {
            AppError::NotFound(format!("hearing {} not found", question.hearing_id))
        })?;
    if !hearing.is_moderator_capable(&actor) {
        return Err(AppError::Forbidden(format!(
            "user {} may not cancel questions in this hearing",
            actor.id
        )));
    }

    let now = Utc::now();
    let result = state.questions.try_update(&id, |question| {
        question
            .cancel(req.reason.clone(), now)
            .map(|()| question_to_response(question, now))
    });

    match result {
        Some(Ok(resp)) => {
            state.events.publish(SessionEvent::now(
                SessionEventKind::QuestionCancelled,
                *hearing.id.as_uuid(),
                json!({ "question_id": resp.question_id }),
            ));
            Ok(Json(resp))
        }
        Some(Err(e)) => Err(e.into()),
        None => Err(AppError::NotFound(format!("question {id} not found"))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
