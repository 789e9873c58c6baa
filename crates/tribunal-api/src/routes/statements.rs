// SPDX-License-Identifier: BUSL-1.1
//! # Statement API Routes
//!
//! Posting and redaction of hearing statements. A statement passes the
//! floor gate at post time only; once admitted it stays part of the
//! transcript, and redaction hides the body without deleting the record.
//! Drafts are held back from the transcript and the per-type quota until
//! their author publishes them.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use tribunal_hearing::{ensure_within_limit, HearingStatus, Statement, StatementType};

use crate::error::AppError;
use crate::events::{SessionEvent, SessionEventKind};
use crate::routes::rfc3339;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

/// Request to post a statement into a live hearing.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PostStatementRequest {
    /// Posting participant.
    pub author_id: Uuid,
    /// Statement type: `opening`, `evidence`, `rebuttal`, `closing`, or
    /// `comment`.
    pub statement_type: String,
    /// Statement text.
    pub body: String,
    /// Hold the statement back as a draft.
    #[serde(default)]
    pub draft: bool,
}

/// Request to publish a held-back draft.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PublishStatementRequest {
    /// The draft's author.
    pub user_id: Uuid,
}

/// Request to redact a statement.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RedactStatementRequest {
    /// Acting user.
    pub actor_id: Uuid,
    /// Acting user's system role.
    pub actor_role: String,
    /// Why the body is being hidden. Served alongside the redacted entry.
    pub reason: String,
}

/// Statement as served in transcripts.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatementResponse {
    pub statement_id: String,
    pub hearing_id: String,
    pub author_id: String,
    pub author_role: String,
    pub statement_type: String,
    /// `None` when the statement has been redacted.
    pub body: Option<String>,
    pub draft: bool,
    pub posted_at: String,
    pub redacted: bool,
    pub redacted_by: Option<String>,
    pub redacted_at: Option<String>,
    pub redaction_reason: Option<String>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the statement router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/hearings/:id/statements",
            post(post_statement).get(get_transcript),
        )
        .route("/v1/statements/:id/publish", post(publish_statement))
        .route("/v1/statements/:id/redact", post(redact_statement))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_statement_type(s: &str) -> Result<StatementType, AppError> {
    match s {
        "opening" => Ok(StatementType::Opening),
        "evidence" => Ok(StatementType::Evidence),
        "rebuttal" => Ok(StatementType::Rebuttal),
        "closing" => Ok(StatementType::Closing),
        "comment" => Ok(StatementType::Comment),
        other => Err(AppError::Validation(format!(
            "unknown statement type: '{other}'"
        ))),
    }
}

/// Non-draft statements of one type the author has in the hearing.
fn published_count(
    state: &AppState,
    hearing_uuid: Uuid,
    author_id: Uuid,
    statement_type: StatementType,
) -> usize {
    state
        .statements
        .filter(|s| {
            *s.hearing_id.as_uuid() == hearing_uuid
                && s.author_id == author_id
                && s.statement_type == statement_type
                && !s.draft
        })
        .len()
}

pub(crate) fn statement_to_response(s: &Statement) -> StatementResponse {
    StatementResponse {
        statement_id: s.id.as_uuid().to_string(),
        hearing_id: s.hearing_id.as_uuid().to_string(),
        author_id: s.author_id.to_string(),
        author_role: s.author_role.as_str().to_string(),
        statement_type: s.statement_type.as_str().to_string(),
        body: s.visible_body().map(str::to_string),
        draft: s.draft,
        posted_at: rfc3339(s.posted_at),
        redacted: s.redacted,
        redacted_by: s.redacted_by.map(|id| id.to_string()),
        redacted_at: s.redacted_at.map(rfc3339),
        redaction_reason: s.redaction_reason.clone(),
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /v1/hearings/:id/statements — Post a statement to a live hearing.
#[utoipa::path(
    post,
    path = "/v1/hearings/{id}/statements",
    params(("id" = String, Path, description = "Hearing UUID")),
    request_body = PostStatementRequest,
    responses(
        (status = 201, description = "Statement posted", body = StatementResponse),
        (status = 403, description = "Floor closed to the author"),
        (status = 404, description = "Hearing not found"),
        (status = 409, description = "Session not live"),
        (status = 429, description = "Per-type statement limit reached"),
    ),
    tag = "statements"
)]
async fn post_statement(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<PostStatementRequest>,
) -> Result<(axum::http::StatusCode, Json<StatementResponse>), AppError> {
    let statement_type = parse_statement_type(&req.statement_type)?;
    let now = Utc::now();

    // The gate check and the statement insert are not a single atomic
    // step, but the per-type cap is a soft quota so a rare race past it
    // is acceptable. Drafts stay outside the quota until published.
    if !req.draft {
        let existing = published_count(&state, id, req.author_id, statement_type);
        ensure_within_limit(statement_type, existing)?;
    }

    let gate = state.hearings.try_update(&id, |hearing| {
        hearing
            .ensure_may_post(req.author_id, now)
            .map(|role| (hearing.id.clone(), role))
    });

    let (hearing_id, author_role) = match gate {
        Some(Ok(pair)) => pair,
        Some(Err(e)) => return Err(e.into()),
        None => return Err(AppError::NotFound(format!("hearing {id} not found"))),
    };

    let statement = Statement::post(
        hearing_id,
        req.author_id,
        author_role,
        statement_type,
        &req.body,
        req.draft,
        now,
    )?;

    let response = statement_to_response(&statement);
    state
        .statements
        .insert(*statement.id.as_uuid(), statement);
    if !response.draft {
        state.events.publish(SessionEvent::now(
            SessionEventKind::StatementPosted,
            id,
            json!({
                "statement_id": response.statement_id,
                "author_id": req.author_id,
                "statement_type": response.statement_type,
            }),
        ));
    }

    Ok((axum::http::StatusCode::CREATED, Json(response)))
}

/// GET /v1/hearings/:id/statements — The hearing transcript in post order.
#[utoipa::path(
    get,
    path = "/v1/hearings/{id}/statements",
    params(("id" = String, Path, description = "Hearing UUID")),
    responses(
        (status = 200, description = "Transcript", body = Vec<StatementResponse>),
        (status = 404, description = "Hearing not found"),
    ),
    tag = "statements"
)]
async fn get_transcript(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<StatementResponse>>, AppError> {
    if !state.hearings.contains(&id) {
        return Err(AppError::NotFound(format!("hearing {id} not found")));
    }
    let mut statements = state
        .statements
        .filter(|s| *s.hearing_id.as_uuid() == id && !s.draft);
    statements.sort_by_key(|s| s.posted_at);
    let responses = statements.iter().map(statement_to_response).collect();
    Ok(Json(responses))
}

/// POST /v1/statements/:id/publish — Publish a held-back draft.
///
/// Publication re-checks the per-type quota; a draft cannot sidestep the
/// cap by being posted early.
#[utoipa::path(
    post,
    path = "/v1/statements/{id}/publish",
    params(("id" = String, Path, description = "Statement UUID")),
    request_body = PublishStatementRequest,
    responses(
        (status = 200, description = "Draft published", body = StatementResponse),
        (status = 403, description = "Only the author may publish"),
        (status = 404, description = "Statement not found"),
        (status = 409, description = "Session not live"),
        (status = 422, description = "Statement is not a draft"),
        (status = 429, description = "Per-type statement limit reached"),
    ),
    tag = "statements"
)]
async fn publish_statement(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<PublishStatementRequest>,
) -> Result<Json<StatementResponse>, AppError> {
    let statement = state
        .statements
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("statement {id} not found")))?;
    let hearing_uuid = *statement.hearing_id.as_uuid();
    // A draft enters the record like a fresh post, so the session must
    // still be live.
    let hearing = state
        .hearings
        .get(&hearing_uuid)
        .ok_or_else(|| AppError::NotFound(format!("hearing {hearing_uuid} not found")))?;
    if hearing.status != HearingStatus::InProgress {
        return Err(AppError::Conflict(format!(
            "hearing in {} does not accept statements",
            hearing.status
        )));
    }
    if statement.draft {
        let existing = published_count(
            &state,
            hearing_uuid,
            statement.author_id,
            statement.statement_type,
        );
        ensure_within_limit(statement.statement_type, existing)?;
    }

    let now = Utc::now();
    let result = state.statements.try_update(&id, |statement| {
        statement
            .publish(req.user_id, now)
            .map(|()| statement_to_response(statement))
    });

    match result {
        Some(Ok(resp)) => {
            state.events.publish(SessionEvent::now(
                SessionEventKind::StatementPosted,
                hearing_uuid,
                json!({
                    "statement_id": resp.statement_id,
                    "author_id": resp.author_id,
                    "statement_type": resp.statement_type,
                    "published_draft": true,
                }),
            ));
            Ok(Json(resp))
        }
        Some(Err(e)) => Err(e.into()),
        None => Err(AppError::NotFound(format!("statement {id} not found"))),
    }
}

/// POST /v1/statements/:id/redact — Hide a statement's body.
#[utoipa::path(
    post,
    path = "/v1/statements/{id}/redact",
    params(("id" = String, Path, description = "Statement UUID")),
    request_body = RedactStatementRequest,
    responses(
        (status = 200, description = "Statement redacted", body = StatementResponse),
        (status = 403, description = "Actor may not redact"),
        (status = 404, description = "Statement not found"),
        (status = 409, description = "Already redacted"),
        (status = 422, description = "A redaction reason is required"),
    ),
    tag = "statements"
)]
async fn redact_statement(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<RedactStatementRequest>,
) -> Result<Json<StatementResponse>, AppError> {
    let actor = crate::routes::parse_actor(req.actor_id, &req.actor_role)?;

    let statement = state
        .statements
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("statement {id} not found")))?;
    let hearing = state
        .hearings
        .get(statement.hearing_id.as_uuid())
        .ok_or_else(|| {
            AppError::NotFound(format!("hearing {} not found", statement.hearing_id))
        })?;
    if !hearing.is_moderator_capable(&actor) {
        return Err(AppError::Forbidden(format!(
            "user {} may not redact statements in this hearing",
            actor.id
        )));
    }

    let result = state.statements.try_update(&id, |statement| {
        statement
            .redact(actor.id, &req.reason, Utc::now())
            .map(|()| statement_to_response(statement))
    });

    match result {
        Some(Ok(resp)) => {
            state.events.publish(SessionEvent::now(
                SessionEventKind::StatementRedacted,
                *hearing.id.as_uuid(),
                json!({
                    "statement_id": resp.statement_id,
                    "redacted_by": actor.id,
                    "reason": req.reason,
                }),
            ));
            Ok(Json(resp))
        }
        Some(Err(e)) => Err(e.into()),
        None => Err(AppError::NotFound(format!("statement {id} not found"))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
