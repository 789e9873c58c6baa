// SPDX-License-Identifier: BUSL-1.1
//! # Reschedule Negotiation API Routes
//!
//! Participant-initiated time negotiation. A participant opens a request
//! against a scheduled hearing; an admin approves it onto a verified slot,
//! rejects it with a note, or lets the allocator auto-resolve it. Approval
//! spawns a successor hearing and marks the original `RESCHEDULED`.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use tribunal_calendar::{
    find_slots, slot_is_offered, RescheduleRequest, RescheduleStatus, ScheduleError, SlotQuery,
};
use tribunal_hearing::{Hearing, HearingStatus};

use crate::error::AppError;
use crate::events::{SessionEvent, SessionEventKind};
use crate::routes::{busy_intervals, parse_actor, rfc3339};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

/// Request to open a reschedule negotiation.
#[derive(Debug, Deserialize, ToSchema)]
pub struct OpenRescheduleRequest {
    /// Acting user. Admins may open inside the notice cutoff.
    pub actor_id: Uuid,
    /// Acting user's system role.
    pub actor_role: String,
    /// Requesting participant.
    pub requested_by: Uuid,
    /// Why the current time does not work.
    pub reason: String,
    /// A concrete replacement start, if the requester has one.
    pub proposed_start: Option<DateTime<Utc>>,
    /// Preferred starts to bias slot search, most preferred first.
    #[serde(default)]
    pub preferred_starts: Vec<DateTime<Utc>>,
    /// Let the allocator pick the slot. Required when no start is proposed.
    #[serde(default)]
    pub auto_schedule: bool,
}

/// Request to approve a negotiation onto a slot.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ApproveRescheduleRequest {
    /// Acting user.
    pub actor_id: Uuid,
    /// Acting user's system role.
    pub actor_role: String,
    /// The chosen start. Falls back to the requester's proposed start.
    pub selected_start: Option<DateTime<Utc>>,
    /// Optional processing note.
    pub note: Option<String>,
}

/// Request to reject a negotiation.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RejectRescheduleRequest {
    /// Acting user.
    pub actor_id: Uuid,
    /// Acting user's system role.
    pub actor_role: String,
    /// Why the request is refused.
    pub note: String,
}

/// Request to withdraw a negotiation.
#[derive(Debug, Deserialize, ToSchema)]
pub struct WithdrawRescheduleRequest {
    /// The withdrawing user. Must be the original requester.
    pub user_id: Uuid,
}

/// Request to auto-resolve a negotiation via the slot allocator.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AutoResolveRequest {
    /// Acting user.
    pub actor_id: Uuid,
    /// Acting user's system role.
    pub actor_role: String,
}

/// Negotiation state in API responses.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RescheduleResponse {
    pub request_id: String,
    pub hearing_id: String,
    pub requested_by: String,
    pub reason: String,
    pub proposed_start: Option<String>,
    pub auto_schedule: bool,
    pub status: String,
    pub created_at: String,
    /// `None` while pending, and for allocator-resolved requests.
    pub processed_by: Option<String>,
    pub processed_at: Option<String>,
    pub process_note: Option<String>,
    pub selected_start: Option<String>,
    /// Successor hearing, once the request is approved or auto-resolved.
    pub new_hearing_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the reschedule negotiation router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/hearings/:id/reschedule-requests",
            post(open_request).get(list_requests),
        )
        .route("/v1/reschedule-requests/:id", get(get_request))
        .route("/v1/reschedule-requests/:id/approve", post(approve_request))
        .route("/v1/reschedule-requests/:id/reject", post(reject_request))
        .route("/v1/reschedule-requests/:id/withdraw", post(withdraw_request))
        .route(
            "/v1/reschedule-requests/:id/auto-resolve",
            post(auto_resolve_request),
        )
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn request_to_response(r: &RescheduleRequest) -> RescheduleResponse {
    RescheduleResponse {
        request_id: r.id.as_uuid().to_string(),
        hearing_id: r.hearing_id.as_uuid().to_string(),
        requested_by: r.requested_by.to_string(),
        reason: r.reason.clone(),
        proposed_start: r.proposed_start.map(rfc3339),
        auto_schedule: r.auto_schedule,
        status: r.status.as_str().to_string(),
        created_at: rfc3339(r.created_at),
        processed_by: r.processed_by.map(|id| id.to_string()),
        processed_at: r.processed_at.map(rfc3339),
        process_note: r.process_note.clone(),
        selected_start: r.selected_start.map(rfc3339),
        new_hearing_id: r.new_hearing_id.as_ref().map(|id| id.as_uuid().to_string()),
    }
}

/// Fetch a pending request along with its still-scheduled hearing.
fn load_request_and_hearing(
    state: &AppState,
    request_id: &Uuid,
) -> Result<(RescheduleRequest, Hearing), AppError> {
    let request = state
        .reschedules
        .get(request_id)
        .ok_or_else(|| AppError::NotFound(format!("reschedule request {request_id} not found")))?;
    let hearing = state
        .hearings
        .get(request.hearing_id.as_uuid())
        .ok_or_else(|| {
            AppError::NotFound(format!("hearing {} not found", request.hearing_id))
        })?;
    Ok((request, hearing))
}

/// Verify a chosen start against the allocator, then replace the hearing.
///
/// Returns the successor hearing once the original has been marked
/// rescheduled. The slot must come back from a fresh search that excludes
/// the hearing being moved, so the verdict reflects real availability.
fn verify_and_replace(
    state: &AppState,
    hearing: &Hearing,
    selected_start: DateTime<Utc>,
    actor: &tribunal_hearing::Actor,
    now: DateTime<Utc>,
) -> Result<Hearing, AppError> {
    let rule = &state.config.schedule_rule;
    let hearing_uuid = *hearing.id.as_uuid();
    let busy = busy_intervals(state, Some(hearing_uuid));
    let query = SlotQuery {
        from: selected_start,
        duration_minutes: hearing.duration_minutes,
        preferred_starts: vec![selected_start],
    };
    let candidates = find_slots(rule, &[hearing.moderator_id], &busy, &query)
        .map_err(|_| AppError::from(ScheduleError::SlotUnavailable))?;
    if !slot_is_offered(&candidates, hearing.moderator_id, selected_start) {
        return Err(ScheduleError::SlotUnavailable.into());
    }

    let successor = hearing.reschedule_successor(selected_start, actor, now)?;
    let successor_uuid = *successor.id.as_uuid();
    state.hearings.insert(successor_uuid, successor.clone());

    let successor_id = successor.id.clone();
    let marked = state.hearings.try_update(&hearing_uuid, |h| {
        h.mark_rescheduled(actor, &successor_id, now)
    });
    match marked {
        Some(Ok(())) => {}
        Some(Err(e)) => {
            // Roll back the successor so a racing transition cannot leave
            // two live hearings for the dispute.
            state.hearings.remove(&successor_uuid);
            return Err(e.into());
        }
        None => {
            state.hearings.remove(&successor_uuid);
            return Err(AppError::NotFound(format!(
                "hearing {hearing_uuid} not found"
            )));
        }
    }

    state.events.publish(SessionEvent::now(
        SessionEventKind::HearingRescheduled,
        hearing_uuid,
        json!({
            "new_hearing_id": successor_uuid,
            "selected_start": rfc3339(selected_start),
        }),
    ));
    state.events.close(&hearing_uuid);
    Ok(successor)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /v1/hearings/:id/reschedule-requests — Open a negotiation.
#[utoipa::path(
    post,
    path = "/v1/hearings/{id}/reschedule-requests",
    params(("id" = String, Path, description = "Hearing UUID")),
    request_body = OpenRescheduleRequest,
    responses(
        (status = 201, description = "Request opened", body = RescheduleResponse),
        (status = 403, description = "Requester is not a participant"),
        (status = 404, description = "Hearing not found"),
        (status = 409, description = "A pending request already exists"),
        (status = 422, description = "Validation error"),
        (status = 429, description = "Reschedule limit reached"),
    ),
    tag = "reschedule"
)]
async fn open_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<OpenRescheduleRequest>,
) -> Result<(axum::http::StatusCode, Json<RescheduleResponse>), AppError> {
    let actor = parse_actor(req.actor_id, &req.actor_role)?;
    let now = Utc::now();
    let hearing = state
        .hearings
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("hearing {id} not found")))?;

    if hearing.participant(req.requested_by).is_none() {
        return Err(AppError::Forbidden(format!(
            "user {} is not a participant of this hearing",
            req.requested_by
        )));
    }
    if hearing.status != HearingStatus::Scheduled {
        return Err(AppError::Conflict(format!(
            "hearing in {} cannot be rescheduled",
            hearing.status
        )));
    }
    RescheduleRequest::check_admissible(
        &state.config.schedule_rule,
        hearing.scheduled_at,
        hearing.reschedule_count,
        actor.is_admin(),
        now,
    )?;

    let existing_pending = state.reschedules.filter(|r| {
        *r.hearing_id.as_uuid() == id && r.status == RescheduleStatus::Pending
    });
    if let Some(open) = existing_pending.first() {
        return Err(ScheduleError::PendingRequestExists {
            hearing_id: open.hearing_id.to_string(),
        }
        .into());
    }

    let request = RescheduleRequest::open(
        hearing.id.clone(),
        req.requested_by,
        &req.reason,
        req.proposed_start,
        req.preferred_starts.clone(),
        req.auto_schedule,
        now,
    )?;

    let response = request_to_response(&request);
    state.reschedules.insert(*request.id.as_uuid(), request);
    state.events.publish(SessionEvent::now(
        SessionEventKind::RescheduleRequested,
        id,
        json!({
            "request_id": response.request_id,
            "requested_by": req.requested_by,
        }),
    ));

    Ok((axum::http::StatusCode::CREATED, Json(response)))
}

/// GET /v1/hearings/:id/reschedule-requests — Negotiations for a hearing.
#[utoipa::path(
    get,
    path = "/v1/hearings/{id}/reschedule-requests",
    params(("id" = String, Path, description = "Hearing UUID")),
    responses(
        (status = 200, description = "Requests for the hearing", body = Vec<RescheduleResponse>),
        (status = 404, description = "Hearing not found"),
    ),
    tag = "reschedule"
)]
async fn list_requests(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<RescheduleResponse>>, AppError> {
    if !state.hearings.contains(&id) {
        return Err(AppError::NotFound(format!("hearing {id} not found")));
    }
    let mut requests = state.reschedules.filter(|r| *r.hearing_id.as_uuid() == id);
    requests.sort_by_key(|r| r.created_at);
    let responses = requests.iter().map(request_to_response).collect();
    Ok(Json(responses))
}

/// GET /v1/reschedule-requests/:id — Negotiation details.
#[utoipa::path(
    get,
    path = "/v1/reschedule-requests/{id}",
    params(("id" = String, Path, description = "Request UUID")),
    responses(
        (status = 200, description = "Request details", body = RescheduleResponse),
        (status = 404, description = "Request not found"),
    ),
    tag = "reschedule"
)]
async fn get_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RescheduleResponse>, AppError> {
    let request = state
        .reschedules
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("reschedule request {id} not found")))?;
    Ok(Json(request_to_response(&request)))
}

/// POST /v1/reschedule-requests/:id/approve — Approve onto a slot.
#[utoipa::path(
    post,
    path = "/v1/reschedule-requests/{id}/approve",
    params(("id" = String, Path, description = "Request UUID")),
    request_body = ApproveRescheduleRequest,
    responses(
        (status = 200, description = "Request approved", body = RescheduleResponse),
        (status = 403, description = "Only admins approve"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request already processed"),
        (status = 422, description = "Start not among the requester's proposals, or slot unavailable"),
    ),
    tag = "reschedule"
)]
async fn approve_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ApproveRescheduleRequest>,
) -> Result<Json<RescheduleResponse>, AppError> {
    let actor = parse_actor(req.actor_id, &req.actor_role)?;
    if !actor.is_admin() {
        return Err(AppError::Forbidden(format!(
            "user {} may not approve reschedule requests",
            actor.id
        )));
    }
    let now = Utc::now();

    let (request, hearing) = load_request_and_hearing(&state, &id)?;
    if request.status != RescheduleStatus::Pending {
        return Err(ScheduleError::AlreadyProcessed {
            status: request.status.as_str().to_string(),
        }
        .into());
    }
    let selected_start = req
        .selected_start
        .or(request.proposed_start)
        .ok_or(ScheduleError::SlotNotProposed)?;
    // Approval commits onto a start the requester actually asked for.
    if !request.proposes(selected_start) {
        return Err(ScheduleError::SlotNotProposed.into());
    }

    let successor = verify_and_replace(&state, &hearing, selected_start, &actor, now)?;

    let result = state.reschedules.try_update(&id, |request| {
        request
            .approve(
                actor.id,
                selected_start,
                successor.id.clone(),
                req.note.clone(),
                now,
            )
            .map(|()| request_to_response(request))
    });

    match result {
        Some(Ok(resp)) => {
            state.events.publish(SessionEvent::now(
                SessionEventKind::RescheduleResolved,
                *hearing.id.as_uuid(),
                json!({ "request_id": resp.request_id, "status": resp.status }),
            ));
            Ok(Json(resp))
        }
        Some(Err(e)) => Err(e.into()),
        None => Err(AppError::NotFound(format!(
            "reschedule request {id} not found"
        ))),
    }
}

/// POST /v1/reschedule-requests/:id/reject — Refuse with a note.
#[utoipa::path(
    post,
    path = "/v1/reschedule-requests/{id}/reject",
    params(("id" = String, Path, description = "Request UUID")),
    request_body = RejectRescheduleRequest,
    responses(
        (status = 200, description = "Request rejected", body = RescheduleResponse),
        (status = 403, description = "Only admins reject"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request already processed"),
        (status = 422, description = "A rejection note is required"),
    ),
    tag = "reschedule"
)]
async fn reject_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<RejectRescheduleRequest>,
) -> Result<Json<RescheduleResponse>, AppError> {
    let actor = parse_actor(req.actor_id, &req.actor_role)?;
    if !actor.is_admin() {
        return Err(AppError::Forbidden(format!(
            "user {} may not reject reschedule requests",
            actor.id
        )));
    }

    let result = state.reschedules.try_update(&id, |request| {
        request
            .reject(actor.id, &req.note, Utc::now())
            .map(|()| (*request.hearing_id.as_uuid(), request_to_response(request)))
    });

    match result {
        Some(Ok((hearing_uuid, resp))) => {
            state.events.publish(SessionEvent::now(
                SessionEventKind::RescheduleResolved,
                hearing_uuid,
                json!({ "request_id": resp.request_id, "status": resp.status }),
            ));
            Ok(Json(resp))
        }
        Some(Err(e)) => Err(e.into()),
        None => Err(AppError::NotFound(format!(
            "reschedule request {id} not found"
        ))),
    }
}

/// POST /v1/reschedule-requests/:id/withdraw — Requester backs out.
#[utoipa::path(
    post,
    path = "/v1/reschedule-requests/{id}/withdraw",
    params(("id" = String, Path, description = "Request UUID")),
    request_body = WithdrawRescheduleRequest,
    responses(
        (status = 200, description = "Request withdrawn", body = RescheduleResponse),
        (status = 403, description = "Only the requester may withdraw"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request already processed"),
    ),
    tag = "reschedule"
)]
async fn withdraw_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<WithdrawRescheduleRequest>,
) -> Result<Json<RescheduleResponse>, AppError> {
    let result = state.reschedules.try_update(&id, |request| {
        request
            .withdraw(req.user_id, Utc::now())
            .map(|()| request_to_response(request))
    });

    match result {
        Some(Ok(resp)) => Ok(Json(resp)),
        Some(Err(e)) => Err(e.into()),
        None => Err(AppError::NotFound(format!(
            "reschedule request {id} not found"
        ))),
    }
}

/// POST /v1/reschedule-requests/:id/auto-resolve — Allocator picks the slot.
#[utoipa::path(
    post,
    path = "/v1/reschedule-requests/{id}/auto-resolve",
    params(("id" = String, Path, description = "Request UUID")),
    request_body = AutoResolveRequest,
    responses(
        (status = 200, description = "Request auto-resolved, or rejected when no slot exists", body = RescheduleResponse),
        (status = 403, description = "Only admins trigger auto-resolution"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request already processed"),
        (status = 422, description = "Requester did not ask for automatic scheduling"),
    ),
    tag = "reschedule"
)]
async fn auto_resolve_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AutoResolveRequest>,
) -> Result<Json<RescheduleResponse>, AppError> {
    let actor = parse_actor(req.actor_id, &req.actor_role)?;
    if !actor.is_admin() {
        return Err(AppError::Forbidden(format!(
            "user {} may not auto-resolve reschedule requests",
            actor.id
        )));
    }
    let now = Utc::now();

    let (request, hearing) = load_request_and_hearing(&state, &id)?;
    if request.status != RescheduleStatus::Pending {
        return Err(ScheduleError::AlreadyProcessed {
            status: request.status.as_str().to_string(),
        }
        .into());
    }
    if !request.auto_schedule {
        return Err(AppError::Validation(
            "requester did not ask for automatic scheduling".to_string(),
        ));
    }
    let hearing_uuid = *hearing.id.as_uuid();
    let busy = busy_intervals(&state, Some(hearing_uuid));
    let query = SlotQuery {
        from: now,
        duration_minutes: hearing.duration_minutes,
        preferred_starts: request.preferred_starts.clone(),
    };
    let candidates = match find_slots(
        &state.config.schedule_rule,
        &[hearing.moderator_id],
        &busy,
        &query,
    ) {
        Ok(candidates) => candidates,
        Err(ScheduleError::NoSlotAvailable) => {
            // The calendar has nothing to offer; settle the request as
            // rejected so the requester is not left waiting.
            let result = state.reschedules.try_update(&id, |request| {
                request
                    .reject(actor.id, "no slot available within the search window", now)
                    .map(|()| request_to_response(request))
            });
            return match result {
                Some(Ok(resp)) => {
                    state.events.publish(SessionEvent::now(
                        SessionEventKind::RescheduleResolved,
                        hearing_uuid,
                        json!({ "request_id": resp.request_id, "status": resp.status }),
                    ));
                    Ok(Json(resp))
                }
                Some(Err(e)) => Err(e.into()),
                None => Err(AppError::NotFound(format!(
                    "reschedule request {id} not found"
                ))),
            };
        }
        Err(e) => return Err(e.into()),
    };
    // find_slots never returns an empty set without erroring.
    let best = candidates[0].start;

    let successor = verify_and_replace(&state, &hearing, best, &actor, now)?;

    let note = format!("auto-resolved onto {}", rfc3339(best));
    let result = state.reschedules.try_update(&id, |request| {
        request
            .auto_resolve(best, successor.id.clone(), Some(note.clone()), now)
            .map(|()| request_to_response(request))
    });

    match result {
        Some(Ok(resp)) => {
            state.events.publish(SessionEvent::now(
                SessionEventKind::RescheduleResolved,
                hearing_uuid,
                json!({ "request_id": resp.request_id, "status": resp.status }),
            ));
            Ok(Json(resp))
        }
        Some(Err(e)) => Err(e.into()),
        None => Err(AppError::NotFound(format!(
            "reschedule request {id} not found"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
