// SPDX-License-Identifier: BUSL-1.1
//! # Calendar API Routes
//!
//! Slot discovery against the configured scheduling rule. Search takes a
//! set of staff members and a window start and returns ranked candidate
//! slots, already filtered for working hours, buffers, and daily load.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use tribunal_calendar::{find_slots, ScheduleRule, SlotQuery};

use crate::error::AppError;
use crate::routes::{busy_intervals, rfc3339};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

/// Slot search request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SlotSearchRequest {
    /// Staff members to consider for the slot.
    pub staff_ids: Vec<Uuid>,
    /// Search window start. Defaults to now.
    pub from: Option<DateTime<Utc>>,
    /// Requested duration in minutes. Zero or absent means the rule default.
    #[serde(default)]
    pub duration_minutes: i64,
    /// Preferred starts to bias ranking, most preferred first.
    #[serde(default)]
    pub preferred_starts: Vec<DateTime<Utc>>,
}

/// One ranked slot candidate.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SlotResponse {
    pub start: String,
    pub end: String,
    pub staff_id: String,
    pub score: i64,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the calendar router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/calendar/slots/search", post(search_slots))
        .route("/v1/calendar/rule", get(get_rule))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /v1/calendar/slots/search — Ranked candidate slots.
#[utoipa::path(
    post,
    path = "/v1/calendar/slots/search",
    request_body = SlotSearchRequest,
    responses(
        (status = 200, description = "Ranked slot candidates", body = Vec<SlotResponse>),
        (status = 422, description = "No staff given, or no slot available"),
    ),
    tag = "calendar"
)]
async fn search_slots(
    State(state): State<AppState>,
    Json(req): Json<SlotSearchRequest>,
) -> Result<Json<Vec<SlotResponse>>, AppError> {
    let busy = busy_intervals(&state, None);
    let query = SlotQuery {
        from: req.from.unwrap_or_else(Utc::now),
        duration_minutes: req.duration_minutes,
        preferred_starts: req.preferred_starts.clone(),
    };
    let candidates = find_slots(&state.config.schedule_rule, &req.staff_ids, &busy, &query)?;
    let responses = candidates
        .iter()
        .map(|c| SlotResponse {
            start: rfc3339(c.start),
            end: rfc3339(c.end),
            staff_id: c.staff_id.to_string(),
            score: c.score,
        })
        .collect();
    Ok(Json(responses))
}

/// GET /v1/calendar/rule — The active scheduling rule.
#[utoipa::path(
    get,
    path = "/v1/calendar/rule",
    responses(
        (status = 200, description = "Active scheduling rule", body = Object),
    ),
    tag = "calendar"
)]
async fn get_rule(State(state): State<AppState>) -> Json<ScheduleRule> {
    Json(state.config.schedule_rule.clone())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
