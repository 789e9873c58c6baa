// SPDX-License-Identifier: BUSL-1.1
//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
///
/// Registers all utoipa-documented routes, schemas, and tags. Serves as
/// the single source of truth for integrators.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Tribunal API",
        version = "0.3.2",
        description = "Dispute-hearing lifecycle and time negotiation services.\n\nProvides:\n- **Hearing lifecycle** management: scheduling, session control, conclusion, and cancellation\n- **Speaker control** with role-gated floor settings and grace windows\n- **Statements** with per-type limits and moderator redaction\n- **Questions** with answer deadlines and overdue flagging\n- **Reschedule negotiation**: participant requests, admin decisions, allocator auto-resolution\n- **Calendar** slot search against the configured scheduling rule\n\nHealth probes (`/health/*`) and `/metrics` sit outside the `/v1` surface.",
        license(name = "BUSL-1.1")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    paths(
        // ── Hearings ─────────────────────────────────────────────────────
        crate::routes::hearings::schedule_hearing,
        crate::routes::hearings::list_hearings,
        crate::routes::hearings::get_hearing,
        crate::routes::hearings::start_hearing,
        crate::routes::hearings::cancel_hearing,
        crate::routes::hearings::conclude_hearing,
        crate::routes::hearings::set_speaker_control,
        crate::routes::hearings::confirm_attendance,
        crate::routes::hearings::record_presence,
        crate::routes::hearings::get_attendance,
        crate::routes::hearings::get_room,
        // ── Statements ───────────────────────────────────────────────────
        crate::routes::statements::post_statement,
        crate::routes::statements::publish_statement,
        crate::routes::statements::get_transcript,
        crate::routes::statements::redact_statement,
        // ── Questions ────────────────────────────────────────────────────
        crate::routes::questions::pose_question,
        crate::routes::questions::list_questions,
        crate::routes::questions::answer_question,
        crate::routes::questions::cancel_question,
        // ── Reschedule negotiation ───────────────────────────────────────
        crate::routes::reschedule::open_request,
        crate::routes::reschedule::list_requests,
        crate::routes::reschedule::get_request,
        crate::routes::reschedule::approve_request,
        crate::routes::reschedule::reject_request,
        crate::routes::reschedule::withdraw_request,
        crate::routes::reschedule::auto_resolve_request,
        // ── Calendar ─────────────────────────────────────────────────────
        crate::routes::calendar::search_slots,
        crate::routes::calendar::get_rule,
    ),
    components(
        schemas(
            // ── Error types ─────────────────────────────────────────────
            crate::error::ErrorBody,
            crate::error::ErrorDetail,
            // ── Hearing DTOs ────────────────────────────────────────────
            crate::routes::hearings::ScheduleHearingRequest,
            crate::routes::hearings::RosterEntryRequest,
            crate::routes::hearings::ActorRequest,
            crate::routes::hearings::CancelRequest,
            crate::routes::hearings::ConcludeRequest,
            crate::routes::hearings::SpeakerControlRequest,
            crate::routes::hearings::ConfirmRequest,
            crate::routes::hearings::PresenceRequest,
            crate::routes::hearings::HearingResponse,
            crate::routes::hearings::ParticipantResponse,
            crate::routes::hearings::TransitionResponse,
            crate::routes::hearings::RoomResponse,
            // ── Statement DTOs ──────────────────────────────────────────
            crate::routes::statements::PostStatementRequest,
            crate::routes::statements::PublishStatementRequest,
            crate::routes::statements::RedactStatementRequest,
            crate::routes::statements::StatementResponse,
            // ── Question DTOs ───────────────────────────────────────────
            crate::routes::questions::PoseQuestionRequest,
            crate::routes::questions::AnswerQuestionRequest,
            crate::routes::questions::CancelQuestionRequest,
            crate::routes::questions::QuestionResponse,
            // ── Reschedule DTOs ─────────────────────────────────────────
            crate::routes::reschedule::OpenRescheduleRequest,
            crate::routes::reschedule::ApproveRescheduleRequest,
            crate::routes::reschedule::RejectRescheduleRequest,
            crate::routes::reschedule::WithdrawRescheduleRequest,
            crate::routes::reschedule::AutoResolveRequest,
            crate::routes::reschedule::RescheduleResponse,
            // ── Calendar DTOs ───────────────────────────────────────────
            crate::routes::calendar::SlotSearchRequest,
            crate::routes::calendar::SlotResponse,
        ),
    ),
    tags(
        (name = "hearings", description = "Hearing lifecycle: scheduling, session control, speaker gating, attendance"),
        (name = "statements", description = "Statements: posting under the floor gate, transcripts, redaction"),
        (name = "questions", description = "Questions with answer deadlines and overdue tracking"),
        (name = "reschedule", description = "Reschedule negotiation: requests, admin decisions, auto-resolution"),
        (name = "calendar", description = "Slot search and the active scheduling rule"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
///
/// Serves the OpenAPI JSON spec at `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json — Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
