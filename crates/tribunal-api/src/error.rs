//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps domain errors from tribunal-hearing and tribunal-calendar to HTTP
//! status codes. Returns JSON error response bodies with error code,
//! message, and details. Never exposes internal error details in
//! production responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use tribunal_calendar::ScheduleError;
use tribunal_hearing::HearingError;

/// Structured JSON error response body.
///
/// All error responses use this format for consistency across the API
/// surface. The `details` field carries additional context for 422
/// validation errors but is omitted for 500-class errors to prevent
/// information leakage.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "VALIDATION_ERROR").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details, present only for client errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
///
/// Maps domain errors to appropriate HTTP status codes and structured
/// JSON error bodies. Internal error details are never exposed to clients.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request validation failed (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body could not be parsed or contains invalid values (422).
    ///
    /// Normalized with `Validation` to 422 Unprocessable Entity: the client
    /// sent syntactically valid HTTP but semantically invalid content. Both
    /// JSON deserialization failures and business-rule violations are 422;
    /// only malformed HTTP framing is 400.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Authorization failure — role or ownership violation (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Conflict with current resource state (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A counted quota has been exhausted (429).
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::UNPROCESSABLE_ENTITY, "BAD_REQUEST"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::LimitExceeded(_) => (StatusCode::TOO_MANY_REQUESTS, "LIMIT_EXCEEDED"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    /// Construct a not-found error (404).
    pub fn not_found(msg: String) -> Self {
        Self::NotFound(msg)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Never expose internal error messages to clients.
        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        // Log server-side errors for operator visibility.
        if let Self::Internal(_) = &self {
            tracing::error!(error = %self, "internal server error");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Convert hearing domain errors to API errors.
impl From<HearingError> for AppError {
    fn from(err: HearingError) -> Self {
        match &err {
            HearingError::InvalidTransition { .. }
            | HearingError::TerminalState { .. }
            | HearingError::WrongState { .. }
            | HearingError::QuestionNotPending { .. }
            | HearingError::AlreadyRedacted => Self::Conflict(err.to_string()),
            HearingError::NotPermitted { .. } | HearingError::FloorClosed { .. } => {
                Self::Forbidden(err.to_string())
            }
            HearingError::UnknownParticipant { .. } => Self::Forbidden(err.to_string()),
            HearingError::StatementLimit { .. } => Self::LimitExceeded(err.to_string()),
            HearingError::NoticeTooShort { .. }
            | HearingError::TooEarly { .. }
            | HearingError::InvalidValue(_) => Self::Validation(err.to_string()),
        }
    }
}

/// Convert calendar domain errors to API errors.
impl From<ScheduleError> for AppError {
    fn from(err: ScheduleError) -> Self {
        match &err {
            ScheduleError::PendingRequestExists { .. } | ScheduleError::AlreadyProcessed { .. } => {
                Self::Conflict(err.to_string())
            }
            ScheduleError::RescheduleLimit { .. } => Self::LimitExceeded(err.to_string()),
            ScheduleError::NotPermitted { .. } => Self::Forbidden(err.to_string()),
            ScheduleError::NoticeTooShort { .. }
            | ScheduleError::SlotNotProposed
            | ScheduleError::SlotUnavailable
            | ScheduleError::NoSlotAvailable
            | ScheduleError::InvalidValue(_) => Self::Validation(err.to_string()),
        }
    }
}
