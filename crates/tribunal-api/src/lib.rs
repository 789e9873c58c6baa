// SPDX-License-Identifier: BUSL-1.1
//! # tribunal-api — Axum API Services for the Tribunal
//!
//! HTTP surface over the hearing lifecycle and time negotiation engines.
//! Wraps [`tribunal_hearing`] and [`tribunal_calendar`] with in-memory
//! stores, a per-hearing event bus, and Prometheus metrics.
//!
//! ## API Surface
//!
//! | Prefix                        | Module                  | Domain              |
//! |-------------------------------|-------------------------|---------------------|
//! | `/v1/hearings/*`              | [`routes::hearings`]    | Hearing lifecycle   |
//! | `/v1/hearings/*/statements`   | [`routes::statements`]  | Statements          |
//! | `/v1/statements/*`            | [`routes::statements`]  | Redaction           |
//! | `/v1/hearings/*/questions`    | [`routes::questions`]   | Questions           |
//! | `/v1/questions/*`             | [`routes::questions`]   | Answers             |
//! | `/v1/hearings/*/reschedule-requests` | [`routes::reschedule`] | Negotiation  |
//! | `/v1/reschedule-requests/*`   | [`routes::reschedule`]  | Negotiation         |
//! | `/v1/calendar/*`              | [`routes::calendar`]    | Slot search         |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → Handler
//! ```
//!
//! ## OpenAPI
//!
//! Auto-generated spec via utoipa derive macros at `/openapi.json`.

pub mod error;
pub mod events;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use std::collections::HashMap;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::{Extension, Router};
use tower_http::trace::TraceLayer;

use crate::middleware::metrics::ApiMetrics;
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
///
/// Health probes (`/health/*`) and `/metrics` are mounted outside the
/// `/v1` surface so monitoring can reach them regardless of API state.
pub fn app(state: AppState) -> Router {
    let metrics = ApiMetrics::new();

    // Body size limit: 2 MiB. Prevents OOM from oversized request bodies;
    // no route in this surface legitimately needs more.
    let api = Router::new()
        .merge(routes::hearings::router())
        .merge(routes::statements::router())
        .merge(routes::questions::router())
        .merge(routes::reschedule::router())
        .merge(routes::calendar::router())
        .merge(openapi::router())
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(Extension(metrics.clone()))
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    let unauthenticated = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness))
        .route("/metrics", axum::routing::get(prometheus_metrics))
        .layer(Extension(metrics))
        .with_state(state);

    Router::new().merge(unauthenticated).merge(api)
}

/// GET /metrics — Prometheus metrics scrape endpoint.
///
/// Updates domain gauges from current `AppState` on each scrape (pull
/// model), then gathers and encodes all metrics in Prometheus text
/// exposition format.
async fn prometheus_metrics(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
) -> impl IntoResponse {
    // -- Update domain gauges from AppState --

    // Hearings by status.
    let hearings = state.hearings.list();
    let mut by_status: HashMap<String, usize> = HashMap::new();
    for h in &hearings {
        *by_status.entry(h.status.as_str().to_string()).or_default() += 1;
    }
    metrics.hearings_total().reset();
    for (status, count) in &by_status {
        metrics
            .hearings_total()
            .with_label_values(&[status])
            .set(*count as f64);
    }

    // Reschedule requests by status.
    let requests = state.reschedules.list();
    let mut by_request_status: HashMap<String, usize> = HashMap::new();
    for r in &requests {
        *by_request_status
            .entry(r.status.as_str().to_string())
            .or_default() += 1;
    }
    metrics.reschedule_requests_total().reset();
    for (status, count) in &by_request_status {
        metrics
            .reschedule_requests_total()
            .with_label_values(&[status])
            .set(*count as f64);
    }

    // Question backlog.
    let now = chrono::Utc::now();
    let questions = state.questions.list();
    let pending = questions
        .iter()
        .filter(|q| q.status == tribunal_hearing::QuestionStatus::Pending)
        .count();
    let overdue = questions.iter().filter(|q| q.is_past_deadline(now)).count();
    metrics.questions_pending().set(pending as f64);
    metrics.questions_overdue().set(overdue as f64);

    // Statements and live event channels.
    metrics.statements_total().set(state.statements.len() as f64);
    metrics
        .event_channels_open()
        .set(state.events.open_channels() as f64);

    // -- Gather and encode --
    match metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to encode Prometheus metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}

/// Liveness probe — always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — verifies the application is ready to serve traffic.
///
/// Checks that every in-memory store is accessible (read lock acquirable)
/// and that the configured scheduling rule is internally consistent.
///
/// Returns 200 "ready" or 503 with a diagnostic message.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    // Verify stores are accessible.
    let _ = state.hearings.len();
    let _ = state.statements.len();
    let _ = state.questions.len();
    let _ = state.reschedules.len();

    // A malformed rule would reject every slot search.
    if let Err(e) = state.config.schedule_rule.validate() {
        tracing::warn!("Scheduling rule failed validation: {e}");
        return (StatusCode::SERVICE_UNAVAILABLE, format!("rule invalid: {e}"))
            .into_response();
    }

    (StatusCode::OK, "ready").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn body_text(resp: axum::response::Response) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn liveness_returns_ok() {
        let app = app(AppState::default());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health/liveness")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "ok");
    }

    #[tokio::test]
    async fn readiness_returns_ready() {
        let app = app(AppState::default());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health/readiness")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "ready");
    }

    #[tokio::test]
    async fn metrics_endpoint_exposes_domain_gauges() {
        let app = app(AppState::default());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("tribunal_questions_pending"));
        assert!(body.contains("tribunal_statements_total"));
        assert!(body.contains("tribunal_event_channels_open"));
    }

    #[tokio::test]
    async fn openapi_spec_is_served() {
        let app = app(AppState::default());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("\"/v1/hearings\""));
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let app = app(AppState::default());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/unknown")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
