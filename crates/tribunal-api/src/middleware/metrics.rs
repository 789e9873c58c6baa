//! # Prometheus Metrics
//!
//! Real Prometheus metrics exporter using the `prometheus` crate.
//!
//! HTTP-level metrics (request counts, latency, errors) are recorded in
//! middleware. Domain-level gauges (hearings, questions, reschedule
//! requests) are updated on each `/metrics` scrape (pull model) — see the
//! metrics handler in `lib.rs`.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use prometheus::{
    core::Collector, Encoder, GaugeVec, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Shared metrics state backed by a Prometheus registry.
#[derive(Clone)]
pub struct ApiMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,

    // -- HTTP middleware metrics (push model) --
    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
    http_errors_total: IntCounterVec,

    // -- Domain gauges (pull model, updated on /metrics scrape) --
    hearings_total: GaugeVec,
    reschedule_requests_total: GaugeVec,
    questions_pending: prometheus::Gauge,
    questions_overdue: prometheus::Gauge,
    statements_total: prometheus::Gauge,
    event_channels_open: prometheus::Gauge,
}

impl std::fmt::Debug for ApiMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiMetrics")
            .field("requests", &self.requests())
            .field("errors", &self.errors())
            .finish()
    }
}

impl ApiMetrics {
    /// Create a new metrics instance with a fresh Prometheus registry.
    pub fn new() -> Self {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("tribunal_http_requests_total", "Total HTTP requests"),
            &["method", "path", "status"],
        )
        .expect("metric can be created");

        let http_request_duration_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "tribunal_http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
            &["method", "path"],
        )
        .expect("metric can be created");

        let http_errors_total = IntCounterVec::new(
            Opts::new(
                "tribunal_http_errors_total",
                "Total HTTP errors (4xx and 5xx)",
            ),
            &["method", "path", "status"],
        )
        .expect("metric can be created");

        let hearings_total = GaugeVec::new(
            Opts::new("tribunal_hearings_total", "Total hearings by status"),
            &["status"],
        )
        .expect("metric can be created");

        let reschedule_requests_total = GaugeVec::new(
            Opts::new(
                "tribunal_reschedule_requests_total",
                "Total reschedule requests by status",
            ),
            &["status"],
        )
        .expect("metric can be created");

        let questions_pending = prometheus::Gauge::new(
            "tribunal_questions_pending",
            "Questions still awaiting an answer",
        )
        .expect("metric can be created");

        let questions_overdue = prometheus::Gauge::new(
            "tribunal_questions_overdue",
            "Pending questions past their deadline",
        )
        .expect("metric can be created");

        let statements_total =
            prometheus::Gauge::new("tribunal_statements_total", "Total transcript statements")
                .expect("metric can be created");

        let event_channels_open = prometheus::Gauge::new(
            "tribunal_event_channels_open",
            "Hearings with an open session event channel",
        )
        .expect("metric can be created");

        // Register all metrics.
        registry
            .register(Box::new(http_requests_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(http_request_duration_seconds.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(http_errors_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(hearings_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(reschedule_requests_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(questions_pending.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(questions_overdue.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(statements_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(event_channels_open.clone()))
            .expect("metric can be registered");

        Self {
            inner: Arc::new(Inner {
                registry,
                http_requests_total,
                http_request_duration_seconds,
                http_errors_total,
                hearings_total,
                reschedule_requests_total,
                questions_pending,
                questions_overdue,
                statements_total,
                event_channels_open,
            }),
        }
    }

    /// Return current total request count (sum across all labels).
    pub fn requests(&self) -> u64 {
        let mut total = 0u64;
        let families = self.inner.http_requests_total.collect();
        for mf in &families {
            for m in mf.get_metric() {
                total += m.get_counter().get_value() as u64;
            }
        }
        total
    }

    /// Return current total error count (sum across all labels).
    pub fn errors(&self) -> u64 {
        let mut total = 0u64;
        let families = self.inner.http_errors_total.collect();
        for mf in &families {
            for m in mf.get_metric() {
                total += m.get_counter().get_value() as u64;
            }
        }
        total
    }

    /// Record an HTTP request (called by the middleware).
    fn record_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();

        self.inner
            .http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);

        if status >= 400 {
            self.inner
                .http_errors_total
                .with_label_values(&[method, path, &status_str])
                .inc();
        }
    }

    // -- Domain gauge accessors (used by the /metrics handler) --

    /// Access the hearings gauge for updating.
    pub fn hearings_total(&self) -> &GaugeVec {
        &self.inner.hearings_total
    }

    /// Access the reschedule requests gauge for updating.
    pub fn reschedule_requests_total(&self) -> &GaugeVec {
        &self.inner.reschedule_requests_total
    }

    /// Access the pending questions gauge for updating.
    pub fn questions_pending(&self) -> &prometheus::Gauge {
        &self.inner.questions_pending
    }

    /// Access the overdue questions gauge for updating.
    pub fn questions_overdue(&self) -> &prometheus::Gauge {
        &self.inner.questions_overdue
    }

    /// Access the statements gauge for updating.
    pub fn statements_total(&self) -> &prometheus::Gauge {
        &self.inner.statements_total
    }

    /// Access the open event channels gauge for updating.
    pub fn event_channels_open(&self) -> &prometheus::Gauge {
        &self.inner.event_channels_open
    }

    /// Gather all metrics and encode to Prometheus text format.
    pub fn gather_and_encode(&self) -> Result<String, String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| format!("failed to encode metrics: {e}"))?;
        String::from_utf8(buffer)
            .map_err(|e| format!("metrics encoding produced invalid UTF-8: {e}"))
    }
}

impl Default for ApiMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize a request path by replacing UUID segments with `{id}`.
///
/// Prevents cardinality explosion in Prometheus labels. UUIDs are detected
/// as 32-hex-char strings with optional hyphens (standard UUID format).
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            // Match standard UUID: 8-4-4-4-12 hex chars with hyphens
            if segment.len() == 36
                && segment.chars().enumerate().all(|(i, c)| {
                    if i == 8 || i == 13 || i == 18 || i == 23 {
                        c == '-'
                    } else {
                        c.is_ascii_hexdigit()
                    }
                })
            {
                "{id}"
            } else if segment.len() == 32 && segment.chars().all(|c| c.is_ascii_hexdigit()) {
                // UUID without hyphens
                "{id}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Middleware that records HTTP request metrics via Prometheus.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());
    let start = Instant::now();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        let duration = start.elapsed().as_secs_f64();
        let status = response.status().as_u16();
        m.record_request(&method, &path, status, duration);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_metrics_new_starts_at_zero() {
        let m = ApiMetrics::new();
        assert_eq!(m.requests(), 0);
        assert_eq!(m.errors(), 0);
    }

    #[test]
    fn requests_increments() {
        let m = ApiMetrics::new();
        m.record_request("GET", "/test", 200, 0.01);
        assert_eq!(m.requests(), 1);
        m.record_request("POST", "/test", 201, 0.02);
        m.record_request("GET", "/other", 200, 0.005);
        assert_eq!(m.requests(), 3);
    }

    #[test]
    fn errors_increments() {
        let m = ApiMetrics::new();
        m.record_request("GET", "/test", 500, 0.1);
        assert_eq!(m.errors(), 1);
        m.record_request("GET", "/test", 404, 0.05);
        assert_eq!(m.errors(), 2);
    }

    #[test]
    fn concurrent_increments_are_safe() {
        let m = ApiMetrics::new();
        let threads: Vec<_> = (0..10)
            .map(|_| {
                let m = m.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        m.record_request("GET", "/test", 200, 0.001);
                        m.record_request("GET", "/err", 500, 0.001);
                    }
                })
            })
            .collect();

        for t in threads {
            t.join().unwrap();
        }

        assert_eq!(m.requests(), 20_000);
        assert_eq!(m.errors(), 10_000);
    }

    #[test]
    fn clone_shares_underlying_counters() {
        let m = ApiMetrics::new();
        let clone = m.clone();

        m.record_request("GET", "/test", 200, 0.01);
        assert_eq!(clone.requests(), 1, "clone should see the same counter");

        clone.record_request("GET", "/err", 500, 0.01);
        assert_eq!(m.errors(), 1, "original should see clone's increment");
    }

    #[test]
    fn gather_and_encode_produces_text() {
        let m = ApiMetrics::new();
        m.record_request("GET", "/test", 200, 0.01);
        let output = m.gather_and_encode().unwrap();
        assert!(output.contains("tribunal_http_requests_total"));
        assert!(output.contains("tribunal_http_request_duration_seconds"));
    }

    #[test]
    fn normalize_path_replaces_uuid_with_hyphens() {
        let path = "/v1/hearings/550e8400-e29b-41d4-a716-446655440000/statements";
        assert_eq!(normalize_path(path), "/v1/hearings/{id}/statements");
    }

    #[test]
    fn normalize_path_replaces_uuid_without_hyphens() {
        let path = "/v1/questions/550e8400e29b41d4a716446655440000";
        assert_eq!(normalize_path(path), "/v1/questions/{id}");
    }

    #[test]
    fn normalize_path_preserves_non_uuid_segments() {
        let path = "/v1/calendar/slots/search";
        assert_eq!(normalize_path(path), "/v1/calendar/slots/search");
    }

    #[test]
    fn normalize_path_multiple_uuids() {
        let path = "/v1/hearings/550e8400-e29b-41d4-a716-446655440000/participants/660e8400-e29b-41d4-a716-446655440001";
        assert_eq!(normalize_path(path), "/v1/hearings/{id}/participants/{id}");
    }

    #[test]
    fn domain_gauges_update() {
        let m = ApiMetrics::new();
        m.hearings_total()
            .with_label_values(&["SCHEDULED"])
            .set(3.0);
        m.hearings_total()
            .with_label_values(&["IN_PROGRESS"])
            .set(1.0);
        m.questions_pending().set(4.0);
        m.questions_overdue().set(1.0);
        m.statements_total().set(42.0);

        let output = m.gather_and_encode().unwrap();
        assert!(output.contains("tribunal_hearings_total"));
        assert!(output.contains("tribunal_questions_pending"));
        assert!(output.contains("tribunal_statements_total"));
    }
}
