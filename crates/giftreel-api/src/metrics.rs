//! Prometheus metrics for the API server.

use std::sync::OnceLock;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use regex_lite::Regex;

/// Install the Prometheus recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "giftreel_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "giftreel_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "giftreel_http_requests_in_flight";

    // Pipeline metrics
    pub const VIDEOS_RENDERED_TOTAL: &str = "giftreel_videos_rendered_total";
    pub const RENDER_DURATION_SECONDS: &str = "giftreel_render_duration_seconds";
    pub const DOWNLOAD_DURATION_SECONDS: &str = "giftreel_download_duration_seconds";
    pub const WEBHOOK_FAILURES_TOTAL: &str = "giftreel_webhook_failures_total";
    pub const NOTIFICATIONS_TOTAL: &str = "giftreel_notifications_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a completed render.
pub fn record_render(photos: usize, duration_secs: f64) {
    counter!(names::VIDEOS_RENDERED_TOTAL).increment(1);
    let labels = [("photos", photos.to_string())];
    histogram!(names::RENDER_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record how long the photo downloads took.
pub fn record_download_duration(duration_secs: f64) {
    histogram!(names::DOWNLOAD_DURATION_SECONDS).record(duration_secs);
}

/// Record a failed webhook request.
pub fn record_webhook_failure(kind: &str) {
    let labels = [("kind", kind.to_string())];
    counter!(names::WEBHOOK_FAILURES_TOTAL, &labels).increment(1);
}

/// Record an email attempt.
pub fn record_notification(success: bool) {
    let labels = [("result", if success { "sent" } else { "failed" }.to_string())];
    counter!(names::NOTIFICATIONS_TOTAL, &labels).increment(1);
}

/// Collapse per-file paths so label cardinality stays bounded.
fn sanitize_path(path: &str) -> String {
    static VIDEO_FILE: OnceLock<Option<Regex>> = OnceLock::new();
    match VIDEO_FILE.get_or_init(|| Regex::new(r"^/videos/[^/]+$").ok()) {
        Some(re) => re.replace(path, "/videos/:file").to_string(),
        None => path.to_string(),
    }
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
