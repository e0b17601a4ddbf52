//! Prometheus metrics.

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Metric names, kept in one place so dashboards match the code.
pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "vprod_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "vprod_http_request_duration_seconds";
    pub const JOBS_SUBMITTED_TOTAL: &str = "vprod_jobs_submitted_total";
}

/// Install the Prometheus recorder; the handle renders `/metrics`.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}

/// Counts and times every request by method, route and status.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let route = route_label(request.uri().path());
    let start = Instant::now();

    let response = next.run(request).await;

    let labels = [
        ("method", method),
        ("path", route),
        ("status", response.status().as_u16().to_string()),
    ];
    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels)
        .record(start.elapsed().as_secs_f64());

    response
}

/// Collapse per-job path segments so the path label stays low-cardinality.
fn route_label(path: &str) -> String {
    match path.strip_prefix("/video-jobs/") {
        Some(rest) if !rest.is_empty() => "/video-jobs/:job_id".to_string(),
        _ => path.to_string(),
    }
}
