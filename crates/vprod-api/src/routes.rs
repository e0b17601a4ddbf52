//! Route table.

use axum::middleware::from_fn;
use axum::routing::get;
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::health::health;
use crate::handlers::jobs::{get_job, list_jobs, submit_job};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_id, request_logging};
use crate::state::AppState;

/// Build the application router.
///
/// `metrics_handle` is `Some` when the Prometheus recorder is installed;
/// without it the `/metrics` route is simply absent.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let mut router = Router::new()
        .route("/video-jobs", axum::routing::post(submit_job).get(list_jobs))
        .route("/video-jobs/:job_id", get(get_job))
        .route("/health", get(health))
        .route("/healthz", get(health));

    if let Some(handle) = metrics_handle {
        router = router.route("/metrics", get(move || async move { handle.render() }));
    }

    // Outermost to innermost: CORS, request id, access log, metrics.
    router
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(from_fn(metrics_middleware))
        .layer(from_fn(request_logging))
        .layer(from_fn(request_id))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
