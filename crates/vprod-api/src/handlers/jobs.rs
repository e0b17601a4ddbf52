//! Job submission and polling handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use metrics::counter;
use serde::Deserialize;
use tracing::info;

use vprod_models::{JobId, JobStatus, JobSummary, VideoJobRequest};

use crate::error::{ApiError, ApiResult};
use crate::metrics::names;
use crate::state::AppState;

/// POST /video-jobs
///
/// Accepts a video production job and starts it in the background.
///
/// Returns:
/// - 202: Initial job summary (poll the job id for progress)
/// - 400: Invalid video id
/// - 409: Artifacts already exist for this video id and overwrite is false
pub async fn submit_job(
    State(state): State<AppState>,
    Json(request): Json<VideoJobRequest>,
) -> ApiResult<(StatusCode, Json<JobSummary>)> {
    if !request.video_id.is_valid() {
        return Err(ApiError::validation(
            "videoId must only use letters, digits, '.', '_' or '-'",
        ));
    }

    if !request.options.overwrite {
        let param_path = state
            .pipeline
            .config()
            .parameter_path(&request.video_id)
            .map_err(|err| ApiError::validation(err.to_string()))?;
        let video_path = state.pipeline.config().output_video_path(&request.video_id);

        if param_path.exists() || video_path.exists() {
            return Err(ApiError::conflict(
                "videoId already exists. Set overwrite=true to replace.",
            ));
        }
    }

    let summary = state.store.create(request.clone()).await?;
    counter!(names::JOBS_SUBMITTED_TOTAL).increment(1);
    info!(job_id = %summary.job_id, video_id = %summary.video_id, "Job accepted");

    Arc::clone(&state.pipeline).spawn(summary.job_id.clone(), request);

    Ok((StatusCode::ACCEPTED, Json(summary)))
}

/// GET /video-jobs/:job_id
///
/// Snapshot of one job.
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobSummary>> {
    state
        .store
        .get(&JobId::from_string(job_id))
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found("job not found"))
}

/// Query parameters for the job list endpoint.
#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    /// Restrict to one status (queued/running/done/failed)
    pub status: Option<String>,
}

/// GET /video-jobs
///
/// Point-in-time snapshot of all jobs, optionally status-filtered.
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListJobsQuery>,
) -> ApiResult<Json<Vec<JobSummary>>> {
    let filter = match query.status.as_deref() {
        Some(raw) => Some(
            JobStatus::parse(raw)
                .ok_or_else(|| ApiError::bad_request(format!("unknown status filter: {raw}")))?,
        ),
        None => None,
    };

    Ok(Json(state.store.list(filter).await))
}
