//! In-memory job registry.
//!
//! One mutex guards the whole table; critical sections only merge fields,
//! no I/O happens under the lock. Records live until process restart.

use std::collections::HashMap;
use tokio::sync::Mutex;

use vprod_models::{JobId, JobRecord, JobStatus, JobSummary, JobUpdate, VideoJobRequest};

use crate::error::{PipelineError, PipelineResult};

/// Concurrency-safe registry of job records keyed by job id.
///
/// Constructed once at startup and shared via `Arc` between the request
/// handlers and the background pipeline tasks.
#[derive(Debug, Default)]
pub struct JobStore {
    jobs: Mutex<HashMap<JobId, JobRecord>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new queued record under a freshly generated id.
    pub async fn create(&self, request: VideoJobRequest) -> PipelineResult<JobSummary> {
        let record = JobRecord::new(JobId::new(), request);
        let summary = record.summary();

        let mut jobs = self.jobs.lock().await;
        if jobs.contains_key(&record.id) {
            // Cannot happen with random ids; guarded anyway.
            return Err(PipelineError::DuplicateJobId(record.id.clone()));
        }
        jobs.insert(record.id.clone(), record);
        Ok(summary)
    }

    /// Snapshot of a single job.
    pub async fn get(&self, id: &JobId) -> Option<JobSummary> {
        self.jobs.lock().await.get(id).map(JobRecord::summary)
    }

    /// Atomically merge an update into a record.
    pub async fn update(&self, id: &JobId, update: JobUpdate) -> PipelineResult<()> {
        let mut jobs = self.jobs.lock().await;
        let record = jobs
            .get_mut(id)
            .ok_or_else(|| PipelineError::JobNotFound(id.clone()))?;
        record.apply(update);
        Ok(())
    }

    /// Point-in-time snapshot of all jobs, optionally filtered by status.
    pub async fn list(&self, status: Option<JobStatus>) -> Vec<JobSummary> {
        self.jobs
            .lock()
            .await
            .values()
            .filter(|record| status.map_or(true, |s| record.status == s))
            .map(JobRecord::summary)
            .collect()
    }
}
