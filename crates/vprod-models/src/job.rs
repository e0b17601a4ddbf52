//! Job lifecycle models.
//!
//! A job tracks one video production run from submission to its terminal
//! state. Records live in the in-process registry for the lifetime of the
//! server; clients observe them through [`JobSummary`] snapshots.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::parameter::{ParameterDoc, VoicePresets};
use crate::video::VideoId;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID (hex form, no hyphens).
    pub fn new() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Job lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Accepted, background task not started yet
    #[default]
    Queued,
    /// Pipeline stages are executing
    Running,
    /// All stages completed, result populated
    Done,
    /// A stage failed, error populated
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }

    /// Parse a wire-format status string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(JobStatus::Queued),
            "running" => Some(JobStatus::Running),
            "done" => Some(JobStatus::Done),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-job behavior switches.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobOptions {
    /// Invoke the render pipeline after the document is persisted
    #[serde(default = "default_true")]
    pub render: bool,
    /// Replace an existing parameter file / output video
    #[serde(default)]
    pub overwrite: bool,
    /// Synthesize missing audio (disabled jobs require pre-staged artifacts)
    #[serde(default = "default_true")]
    pub generate_audio: bool,
    /// Skip the render stage even when requested
    #[serde(default)]
    pub dry_run: bool,
}

fn default_true() -> bool {
    true
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            render: true,
            overwrite: false,
            generate_audio: true,
            dry_run: false,
        }
    }
}

/// A job submission: the video identifier, its parameter document and
/// execution options.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoJobRequest {
    pub video_id: VideoId,
    pub parameter: ParameterDoc,
    #[serde(default)]
    pub options: JobOptions,
    /// Request-level presets; override document-embedded presets name-wise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_presets: Option<VoicePresets>,
}

/// Observable progress of a running job.
///
/// Counters appear once the synthesis stage announces them; `tts_done` is
/// monotonically non-decreasing and never exceeds `tts_total`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobProgress {
    pub stage: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tts_total: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tts_done: Option<u32>,
}

impl Default for JobProgress {
    fn default() -> Self {
        Self {
            stage: "waiting".to_string(),
            tts_total: None,
            tts_done: None,
        }
    }
}

impl JobProgress {
    /// Merge a patch field-wise; unset patch fields leave current values.
    pub fn apply(&mut self, patch: &ProgressPatch) {
        if let Some(stage) = &patch.stage {
            self.stage = stage.clone();
        }
        if let Some(total) = patch.tts_total {
            self.tts_total = Some(total);
        }
        if let Some(done) = patch.tts_done {
            self.tts_done = Some(done);
        }
    }
}

/// Partial progress update merged into [`JobProgress`].
#[derive(Debug, Clone, Default)]
pub struct ProgressPatch {
    pub stage: Option<String>,
    pub tts_total: Option<u32>,
    pub tts_done: Option<u32>,
}

impl ProgressPatch {
    /// Patch that moves the job to a new stage.
    pub fn stage(stage: impl Into<String>) -> Self {
        Self {
            stage: Some(stage.into()),
            ..Self::default()
        }
    }

    /// Patch that bumps the synthesis counter.
    pub fn tts_done(done: u32) -> Self {
        Self {
            tts_done: Some(done),
            ..Self::default()
        }
    }

    pub fn with_tts_total(mut self, total: u32) -> Self {
        self.tts_total = Some(total);
        self
    }

    pub fn with_tts_done(mut self, done: u32) -> Self {
        self.tts_done = Some(done);
        self
    }
}

/// Terminal error descriptor exposed on failed jobs.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobErrorInfo {
    pub code: String,
    pub message: String,
}

impl JobErrorInfo {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Terminal result descriptor exposed on completed jobs.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobOutcome {
    /// Where the finished parameter document was written
    pub parameter_path: String,
    /// Hook-scene duration, when computable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook_sec: Option<f64>,
    /// Total document duration, when computable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_sec: Option<f64>,
    /// Rendered video artifact, when the render stage ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_path: Option<String>,
}

impl JobOutcome {
    pub fn new(parameter_path: impl Into<String>) -> Self {
        Self {
            parameter_path: parameter_path.into(),
            hook_sec: None,
            total_sec: None,
            video_path: None,
        }
    }
}

/// Field-merge update applied to a job record.
///
/// Unset fields are no-ops; the progress patch merges key-wise instead of
/// replacing the whole progress object.
#[derive(Debug, Clone, Default)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub progress: Option<ProgressPatch>,
    pub result: Option<JobOutcome>,
    pub error: Option<JobErrorInfo>,
}

impl JobUpdate {
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn progress(patch: ProgressPatch) -> Self {
        Self {
            progress: Some(patch),
            ..Self::default()
        }
    }

    pub fn with_progress(mut self, patch: ProgressPatch) -> Self {
        self.progress = Some(patch);
        self
    }

    pub fn with_result(mut self, result: JobOutcome) -> Self {
        self.result = Some(result);
        self
    }

    pub fn with_error(mut self, error: JobErrorInfo) -> Self {
        self.error = Some(error);
        self
    }
}

/// A job as held by the registry.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobRecord {
    pub id: JobId,
    pub request: VideoJobRequest,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub progress: JobProgress,
    pub result: Option<JobOutcome>,
    pub error: Option<JobErrorInfo>,
}

impl JobRecord {
    pub fn new(id: JobId, request: VideoJobRequest) -> Self {
        let now = Utc::now();
        Self {
            id,
            request,
            status: JobStatus::Queued,
            created_at: now,
            updated_at: now,
            progress: JobProgress::default(),
            result: None,
            error: None,
        }
    }

    /// Apply a field-merge update and bump the modification timestamp.
    pub fn apply(&mut self, update: JobUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(patch) = update.progress {
            self.progress.apply(&patch);
        }
        if update.result.is_some() {
            self.result = update.result;
        }
        if update.error.is_some() {
            self.error = update.error;
        }
        self.updated_at = Utc::now();
    }

    /// Wire-format snapshot of this record.
    pub fn summary(&self) -> JobSummary {
        JobSummary {
            job_id: self.id.clone(),
            status: self.status,
            video_id: self.request.video_id.clone(),
            created_at: self.created_at.to_rfc3339(),
            updated_at: self.updated_at.to_rfc3339(),
            progress: self.progress.clone(),
            result: self.result.clone(),
            error: self.error.clone(),
        }
    }
}

/// Client-facing job snapshot.
///
/// `result` and `error` are always present on the wire (null until set) so
/// pollers see stable field shape.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub job_id: JobId,
    pub status: JobStatus,
    pub video_id: VideoId,
    pub created_at: String,
    pub updated_at: String,
    pub progress: JobProgress,
    #[serde(default)]
    pub result: Option<JobOutcome>,
    #[serde(default)]
    pub error: Option<JobErrorInfo>,
}
