//! Shared data models for the video production backend.
//!
//! This crate provides Serde-serializable types for:
//! - Jobs: records, status, options, progress and wire summaries
//! - The parameter document: scenes, script groups, script items
//! - Voice presets and scene audio descriptors

pub mod job;
pub mod parameter;
pub mod video;

// Re-export common types
pub use job::{
    JobErrorInfo, JobId, JobOptions, JobOutcome, JobProgress, JobRecord, JobStatus, JobSummary,
    JobUpdate, ProgressPatch, VideoJobRequest,
};
pub use parameter::{
    AudioDescriptor, JsonMap, ParameterDoc, Scene, SceneAudio, ScriptGroup, ScriptItem,
    VoicePresets,
};
pub use video::VideoId;
