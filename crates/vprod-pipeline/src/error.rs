//! Pipeline error types.

use thiserror::Error;

use vprod_media::MediaError;
use vprod_models::{JobErrorInfo, JobId};
use vprod_tts::TtsError;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors that terminate a job.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("TTS synthesis failed: {0}")]
    Tts(#[from] TtsError),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error("voice file missing for {0}")]
    VoiceFileMissing(String),

    #[error("job not found: {0}")]
    JobNotFound(JobId),

    #[error("duplicate job id: {0}")]
    DuplicateJobId(JobId),

    #[error("failed to serialize parameter document: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Internal(String),
}

impl PipelineError {
    /// Stable error code recorded on the failed job.
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::Tts(_) => "tts_error",
            PipelineError::Media(MediaError::UnsafePath(_)) => "unsafe_path",
            PipelineError::Media(
                MediaError::FfprobeNotFound
                | MediaError::FfprobeFailed { .. }
                | MediaError::FileNotFound(_)
                | MediaError::JsonParse(_),
            ) => "probe_error",
            PipelineError::Media(
                MediaError::RenderFailed { .. } | MediaError::RenderOutputMissing(_),
            ) => "render_error",
            PipelineError::Media(MediaError::Io(_)) | PipelineError::Io(_) => "io_error",
            PipelineError::VoiceFileMissing(_) => "voice_file_missing",
            PipelineError::JobNotFound(_)
            | PipelineError::DuplicateJobId(_)
            | PipelineError::Serialize(_)
            | PipelineError::Internal(_) => "internal_error",
        }
    }

    /// Error descriptor exposed on the job record.
    pub fn to_error_info(&self) -> JobErrorInfo {
        JobErrorInfo::new(self.code(), self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = PipelineError::Media(MediaError::unsafe_path("bad"));
        assert_eq!(err.code(), "unsafe_path");

        let err = PipelineError::VoiceFileMissing("media/audio/v.wav".to_string());
        assert_eq!(err.code(), "voice_file_missing");
        assert!(err.to_error_info().message.contains("media/audio/v.wav"));

        let err = PipelineError::Media(MediaError::RenderFailed {
            exit_code: Some(2),
            detail: "boom".to_string(),
        });
        assert_eq!(err.code(), "render_error");
    }
}
