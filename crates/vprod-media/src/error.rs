//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while probing, rendering or resolving artifacts.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("unsafe path detected: {0}")]
    UnsafePath(String),

    #[error("Render command failed ({exit_code:?}): {detail}")]
    RenderFailed {
        exit_code: Option<i32>,
        detail: String,
    },

    #[error("Render output not found: {0}")]
    RenderOutputMissing(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl MediaError {
    /// Create an FFprobe failure error.
    pub fn ffprobe_failed(message: impl Into<String>, stderr: Option<String>) -> Self {
        Self::FfprobeFailed {
            message: message.into(),
            stderr,
        }
    }

    /// Create an unsafe path error.
    pub fn unsafe_path(message: impl Into<String>) -> Self {
        Self::UnsafePath(message.into())
    }
}
