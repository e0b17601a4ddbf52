//! TTS client error types.

use thiserror::Error;

/// Result type for TTS operations.
pub type TtsResult<T> = Result<T, TtsError>;

/// Errors from the TTS engine client.
#[derive(Debug, Error)]
pub enum TtsError {
    #[error("TTS request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TTS engine returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unexpected TTS response: {0}")]
    InvalidResponse(String),
}
