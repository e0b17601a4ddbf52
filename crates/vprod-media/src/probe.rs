//! FFprobe audio duration probing.

use serde::Deserialize;
use std::path::Path;

use crate::error::{MediaError, MediaResult};
use crate::exec::run_command;

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

/// Probe an audio file's duration in seconds (millisecond precision).
///
/// A missing file maps to [`MediaError::FileNotFound`] so callers can apply
/// an estimation fallback; every other failure is an [`MediaError::FfprobeFailed`].
pub async fn probe_audio_duration(path: impl AsRef<Path>) -> MediaResult<f64> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)?;

    let path_str = path.to_string_lossy();
    let output = run_command(
        "ffprobe",
        [
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_format",
            path_str.as_ref(),
        ],
    )
    .await?;

    if !output.success() {
        return Err(MediaError::ffprobe_failed(
            format!("ffprobe exited with {:?}", output.exit_code),
            Some(output.detail()),
        ));
    }

    parse_duration(&output.stdout)
}

/// Parse `format.duration` out of ffprobe's JSON output.
fn parse_duration(stdout: &str) -> MediaResult<f64> {
    let probe: FfprobeOutput = serde_json::from_str(stdout)?;

    let duration = probe
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.parse::<f64>().ok())
        .ok_or_else(|| MediaError::ffprobe_failed("no parsable duration in ffprobe output", None))?;

    Ok(round_ms(duration))
}

fn round_ms(seconds: f64) -> f64 {
    (seconds * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        let stdout = r#"{"format": {"duration": "3.4567", "size": "12345"}}"#;
        assert_eq!(parse_duration(stdout).unwrap(), 3.457);
    }

    #[test]
    fn test_parse_duration_missing_field() {
        let stdout = r#"{"format": {"size": "12345"}}"#;
        assert!(matches!(
            parse_duration(stdout),
            Err(MediaError::FfprobeFailed { .. })
        ));
    }

    #[test]
    fn test_parse_duration_invalid_json() {
        assert!(matches!(
            parse_duration("not json"),
            Err(MediaError::JsonParse(_))
        ));
    }

    #[tokio::test]
    async fn test_probe_missing_file() {
        let result = probe_audio_duration("/definitely/not/here.wav").await;
        assert!(matches!(result, Err(MediaError::FileNotFound(_))));
    }
}
