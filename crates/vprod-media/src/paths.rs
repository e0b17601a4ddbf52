//! Path traversal-safe artifact resolution.
//!
//! Voice and audio paths arrive from clients as free-form strings. Every
//! artifact path is resolved through [`safe_join`] before any filesystem
//! read or write; nothing else in the pipeline joins client input onto a
//! directory.

use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::{MediaError, MediaResult};

/// Join a client-supplied relative path onto a base directory.
///
/// Leading slashes are stripped, empty and `.` segments are discarded, and a
/// `..` segment fails with an unsafe-path error. The joined result must stay
/// lexically under `base`.
pub fn safe_join(base: impl AsRef<Path>, relative: &str) -> MediaResult<PathBuf> {
    let base = base.as_ref();
    let clean = relative.trim().trim_start_matches(['/', '\\']);

    let mut segments = Vec::new();
    for segment in clean.split(['/', '\\']) {
        match segment {
            "" | "." => continue,
            ".." => {
                return Err(MediaError::unsafe_path(format!(
                    "traversal segment in {relative:?}"
                )))
            }
            part => segments.push(part),
        }
    }

    if segments.is_empty() {
        return Err(MediaError::unsafe_path("relative path is empty"));
    }

    let mut full = base.to_path_buf();
    for segment in segments {
        full.push(segment);
    }

    if !full.starts_with(base) {
        return Err(MediaError::unsafe_path(format!(
            "{relative:?} escapes the project directory"
        )));
    }

    Ok(full)
}

/// Strip legacy project-path prefixes off a voice path.
///
/// Older documents reference artifacts as `/data/projects/{video_id}/...` or
/// `{video_id}/...`; the stored form is always project-relative.
pub fn normalize_voice_path(video_id: &str, value: &str) -> String {
    let clean = value.trim();
    if clean.is_empty() {
        return String::new();
    }

    let prefixes = [
        format!("/data/projects/{video_id}/"),
        format!("data/projects/{video_id}/"),
        format!("/{video_id}/"),
        format!("{video_id}/"),
    ];

    let mut rest = clean;
    for prefix in &prefixes {
        if let Some(stripped) = rest.strip_prefix(prefix.as_str()) {
            rest = stripped;
            break;
        }
    }

    rest.trim_start_matches(['/', '\\']).to_string()
}

/// Create the parent directory of `path` if it does not exist yet.
pub async fn ensure_parent_dir(path: impl AsRef<Path>) -> MediaResult<()> {
    if let Some(parent) = path.as_ref().parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}
