//! Pipeline configuration.
//!
//! Read from the environment at startup; env names match the deployment's
//! docker-compose files, so defaults mirror the container layout.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

use vprod_media::{safe_join, MediaResult, RenderCommand};
use vprod_models::VideoId;

use crate::util::value_to_i64;

/// Configuration for job execution.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root holding one project directory per video
    pub projects_root: PathBuf,
    /// Directory rendered videos land in
    pub video_out_dir: PathBuf,
    /// Parameter file location template with a `{video_id}` placeholder
    pub param_template: String,
    /// TTS engine base URL
    pub tts_base_url: String,
    pub tts_timeout: Duration,
    /// Fixed margin added to the computed hook duration
    pub hook_margin_sec: f64,
    /// Minimum hook-scene duration
    pub min_hook_sec: f64,
    /// Characters per second for duration estimation fallback
    pub chars_per_sec: f64,
    /// Default hook audio artifact path (project-relative)
    pub hook_audio_path: String,
    pub speakers: SpeakerTable,
    pub render: RenderCommand,
}

impl PipelineConfig {
    /// Read pipeline settings from the environment.
    pub fn from_env() -> Self {
        let projects_root = PathBuf::from(env_or("MEDIA_PROJECT_DIR", "/remotion-projects"));
        let video_out_dir = PathBuf::from(env_or("MEDIA_OUTPUT_DIR", "/remotion-out"));

        Self {
            param_template: env_or("MEDIA_PARAM_TEMPLATE", "{video_id}/parameter.json"),
            tts_base_url: env_or("VOICEVOX_URL", "http://voicevox:50021")
                .trim_end_matches('/')
                .to_string(),
            tts_timeout: Duration::from_secs_f64(env_f64("VOICEVOX_TIMEOUT", 30.0)),
            hook_margin_sec: env_f64("HOOK_MARGIN_SEC", 0.8),
            min_hook_sec: env_f64("MIN_HOOK_SEC", 3.0),
            chars_per_sec: env_f64("DEFAULT_CHAR_PER_SEC", 8.0),
            hook_audio_path: env_or("HOOK_AUDIO_PATH", "media/audio/hook.wav"),
            speakers: SpeakerTable::from_env(),
            render: RenderCommand::from_env(video_out_dir.clone()),
            projects_root,
            video_out_dir,
        }
    }

    /// Per-video project directory.
    pub fn project_dir(&self, video_id: &VideoId) -> PathBuf {
        self.projects_root.join(video_id.as_str())
    }

    /// Resolved parameter file path for a video.
    pub fn parameter_path(&self, video_id: &VideoId) -> MediaResult<PathBuf> {
        let rel = self.param_template.replace("{video_id}", video_id.as_str());
        safe_join(&self.projects_root, rel.trim())
    }

    /// Expected final video artifact for the submission conflict check.
    pub fn output_video_path(&self, video_id: &VideoId) -> PathBuf {
        self.video_out_dir.join(format!("{video_id}.mp4"))
    }
}

/// Speaker-key to engine-speaker-id table with job-level defaults.
#[derive(Debug, Clone)]
pub struct SpeakerTable {
    map: BTreeMap<String, i64>,
    /// Fallback speaker for script items
    pub default_speaker: i64,
    /// Fallback speaker for the hook scene
    pub hook_speaker: i64,
}

impl SpeakerTable {
    /// Build a table from explicit entries.
    pub fn new(
        entries: impl IntoIterator<Item = (String, i64)>,
        default_speaker: i64,
        hook_speaker: i64,
    ) -> Self {
        Self {
            map: entries.into_iter().collect(),
            default_speaker,
            hook_speaker,
        }
    }

    /// Read the speaker table from the environment.
    ///
    /// `VOICEVOX_SPEAKER_MAP` holds a JSON object of key → id; a parse
    /// failure falls back to the left/right defaults.
    pub fn from_env() -> Self {
        let left = env_i64("VOICEVOX_LEFT_SPEAKER", 8);
        let right = env_i64("VOICEVOX_RIGHT_SPEAKER", 3);
        let mut map: BTreeMap<String, i64> =
            [("left".to_string(), left), ("right".to_string(), right)].into();

        if let Ok(raw) = std::env::var("VOICEVOX_SPEAKER_MAP") {
            match parse_speaker_map(&raw) {
                Some(parsed) if !parsed.is_empty() => map = parsed,
                _ => warn!("Failed to parse VOICEVOX_SPEAKER_MAP. Fallback to defaults."),
            }
        }

        let fallback = map
            .get("left")
            .copied()
            .or_else(|| map.values().next().copied())
            .unwrap_or(3);
        let default_speaker = env_i64("VOICEVOX_DEFAULT_SPEAKER", fallback);
        let hook_speaker = env_i64("VOICEVOX_HOOK_SPEAKER", default_speaker);

        Self {
            map,
            default_speaker,
            hook_speaker,
        }
    }

    /// Look up an engine speaker id by speaker key.
    pub fn lookup(&self, key: &str) -> Option<i64> {
        self.map.get(key).copied()
    }
}

fn parse_speaker_map(raw: &str) -> Option<BTreeMap<String, i64>> {
    let value: serde_json::Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;

    let mut map = BTreeMap::new();
    for (key, value) in object {
        map.insert(key.clone(), value_to_i64(value)?);
    }
    Some(map)
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_f64(name: &str, default: f64) -> f64 {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_i64(name: &str, default: i64) -> i64 {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_speaker_map() {
        let map = parse_speaker_map(r#"{"left": 8, "right": "3", "guest": 14}"#).unwrap();
        assert_eq!(map.get("left"), Some(&8));
        assert_eq!(map.get("right"), Some(&3));
        assert_eq!(map.get("guest"), Some(&14));

        assert!(parse_speaker_map("not json").is_none());
        assert!(parse_speaker_map(r#"{"left": []}"#).is_none());
    }

    #[test]
    fn test_speaker_lookup() {
        let table = SpeakerTable::new([("left".to_string(), 8), ("right".to_string(), 3)], 8, 8);
        assert_eq!(table.lookup("left"), Some(8));
        assert_eq!(table.lookup("narrator"), None);
    }

    #[test]
    fn test_parameter_path_uses_template() {
        let config = test_config("/projects", "/out");
        let path = config.parameter_path(&VideoId::from("abc")).unwrap();
        assert_eq!(path, PathBuf::from("/projects/abc/parameter.json"));
    }

    #[test]
    fn test_output_video_path() {
        let config = test_config("/projects", "/out");
        assert_eq!(
            config.output_video_path(&VideoId::from("abc")),
            PathBuf::from("/out/abc.mp4")
        );
    }

    fn test_config(projects: &str, out: &str) -> PipelineConfig {
        PipelineConfig {
            projects_root: PathBuf::from(projects),
            video_out_dir: PathBuf::from(out),
            param_template: "{video_id}/parameter.json".to_string(),
            tts_base_url: "http://localhost:50021".to_string(),
            tts_timeout: Duration::from_secs(30),
            hook_margin_sec: 0.8,
            min_hook_sec: 3.0,
            chars_per_sec: 8.0,
            hook_audio_path: "media/audio/hook.wav".to_string(),
            speakers: SpeakerTable::new([("left".to_string(), 8)], 8, 8),
            render: RenderCommand::from_env(PathBuf::from(out)),
        }
    }
}
