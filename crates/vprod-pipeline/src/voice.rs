//! Voice synthesis stage helpers.
//!
//! Artifact naming, speaker/settings resolution and the duration-probe seam
//! used by the orchestrator's `tts` stage.

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::warn;

use vprod_media::{normalize_voice_path, probe_audio_duration, safe_join, MediaResult};
use vprod_models::{JsonMap, ParameterDoc, Scene, ScriptItem, VoicePresets};

use crate::config::SpeakerTable;
use crate::error::PipelineResult;
use crate::util::{round_ms, value_to_i64, value_truthy};

/// Audio duration lookup, normally backed by ffprobe.
///
/// A seam so the orchestrator can be exercised without external tools; the
/// `FileNotFound` error variant is load-bearing (it triggers the estimation
/// fallback).
#[async_trait]
pub trait DurationProbe: Send + Sync {
    async fn duration_sec(&self, path: &Path) -> MediaResult<f64>;
}

/// ffprobe-backed probe.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfprobeDurations;

#[async_trait]
impl DurationProbe for FfprobeDurations {
    async fn duration_sec(&self, path: &Path) -> MediaResult<f64> {
        probe_audio_duration(path).await
    }
}

/// Deterministic artifact name for a script item without a pre-set voice
/// path: `media/audio/{video_id}-{group:02}-{item:02}.wav`, 1-based indices.
pub(crate) fn default_voice_name(video_id: &str, group_index: usize, item_index: usize) -> String {
    format!(
        "media/audio/{}-{:02}-{:02}.wav",
        video_id,
        group_index + 1,
        item_index + 1
    )
}

/// Estimated narration duration from text length, floored at 0.4s.
pub(crate) fn estimate_voice_sec(text: &str, chars_per_sec: f64) -> f64 {
    let length = text.trim().chars().count();
    if length == 0 {
        return 0.0;
    }
    round_ms((length as f64 / chars_per_sec.max(1.0)).max(0.4))
}

/// Resolve a client-supplied voice path to an absolute artifact path under
/// the project directory.
pub(crate) fn resolve_voice_file(
    project_dir: &Path,
    video_id: &str,
    voice_value: &str,
) -> PipelineResult<PathBuf> {
    let rel = normalize_voice_path(video_id, voice_value);
    Ok(safe_join(project_dir, &rel)?)
}

/// The synthesis-tuning keys read off a script item or the hook scene.
#[derive(Debug, Clone, Copy)]
pub(crate) struct VoiceControls<'a> {
    pub voice_speaker: Option<&'a Value>,
    pub voice_preset: Option<&'a str>,
    pub voice_tts: Option<&'a JsonMap>,
}

impl<'a> From<&'a ScriptItem> for VoiceControls<'a> {
    fn from(item: &'a ScriptItem) -> Self {
        Self {
            voice_speaker: item.voice_speaker.as_ref(),
            voice_preset: item.voice_preset.as_deref(),
            voice_tts: item.voice_tts.as_ref(),
        }
    }
}

impl<'a> From<&'a Scene> for VoiceControls<'a> {
    fn from(scene: &'a Scene) -> Self {
        Self {
            voice_speaker: scene.voice_speaker.as_ref(),
            voice_preset: scene.voice_preset.as_deref(),
            voice_tts: scene.voice_tts.as_ref(),
        }
    }
}

/// Resolved synthesis parameters: the engine speaker and a settings overlay.
#[derive(Debug, Clone)]
pub(crate) struct VoiceTuning {
    pub speaker_id: i64,
    pub settings: JsonMap,
}

/// Merge presets and inline settings into one tuning object.
///
/// Priority (later overlays earlier): preset for the `voiceSpeaker` key,
/// preset for the default key, named `voicePreset`, inline `voiceTts`.
/// A `speakerId` inside the merged settings selects the engine speaker;
/// otherwise `fallback_speaker` applies. The key itself is not forwarded.
pub(crate) fn voice_settings_for(
    controls: VoiceControls<'_>,
    presets: &VoicePresets,
    default_key: Option<&str>,
    fallback_speaker: i64,
) -> VoiceTuning {
    let mut settings = JsonMap::new();

    let mut speaker_keys: Vec<String> = Vec::new();
    if let Some(value) = controls.voice_speaker {
        if value_truthy(value) {
            speaker_keys.push(value_to_key(value));
        }
    }
    if let Some(key) = default_key {
        speaker_keys.push(key.to_string());
    }

    for key in &speaker_keys {
        if let Some(preset) = presets.get(key) {
            overlay(&mut settings, preset);
        }
    }

    if let Some(name) = controls.voice_preset {
        if let Some(preset) = presets.get(name) {
            overlay(&mut settings, preset);
        }
    }

    if let Some(inline) = controls.voice_tts {
        overlay(&mut settings, inline);
    }

    let speaker_id = settings
        .get("speakerId")
        .and_then(value_to_i64)
        .unwrap_or(fallback_speaker);
    settings.remove("speakerId");

    VoiceTuning {
        speaker_id,
        settings,
    }
}

/// Fallback engine speaker for a script item: explicit override extras,
/// then the speaker-key table, then the job default.
pub(crate) fn resolve_item_speaker(item: &ScriptItem, speakers: &SpeakerTable) -> i64 {
    let candidate = [
        item.voicevox_speaker.as_ref(),
        item.tts_speaker_id.as_ref(),
        item.voice_speaker.as_ref(),
    ]
    .into_iter()
    .flatten()
    .find(|value| value_truthy(value));

    if let Some(value) = candidate {
        match value_to_i64(value) {
            Some(id) => return id,
            None => warn!("Invalid speaker override {value}. Falling back."),
        }
    }

    if let Some(speaker) = &item.speaker {
        if let Some(id) = speakers.lookup(speaker) {
            return id;
        }
    }

    speakers.default_speaker
}

/// Combined preset table: request-supplied presets override document-embedded
/// presets for the same name.
pub(crate) fn merge_presets(
    parameter: &ParameterDoc,
    request_presets: Option<&VoicePresets>,
) -> VoicePresets {
    let mut presets = parameter.embedded_voice_presets();
    if let Some(extra) = request_presets {
        for (name, settings) in extra {
            presets.insert(name.clone(), settings.clone());
        }
    }
    presets
}

fn overlay(settings: &mut JsonMap, preset: &JsonMap) {
    for (key, value) in preset {
        settings.insert(key.clone(), value.clone());
    }
}

fn value_to_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
