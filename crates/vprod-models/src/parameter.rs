//! The parameter document: the per-video specification.
//!
//! Clients submit documents with an open set of extra attributes. The keys
//! the orchestrator reads are first-class optional fields; everything else
//! passes through the flattened `extra` maps untouched. Declared fields keep
//! `null` on serialization so the persisted document has stable field
//! presence for downstream consumers.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Free-form JSON object.
pub type JsonMap = serde_json::Map<String, Value>;

/// Named bundles of synthesis tuning parameters.
pub type VoicePresets = HashMap<String, JsonMap>;

/// The full per-video document: render spec, metadata, scenes and script.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParameterDoc {
    /// Render spec (fps, durationInFrames, ...)
    pub spec: JsonMap,
    /// Video metadata; annotated with `videoId` during the run if absent
    pub meta: JsonMap,
    pub scenes: Vec<Scene>,
    pub script_groups: Vec<ScriptGroup>,
    #[serde(default)]
    pub captions: Option<Vec<JsonMap>>,
    #[serde(default)]
    pub banners: Option<Vec<JsonMap>>,
    #[serde(default)]
    pub speeches: Option<Vec<JsonMap>>,
    #[serde(default)]
    pub vars: Option<JsonMap>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

impl ParameterDoc {
    /// Presets embedded under `vars.voicePresets` (object-valued entries only).
    pub fn embedded_voice_presets(&self) -> VoicePresets {
        let mut presets = VoicePresets::new();
        if let Some(vars) = &self.vars {
            if let Some(Value::Object(raw)) = vars.get("voicePresets") {
                for (name, value) in raw {
                    if let Value::Object(settings) = value {
                        presets.insert(name.clone(), settings.clone());
                    }
                }
            }
        }
        presets
    }
}

/// One scene on the timeline.
///
/// Scene 0 is the hook: when it carries text, its narration drives the
/// minimum-duration policy for the opening segment.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub start_frame: u64,
    #[serde(default)]
    pub duration_sec: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<SceneAudio>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_speaker: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_preset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_tts: Option<JsonMap>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

impl Scene {
    /// Whether this scene qualifies as the hook (non-empty text).
    pub fn has_hook_text(&self) -> bool {
        self.text.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Resolve the audio attribute into a descriptor.
    ///
    /// A plain path becomes `{src, volume: 1, startFrom: 0}`; a structured
    /// descriptor is kept as-is; an absent attribute defaults to
    /// `default_src`.
    pub fn audio_descriptor(&self, default_src: &str) -> AudioDescriptor {
        match &self.audio {
            Some(SceneAudio::Path(path)) => AudioDescriptor::for_src(path.clone()),
            Some(SceneAudio::Descriptor(descriptor)) => descriptor.clone(),
            None => AudioDescriptor::for_src(default_src.to_string()),
        }
    }
}

/// Scene audio: either a bare source path or a structured descriptor.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum SceneAudio {
    Path(String),
    Descriptor(AudioDescriptor),
}

/// Structured scene audio descriptor.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AudioDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_from: Option<Value>,
    /// Filled in once the artifact's real duration is known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_sec: Option<f64>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

impl AudioDescriptor {
    fn for_src(src: String) -> Self {
        Self {
            src: Some(src),
            volume: Some(Value::from(1)),
            start_from: Some(Value::from(0)),
            duration_sec: None,
            extra: JsonMap::new(),
        }
    }
}

/// An ordered cluster of spoken lines sharing a gap policy.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScriptGroup {
    pub id: String,
    /// Pause inserted between consecutive items (not after the last)
    #[serde(default)]
    pub gap_sec: Option<f64>,
    #[serde(default = "default_keep_stack")]
    pub keep_stack: Option<bool>,
    pub items: Vec<ScriptItem>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

fn default_keep_stack() -> Option<bool> {
    Some(true)
}

/// One spoken line.
///
/// `voice` and `voice_sec` are assigned by the synthesis stage when absent;
/// a pre-set `voice` fixes the artifact path, not its content.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScriptItem {
    #[serde(rename = "type", default = "default_item_kind")]
    pub kind: Option<String>,
    /// Speaker key (e.g. left/right) resolved against the speaker table
    #[serde(default)]
    pub speaker: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    /// Voice artifact path relative to the project directory
    #[serde(default)]
    pub voice: Option<String>,
    #[serde(default)]
    pub voice_sec: Option<f64>,
    #[serde(default)]
    pub duration_frames: Option<u64>,
    #[serde(default)]
    pub duration_sec: Option<f64>,
    /// Preset-table key override for settings resolution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_speaker: Option<Value>,
    /// Named preset reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_preset: Option<String>,
    /// Inline synthesis settings; win over any preset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_tts: Option<JsonMap>,
    /// Direct engine speaker id overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voicevox_speaker: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tts_speaker_id: Option<Value>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

fn default_item_kind() -> Option<String> {
    Some("talk".to_string())
}
