//! End-to-end orchestrator tests.
//!
//! The TTS engine is a wiremock server and the duration probe is scripted,
//! so jobs run through every stage against a temp project root without
//! external tools.

use async_trait::async_trait;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vprod_media::{MediaError, MediaResult, RenderCommand};
use vprod_pipeline::{DurationProbe, JobStore, Pipeline, PipelineConfig, SpeakerTable};
use vprod_models::{JobStatus, VideoJobRequest};

/// Probe returning a fixed duration for existing files.
struct FixedProbe(f64);

#[async_trait]
impl DurationProbe for FixedProbe {
    async fn duration_sec(&self, path: &Path) -> MediaResult<f64> {
        if !path.exists() {
            return Err(MediaError::FileNotFound(path.to_path_buf()));
        }
        Ok(self.0)
    }
}

/// Probe that dies, to exercise the supervisor.
struct PanickingProbe;

#[async_trait]
impl DurationProbe for PanickingProbe {
    async fn duration_sec(&self, _path: &Path) -> MediaResult<f64> {
        panic!("probe blew up");
    }
}

fn test_config(projects_root: &Path, out_dir: &Path, tts_url: &str) -> PipelineConfig {
    PipelineConfig {
        projects_root: projects_root.to_path_buf(),
        video_out_dir: out_dir.to_path_buf(),
        param_template: "{video_id}/parameter.json".to_string(),
        tts_base_url: tts_url.to_string(),
        tts_timeout: Duration::from_secs(5),
        hook_margin_sec: 0.8,
        min_hook_sec: 3.0,
        chars_per_sec: 8.0,
        hook_audio_path: "media/audio/hook.wav".to_string(),
        speakers: SpeakerTable::new([("left".to_string(), 8), ("right".to_string(), 3)], 8, 8),
        render: RenderCommand {
            command_template: None,
            workdir_in_container: None,
            docker_service: "remotion".to_string(),
            docker_shell: "/bin/sh".to_string(),
            docker_user: "node".to_string(),
            output_dir: out_dir.to_path_buf(),
            output_template: "{video_id}.mp4".to_string(),
        },
    }
}

async fn mock_tts() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/audio_query"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"speedScale": 1.0, "accentPhrases": []})),
        )
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/synthesis"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"RIFFfake-wav".to_vec()))
        .mount(&server)
        .await;

    server
}

fn request(value: serde_json::Value) -> VideoJobRequest {
    serde_json::from_value(value).unwrap()
}

async fn run_to_completion(
    pipeline: Arc<Pipeline>,
    req: VideoJobRequest,
) -> vprod_models::JobSummary {
    let summary = pipeline.store().create(req.clone()).await.unwrap();
    let job_id = summary.job_id.clone();
    Arc::clone(&pipeline).spawn(job_id.clone(), req).await.unwrap();
    pipeline.store().get(&job_id).await.unwrap()
}

#[tokio::test]
async fn test_full_run_synthesizes_and_persists() {
    let projects = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let tts = mock_tts().await;

    let store = Arc::new(JobStore::new());
    let pipeline = Arc::new(
        Pipeline::new(test_config(projects.path(), out.path(), &tts.uri()), store)
            .unwrap()
            .with_probe(Arc::new(FixedProbe(2.5))),
    );

    let req = request(json!({
        "videoId": "abc",
        "parameter": {
            "spec": {"fps": 30},
            "meta": {},
            "scenes": [{"startFrame": 0, "text": "opening line"}],
            "scriptGroups": [{
                "id": "g1",
                "gapSec": 0.5,
                "items": [
                    {"speaker": "left", "text": "hello there"},
                    {"text": "   "}
                ]
            }]
        }
    }));

    let job = run_to_completion(pipeline, req).await;

    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(job.progress.stage, "finishing");
    assert_eq!(job.progress.tts_total, Some(3));
    assert_eq!(job.progress.tts_done, Some(3));
    assert!(job.error.is_none());

    let result = job.result.expect("result set on done");
    // Hook duration comes straight from the probed hook artifact.
    assert_eq!(result.hook_sec, Some(2.5));
    assert_eq!(result.total_sec, Some(2.5));
    assert!(result.video_path.is_none());

    // Synthesized artifacts land under the project directory.
    let project_dir = projects.path().join("abc");
    assert!(project_dir.join("media/audio/abc-01-01.wav").exists());
    assert!(project_dir.join("media/audio/hook.wav").exists());

    // The persisted document carries the computed fields.
    let written: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(PathBuf::from(&result.parameter_path)).unwrap(),
    )
    .unwrap();
    assert_eq!(written["meta"]["videoId"], json!("abc"));
    let items = &written["scriptGroups"][0]["items"];
    assert_eq!(items[0]["voice"], json!("media/audio/abc-01-01.wav"));
    assert_eq!(items[0]["voiceSec"], json!(2.5));
    assert_eq!(items[1]["voiceSec"], json!(0.0));
    assert!(items[1]["voice"].is_null());
    assert_eq!(written["scenes"][0]["durationSec"], json!(2.5));
    assert_eq!(written["scenes"][0]["audio"]["durationSec"], json!(2.5));
    // Declared-but-unset fields keep null presence for downstream readers.
    assert!(written.as_object().unwrap().contains_key("captions"));
    assert!(written["captions"].is_null());
}

#[tokio::test]
async fn test_generation_disabled_requires_prestaged_artifacts() {
    let projects = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let tts = mock_tts().await;

    let store = Arc::new(JobStore::new());
    let pipeline = Arc::new(
        Pipeline::new(test_config(projects.path(), out.path(), &tts.uri()), store)
            .unwrap()
            .with_probe(Arc::new(FixedProbe(1.0))),
    );

    let req = request(json!({
        "videoId": "abc",
        "parameter": {
            "spec": {},
            "meta": {},
            "scenes": [{"startFrame": 0}],
            "scriptGroups": [{"id": "g1", "items": [{"text": "needs audio"}]}]
        },
        "options": {"generateAudio": false, "render": false}
    }));

    let job = run_to_completion(pipeline, req).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.progress.stage, "failed");
    assert!(job.result.is_none());
    let error = job.error.expect("error set on failed");
    assert_eq!(error.code, "voice_file_missing");
    assert!(error.message.contains("media/audio/abc-01-01.wav"));
}

#[tokio::test]
async fn test_generation_disabled_uses_prestaged_artifact() {
    let projects = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let tts = mock_tts().await;

    // Pre-stage the expected artifact.
    let audio_dir = projects.path().join("abc/media/audio");
    std::fs::create_dir_all(&audio_dir).unwrap();
    std::fs::write(audio_dir.join("abc-01-01.wav"), b"RIFF").unwrap();

    let store = Arc::new(JobStore::new());
    let pipeline = Arc::new(
        Pipeline::new(test_config(projects.path(), out.path(), &tts.uri()), store)
            .unwrap()
            .with_probe(Arc::new(FixedProbe(4.0))),
    );

    let req = request(json!({
        "videoId": "abc",
        "parameter": {
            "spec": {},
            "meta": {},
            "scenes": [{"startFrame": 0}],
            "scriptGroups": [{"id": "g1", "items": [{"text": "pre-staged"}]}]
        },
        "options": {"generateAudio": false, "render": false}
    }));

    let job = run_to_completion(pipeline, req).await;

    assert_eq!(job.status, JobStatus::Done);
    let written: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(&job.result.unwrap().parameter_path).unwrap(),
    )
    .unwrap();
    assert_eq!(written["scriptGroups"][0]["items"][0]["voiceSec"], json!(4.0));
}

#[tokio::test]
async fn test_traversal_voice_path_fails_job() {
    let projects = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let tts = mock_tts().await;

    let store = Arc::new(JobStore::new());
    let pipeline = Arc::new(
        Pipeline::new(test_config(projects.path(), out.path(), &tts.uri()), store)
            .unwrap()
            .with_probe(Arc::new(FixedProbe(1.0))),
    );

    let req = request(json!({
        "videoId": "abc",
        "parameter": {
            "spec": {},
            "meta": {},
            "scenes": [{"startFrame": 0}],
            "scriptGroups": [{
                "id": "g1",
                "items": [{"text": "evil", "voice": "../../etc/passwd"}]
            }]
        }
    }));

    let job = run_to_completion(pipeline, req).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error.unwrap().code, "unsafe_path");
    // Nothing escaped the project root.
    assert!(!projects.path().join("etc/passwd").exists());
}

#[tokio::test]
async fn test_empty_script_job_completes_with_spec_fallback() {
    let projects = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let tts = mock_tts().await;

    let store = Arc::new(JobStore::new());
    let pipeline = Arc::new(
        Pipeline::new(test_config(projects.path(), out.path(), &tts.uri()), store)
            .unwrap()
            .with_probe(Arc::new(FixedProbe(1.0))),
    );

    let req = request(json!({
        "videoId": "empty",
        "parameter": {
            "spec": {"fps": 30, "durationInFrames": 900},
            "meta": {},
            "scenes": [{"startFrame": 0}],
            "scriptGroups": []
        }
    }));

    let job = run_to_completion(pipeline, req).await;

    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(job.progress.tts_total, Some(0));
    let result = job.result.unwrap();
    assert!(result.hook_sec.is_none());
    assert_eq!(result.total_sec, Some(30.0));
    assert!(projects.path().join("empty/parameter.json").exists());
}

#[tokio::test]
async fn test_panicking_stage_still_reaches_terminal_state() {
    let projects = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let tts = mock_tts().await;

    let store = Arc::new(JobStore::new());
    let pipeline = Arc::new(
        Pipeline::new(test_config(projects.path(), out.path(), &tts.uri()), store)
            .unwrap()
            .with_probe(Arc::new(PanickingProbe)),
    );

    let req = request(json!({
        "videoId": "abc",
        "parameter": {
            "spec": {},
            "meta": {},
            "scenes": [{"startFrame": 0}],
            "scriptGroups": [{"id": "g1", "items": [{"text": "boom"}]}]
        }
    }));

    let job = run_to_completion(pipeline, req).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.result.is_none());
    assert_eq!(job.error.unwrap().code, "internal_error");
}
