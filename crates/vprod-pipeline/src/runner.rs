//! Pipeline orchestrator.
//!
//! Stage sequence per job: `tts` → `param-building` → (`rendering`) →
//! `finishing`. Stages run strictly in order inside one background task per
//! job; a supervisor task turns every exit path (success, stage error,
//! panic) into exactly one terminal store update.

use metrics::counter;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use vprod_media::{ensure_parent_dir, MediaError};
use vprod_models::{
    JobErrorInfo, JobId, JobOutcome, JobStatus, JobUpdate, ParameterDoc, ProgressPatch,
    SceneAudio, VideoId, VideoJobRequest,
};
use vprod_tts::TtsClient;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::store::JobStore;
use crate::timing::{compute_hook_sec, compute_total_sec};
use crate::voice::{
    default_voice_name, estimate_voice_sec, merge_presets, resolve_item_speaker,
    resolve_voice_file, voice_settings_for, DurationProbe, FfprobeDurations, VoiceControls,
};

const JOBS_COMPLETED_TOTAL: &str = "vprod_jobs_completed_total";
const JOBS_FAILED_TOTAL: &str = "vprod_jobs_failed_total";

/// Drives jobs through their stages against a shared [`JobStore`].
pub struct Pipeline {
    config: PipelineConfig,
    store: Arc<JobStore>,
    tts: TtsClient,
    probe: Arc<dyn DurationProbe>,
}

impl Pipeline {
    /// Build a pipeline with the ffprobe-backed duration probe.
    pub fn new(config: PipelineConfig, store: Arc<JobStore>) -> PipelineResult<Self> {
        let tts = TtsClient::new(config.tts_base_url.as_str(), config.tts_timeout)?;
        Ok(Self {
            config,
            store,
            tts,
            probe: Arc::new(FfprobeDurations),
        })
    }

    /// Substitute the duration probe (test seam).
    pub fn with_probe(mut self, probe: Arc<dyn DurationProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    /// Launch the background task for an accepted job.
    ///
    /// The returned handle is for tests; callers normally fire and forget.
    /// The supervisor owns the terminal store update so it lands even when
    /// the stage task panics.
    pub fn spawn(self: Arc<Self>, job_id: JobId, request: VideoJobRequest) -> JoinHandle<()> {
        let pipeline = self;
        tokio::spawn(async move {
            let inner = tokio::spawn({
                let pipeline = Arc::clone(&pipeline);
                let job_id = job_id.clone();
                async move { pipeline.run(&job_id, request).await }
            });

            let update = match inner.await {
                Ok(Ok(outcome)) => {
                    counter!(JOBS_COMPLETED_TOTAL).increment(1);
                    info!(job_id = %job_id, "Job finished");
                    JobUpdate::status(JobStatus::Done)
                        .with_result(outcome)
                        .with_progress(ProgressPatch::stage("finishing"))
                }
                Ok(Err(err)) => {
                    counter!(JOBS_FAILED_TOTAL).increment(1);
                    error!(job_id = %job_id, error = %err, "Job failed");
                    JobUpdate::status(JobStatus::Failed)
                        .with_error(err.to_error_info())
                        .with_progress(ProgressPatch::stage("failed"))
                }
                Err(join_err) => {
                    counter!(JOBS_FAILED_TOTAL).increment(1);
                    error!(job_id = %job_id, "Job task died: {join_err}");
                    JobUpdate::status(JobStatus::Failed)
                        .with_error(JobErrorInfo::new(
                            "internal_error",
                            "job task terminated unexpectedly",
                        ))
                        .with_progress(ProgressPatch::stage("failed"))
                }
            };

            if let Err(err) = pipeline.store.update(&job_id, update).await {
                error!(job_id = %job_id, error = %err, "Failed to record terminal job state");
            }
        })
    }

    /// Run all stages for one job. The submitted document is never mutated;
    /// stages work on a private draft which is what gets persisted.
    async fn run(&self, job_id: &JobId, request: VideoJobRequest) -> PipelineResult<JobOutcome> {
        self.store
            .update(
                job_id,
                JobUpdate::status(JobStatus::Running).with_progress(ProgressPatch::stage("tts")),
            )
            .await?;

        let video_id = request.video_id.clone();
        let mut parameter = request.parameter.clone();
        parameter
            .meta
            .entry("videoId".to_string())
            .or_insert_with(|| Value::String(video_id.as_str().to_string()));

        tokio::fs::create_dir_all(self.config.project_dir(&video_id)).await?;

        self.run_tts_stage(job_id, &video_id, &mut parameter, &request)
            .await?;

        self.store
            .update(job_id, JobUpdate::progress(ProgressPatch::stage("param-building")))
            .await?;

        let hook_sec = compute_hook_sec(
            &mut parameter,
            self.config.hook_margin_sec,
            self.config.min_hook_sec,
            self.config.chars_per_sec,
        );
        let param_path = self.write_parameter(&video_id, &parameter).await?;

        let mut outcome = JobOutcome::new(param_path.display().to_string());
        outcome.hook_sec = hook_sec.filter(|sec| *sec != 0.0);
        outcome.total_sec = compute_total_sec(&parameter);

        if request.options.render && !request.options.dry_run {
            if self.config.render.is_configured() {
                self.store
                    .update(job_id, JobUpdate::progress(ProgressPatch::stage("rendering")))
                    .await?;
                let video_path = self.config.render.render(video_id.as_str()).await?;
                outcome.video_path = Some(video_path.display().to_string());
            } else {
                info!(video_id = %video_id, "No render command configured. Skipping render.");
            }
        }

        Ok(outcome)
    }

    /// Synthesize voice for every spoken line, then the hook scene.
    ///
    /// Deterministic order (groups, items, hook last) makes `ttsDone` a
    /// unique progress indicator; each slot publishes immediately.
    async fn run_tts_stage(
        &self,
        job_id: &JobId,
        video_id: &VideoId,
        parameter: &mut ParameterDoc,
        request: &VideoJobRequest,
    ) -> PipelineResult<()> {
        let options = &request.options;
        let presets = merge_presets(parameter, request.voice_presets.as_ref());
        let hook_required = parameter
            .scenes
            .first()
            .map(|scene| scene.has_hook_text())
            .unwrap_or(false);

        let item_count: usize = parameter
            .script_groups
            .iter()
            .map(|group| group.items.len())
            .sum();
        let total = (item_count + usize::from(hook_required)) as u32;

        self.store
            .update(
                job_id,
                JobUpdate::progress(
                    ProgressPatch::stage("tts").with_tts_total(total).with_tts_done(0),
                ),
            )
            .await?;
        if total == 0 {
            return Ok(());
        }

        let project_dir = self.config.project_dir(video_id);
        let mut done: u32 = 0;

        for (group_index, group) in parameter.script_groups.iter_mut().enumerate() {
            for (item_index, item) in group.items.iter_mut().enumerate() {
                let text = item.text.as_deref().unwrap_or("").trim().to_string();
                if text.is_empty() {
                    item.voice_sec = Some(0.0);
                    done += 1;
                    self.store
                        .update(job_id, JobUpdate::progress(ProgressPatch::tts_done(done)))
                        .await?;
                    continue;
                }

                let voice_path = item
                    .voice
                    .clone()
                    .filter(|voice| !voice.is_empty())
                    .unwrap_or_else(|| {
                        default_voice_name(video_id.as_str(), group_index, item_index)
                    });
                item.voice = Some(voice_path.clone());
                let target = resolve_voice_file(&project_dir, video_id.as_str(), &voice_path)?;

                if options.generate_audio {
                    let fallback = resolve_item_speaker(item, &self.config.speakers);
                    let tuning = voice_settings_for(
                        VoiceControls::from(&*item),
                        &presets,
                        item.speaker.as_deref(),
                        fallback,
                    );
                    let audio = self
                        .tts
                        .synthesize(&text, tuning.speaker_id, Some(&tuning.settings))
                        .await?;
                    ensure_parent_dir(&target).await?;
                    tokio::fs::write(&target, &audio).await?;
                } else if !target.exists() {
                    return Err(PipelineError::VoiceFileMissing(voice_path));
                }

                item.voice_sec = Some(self.probed_duration(&target, &text).await?);
                done += 1;
                self.store
                    .update(job_id, JobUpdate::progress(ProgressPatch::tts_done(done)))
                    .await?;
            }
        }

        if hook_required {
            if let Some(scene) = parameter.scenes.first_mut() {
                let mut audio_conf = scene.audio_descriptor(&self.config.hook_audio_path);
                let text = scene.text.clone().unwrap_or_default();

                let voice_path = audio_conf
                    .src
                    .as_deref()
                    .map(str::trim)
                    .filter(|src| !src.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| self.config.hook_audio_path.clone());
                audio_conf.src = Some(voice_path.clone());
                let target = resolve_voice_file(&project_dir, video_id.as_str(), &voice_path)?;

                if options.generate_audio {
                    let tuning = voice_settings_for(
                        VoiceControls::from(&*scene),
                        &presets,
                        Some("hook"),
                        self.config.speakers.hook_speaker,
                    );
                    let audio = self
                        .tts
                        .synthesize(text.trim(), tuning.speaker_id, Some(&tuning.settings))
                        .await?;
                    ensure_parent_dir(&target).await?;
                    tokio::fs::write(&target, &audio).await?;
                } else if !target.exists() {
                    return Err(PipelineError::VoiceFileMissing(voice_path));
                }

                audio_conf.duration_sec = Some(self.probed_duration(&target, &text).await?);
                scene.audio = Some(SceneAudio::Descriptor(audio_conf));
                done += 1;
                self.store
                    .update(job_id, JobUpdate::progress(ProgressPatch::tts_done(done)))
                    .await?;
            }
        }

        Ok(())
    }

    /// Probe an artifact's duration; a missing file falls back to the text
    /// estimate, any other probe failure fails the job.
    async fn probed_duration(&self, target: &std::path::Path, text: &str) -> PipelineResult<f64> {
        match self.probe.duration_sec(target).await {
            Ok(duration) => Ok(duration),
            Err(MediaError::FileNotFound(_)) => {
                Ok(estimate_voice_sec(text, self.config.chars_per_sec))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Persist the finished document (pretty JSON, nulls kept).
    async fn write_parameter(
        &self,
        video_id: &VideoId,
        parameter: &ParameterDoc,
    ) -> PipelineResult<PathBuf> {
        let path = self.config.parameter_path(video_id)?;
        ensure_parent_dir(&path).await?;
        let body = serde_json::to_string_pretty(parameter)?;
        tokio::fs::write(&path, body).await?;
        info!(video_id = %video_id, path = %path.display(), "Parameter document written");
        Ok(path)
    }
}
