//! Render invocation.
//!
//! The render pipeline runs inside a companion container; we build a shell
//! line from a configured command template and execute it through
//! `docker exec`. The video identifier is shell-quoted everywhere it is
//! interpolated.

use std::path::PathBuf;
use tracing::{debug, info};

use crate::error::{MediaError, MediaResult};
use crate::exec::{run_command, sh_quote};

/// Configuration for the external render command.
#[derive(Debug, Clone)]
pub struct RenderCommand {
    /// Command template with `{video_id}` placeholders; empty disables rendering
    pub command_template: Option<String>,
    /// Working directory inside the render container
    pub workdir_in_container: Option<String>,
    pub docker_service: String,
    pub docker_shell: String,
    pub docker_user: String,
    /// Directory the render drops finished videos into
    pub output_dir: PathBuf,
    /// Output artifact name template with a `{video_id}` placeholder
    pub output_template: String,
}

impl RenderCommand {
    /// Read render settings from the environment.
    pub fn from_env(output_dir: PathBuf) -> Self {
        let command_template = std::env::var("REMOTION_RENDER_COMMAND").unwrap_or_else(|_| {
            "REMOTION_BUNDLE_CACHE=/tmp/remotion-cache \
             REMOTION_DISABLE_DEFAULT_FOLDER_CLEANUP=true \
             npm run render:project -- --project {video_id}"
                .to_string()
        });

        Self {
            command_template: Some(command_template).filter(|t| !t.trim().is_empty()),
            workdir_in_container: Some(
                std::env::var("REMOTION_WORKDIR_IN_CONTAINER")
                    .unwrap_or_else(|_| "/app/ns-video".to_string()),
            )
            .filter(|w| !w.is_empty()),
            docker_service: std::env::var("REMOTION_DOCKER_SERVICE")
                .unwrap_or_else(|_| "remotion".to_string()),
            docker_shell: std::env::var("REMOTION_DOCKER_SHELL")
                .unwrap_or_else(|_| "/bin/sh".to_string()),
            docker_user: std::env::var("REMOTION_DOCKER_USER")
                .unwrap_or_else(|_| "node".to_string()),
            output_dir,
            output_template: std::env::var("REMOTION_OUTPUT_TEMPLATE")
                .unwrap_or_else(|_| "{video_id}.mp4".to_string()),
        }
    }

    /// Whether a render command template is configured.
    pub fn is_configured(&self) -> bool {
        self.command_template.is_some()
    }

    /// Expected output artifact path for a video.
    pub fn output_path(&self, video_id: &str) -> PathBuf {
        let rel = self.output_template.replace("{video_id}", video_id);
        self.output_dir
            .join(rel.trim_start_matches(['/', '\\']))
    }

    /// Build the shell line executed inside the render container.
    pub fn shell_line(&self, video_id: &str) -> Option<String> {
        let template = self.command_template.as_deref()?;
        let safe_id = sh_quote(video_id);

        let mut line = template.replace("{video_id}", &safe_id);
        line = format!(
            "npm_config_project={safe_id} REMOTION_PROJECT={safe_id} {line}"
        );
        if let Some(workdir) = &self.workdir_in_container {
            line = format!("cd {} && {}", sh_quote(workdir), line);
        }
        Some(line)
    }

    /// Run the render and verify the expected output artifact exists.
    pub async fn render(&self, video_id: &str) -> MediaResult<PathBuf> {
        let line = self.shell_line(video_id).ok_or_else(|| MediaError::RenderFailed {
            exit_code: None,
            detail: "render command not configured".to_string(),
        })?;

        debug!(video_id, "Render shell line: {}", line);

        let output = run_command(
            "docker",
            [
                "exec",
                "--user",
                self.docker_user.as_str(),
                self.docker_service.as_str(),
                self.docker_shell.as_str(),
                "-c",
                line.as_str(),
            ],
        )
        .await?;

        if !output.success() {
            return Err(MediaError::RenderFailed {
                exit_code: output.exit_code,
                detail: output.detail(),
            });
        }

        let produced = self.output_path(video_id);
        if !produced.exists() {
            return Err(MediaError::RenderOutputMissing(produced));
        }

        info!(video_id, path = %produced.display(), "Render finished");
        Ok(produced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command() -> RenderCommand {
        RenderCommand {
            command_template: Some("npm run render:project -- --project {video_id}".to_string()),
            workdir_in_container: Some("/app/ns-video".to_string()),
            docker_service: "remotion".to_string(),
            docker_shell: "/bin/sh".to_string(),
            docker_user: "node".to_string(),
            output_dir: PathBuf::from("/out"),
            output_template: "{video_id}.mp4".to_string(),
        }
    }

    #[test]
    fn test_shell_line_interpolation() {
        let line = command().shell_line("abc").unwrap();
        assert_eq!(
            line,
            "cd /app/ns-video && npm_config_project=abc REMOTION_PROJECT=abc \
             npm run render:project -- --project abc"
        );
    }

    #[test]
    fn test_shell_line_quotes_hostile_ids() {
        let line = command().shell_line("a;rm -rf /").unwrap();
        assert!(line.contains("--project 'a;rm -rf /'"));
        assert!(line.contains("REMOTION_PROJECT='a;rm -rf /'"));
    }

    #[test]
    fn test_shell_line_without_workdir() {
        let mut cmd = command();
        cmd.workdir_in_container = None;
        let line = cmd.shell_line("abc").unwrap();
        assert!(line.starts_with("npm_config_project=abc"));
    }

    #[test]
    fn test_output_path() {
        assert_eq!(command().output_path("abc"), PathBuf::from("/out/abc.mp4"));

        let mut cmd = command();
        cmd.output_template = "/final/{video_id}.mp4".to_string();
        assert_eq!(cmd.output_path("abc"), PathBuf::from("/out/final/abc.mp4"));
    }

    #[test]
    fn test_unconfigured_command() {
        let mut cmd = command();
        cmd.command_template = None;
        assert!(!cmd.is_configured());
        assert!(cmd.shell_line("abc").is_none());
    }
}
