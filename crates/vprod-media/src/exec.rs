//! Structured external-process execution.
//!
//! Every shell-out in the pipeline goes through [`run_command`] so callers
//! get a structured result (exit code, captured stdout/stderr) instead of a
//! bare error, and retry/timeout policy can be layered on without touching
//! call sites.

use std::ffi::OsStr;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::error::MediaResult;

/// Captured result of an external command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Whether the command exited with status zero.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Human-oriented failure detail: stderr when present, else stdout.
    pub fn detail(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            stderr.to_string()
        } else {
            self.stdout.trim().to_string()
        }
    }
}

/// Run a command to completion, capturing its output.
pub async fn run_command<I, S>(program: &str, args: I) -> MediaResult<CommandOutput>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!("Running external command: {}", program);

    let output = command.output().await?;

    Ok(CommandOutput {
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

/// Quote a value for safe interpolation into a POSIX shell command line.
pub fn sh_quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '/' | ':' | '='))
    {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sh_quote_plain_values() {
        assert_eq!(sh_quote("abc-123"), "abc-123");
        assert_eq!(sh_quote("/app/ns-video"), "/app/ns-video");
    }

    #[test]
    fn test_sh_quote_wraps_specials() {
        assert_eq!(sh_quote("a b"), "'a b'");
        assert_eq!(sh_quote("a;rm -rf"), "'a;rm -rf'");
        assert_eq!(sh_quote(""), "''");
        assert_eq!(sh_quote("it's"), r"'it'\''s'");
    }

    #[tokio::test]
    async fn test_run_command_captures_output() {
        let output = run_command("echo", ["hello"]).await.unwrap();
        assert!(output.success());
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn test_detail_prefers_stderr() {
        let output = CommandOutput {
            exit_code: Some(1),
            stdout: "ignored\n".to_string(),
            stderr: "boom\n".to_string(),
        };
        assert_eq!(output.detail(), "boom");

        let output = CommandOutput {
            exit_code: Some(1),
            stdout: "fallback\n".to_string(),
            stderr: String::new(),
        };
        assert_eq!(output.detail(), "fallback");
    }
}
