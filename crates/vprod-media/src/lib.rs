//! External-process plumbing for the video production pipeline.
//!
//! This crate owns everything that crosses the process boundary or touches
//! client-supplied paths:
//! - structured process execution (exit code + captured output)
//! - ffprobe audio-duration probing
//! - the containerized render invocation
//! - path traversal-safe artifact resolution

pub mod error;
pub mod exec;
pub mod paths;
pub mod probe;
pub mod render;

pub use error::{MediaError, MediaResult};
pub use exec::{run_command, sh_quote, CommandOutput};
pub use paths::{ensure_parent_dir, normalize_voice_path, safe_join};
pub use probe::probe_audio_duration;
pub use render::RenderCommand;
