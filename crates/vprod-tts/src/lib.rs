//! HTTP client for the TTS engine.
//!
//! The engine exposes a two-step protocol: `audio_query` returns a synthesis
//! parameter document for given text and speaker, and `synthesis` turns that
//! document into raw audio bytes. Callers may overlay recognized tuning
//! parameters onto the query document between the two calls.

pub mod client;
pub mod error;

pub use client::{apply_overrides, TtsClient, SYNTH_PARAM_KEYS};
pub use error::{TtsError, TtsResult};
