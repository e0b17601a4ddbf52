//! Derived timing computation.
//!
//! Runs after the synthesis stage, once every spoken line carries a
//! duration. Writes the hook-scene duration back onto scene 0 and derives
//! the total document duration for the job result.

use vprod_models::{ParameterDoc, SceneAudio};

use crate::util::{round_ms, value_to_f64, value_truthy};
use crate::voice::estimate_voice_sec;

/// Compute the hook-scene duration and write it onto scene 0.
///
/// A non-zero duration already stated on the scene's audio descriptor is
/// trusted. Otherwise: sum of the first group's item durations plus the
/// inter-item gaps plus `margin_sec`, floored at `min_hook_sec`.
pub(crate) fn compute_hook_sec(
    parameter: &mut ParameterDoc,
    margin_sec: f64,
    min_hook_sec: f64,
    chars_per_sec: f64,
) -> Option<f64> {
    if parameter.scenes.is_empty() || parameter.script_groups.is_empty() {
        return None;
    }

    let stated = match &parameter.scenes[0].audio {
        Some(SceneAudio::Descriptor(descriptor)) => {
            descriptor.duration_sec.filter(|sec| *sec != 0.0)
        }
        _ => None,
    };

    let duration = stated.unwrap_or_else(|| {
        let group = &parameter.script_groups[0];
        let gap = group.gap_sec.unwrap_or(0.0);

        let mut total = 0.0;
        for (index, item) in group.items.iter().enumerate() {
            total += item.voice_sec.filter(|sec| *sec != 0.0).unwrap_or_else(|| {
                estimate_voice_sec(item.text.as_deref().unwrap_or(""), chars_per_sec)
            });
            if index + 1 < group.items.len() {
                total += gap;
            }
        }
        (total + margin_sec).max(min_hook_sec)
    });

    let computed = round_ms(duration);
    parameter.scenes[0].duration_sec = Some(computed);
    Some(computed)
}

/// Total document duration: sum of explicit scene durations, else the render
/// spec's frame count over fps. Shape problems yield `None`, never an error.
pub(crate) fn compute_total_sec(parameter: &ParameterDoc) -> Option<f64> {
    let sum: f64 = parameter
        .scenes
        .iter()
        .filter_map(|scene| scene.duration_sec)
        .filter(|sec| *sec != 0.0)
        .sum();

    if sum > 0.0 {
        return Some(round_ms(sum));
    }

    spec_fallback(parameter)
}

fn spec_fallback(parameter: &ParameterDoc) -> Option<f64> {
    let fps = match parameter.spec.get("fps") {
        None => 30.0,
        Some(value) => value_to_f64(value)?,
    };
    let frames = match parameter.spec.get("durationInFrames") {
        Some(value) if value_truthy(value) => value_to_f64(value)?,
        _ => 0.0,
    };

    if frames > 0.0 && fps > 0.0 {
        Some(round_ms(frames / fps))
    } else {
        None
    }
}
