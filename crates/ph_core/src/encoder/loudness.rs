//! Two-pass loudnorm filter strings and analysis parsing.
//!
//! Pass one runs `loudnorm` with `print_format=json` against a null output;
//! ffmpeg prints the measured statistics as a JSON block at the end of
//! stderr. Pass two feeds those measurements back as `measured_*`
//! parameters with `linear=true` so the gain is applied in one linear step.

use serde::Deserialize;

use crate::models::{LoudnessProfile, LoudnessTarget};

/// Filter string for the measurement pass.
pub fn analysis_filter(target: &LoudnessTarget) -> String {
    format!(
        "loudnorm=I={}:LRA={}:TP={}:print_format=json",
        target.integrated_lufs, target.loudness_range, target.true_peak_dbtp
    )
}

/// Filter string for the normalizing pass.
pub fn normalize_filter(target: &LoudnessTarget, profile: &LoudnessProfile) -> String {
    format!(
        "loudnorm=I={}:LRA={}:TP={}:measured_I={:.2}:measured_LRA={:.2}:measured_TP={:.2}:\
         measured_thresh={:.2}:offset={:.2}:linear=true",
        target.integrated_lufs,
        target.loudness_range,
        target.true_peak_dbtp,
        profile.input_i,
        profile.input_lra,
        profile.input_tp,
        profile.input_thresh,
        profile.target_offset
    )
}

/// Raw JSON shape as printed by the filter. All values are strings.
#[derive(Debug, Deserialize)]
struct RawLoudnorm {
    input_i: String,
    input_tp: String,
    input_lra: String,
    input_thresh: String,
    target_offset: String,
}

/// Extract the measured loudness profile from an ffmpeg stderr transcript.
///
/// Finds the last JSON object in the output and parses it. Returns `None`
/// when no parsable block is present (e.g. the run died before the filter
/// printed its summary).
pub fn parse_loudnorm_output(stderr: &str) -> Option<LoudnessProfile> {
    let start = stderr.rfind('{')?;
    let end = stderr[start..].find('}')? + start;
    let block = &stderr[start..=end];

    let raw: RawLoudnorm = serde_json::from_str(block).ok()?;

    Some(LoudnessProfile {
        input_i: parse_measure(&raw.input_i, -99.0, 0.0)?,
        input_tp: parse_measure(&raw.input_tp, -99.0, 99.0)?,
        input_lra: parse_measure(&raw.input_lra, 0.0, 99.0)?,
        input_thresh: parse_measure(&raw.input_thresh, -99.0, 0.0)?,
        target_offset: parse_measure(&raw.target_offset, -99.0, 99.0)?,
    })
}

/// Parse one measurement, clamping to the range the filter accepts.
///
/// Silent sources measure `-inf`, which the second pass rejects; clamping
/// keeps the run alive with a floor value instead.
fn parse_measure(value: &str, min: f64, max: f64) -> Option<f64> {
    let parsed = match value.trim() {
        "-inf" => f64::NEG_INFINITY,
        "inf" => f64::INFINITY,
        other => other.parse::<f64>().ok()?,
    };
    Some(parsed.clamp(min, max))
}
