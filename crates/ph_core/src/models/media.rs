//! Media-level value types: probed sources, segment windows, loudness
//! measurements, and the uniform encode target.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::enums::SegmentKind;

/// A source file that survived probing.
///
/// Immutable once created; candidates whose probe failed or whose duration
/// falls under the [`DurationPolicy`] never become a `SourceCandidate` in a
/// selection plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceCandidate {
    /// Path to the source file.
    pub path: PathBuf,
    /// Probed duration in seconds.
    pub duration_secs: f64,
    /// Whether the file carries at least one audio stream.
    pub has_audio: bool,
}

/// Minimum-duration contract for source eligibility.
///
/// A source is eligible only if
/// `duration >= clip_length + 2 * edge_margin`. Violators are excluded from
/// selection, never clamped. With the defaults (60s clips, 10s margins) the
/// floor is 80 seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DurationPolicy {
    /// Length of each extracted segment, in seconds.
    pub clip_length_secs: f64,
    /// Seconds reserved at the start and end of every source, excluded
    /// from random segment selection.
    pub edge_margin_secs: f64,
}

impl Default for DurationPolicy {
    fn default() -> Self {
        Self {
            clip_length_secs: 60.0,
            edge_margin_secs: 10.0,
        }
    }
}

impl DurationPolicy {
    /// The minimum source duration this policy accepts.
    pub fn min_duration_secs(&self) -> f64 {
        self.clip_length_secs + 2.0 * self.edge_margin_secs
    }

    /// Whether a source of the given duration is eligible.
    pub fn is_eligible(&self, duration_secs: f64) -> bool {
        duration_secs >= self.min_duration_secs()
    }

    /// Width of the span from which a start offset may be drawn.
    ///
    /// Negative when the source is too short; zero when the window fits
    /// exactly once (start offset is forced to the edge margin).
    pub fn usable_span_secs(&self, duration_secs: f64) -> f64 {
        duration_secs - 2.0 * self.edge_margin_secs - self.clip_length_secs
    }
}

/// The extraction window chosen for one source.
///
/// Invariant: `edge_margin <= start <= duration - edge_margin - length`,
/// i.e. the window never overlaps the reserved edges of the source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentWindow {
    /// Offset into the source, in seconds.
    pub start_secs: f64,
    /// Window length, in seconds.
    pub duration_secs: f64,
}

impl SegmentWindow {
    pub fn new(start_secs: f64, duration_secs: f64) -> Self {
        Self {
            start_secs,
            duration_secs,
        }
    }

    /// End offset of the window within the source.
    pub fn end_secs(&self) -> f64 {
        self.start_secs + self.duration_secs
    }
}

/// Measured loudness statistics from a first-pass `loudnorm` analysis.
///
/// Field names follow the keys ffmpeg prints in its JSON summary; the
/// values feed the second (normalizing) pass as `measured_*` parameters.
/// Not persisted beyond the run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoudnessProfile {
    /// Integrated loudness, LUFS.
    pub input_i: f64,
    /// True peak, dBTP.
    pub input_tp: f64,
    /// Loudness range, LU.
    pub input_lra: f64,
    /// Measurement threshold, LUFS.
    pub input_thresh: f64,
    /// Offset to apply to reach the target, LU.
    pub target_offset: f64,
}

impl Default for LoudnessProfile {
    /// Neutral fallback used when a source has no measurable audio; matches
    /// the filter's own defaults so normalization degrades to a no-op.
    fn default() -> Self {
        Self {
            input_i: -23.0,
            input_tp: -1.5,
            input_lra: 7.0,
            input_thresh: -50.0,
            target_offset: 0.0,
        }
    }
}

/// Normalization target for the `loudnorm` filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoudnessTarget {
    /// Target integrated loudness, LUFS.
    pub integrated_lufs: f64,
    /// Target loudness range, LU.
    pub loudness_range: f64,
    /// Maximum true peak, dBTP.
    pub true_peak_dbtp: f64,
}

impl Default for LoudnessTarget {
    fn default() -> Self {
        Self {
            integrated_lufs: -23.0,
            loudness_range: 7.0,
            true_peak_dbtp: -1.5,
        }
    }
}

/// The uniform output spec every segment is re-encoded to.
///
/// All segments sharing this spec is what makes the final concatenation a
/// stream copy rather than a second encode pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetSpec {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// libx264 constant rate factor.
    pub crf: u8,
    /// x264 speed preset.
    pub preset: String,
    pub audio_bitrate_kbps: u32,
    pub audio_sample_rate_hz: u32,
    pub audio_channels: u8,
}

impl Default for TargetSpec {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 30,
            crf: 23,
            preset: "medium".to_string(),
            audio_bitrate_kbps: 192,
            audio_sample_rate_hz: 48_000,
            audio_channels: 2,
        }
    }
}

/// Fade transition applied at segment boundaries.
///
/// Fades apply uniformly to every segment and to the interstitial,
/// including the very first and last - one rule, visually consistent.
/// A zero duration disables fading entirely.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FadeSpec {
    /// Fade-in/fade-out duration in seconds. Valid range 0-10.
    pub duration_secs: f64,
}

impl FadeSpec {
    /// Longest fade the pipeline accepts.
    pub const MAX_SECS: f64 = 10.0;

    pub fn new(duration_secs: f64) -> Self {
        Self { duration_secs }
    }

    /// Whether the configured duration is within the accepted range.
    pub fn is_valid(&self) -> bool {
        self.duration_secs >= 0.0 && self.duration_secs <= Self::MAX_SECS
    }

    /// Whether fading is a no-op.
    pub fn is_disabled(&self) -> bool {
        self.duration_secs <= 0.0
    }
}

impl Default for FadeSpec {
    fn default() -> Self {
        Self { duration_secs: 3.0 }
    }
}

/// A fully processed (trimmed, normalized, scaled, faded) piece on disk.
///
/// Lives only inside the run's temporary working directory and is removed
/// with it on every exit path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedSegment {
    pub path: PathBuf,
    pub kind: SegmentKind,
    /// Encoded length in seconds, for progress scaling.
    pub duration_secs: f64,
}

impl EncodedSegment {
    pub fn content(path: impl Into<PathBuf>, duration_secs: f64) -> Self {
        Self {
            path: path.into(),
            kind: SegmentKind::Content,
            duration_secs,
        }
    }

    pub fn interstitial(path: impl Into<PathBuf>, duration_secs: f64) -> Self {
        Self {
            path: path.into(),
            kind: SegmentKind::Interstitial,
            duration_secs,
        }
    }
}
