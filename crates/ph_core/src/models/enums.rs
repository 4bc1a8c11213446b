//! Enumerations shared across the pipeline.

use serde::{Deserialize, Serialize};

/// Stage of a pipeline run.
///
/// A run moves linearly through `Probing -> Selecting -> Processing ->
/// Concatenating -> Completed`, and may divert to `Cancelled` or `Failed`
/// from any non-terminal stage. Exactly one terminal stage is reached per
/// run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    #[default]
    Idle,
    Probing,
    Selecting,
    Processing,
    Concatenating,
    Completed,
    Cancelled,
    Failed,
}

impl RunStage {
    /// Whether this stage ends the run.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStage::Completed | RunStage::Cancelled | RunStage::Failed
        )
    }

    /// Human-readable stage name for status displays.
    pub fn label(&self) -> &'static str {
        match self {
            RunStage::Idle => "Idle",
            RunStage::Probing => "Probing sources",
            RunStage::Selecting => "Selecting clips",
            RunStage::Processing => "Processing clips",
            RunStage::Concatenating => "Concatenating",
            RunStage::Completed => "Completed",
            RunStage::Cancelled => "Cancelled",
            RunStage::Failed => "Failed",
        }
    }
}

/// What an encoded segment contributes to the final video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    /// A one-minute segment drawn from a source video.
    Content,
    /// The common clip inserted between content segments.
    Interstitial,
}

/// Output quality preset, mapped onto x264 CRF/preset pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityPreset {
    /// Constant rate factor for libx264.
    pub fn crf(&self) -> u8 {
        match self {
            QualityPreset::Low => 28,
            QualityPreset::Medium => 23,
            QualityPreset::High => 18,
        }
    }

    /// x264 speed preset name.
    pub fn x264_preset(&self) -> &'static str {
        match self {
            QualityPreset::Low => "veryfast",
            QualityPreset::Medium => "medium",
            QualityPreset::High => "slow",
        }
    }
}
