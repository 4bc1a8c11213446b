//! Core data model for the processing pipeline.

mod enums;
mod media;
mod plan;

pub use enums::{QualityPreset, RunStage, SegmentKind};
pub use media::{
    DurationPolicy, EncodedSegment, FadeSpec, LoudnessProfile, LoudnessTarget, SegmentWindow,
    SourceCandidate, TargetSpec,
};
pub use plan::{ConcatenationPlan, SelectionPlan};
