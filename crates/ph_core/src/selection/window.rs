//! Random segment window planning.

use rand::Rng;
use thiserror::Error;

use crate::models::{DurationPolicy, SegmentWindow};

/// Errors from window planning.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WindowError {
    #[error("source is {duration_secs:.1}s, below the {min_secs:.1}s floor")]
    TooShort {
        duration_secs: f64,
        min_secs: f64,
    },
}

/// Choose a random extraction window inside a source.
///
/// The start offset is drawn uniformly from
/// `[edge_margin, duration - edge_margin - clip_length]`; sources at exactly
/// the policy floor get the single valid window starting at the margin.
pub fn plan_window<R: Rng>(
    duration_secs: f64,
    policy: &DurationPolicy,
    rng: &mut R,
) -> Result<SegmentWindow, WindowError> {
    if !policy.is_eligible(duration_secs) {
        return Err(WindowError::TooShort {
            duration_secs,
            min_secs: policy.min_duration_secs(),
        });
    }

    let span = policy.usable_span_secs(duration_secs);
    let offset = if span > 0.0 {
        rng.gen_range(0.0..=span)
    } else {
        0.0
    };

    Ok(SegmentWindow::new(
        policy.edge_margin_secs + offset,
        policy.clip_length_secs,
    ))
}
