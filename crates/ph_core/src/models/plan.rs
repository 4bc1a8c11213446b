//! Selection and concatenation plans.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::enums::SegmentKind;
use super::media::{EncodedSegment, SourceCandidate};

/// The ordered set of sources chosen for a run.
///
/// Length is `min(requested, eligible)`, drawn without replacement. The
/// order fixes the per-clip processing sequence and the order of content
/// segments in the final video.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionPlan {
    entries: Vec<SourceCandidate>,
}

impl SelectionPlan {
    pub fn new(entries: Vec<SourceCandidate>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceCandidate> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[SourceCandidate] {
        &self.entries
    }
}

/// The ordered list of encoded segments fed to the final concatenation.
///
/// The plan stores content segments and the single interstitial segment
/// separately; [`ConcatenationPlan::sequence`] interleaves them as
/// `C, X, C, X, ..., C` - content first and last, one interstitial between
/// each adjacent content pair, never a trailing interstitial. Holding the
/// invariant structurally means no caller can build an out-of-order plan.
#[derive(Debug, Clone, PartialEq)]
pub struct ConcatenationPlan {
    interstitial: EncodedSegment,
    contents: Vec<EncodedSegment>,
}

impl ConcatenationPlan {
    /// Create a plan around the encoded interstitial clip.
    pub fn new(interstitial: EncodedSegment) -> Self {
        debug_assert_eq!(interstitial.kind, SegmentKind::Interstitial);
        Self {
            interstitial,
            contents: Vec::new(),
        }
    }

    /// Append one finished content segment.
    pub fn push_content(&mut self, segment: EncodedSegment) {
        debug_assert_eq!(segment.kind, SegmentKind::Content);
        self.contents.push(segment);
    }

    /// Number of content segments in the plan.
    pub fn content_count(&self) -> usize {
        self.contents.len()
    }

    /// Whether no content segment survived processing.
    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// The full playback order: `C, X, C, X, ..., C`.
    pub fn sequence(&self) -> Vec<&EncodedSegment> {
        let mut out = Vec::with_capacity(self.contents.len() * 2);
        for (i, content) in self.contents.iter().enumerate() {
            if i > 0 {
                out.push(&self.interstitial);
            }
            out.push(content);
        }
        out
    }

    /// Paths in playback order, for building the concat list.
    pub fn paths(&self) -> Vec<&Path> {
        self.sequence()
            .into_iter()
            .map(|s| s.path.as_path())
            .collect()
    }

    /// Expected duration of the concatenated output, in seconds.
    pub fn total_duration_secs(&self) -> f64 {
        self.sequence().iter().map(|s| s.duration_secs).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn candidate(name: &str, duration: f64) -> SourceCandidate {
        SourceCandidate {
            path: PathBuf::from(name),
            duration_secs: duration,
            has_audio: true,
        }
    }

    #[test]
    fn selection_plan_preserves_order() {
        let plan = SelectionPlan::new(vec![candidate("a.mp4", 90.0), candidate("b.mp4", 120.0)]);
        assert_eq!(plan.len(), 2);
        let names: Vec<_> = plan.iter().map(|c| c.path.clone()).collect();
        assert_eq!(names, vec![PathBuf::from("a.mp4"), PathBuf::from("b.mp4")]);
    }

    #[test]
    fn concat_sequence_interleaves_without_trailing_interstitial() {
        let mut plan = ConcatenationPlan::new(EncodedSegment::interstitial("x.mp4", 5.0));
        for i in 0..3 {
            plan.push_content(EncodedSegment::content(format!("c{i}.mp4"), 60.0));
        }

        let kinds: Vec<_> = plan.sequence().iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SegmentKind::Content,
                SegmentKind::Interstitial,
                SegmentKind::Content,
                SegmentKind::Interstitial,
                SegmentKind::Content,
            ]
        );
    }

    #[test]
    fn concat_sequence_counts_n_minus_one_interstitials() {
        let mut plan = ConcatenationPlan::new(EncodedSegment::interstitial("x.mp4", 5.0));
        for i in 0..60 {
            plan.push_content(EncodedSegment::content(format!("c{i}.mp4"), 60.0));
        }

        let seq = plan.sequence();
        assert_eq!(seq.len(), 60 + 59);
        assert_eq!(seq.first().unwrap().kind, SegmentKind::Content);
        assert_eq!(seq.last().unwrap().kind, SegmentKind::Content);
        let interstitials = seq
            .iter()
            .filter(|s| s.kind == SegmentKind::Interstitial)
            .count();
        assert_eq!(interstitials, 59);
    }

    #[test]
    fn single_content_plan_has_no_interstitial() {
        let mut plan = ConcatenationPlan::new(EncodedSegment::interstitial("x.mp4", 5.0));
        plan.push_content(EncodedSegment::content("only.mp4", 60.0));
        assert_eq!(plan.sequence().len(), 1);
    }

    #[test]
    fn empty_plan_reports_empty() {
        let plan = ConcatenationPlan::new(EncodedSegment::interstitial("x.mp4", 5.0));
        assert!(plan.is_empty());
        assert!(plan.sequence().is_empty());
    }

    #[test]
    fn total_duration_includes_interstitial_repeats() {
        let mut plan = ConcatenationPlan::new(EncodedSegment::interstitial("x.mp4", 5.0));
        for i in 0..3 {
            plan.push_content(EncodedSegment::content(format!("c{i}.mp4"), 60.0));
        }
        // Three contents plus the two interstitials between them.
        assert_eq!(plan.total_duration_secs(), 3.0 * 60.0 + 2.0 * 5.0);
    }
}
