//! Source enumeration, eligibility filtering, and random selection.
//!
//! Selection runs in three steps: enumerate the source folder (filesystem
//! only, no subprocesses), probe each file and apply the duration policy,
//! then draw the requested number of sources without replacement. The draw
//! order is the processing order and the order of content segments in the
//! final video.

mod window;

pub use window::{plan_window, WindowError};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rand::Rng;

use crate::cancel::CancelHandle;
use crate::models::{DurationPolicy, SelectionPlan, SourceCandidate};
use crate::probe::MediaProber;

/// File extensions never considered video sources.
pub const EXCLUDED_EXTENSIONS: &[&str] = &["log", "py", "txt", "json"];

/// Why a file was left out of the candidate pool.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// Probing the file failed; carries the error text.
    ProbeFailed(String),
    /// Probed fine but shorter than the policy floor.
    TooShort { duration_secs: f64 },
    /// Carries no audio stream; would break the uniform output spec.
    NoAudio,
}

/// A file that was enumerated but did not become a candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSource {
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// List candidate files in a source folder.
///
/// Returns a sorted list of regular files, excluding hidden files and the
/// extensions in [`EXCLUDED_EXTENSIONS`]. Does not recurse.
pub fn enumerate_sources(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if !entry.file_type()?.is_file() {
            continue;
        }

        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with('.') {
            continue;
        }

        let excluded = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| {
                let e = e.to_ascii_lowercase();
                EXCLUDED_EXTENSIONS.iter().any(|x| *x == e)
            })
            .unwrap_or(false);
        if excluded {
            continue;
        }

        files.push(path);
    }

    // Deterministic enumeration order; randomness enters only at the draw.
    files.sort();
    Ok(files)
}

/// Probe every enumerated file and apply the duration policy.
///
/// Per-file probe failures are skips, never fatal: the failed file is
/// reported in the skip list and the rest of the pool is still probed.
/// Returns early with whatever was gathered so far when cancelled.
pub fn probe_candidates(
    paths: &[PathBuf],
    policy: &DurationPolicy,
    prober: &dyn MediaProber,
    cancel: &CancelHandle,
) -> (Vec<SourceCandidate>, Vec<SkippedSource>) {
    let mut candidates = Vec::new();
    let mut skipped = Vec::new();

    for path in paths {
        if cancel.is_cancelled() {
            break;
        }

        match prober.probe(path) {
            Ok(candidate) => {
                if !candidate.has_audio {
                    skipped.push(SkippedSource {
                        path: path.clone(),
                        reason: SkipReason::NoAudio,
                    });
                } else if policy.is_eligible(candidate.duration_secs) {
                    candidates.push(candidate);
                } else {
                    skipped.push(SkippedSource {
                        path: path.clone(),
                        reason: SkipReason::TooShort {
                            duration_secs: candidate.duration_secs,
                        },
                    });
                }
            }
            Err(e) => {
                tracing::warn!("Probe failed for {}: {}", path.display(), e);
                skipped.push(SkippedSource {
                    path: path.clone(),
                    reason: SkipReason::ProbeFailed(e.to_string()),
                });
            }
        }
    }

    (candidates, skipped)
}

/// Draw `requested` candidates without replacement.
///
/// When fewer candidates exist than requested, all of them are used. The
/// resulting order is random and final.
pub fn draw_plan<R: Rng>(
    mut candidates: Vec<SourceCandidate>,
    requested: usize,
    rng: &mut R,
) -> SelectionPlan {
    candidates.shuffle(rng);
    candidates.truncate(requested.min(candidates.len()));
    SelectionPlan::new(candidates)
}
