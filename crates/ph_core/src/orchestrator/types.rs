//! Run configuration and report types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::models::FadeSpec;

use super::errors::{PipelineError, PipelineResult};

/// Where the run's source videos come from.
///
/// A folder is scanned non-recursively; a file list is taken as-is (the
/// shape a playlist-download collaborator hands over).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceSet {
    Folder(PathBuf),
    Files(Vec<PathBuf>),
}

impl SourceSet {
    /// Short description for error messages.
    pub fn describe(&self) -> String {
        match self {
            SourceSet::Folder(dir) => format!("folder {}", dir.display()),
            SourceSet::Files(files) => format!("list of {} files", files.len()),
        }
    }
}

/// Everything one run needs beyond the persisted settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Source videos to draw from.
    pub source: SourceSet,

    /// The clip inserted between every pair of content segments.
    pub common_clip: PathBuf,

    /// Where the final video is written.
    pub output_path: PathBuf,

    /// Override for the configured clip count.
    #[serde(default)]
    pub clip_count: Option<usize>,

    /// Fade in/out duration at segment boundaries, seconds.
    #[serde(default)]
    pub fade: FadeSpec,

    /// Seed for the selection RNG; `None` draws from entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl RunConfig {
    pub fn from_folder(
        source_dir: impl Into<PathBuf>,
        common_clip: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self::new(SourceSet::Folder(source_dir.into()), common_clip, output_path)
    }

    pub fn from_files(
        files: Vec<PathBuf>,
        common_clip: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self::new(SourceSet::Files(files), common_clip, output_path)
    }

    pub fn new(
        source: SourceSet,
        common_clip: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source,
            common_clip: common_clip.into(),
            output_path: output_path.into(),
            clip_count: None,
            fade: FadeSpec::default(),
            seed: None,
        }
    }

    /// Filesystem-level validation. Runs before any subprocess is spawned.
    pub fn validate(&self) -> PipelineResult<()> {
        if let SourceSet::Folder(dir) = &self.source {
            if !dir.is_dir() {
                return Err(PipelineError::validation_failed(format!(
                    "source folder does not exist: {}",
                    dir.display()
                )));
            }
        }
        if !self.common_clip.is_file() {
            return Err(PipelineError::common_clip(
                &self.common_clip,
                "file does not exist",
            ));
        }
        if !self.fade.is_valid() {
            return Err(PipelineError::validation_failed(format!(
                "fade duration {}s is outside 0-{}s",
                self.fade.duration_secs,
                FadeSpec::MAX_SECS
            )));
        }
        if let Some(0) = self.clip_count {
            return Err(PipelineError::validation_failed(
                "clip count override must be at least 1",
            ));
        }
        Ok(())
    }
}

/// What a completed run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Final concatenated video.
    pub output: PathBuf,
    /// Content segments in the output.
    pub content_count: usize,
    /// Clips that were selected but failed processing.
    pub failed_count: usize,
    /// The run's log file, when one was created.
    pub log_path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn validate_rejects_missing_paths() {
        let dir = tempdir().unwrap();
        let clip = dir.path().join("common.mp4");
        File::create(&clip).unwrap();

        let config =
            RunConfig::from_folder(dir.path().join("nope"), &clip, dir.path().join("out.mp4"));
        assert!(matches!(
            config.validate(),
            Err(PipelineError::ValidationFailed(_))
        ));

        let config = RunConfig::from_folder(dir.path(), dir.path().join("missing.mp4"), "out.mp4");
        assert!(matches!(
            config.validate(),
            Err(PipelineError::CommonClipUnusable { .. })
        ));
    }

    #[test]
    fn file_list_sources_need_no_folder() {
        let dir = tempdir().unwrap();
        let clip = dir.path().join("common.mp4");
        File::create(&clip).unwrap();

        let config = RunConfig::from_files(
            vec![dir.path().join("a.mp4")],
            &clip,
            dir.path().join("out.mp4"),
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_fade_and_zero_count() {
        let dir = tempdir().unwrap();
        let clip = dir.path().join("common.mp4");
        File::create(&clip).unwrap();

        let mut config = RunConfig::from_folder(dir.path(), &clip, dir.path().join("out.mp4"));
        config.fade = FadeSpec::new(11.0);
        assert!(config.validate().is_err());

        config.fade = FadeSpec::default();
        config.clip_count = Some(0);
        assert!(config.validate().is_err());

        config.clip_count = Some(5);
        assert!(config.validate().is_ok());
    }
}
