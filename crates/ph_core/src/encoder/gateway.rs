//! Encoder gateway: the trait boundary in front of ffmpeg.
//!
//! The orchestrator drives the run entirely through [`EncoderGateway`], so
//! tests can swap in a fake that never spawns a process. The real
//! [`FfmpegGateway`] implements the three operations as ffmpeg invocations:
//! loudness analysis, two-pass normalize + encode, and stream-copy
//! concatenation.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

use crate::cancel::CancelHandle;
use crate::logging::RunLogger;
use crate::models::{
    ConcatenationPlan, FadeSpec, LoudnessProfile, LoudnessTarget, SegmentWindow, TargetSpec,
};

use super::command::{scale_pad_filter, FfmpegCommand};
use super::loudness::{analysis_filter, normalize_filter, parse_loudnorm_output};
use super::runner::{run_ffmpeg, RunOutput};

/// Stderr lines retained for diagnostics. Large enough to include the
/// loudnorm JSON block printed at the end of the analysis pass.
const STDERR_TAIL_LINES: usize = 120;

/// Errors from encoder operations.
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{stage} failed for {path} (exit code {exit_code}):\n{diagnostic}")]
    CommandFailed {
        stage: &'static str,
        path: PathBuf,
        exit_code: i32,
        diagnostic: String,
    },

    #[error("Could not parse loudness analysis for {0}")]
    LoudnessParse(PathBuf),

    #[error("Run was cancelled")]
    Cancelled,

    #[error("ffmpeg not available: {0}")]
    ToolMissing(String),
}

/// Result type for encoder operations.
pub type EncodeResult<T> = Result<T, EncodeError>;

/// One segment encode: trim, normalize, scale, fade, re-encode.
#[derive(Debug, Clone)]
pub struct EncodeRequest {
    pub source: PathBuf,
    /// Extraction window; `None` encodes the whole source (interstitial).
    pub window: Option<SegmentWindow>,
    /// Duration of the encoded piece, for fades and progress scaling.
    pub duration_secs: f64,
    /// Measured loudness from the analysis pass.
    pub profile: LoudnessProfile,
    pub output: PathBuf,
}

/// Abstraction over the media encoder.
pub trait EncoderGateway: Send + Sync {
    /// Verify the encoder is runnable. Called once per run, before any
    /// source is touched.
    fn preflight(&self) -> EncodeResult<()> {
        Ok(())
    }

    /// First loudnorm pass: measure the loudness of a (windowed) source.
    ///
    /// Captured encoder output lines go into `logger`'s tail buffer for
    /// error diagnosis.
    fn analyze_loudness(
        &self,
        source: &Path,
        window: Option<&SegmentWindow>,
        duration_secs: f64,
        cancel: &CancelHandle,
        logger: &RunLogger,
        progress: &dyn Fn(u8),
    ) -> EncodeResult<LoudnessProfile>;

    /// Second pass: normalize and re-encode one segment to the target spec.
    fn encode_segment(
        &self,
        request: &EncodeRequest,
        cancel: &CancelHandle,
        logger: &RunLogger,
        progress: &dyn Fn(u8),
    ) -> EncodeResult<()>;

    /// Stream-copy all segments into the final output.
    ///
    /// Writes into a staging file inside `work_dir` first and moves it to
    /// `final_output` only on success, so a failed or cancelled run never
    /// leaves a partial final file behind.
    fn concatenate(
        &self,
        plan: &ConcatenationPlan,
        work_dir: &Path,
        final_output: &Path,
        cancel: &CancelHandle,
        logger: &RunLogger,
        progress: &dyn Fn(u8),
    ) -> EncodeResult<PathBuf>;
}

/// The real gateway, shelling out to ffmpeg.
#[derive(Debug, Clone)]
pub struct FfmpegGateway {
    target: TargetSpec,
    loudness: LoudnessTarget,
    fade: FadeSpec,
}

impl FfmpegGateway {
    pub fn new(target: TargetSpec, loudness: LoudnessTarget, fade: FadeSpec) -> Self {
        Self {
            target,
            loudness,
            fade,
        }
    }

    /// Video filter chain for one segment: letterbox scaling plus fades.
    fn video_filter(&self, duration_secs: f64) -> String {
        let mut filter = scale_pad_filter(&self.target);
        if !self.fade.is_disabled() {
            let d = self.fade.duration_secs;
            let out_start = (duration_secs - d).max(0.0);
            filter.push_str(&format!(",fade=t=in:st=0:d={d}"));
            filter.push_str(&format!(",fade=t=out:st={out_start:.3}:d={d}"));
        }
        filter
    }

    /// Run one invocation, logging the command and routing its stderr into
    /// the run logger's tail buffer.
    fn run_logged(
        &self,
        command: FfmpegCommand,
        total_secs: f64,
        cancel: &CancelHandle,
        logger: &RunLogger,
        progress: &dyn Fn(u8),
    ) -> EncodeResult<RunOutput> {
        logger.command(&command.display());
        // The tail must belong to this invocation only.
        logger.clear_tail();

        let output = run_ffmpeg(command, total_secs, cancel, progress, STDERR_TAIL_LINES)?;
        for line in &output.stderr_tail {
            logger.output_line(line, true);
        }

        if output.cancelled {
            return Err(EncodeError::Cancelled);
        }
        Ok(output)
    }
}

impl EncoderGateway for FfmpegGateway {
    fn preflight(&self) -> EncodeResult<()> {
        let output = Command::new("ffmpeg")
            .arg("-version")
            .output()
            .map_err(|e| EncodeError::ToolMissing(e.to_string()))?;
        if !output.status.success() {
            return Err(EncodeError::ToolMissing(
                "ffmpeg -version reported failure".to_string(),
            ));
        }
        Ok(())
    }

    fn analyze_loudness(
        &self,
        source: &Path,
        window: Option<&SegmentWindow>,
        duration_secs: f64,
        cancel: &CancelHandle,
        logger: &RunLogger,
        progress: &dyn Fn(u8),
    ) -> EncodeResult<LoudnessProfile> {
        let mut cmd = FfmpegCommand::new();
        if let Some(w) = window {
            cmd = cmd.seek(w.start_secs);
        }
        cmd = cmd.input(source);
        if let Some(w) = window {
            cmd = cmd.duration(w.duration_secs);
        }
        let cmd = cmd
            .no_video()
            .audio_filter(&analysis_filter(&self.loudness))
            .report_progress()
            .null_output();

        let output = self.run_logged(cmd, duration_secs, cancel, logger, progress)?;

        if !output.success {
            return Err(EncodeError::CommandFailed {
                stage: "loudness analysis",
                path: source.to_path_buf(),
                exit_code: output.exit_code,
                diagnostic: output.diagnostic(),
            });
        }

        parse_loudnorm_output(&output.diagnostic())
            .ok_or_else(|| EncodeError::LoudnessParse(source.to_path_buf()))
    }

    fn encode_segment(
        &self,
        request: &EncodeRequest,
        cancel: &CancelHandle,
        logger: &RunLogger,
        progress: &dyn Fn(u8),
    ) -> EncodeResult<()> {
        let mut cmd = FfmpegCommand::new();
        if let Some(w) = &request.window {
            cmd = cmd.seek(w.start_secs);
        }
        cmd = cmd.input(&request.source);
        if let Some(w) = &request.window {
            cmd = cmd.duration(w.duration_secs);
        }
        let cmd = cmd
            .video_filter(&self.video_filter(request.duration_secs))
            .audio_filter(&normalize_filter(&self.loudness, &request.profile))
            .apply_target(&self.target)
            .report_progress()
            .output(&request.output);

        let output = self.run_logged(cmd, request.duration_secs, cancel, logger, progress)?;

        if !output.success {
            return Err(EncodeError::CommandFailed {
                stage: "encode",
                path: request.source.to_path_buf(),
                exit_code: output.exit_code,
                diagnostic: output.diagnostic(),
            });
        }
        Ok(())
    }

    fn concatenate(
        &self,
        plan: &ConcatenationPlan,
        work_dir: &Path,
        final_output: &Path,
        cancel: &CancelHandle,
        logger: &RunLogger,
        progress: &dyn Fn(u8),
    ) -> EncodeResult<PathBuf> {
        let list_path = write_concat_list(plan, work_dir)?;
        let staging = work_dir.join("final_staging.mp4");

        let cmd = FfmpegCommand::new()
            .concat_input(&list_path)
            .stream_copy()
            .report_progress()
            .output(&staging);

        let total_secs = plan.total_duration_secs();
        let output = self.run_logged(cmd, total_secs, cancel, logger, progress)?;

        if !output.success {
            return Err(EncodeError::CommandFailed {
                stage: "concatenation",
                path: staging.clone(),
                exit_code: output.exit_code,
                diagnostic: output.diagnostic(),
            });
        }

        persist_output(&staging, final_output)?;
        Ok(final_output.to_path_buf())
    }
}

/// Write the concat-demuxer list file for a plan.
fn write_concat_list(plan: &ConcatenationPlan, work_dir: &Path) -> std::io::Result<PathBuf> {
    let list_path = work_dir.join("concat_list.txt");
    let mut file = fs::File::create(&list_path)?;
    for path in plan.paths() {
        // Single quotes inside a quoted concat entry close, escape, reopen.
        let escaped = path.to_string_lossy().replace('\'', "'\\''");
        writeln!(file, "file '{}'", escaped)?;
    }
    file.sync_all()?;
    Ok(list_path)
}

/// Move the staged result into place.
///
/// Rename is atomic on the same filesystem; across filesystems it fails
/// with EXDEV, so fall back to copy + remove.
fn persist_output(staging: &Path, final_output: &Path) -> std::io::Result<()> {
    if let Some(parent) = final_output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    match fs::rename(staging, final_output) {
        Ok(()) => Ok(()),
        Err(_) => {
            fs::copy(staging, final_output)?;
            fs::remove_file(staging)?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EncodedSegment;
    use tempfile::tempdir;

    #[test]
    fn concat_list_is_in_playback_order() {
        let dir = tempdir().unwrap();
        let mut plan = ConcatenationPlan::new(EncodedSegment::interstitial("/tmp/x.mp4", 5.0));
        plan.push_content(EncodedSegment::content("/tmp/c0.mp4", 60.0));
        plan.push_content(EncodedSegment::content("/tmp/c1.mp4", 60.0));

        let list = write_concat_list(&plan, dir.path()).unwrap();
        let content = fs::read_to_string(list).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(
            lines,
            vec![
                "file '/tmp/c0.mp4'",
                "file '/tmp/x.mp4'",
                "file '/tmp/c1.mp4'",
            ]
        );
    }

    #[test]
    fn concat_list_escapes_quotes() {
        let dir = tempdir().unwrap();
        let mut plan = ConcatenationPlan::new(EncodedSegment::interstitial("/tmp/x.mp4", 5.0));
        plan.push_content(EncodedSegment::content("/tmp/it's here.mp4", 60.0));

        let list = write_concat_list(&plan, dir.path()).unwrap();
        let content = fs::read_to_string(list).unwrap();
        assert!(content.contains(r"file '/tmp/it'\''s here.mp4'"));
    }

    #[test]
    fn persist_moves_staging_into_place() {
        let dir = tempdir().unwrap();
        let staging = dir.path().join("staging.mp4");
        let final_output = dir.path().join("out").join("final.mp4");
        fs::write(&staging, b"payload").unwrap();

        persist_output(&staging, &final_output).unwrap();

        assert!(!staging.exists());
        assert_eq!(fs::read(&final_output).unwrap(), b"payload");
    }

    #[test]
    fn fade_filter_is_skipped_when_disabled() {
        let gateway = FfmpegGateway::new(
            TargetSpec::default(),
            LoudnessTarget::default(),
            FadeSpec::new(0.0),
        );
        let filter = gateway.video_filter(60.0);
        assert!(!filter.contains("fade"));

        let fading = FfmpegGateway::new(
            TargetSpec::default(),
            LoudnessTarget::default(),
            FadeSpec::new(3.0),
        );
        let filter = fading.video_filter(60.0);
        assert!(filter.contains("fade=t=in:st=0:d=3"));
        assert!(filter.contains("fade=t=out:st=57.000:d=3"));
    }
}
