//! The run pipeline: probe, select, process, concatenate.
//!
//! A [`Pipeline`] owns one run from validation to the terminal event. The
//! stages run sequentially on the calling thread (usually a worker thread,
//! see [`super::worker`]); cancellation is checked between stages, between
//! clips, and inside every encoder invocation.
//!
//! Failure scoping: anything that goes wrong while processing one selected
//! clip is a per-clip failure - the clip is dropped, a `ClipResult` event is
//! emitted, and the run continues. Everything else (bad inputs, missing
//! tools, unusable common clip, failed concatenation) fails the whole run.

use std::path::Path;
use std::time::Instant;

use chrono::Local;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::cancel::CancelHandle;
use crate::config::Settings;
use crate::encoder::{EncodeError, EncodeRequest, EncoderGateway, FfmpegGateway};
use crate::events::{ClipOutcome, EventSender, RunOutcome};
use crate::logging::{LogConfig, RunLogger, RunLoggerBuilder};
use crate::models::{
    ConcatenationPlan, DurationPolicy, EncodedSegment, RunStage, SourceCandidate,
};
use crate::probe::{FfprobeProber, MediaProber};
use crate::selection::{self, plan_window, SkipReason};

use super::errors::{PipelineError, PipelineResult};
use super::types::{RunConfig, RunReport, SourceSet};

/// One clip's processing failure, scoped to that clip.
struct ClipFailure {
    cancelled: bool,
    detail: String,
}

impl From<EncodeError> for ClipFailure {
    fn from(e: EncodeError) -> Self {
        Self {
            cancelled: matches!(e, EncodeError::Cancelled),
            detail: e.to_string(),
        }
    }
}

/// Orchestrates a single run.
pub struct Pipeline<P: MediaProber, G: EncoderGateway> {
    prober: P,
    gateway: G,
    settings: Settings,
    config: RunConfig,
    events: EventSender,
    cancel: CancelHandle,
}

impl Pipeline<FfprobeProber, FfmpegGateway> {
    /// Pipeline backed by the real ffprobe/ffmpeg tools.
    pub fn with_defaults(
        settings: Settings,
        config: RunConfig,
        events: EventSender,
        cancel: CancelHandle,
    ) -> Self {
        let gateway = FfmpegGateway::new(
            settings.encoding.target_spec(),
            settings.encoding.loudness_target(),
            config.fade,
        );
        Self::new(FfprobeProber::new(), gateway, settings, config, events, cancel)
    }
}

impl<P: MediaProber, G: EncoderGateway> Pipeline<P, G> {
    pub fn new(
        prober: P,
        gateway: G,
        settings: Settings,
        config: RunConfig,
        events: EventSender,
        cancel: CancelHandle,
    ) -> Self {
        Self {
            prober,
            gateway,
            settings,
            config,
            events,
            cancel,
        }
    }

    /// Run to completion, emitting exactly one terminal event.
    pub fn run(self) -> RunOutcome {
        let started = Instant::now();
        let outcome = match self.execute() {
            Ok(report) => RunOutcome::Completed {
                output: report.output,
                content_count: report.content_count,
                elapsed: started.elapsed(),
            },
            Err(PipelineError::Cancelled) => RunOutcome::Cancelled,
            Err(e) => {
                tracing::error!("Run failed: {}", e);
                RunOutcome::Failed {
                    message: e.to_string(),
                }
            }
        };

        self.events.stage(outcome.stage());
        self.events.finished(outcome.clone());
        outcome
    }

    fn execute(&self) -> PipelineResult<RunReport> {
        self.config.validate()?;

        let logger = self.open_logger()?;
        logger.info(&format!(
            "Sources: {} | Common clip: {} | Output: {}",
            self.config.source.describe(),
            self.config.common_clip.display(),
            self.config.output_path.display()
        ));

        // --- Probing ---------------------------------------------------
        self.events.stage(RunStage::Probing);
        logger.phase("Probing sources");

        let mut files = match &self.config.source {
            SourceSet::Folder(dir) => selection::enumerate_sources(dir)
                .map_err(|e| PipelineError::setup_failed("listing source folder", e))?,
            SourceSet::Files(files) => files.clone(),
        };
        files.retain(|p| p != &self.config.common_clip && p != &self.config.output_path);

        // Empty input fails before any tool is spawned.
        if files.is_empty() {
            return Err(PipelineError::NoEligibleSources(
                self.config.source.describe(),
            ));
        }

        self.prober.preflight()?;
        self.gateway.preflight().map_err(tool_error)?;

        let common = self
            .prober
            .probe(&self.config.common_clip)
            .map_err(|e| PipelineError::common_clip(&self.config.common_clip, e.to_string()))?;
        if !common.has_audio {
            return Err(PipelineError::common_clip(
                &self.config.common_clip,
                "no audio stream",
            ));
        }

        let policy = self.settings.selection.policy();
        let (candidates, skipped) =
            selection::probe_candidates(&files, &policy, &self.prober, &self.cancel);
        self.checkpoint()?;

        for skip in &skipped {
            let reason = match &skip.reason {
                SkipReason::ProbeFailed(e) => format!("probe failed: {e}"),
                SkipReason::TooShort { duration_secs } => format!(
                    "{duration_secs:.1}s is below the {:.1}s floor",
                    policy.min_duration_secs()
                ),
                SkipReason::NoAudio => "no audio stream".to_string(),
            };
            logger.warn(&format!("Skipping {}: {}", skip.path.display(), reason));
        }
        logger.info(&format!(
            "{} eligible of {} files",
            candidates.len(),
            files.len()
        ));

        if candidates.is_empty() {
            return Err(PipelineError::NoEligibleSources(
                self.config.source.describe(),
            ));
        }

        // --- Selecting -------------------------------------------------
        self.events.stage(RunStage::Selecting);
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let requested = self
            .config
            .clip_count
            .unwrap_or(self.settings.selection.clip_count);
        let plan = selection::draw_plan(candidates, requested, &mut rng);
        if plan.len() < requested {
            logger.warn(&format!(
                "Only {} eligible sources for the requested {}",
                plan.len(),
                requested
            ));
        }
        logger.info(&format!("Selected {} clips", plan.len()));

        // --- Workspace ---------------------------------------------------
        std::fs::create_dir_all(&self.settings.paths.temp_root)
            .map_err(|e| PipelineError::setup_failed("creating temp root", e))?;
        // Dropped on every exit path, removing all intermediates.
        let work = tempfile::Builder::new()
            .prefix("powerhour_")
            .tempdir_in(&self.settings.paths.temp_root)
            .map_err(|e| PipelineError::setup_failed("creating working directory", e))?;

        // --- Processing --------------------------------------------------
        self.events.stage(RunStage::Processing);

        logger.phase("Common clip");
        let interstitial = match self.encode_common_clip(&common, work.path(), &logger) {
            Ok(segment) => segment,
            Err(failure) if failure.cancelled => return Err(PipelineError::Cancelled),
            Err(failure) => {
                logger.show_tail("encoder output");
                return Err(PipelineError::common_clip(
                    &self.config.common_clip,
                    failure.detail,
                ));
            }
        };
        let mut concat_plan = ConcatenationPlan::new(interstitial);

        let total = plan.len();
        let mut failed_count = 0usize;

        for (index, candidate) in plan.iter().enumerate() {
            self.checkpoint()?;

            let name = candidate
                .path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| candidate.path.display().to_string());
            logger.phase(&format!("Clip {}/{}: {}", index + 1, total, name));
            self.events
                .status(format!("Processing {} ({}/{})", name, index + 1, total));
            logger.reset_progress();

            match self.process_clip(index, total, candidate, &policy, work.path(), &mut rng, &logger)
            {
                Ok(segment) => {
                    concat_plan.push_content(segment);
                    logger.success(&format!("Clip {}/{} done", index + 1, total));
                    self.events.clip_result(ClipOutcome {
                        index,
                        source: candidate.path.clone(),
                        ok: true,
                        detail: None,
                    });
                }
                Err(failure) if failure.cancelled => return Err(PipelineError::Cancelled),
                Err(failure) => {
                    failed_count += 1;
                    logger.error(&format!("Clip {}/{} failed: {}", index + 1, total, failure.detail));
                    logger.show_tail("encoder output");
                    self.events.clip_result(ClipOutcome {
                        index,
                        source: candidate.path.clone(),
                        ok: false,
                        detail: Some(failure.detail),
                    });
                }
            }
        }

        if concat_plan.is_empty() {
            return Err(PipelineError::AllClipsFailed { attempted: total });
        }

        // --- Concatenating -----------------------------------------------
        self.checkpoint()?;
        self.events.stage(RunStage::Concatenating);
        logger.phase("Concatenation");
        logger.reset_progress();

        let output = self
            .gateway
            .concatenate(
                &concat_plan,
                work.path(),
                &self.config.output_path,
                &self.cancel,
                &logger,
                &|p| {
                    self.events.overall_progress(p);
                },
            )
            .map_err(|e| match e {
                EncodeError::Cancelled => PipelineError::Cancelled,
                other => {
                    logger.show_tail("encoder output");
                    PipelineError::ConcatFailed(other)
                }
            })?;

        self.events.overall_progress(100);
        logger.success(&format!(
            "Wrote {} ({} clips, {} failed)",
            output.display(),
            concat_plan.content_count(),
            failed_count
        ));

        Ok(RunReport {
            output,
            content_count: concat_plan.content_count(),
            failed_count,
            log_path: Some(logger.log_path().to_path_buf()),
        })
    }

    /// Analyze and encode the interstitial. Its failure is fatal: without it
    /// the output would silently lose the defining structure of the video.
    fn encode_common_clip(
        &self,
        common: &SourceCandidate,
        work_dir: &Path,
        logger: &RunLogger,
    ) -> Result<EncodedSegment, ClipFailure> {
        let profile = self.gateway.analyze_loudness(
            &common.path,
            None,
            common.duration_secs,
            &self.cancel,
            logger,
            &|p| {
                logger.progress((p / 2) as u32);
            },
        )?;

        let output = work_dir.join("interstitial.mp4");
        let request = EncodeRequest {
            source: common.path.clone(),
            window: None,
            duration_secs: common.duration_secs,
            profile,
            output: output.clone(),
        };
        self.gateway
            .encode_segment(&request, &self.cancel, logger, &|p| {
                logger.progress((50 + p / 2) as u32);
            })?;

        Ok(EncodedSegment::interstitial(output, common.duration_secs))
    }

    /// Process one selected clip: window, analyze, normalize + encode.
    #[allow(clippy::too_many_arguments)]
    fn process_clip<R: Rng>(
        &self,
        index: usize,
        total: usize,
        candidate: &SourceCandidate,
        policy: &DurationPolicy,
        work_dir: &Path,
        rng: &mut R,
        logger: &RunLogger,
    ) -> Result<EncodedSegment, ClipFailure> {
        let window = plan_window(candidate.duration_secs, policy, rng).map_err(|e| ClipFailure {
            cancelled: false,
            detail: e.to_string(),
        })?;
        logger.info(&format!(
            "Window {:.1}s - {:.1}s of {:.1}s",
            window.start_secs,
            window.end_secs(),
            candidate.duration_secs
        ));

        // Pass one fills 0-50%, pass two the rest.
        let profile = self.gateway.analyze_loudness(
            &candidate.path,
            Some(&window),
            window.duration_secs,
            &self.cancel,
            logger,
            &|p| self.report_clip(index, total, p / 2, logger),
        )?;

        let output = work_dir.join(format!("clip_{:03}.mp4", index));
        let request = EncodeRequest {
            source: candidate.path.clone(),
            window: Some(window),
            duration_secs: window.duration_secs,
            profile,
            output: output.clone(),
        };
        self.gateway
            .encode_segment(&request, &self.cancel, logger, &|p| {
                self.report_clip(index, total, 50 + p / 2, logger)
            })?;

        Ok(EncodedSegment::content(output, window.duration_secs))
    }

    /// Fan one clip-local percentage out to the log, the clip progress
    /// event, and the whole-run progress event.
    fn report_clip(&self, index: usize, total: usize, percent: u8, logger: &RunLogger) {
        logger.progress(percent as u32);
        self.events.clip_progress(index, total, percent);
        if total > 0 {
            let overall = (index * 100 + percent as usize) / total;
            self.events.overall_progress(overall as u8);
        }
    }

    fn open_logger(&self) -> PipelineResult<RunLogger> {
        let run_name = format!("powerhour_{}", Local::now().format("%Y%m%d_%H%M%S"));
        let events = self.events.clone();
        RunLoggerBuilder::new(run_name, &self.settings.paths.logs_folder)
            .config(LogConfig::from_settings(&self.settings.logging))
            .sink(Box::new(move |line| events.log(line)))
            .build()
            .map_err(|e| PipelineError::setup_failed("creating run log", e))
    }

    fn checkpoint(&self) -> PipelineResult<()> {
        if self.cancel.is_cancelled() {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    }
}

fn tool_error(e: EncodeError) -> PipelineError {
    match e {
        EncodeError::ToolMissing(m) => PipelineError::ToolMissing(m),
        other => PipelineError::ValidationFailed(other.to_string()),
    }
}
