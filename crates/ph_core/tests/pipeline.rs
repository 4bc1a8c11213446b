//! End-to-end pipeline tests against fake probe/encode backends.
//!
//! No test here spawns ffmpeg; the fakes record what the pipeline asked
//! for so the tests can assert on ordering, failure scoping, cancellation,
//! and event delivery.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tempfile::{tempdir, TempDir};

use ph_core::cancel::CancelHandle;
use ph_core::config::Settings;
use ph_core::encoder::{EncodeError, EncodeRequest, EncodeResult, EncoderGateway};
use ph_core::events::{self, RunEvent, RunOutcome};
use ph_core::logging::RunLogger;
use ph_core::models::{
    ConcatenationPlan, LoudnessProfile, RunStage, SegmentKind, SegmentWindow, SourceCandidate,
};
use ph_core::orchestrator::{Pipeline, RunConfig};
use ph_core::probe::{MediaProber, ProbeError, ProbeResult};

fn file_name(path: &Path) -> String {
    path.file_name().unwrap().to_string_lossy().to_string()
}

#[derive(Clone, Default)]
struct FakeProber {
    /// file name -> (duration, has_audio)
    durations: Arc<HashMap<String, (f64, bool)>>,
    calls: Arc<AtomicUsize>,
}

impl MediaProber for FakeProber {
    fn probe(&self, path: &Path) -> ProbeResult<SourceCandidate> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.durations.get(&file_name(path)) {
            Some(&(duration_secs, has_audio)) => Ok(SourceCandidate {
                path: path.to_path_buf(),
                duration_secs,
                has_audio,
            }),
            None => Err(ProbeError::MissingDuration(path.to_path_buf())),
        }
    }
}

#[derive(Default)]
struct GatewayState {
    /// Source file names whose encode pass fails.
    fail_encodes: HashSet<String>,
    /// Source file name that triggers cancellation when its encode starts.
    cancel_on_encode: Option<String>,
    cancel_handle: Mutex<Option<CancelHandle>>,
    /// Encoded source file names, in call order.
    encoded: Mutex<Vec<String>>,
    /// Segment kinds of the concat sequence, when concatenation ran.
    concat_kinds: Mutex<Option<Vec<SegmentKind>>>,
}

#[derive(Clone, Default)]
struct FakeGateway(Arc<GatewayState>);

impl EncoderGateway for FakeGateway {
    fn analyze_loudness(
        &self,
        _source: &Path,
        _window: Option<&SegmentWindow>,
        _duration_secs: f64,
        cancel: &CancelHandle,
        _logger: &RunLogger,
        progress: &dyn Fn(u8),
    ) -> EncodeResult<LoudnessProfile> {
        if cancel.is_cancelled() {
            return Err(EncodeError::Cancelled);
        }
        progress(100);
        Ok(LoudnessProfile::default())
    }

    fn encode_segment(
        &self,
        request: &EncodeRequest,
        cancel: &CancelHandle,
        logger: &RunLogger,
        progress: &dyn Fn(u8),
    ) -> EncodeResult<()> {
        let name = file_name(&request.source);

        if self.0.cancel_on_encode.as_deref() == Some(name.as_str()) {
            if let Some(handle) = self.0.cancel_handle.lock().as_ref() {
                handle.cancel();
            }
            return Err(EncodeError::Cancelled);
        }
        if cancel.is_cancelled() {
            return Err(EncodeError::Cancelled);
        }
        if self.0.fail_encodes.contains(&name) {
            logger.output_line("x264 [error]: malformed input packet", true);
            return Err(EncodeError::CommandFailed {
                stage: "encode",
                path: request.source.clone(),
                exit_code: 1,
                diagnostic: "simulated encoder crash".to_string(),
            });
        }

        fs::write(&request.output, b"segment").unwrap();
        self.0.encoded.lock().push(name);
        progress(100);
        Ok(())
    }

    fn concatenate(
        &self,
        plan: &ConcatenationPlan,
        _work_dir: &Path,
        final_output: &Path,
        cancel: &CancelHandle,
        _logger: &RunLogger,
        progress: &dyn Fn(u8),
    ) -> EncodeResult<PathBuf> {
        if cancel.is_cancelled() {
            return Err(EncodeError::Cancelled);
        }
        let kinds: Vec<_> = plan.sequence().iter().map(|s| s.kind).collect();
        *self.0.concat_kinds.lock() = Some(kinds);
        fs::write(final_output, b"final").unwrap();
        progress(100);
        Ok(final_output.to_path_buf())
    }
}

struct TestEnv {
    _dir: TempDir,
    settings: Settings,
    config: RunConfig,
    prober: FakeProber,
}

/// Build a workspace with a sources folder and a common clip.
///
/// `sources` maps file names to (duration, has_audio) as the fake prober
/// will report them; names absent from the map probe as broken.
fn setup(sources: &[(&str, f64, bool)]) -> TestEnv {
    let dir = tempdir().unwrap();
    let source_dir = dir.path().join("sources");
    fs::create_dir(&source_dir).unwrap();

    let mut durations = HashMap::new();
    for (name, duration, has_audio) in sources {
        fs::write(source_dir.join(name), b"video").unwrap();
        durations.insert(name.to_string(), (*duration, *has_audio));
    }

    let common_clip = dir.path().join("common.mp4");
    fs::write(&common_clip, b"video").unwrap();
    durations.insert("common.mp4".to_string(), (30.0, true));

    let mut settings = Settings::default();
    settings.paths.logs_folder = dir.path().join("logs").display().to_string();
    settings.paths.temp_root = dir.path().join("tmp").display().to_string();

    let mut config = RunConfig::from_folder(&source_dir, &common_clip, dir.path().join("final.mp4"));
    config.seed = Some(1234);

    TestEnv {
        _dir: dir,
        settings,
        config,
        prober: FakeProber {
            durations: Arc::new(durations),
            calls: Arc::new(AtomicUsize::new(0)),
        },
    }
}

fn run(env: &TestEnv, gateway: &FakeGateway) -> (RunOutcome, Vec<RunEvent>) {
    // Capacity large enough that no lossy event is dropped while nothing
    // consumes during the synchronous run.
    let (tx, rx) = events::channel(4096);
    let cancel = CancelHandle::new();
    *gateway.0.cancel_handle.lock() = Some(cancel.clone());

    let pipeline = Pipeline::new(
        env.prober.clone(),
        gateway.clone(),
        env.settings.clone(),
        env.config.clone(),
        tx,
        cancel,
    );
    let outcome = pipeline.run();
    (outcome, rx.try_iter().collect())
}

fn finished_count(events: &[RunEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, RunEvent::Finished(_)))
        .count()
}

#[test]
fn run_completes_with_only_eligible_sources() {
    let env = setup(&[
        ("long1.mp4", 90.0, true),
        ("short.mp4", 45.0, true),
        ("long2.mp4", 120.0, true),
    ]);
    let gateway = FakeGateway::default();

    let (outcome, events) = run(&env, &gateway);

    match outcome {
        RunOutcome::Completed {
            output,
            content_count,
            ..
        } => {
            assert_eq!(output, env.config.output_path);
            assert_eq!(content_count, 2);
            assert!(output.exists());
        }
        other => panic!("expected completion, got {other:?}"),
    }

    // Interstitial is encoded first, then the selected clips.
    let encoded = gateway.0.encoded.lock().clone();
    assert_eq!(encoded[0], "common.mp4");
    assert_eq!(encoded.len(), 3);
    assert!(!encoded.contains(&"short.mp4".to_string()));

    let kinds = gateway.0.concat_kinds.lock().clone().unwrap();
    assert_eq!(
        kinds,
        vec![
            SegmentKind::Content,
            SegmentKind::Interstitial,
            SegmentKind::Content,
        ]
    );

    assert_eq!(finished_count(&events), 1);
    let ok_clips = events
        .iter()
        .filter(|e| matches!(e, RunEvent::ClipResult(c) if c.ok))
        .count();
    assert_eq!(ok_clips, 2);
}

#[test]
fn one_failed_clip_does_not_fail_the_run() {
    let env = setup(&[
        ("a.mp4", 100.0, true),
        ("b.mp4", 100.0, true),
        ("c.mp4", 100.0, true),
    ]);
    let gateway = FakeGateway(Arc::new(GatewayState {
        fail_encodes: HashSet::from(["b.mp4".to_string()]),
        ..Default::default()
    }));

    let (outcome, events) = run(&env, &gateway);

    match outcome {
        RunOutcome::Completed { content_count, .. } => assert_eq!(content_count, 2),
        other => panic!("expected completion, got {other:?}"),
    }

    let failures: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            RunEvent::ClipResult(c) if !c.ok => Some(c.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(file_name(&failures[0].source), "b.mp4");
    assert!(failures[0].detail.as_deref().unwrap().contains("encode"));

    // Two content segments still got stitched with the interstitial between.
    let kinds = gateway.0.concat_kinds.lock().clone().unwrap();
    assert_eq!(kinds.len(), 3);
}

#[test]
fn failed_clip_surfaces_encoder_output_in_the_log() {
    let env = setup(&[("a.mp4", 100.0, true), ("b.mp4", 100.0, true)]);
    let gateway = FakeGateway(Arc::new(GatewayState {
        fail_encodes: HashSet::from(["a.mp4".to_string()]),
        ..Default::default()
    }));

    let (outcome, events) = run(&env, &gateway);

    assert!(matches!(outcome, RunOutcome::Completed { .. }));
    // The captured stderr tail reaches the event stream as log lines.
    assert!(events
        .iter()
        .any(|e| matches!(e, RunEvent::Log(line) if line.contains("malformed input packet"))));
}

#[test]
fn cancellation_during_processing_cancels_cleanly() {
    let env = setup(&[
        ("a.mp4", 100.0, true),
        ("b.mp4", 100.0, true),
        ("c.mp4", 100.0, true),
    ]);
    let gateway = FakeGateway(Arc::new(GatewayState {
        cancel_on_encode: Some("b.mp4".to_string()),
        ..Default::default()
    }));

    let (outcome, events) = run(&env, &gateway);

    assert_eq!(outcome, RunOutcome::Cancelled);
    assert_eq!(finished_count(&events), 1);
    assert!(events
        .iter()
        .any(|e| matches!(e, RunEvent::Stage(RunStage::Cancelled))));
    assert!(!events
        .iter()
        .any(|e| matches!(e, RunEvent::Finished(RunOutcome::Completed { .. }))));

    // Concatenation never ran and no final file appeared.
    assert!(gateway.0.concat_kinds.lock().is_none());
    assert!(!env.config.output_path.exists());

    // The working directory and every segment in it are gone.
    let temp_root = PathBuf::from(&env.settings.paths.temp_root);
    assert!(fs::read_dir(&temp_root).unwrap().next().is_none());
}

#[test]
fn empty_source_folder_fails_before_any_probe() {
    let env = setup(&[]);
    let gateway = FakeGateway::default();

    let (outcome, events) = run(&env, &gateway);

    match outcome {
        RunOutcome::Failed { message } => {
            assert!(message.contains("No eligible sources"), "{message}");
        }
        other => panic!("expected failure, got {other:?}"),
    }

    assert_eq!(env.prober.calls.load(Ordering::SeqCst), 0);
    assert!(gateway.0.encoded.lock().is_empty());
    assert_eq!(finished_count(&events), 1);
}

#[test]
fn all_clips_failing_fails_the_run() {
    let env = setup(&[("a.mp4", 100.0, true), ("b.mp4", 100.0, true)]);
    let gateway = FakeGateway(Arc::new(GatewayState {
        fail_encodes: HashSet::from(["a.mp4".to_string(), "b.mp4".to_string()]),
        ..Default::default()
    }));

    let (outcome, events) = run(&env, &gateway);

    match outcome {
        RunOutcome::Failed { message } => {
            assert!(message.contains("failed processing"), "{message}");
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(gateway.0.concat_kinds.lock().is_none());
    assert_eq!(finished_count(&events), 1);

    // No segment files survive the failed run.
    let temp_root = PathBuf::from(&env.settings.paths.temp_root);
    assert!(fs::read_dir(&temp_root).unwrap().next().is_none());
}

#[test]
fn seeded_runs_pick_the_same_clips_in_the_same_order() {
    let names: Vec<String> = (0..10).map(|i| format!("src{i}.mp4")).collect();
    let sources: Vec<(&str, f64, bool)> =
        names.iter().map(|n| (n.as_str(), 150.0, true)).collect();

    let mut env = setup(&sources);
    env.config.clip_count = Some(4);
    env.config.seed = Some(42);

    let gateway_a = FakeGateway::default();
    let (outcome_a, _) = run(&env, &gateway_a);
    let gateway_b = FakeGateway::default();
    let (outcome_b, _) = run(&env, &gateway_b);

    assert!(matches!(outcome_a, RunOutcome::Completed { content_count, .. } if content_count == 4));
    assert!(matches!(outcome_b, RunOutcome::Completed { content_count, .. } if content_count == 4));
    assert_eq!(
        gateway_a.0.encoded.lock().clone(),
        gateway_b.0.encoded.lock().clone()
    );
}

#[test]
fn sources_without_audio_are_skipped() {
    let env = setup(&[("sound.mp4", 100.0, true), ("silent.mp4", 100.0, false)]);
    let gateway = FakeGateway::default();

    let (outcome, _) = run(&env, &gateway);

    match outcome {
        RunOutcome::Completed { content_count, .. } => assert_eq!(content_count, 1),
        other => panic!("expected completion, got {other:?}"),
    }
    assert!(!gateway
        .0
        .encoded
        .lock()
        .contains(&"silent.mp4".to_string()));
}
