//! Run event stream.
//!
//! The pipeline runs on a worker thread and reports back through a bounded
//! channel of [`RunEvent`]s. The producer never blocks on a lagging
//! consumer: on overflow the oldest queued event is evicted to make room.
//! Lossy events (progress, status, log lines) are dropped if eviction does
//! not free a slot; result and terminal events keep evicting until they fit,
//! so they are always delivered. Every run ends with exactly one
//! [`RunEvent::Finished`].

use std::path::PathBuf;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use crate::models::RunStage;

/// Default capacity of the event channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// One message from a running pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    /// The run entered a new stage.
    Stage(RunStage),
    /// Human-readable status line for display.
    Status(String),
    /// A formatted log line, mirroring the run's log file.
    Log(String),
    /// Whole-run progress in percent.
    OverallProgress { percent: u8 },
    /// Progress of the clip currently being processed.
    ClipProgress {
        /// Zero-based position in the selection plan.
        index: usize,
        /// Total clips in the plan.
        total: usize,
        percent: u8,
    },
    /// A clip finished processing, successfully or not.
    ClipResult(ClipOutcome),
    /// The run reached its terminal state. Sent exactly once.
    Finished(RunOutcome),
}

/// Per-clip processing result.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipOutcome {
    /// Zero-based position in the selection plan.
    pub index: usize,
    /// The source file the clip was drawn from.
    pub source: PathBuf,
    pub ok: bool,
    /// Failure detail; `None` on success.
    pub detail: Option<String>,
}

/// Terminal state of a run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed {
        /// Final concatenated video.
        output: PathBuf,
        /// Content segments that made it into the output.
        content_count: usize,
        /// Wall-clock time the run took.
        elapsed: Duration,
    },
    Cancelled,
    Failed {
        message: String,
    },
}

impl RunOutcome {
    /// The stage this outcome corresponds to.
    pub fn stage(&self) -> RunStage {
        match self {
            RunOutcome::Completed { .. } => RunStage::Completed,
            RunOutcome::Cancelled => RunStage::Cancelled,
            RunOutcome::Failed { .. } => RunStage::Failed,
        }
    }
}

/// Receiving half of the run event stream.
pub type EventReceiver = Receiver<RunEvent>;

/// Sending half of the run event stream, with per-event delivery policy.
///
/// Holds its own receiver handle so it can evict the oldest queued event on
/// overflow instead of blocking the worker.
#[derive(Clone)]
pub struct EventSender {
    tx: Sender<RunEvent>,
    rx: Receiver<RunEvent>,
}

impl EventSender {
    /// Emit a lossy event. On overflow the oldest queued event is evicted;
    /// if the queue is still full the new event is dropped.
    pub fn emit(&self, event: RunEvent) {
        match self.tx.try_send(event) {
            Ok(()) | Err(TrySendError::Disconnected(_)) => {}
            Err(TrySendError::Full(event)) => {
                let _ = self.rx.try_recv();
                let _ = self.tx.try_send(event);
            }
        }
    }

    /// Emit an event that must not be dropped. Evicts oldest queued events
    /// until there is room; never blocks on a lagging consumer.
    pub fn emit_reliable(&self, event: RunEvent) {
        let mut event = event;
        loop {
            match self.tx.try_send(event) {
                Ok(()) | Err(TrySendError::Disconnected(_)) => return,
                Err(TrySendError::Full(e)) => {
                    event = e;
                    let _ = self.rx.try_recv();
                }
            }
        }
    }

    pub fn stage(&self, stage: RunStage) {
        self.emit(RunEvent::Stage(stage));
        self.status(stage.label());
    }

    pub fn status(&self, message: impl Into<String>) {
        self.emit(RunEvent::Status(message.into()));
    }

    pub fn log(&self, line: impl Into<String>) {
        self.emit(RunEvent::Log(line.into()));
    }

    pub fn overall_progress(&self, percent: u8) {
        self.emit(RunEvent::OverallProgress {
            percent: percent.min(100),
        });
    }

    pub fn clip_progress(&self, index: usize, total: usize, percent: u8) {
        self.emit(RunEvent::ClipProgress {
            index,
            total,
            percent: percent.min(100),
        });
    }

    pub fn clip_result(&self, outcome: ClipOutcome) {
        self.emit_reliable(RunEvent::ClipResult(outcome));
    }

    /// Send the terminal event. Callers must invoke this exactly once.
    pub fn finished(&self, outcome: RunOutcome) {
        self.emit_reliable(RunEvent::Finished(outcome));
    }
}

/// Create a bounded event channel.
pub fn channel(capacity: usize) -> (EventSender, EventReceiver) {
    let (tx, rx) = bounded(capacity);
    let sender = EventSender {
        tx,
        rx: rx.clone(),
    };
    (sender, rx)
}

/// Create a bounded event channel with the default capacity.
pub fn default_channel() -> (EventSender, EventReceiver) {
    channel(DEFAULT_CHANNEL_CAPACITY)
}
