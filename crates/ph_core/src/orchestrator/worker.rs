//! Worker thread wrapper around the pipeline.
//!
//! Front-ends call [`spawn_run`] and get back a handle for cancellation
//! plus the event receiver to drive their UI from. The pipeline itself
//! runs on a dedicated named thread.

use std::io;
use std::thread::{self, JoinHandle};

use crate::cancel::CancelHandle;
use crate::config::Settings;
use crate::events::{self, EventReceiver, RunOutcome};

use super::pipeline::Pipeline;
use super::types::RunConfig;

/// Handle to a run executing on a worker thread.
pub struct RunHandle {
    cancel: CancelHandle,
    join: JoinHandle<RunOutcome>,
}

impl RunHandle {
    /// Request cancellation. The run winds down at its next checkpoint and
    /// still emits its terminal event.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A cancel handle that can outlive this handle.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Block until the run finishes and return its outcome.
    pub fn join(self) -> RunOutcome {
        self.join.join().unwrap_or(RunOutcome::Failed {
            message: "run thread panicked".to_string(),
        })
    }

    /// Whether the worker thread has exited.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

/// Start a run on a worker thread with the real ffprobe/ffmpeg backends.
pub fn spawn_run(settings: Settings, config: RunConfig) -> io::Result<(RunHandle, EventReceiver)> {
    let (tx, rx) = events::default_channel();
    let cancel = CancelHandle::new();

    let pipeline = Pipeline::with_defaults(settings, config, tx, cancel.clone());
    let join = thread::Builder::new()
        .name("powerhour-run".to_string())
        .spawn(move || pipeline.run())?;

    Ok((RunHandle { cancel, join }, rx))
}
