//! Cooperative cancellation flag shared between a run and its owner.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Handle for cancelling a running pipeline.
///
/// The flag is observed by the worker at well-defined checkpoints: before
/// each per-clip iteration, before concatenation, and inside the encoder's
/// progress loop (which kills the in-flight subprocess). Cloning the handle
/// shares the same flag.
#[derive(Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Create a fresh, un-cancelled handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. The run will stop at the next checkpoint.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
