//! Error types for the orchestrator pipeline.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::encoder::EncodeError;
use crate::probe::ProbeError;

/// Top-level pipeline error.
///
/// A `PipelineError` ends the whole run; per-clip failures are handled
/// inside the processing loop and never surface here.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Input validation failed before the pipeline started.
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// A required external tool is missing or unrunnable.
    #[error("Required tool unavailable: {0}")]
    ToolMissing(String),

    /// The source set yielded no usable candidates.
    #[error("No eligible sources in {0}")]
    NoEligibleSources(String),

    /// The common clip could not be probed or processed.
    #[error("Common clip unusable ({path}): {message}")]
    CommonClipUnusable { path: PathBuf, message: String },

    /// Every selected clip failed processing.
    #[error("All {attempted} selected clips failed processing")]
    AllClipsFailed { attempted: usize },

    /// The final concatenation failed.
    #[error("Concatenation failed: {0}")]
    ConcatFailed(#[source] EncodeError),

    /// Run setup failed (directories, log file).
    #[error("Setup failed: {message}")]
    SetupFailed {
        message: String,
        #[source]
        source: io::Error,
    },

    /// The run was cancelled.
    #[error("Run was cancelled")]
    Cancelled,
}

impl PipelineError {
    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::ValidationFailed(message.into())
    }

    pub fn common_clip(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::CommonClipUnusable {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn setup_failed(message: impl Into<String>, source: io::Error) -> Self {
        Self::SetupFailed {
            message: message.into(),
            source,
        }
    }

    /// Whether this error is the cancellation path rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineError::Cancelled)
    }
}

impl From<ProbeError> for PipelineError {
    fn from(e: ProbeError) -> Self {
        match e {
            ProbeError::ToolMissing(m) => PipelineError::ToolMissing(m),
            other => PipelineError::ValidationFailed(other.to_string()),
        }
    }
}

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_display_context() {
        let err = PipelineError::common_clip("/media/clip.mp4", "no audio stream");
        let msg = err.to_string();
        assert!(msg.contains("/media/clip.mp4"));
        assert!(msg.contains("no audio stream"));

        let err = PipelineError::AllClipsFailed { attempted: 7 };
        assert!(err.to_string().contains('7'));
    }

    #[test]
    fn cancelled_is_not_a_failure() {
        assert!(PipelineError::Cancelled.is_cancelled());
        assert!(!PipelineError::validation_failed("x").is_cancelled());
    }
}
