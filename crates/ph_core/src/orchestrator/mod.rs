//! Run orchestration.
//!
//! [`Pipeline`] drives a run through its stages; [`spawn_run`] wraps it in
//! a worker thread for front-ends. Errors that end the whole run live in
//! [`errors`]; per-clip failures surface only as `ClipResult` events.

mod errors;
mod pipeline;
mod types;
mod worker;

pub use errors::{PipelineError, PipelineResult};
pub use pipeline::Pipeline;
pub use types::{RunConfig, RunReport, SourceSet};
pub use worker::{spawn_run, RunHandle};
