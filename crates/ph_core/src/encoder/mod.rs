//! Media encoding: ffmpeg command construction, loudness normalization,
//! progress parsing, and subprocess execution.
//!
//! The orchestrator talks to this module only through [`EncoderGateway`].

mod command;
mod gateway;
mod loudness;
mod progress;
mod runner;

pub use command::{scale_pad_filter, FfmpegCommand};
pub use gateway::{EncodeError, EncodeRequest, EncodeResult, EncoderGateway, FfmpegGateway};
pub use loudness::{analysis_filter, normalize_filter, parse_loudnorm_output};
pub use progress::ProgressParser;
pub use runner::{run_ffmpeg, RunOutput};
