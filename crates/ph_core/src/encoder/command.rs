//! ffmpeg argument builder.
//!
//! Builds the argv for the three ffmpeg invocations the pipeline makes:
//! loudness analysis, segment encode, and stream-copy concatenation.
//! Arguments are kept as `OsString` so paths never pass through lossy
//! string conversion.

use std::ffi::OsString;
use std::path::Path;

use crate::models::TargetSpec;

/// Fluent builder for an ffmpeg argument vector.
#[derive(Debug, Clone, Default)]
pub struct FfmpegCommand {
    args: Vec<OsString>,
}

impl FfmpegCommand {
    /// Start a new command with the common flags every invocation uses.
    pub fn new() -> Self {
        let mut cmd = Self { args: Vec::new() };
        cmd.push("-hide_banner");
        cmd.push("-nostdin");
        cmd.push("-y");
        cmd
    }

    fn push(&mut self, arg: impl Into<OsString>) -> &mut Self {
        self.args.push(arg.into());
        self
    }

    /// Input seek, placed before `-i` for fast seeking.
    pub fn seek(mut self, start_secs: f64) -> Self {
        self.push("-ss");
        self.push(format!("{:.3}", start_secs));
        self
    }

    /// Add an input file.
    pub fn input(mut self, path: &Path) -> Self {
        self.push("-i");
        self.push(path);
        self
    }

    /// Add a concat-demuxer input reading the given list file.
    pub fn concat_input(mut self, list_path: &Path) -> Self {
        self.push("-f");
        self.push("concat");
        self.push("-safe");
        self.push("0");
        self.push("-i");
        self.push(list_path);
        self
    }

    /// Limit output duration. Placed after the input, so it bounds the
    /// encoded length rather than the seek.
    pub fn duration(mut self, secs: f64) -> Self {
        self.push("-t");
        self.push(format!("{:.3}", secs));
        self
    }

    /// Video filter chain.
    pub fn video_filter(mut self, filter: &str) -> Self {
        self.push("-vf");
        self.push(filter);
        self
    }

    /// Audio filter chain.
    pub fn audio_filter(mut self, filter: &str) -> Self {
        self.push("-af");
        self.push(filter);
        self
    }

    /// Drop the video streams entirely (audio-only analysis passes).
    pub fn no_video(mut self) -> Self {
        self.push("-vn");
        self
    }

    /// Full H.264/AAC encode flags for the uniform output spec.
    pub fn apply_target(mut self, target: &TargetSpec) -> Self {
        self.push("-r");
        self.push(target.fps.to_string());
        self.push("-c:v");
        self.push("libx264");
        self.push("-preset");
        self.push(target.preset.as_str());
        self.push("-crf");
        self.push(target.crf.to_string());
        self.push("-pix_fmt");
        self.push("yuv420p");
        self.push("-c:a");
        self.push("aac");
        self.push("-b:a");
        self.push(format!("{}k", target.audio_bitrate_kbps));
        self.push("-ar");
        self.push(target.audio_sample_rate_hz.to_string());
        self.push("-ac");
        self.push(target.audio_channels.to_string());
        self.push("-movflags");
        self.push("+faststart");
        self
    }

    /// Copy streams without re-encoding.
    pub fn stream_copy(mut self) -> Self {
        self.push("-c");
        self.push("copy");
        self
    }

    /// Emit machine-readable progress on stdout, silence the stats line.
    pub fn report_progress(mut self) -> Self {
        self.push("-progress");
        self.push("pipe:1");
        self.push("-nostats");
        self
    }

    /// Discard the output (analysis passes).
    pub fn null_output(mut self) -> Self {
        self.push("-f");
        self.push("null");
        self.push("-");
        self
    }

    /// Write the output file.
    pub fn output(mut self, path: &Path) -> Self {
        self.push(path);
        self
    }

    /// Finish building.
    pub fn into_args(self) -> Vec<OsString> {
        self.args
    }

    /// Lossy single-line rendering for logs.
    pub fn display(&self) -> String {
        let mut out = String::from("ffmpeg");
        for arg in &self.args {
            out.push(' ');
            out.push_str(&arg.to_string_lossy());
        }
        out
    }
}

/// The scale/pad chain that letterboxes any aspect ratio into the target
/// frame without distortion.
pub fn scale_pad_filter(target: &TargetSpec) -> String {
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2",
        w = target.width,
        h = target.height
    )
}
