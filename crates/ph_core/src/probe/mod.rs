//! Source probing using ffprobe.
//!
//! Provides duration and audio-stream detection for candidate source files.
//! The [`MediaProber`] trait is the seam that lets the orchestrator run
//! against a fake prober in tests.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::Value;
use thiserror::Error;

use crate::models::SourceCandidate;

/// Errors that can occur while probing a source file.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to run ffprobe: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("ffprobe exited with code {exit_code} for {path}: {message}")]
    CommandFailed {
        path: PathBuf,
        exit_code: i32,
        message: String,
    },

    #[error("Failed to parse ffprobe output: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("No duration reported for {0}")]
    MissingDuration(PathBuf),

    #[error("ffprobe not available: {0}")]
    ToolMissing(String),
}

/// Result type for probe operations.
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Abstraction over source probing.
pub trait MediaProber: Send + Sync {
    /// Probe one file, returning its duration and audio presence.
    fn probe(&self, path: &Path) -> ProbeResult<SourceCandidate>;

    /// Verify the probing tool is runnable. Called once per run, before any
    /// source is touched.
    fn preflight(&self) -> ProbeResult<()> {
        Ok(())
    }
}

/// Probes files by invoking `ffprobe` with JSON output.
#[derive(Debug, Clone, Default)]
pub struct FfprobeProber;

impl FfprobeProber {
    pub fn new() -> Self {
        Self
    }
}

impl MediaProber for FfprobeProber {
    fn probe(&self, path: &Path) -> ProbeResult<SourceCandidate> {
        if !path.exists() {
            return Err(ProbeError::FileNotFound(path.to_path_buf()));
        }

        tracing::debug!("Probing file: {}", path.display());

        let output = Command::new("ffprobe")
            .args(["-v", "error", "-show_format", "-show_streams", "-of", "json"])
            .arg(path)
            .output()?;

        if !output.status.success() {
            return Err(ProbeError::CommandFailed {
                path: path.to_path_buf(),
                exit_code: output.status.code().unwrap_or(-1),
                message: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }

        let json: Value = serde_json::from_slice(&output.stdout)?;
        parse_probe_json(&json, path)
    }

    fn preflight(&self) -> ProbeResult<()> {
        let status = Command::new("ffprobe")
            .arg("-version")
            .output()
            .map_err(|e| ProbeError::ToolMissing(e.to_string()))?;
        if !status.status.success() {
            return Err(ProbeError::ToolMissing(
                "ffprobe -version reported failure".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parse the JSON output from ffprobe.
fn parse_probe_json(json: &Value, path: &Path) -> ProbeResult<SourceCandidate> {
    // ffprobe reports duration as a string in format properties; some
    // containers only carry it on the video stream.
    let format_duration = json
        .get("format")
        .and_then(|f| f.get("duration"))
        .and_then(|d| d.as_str())
        .and_then(|s| s.parse::<f64>().ok());

    let streams = json
        .get("streams")
        .and_then(|s| s.as_array())
        .map(|a| a.as_slice())
        .unwrap_or(&[]);

    let stream_duration = streams
        .iter()
        .filter_map(|s| {
            s.get("duration")
                .and_then(|d| d.as_str())
                .and_then(|s| s.parse::<f64>().ok())
        })
        .fold(None::<f64>, |acc, d| Some(acc.map_or(d, |a| a.max(d))));

    let duration_secs = format_duration
        .or(stream_duration)
        .ok_or_else(|| ProbeError::MissingDuration(path.to_path_buf()))?;

    let has_audio = streams
        .iter()
        .any(|s| s.get("codec_type").and_then(|t| t.as_str()) == Some("audio"));

    Ok(SourceCandidate {
        path: path.to_path_buf(),
        duration_secs,
        has_audio,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_nonexistent_file() {
        let prober = FfprobeProber::new();
        let result = prober.probe(Path::new("/nonexistent/file.mp4"));
        assert!(matches!(result, Err(ProbeError::FileNotFound(_))));
    }

    #[test]
    fn parses_format_duration() {
        let json: Value = serde_json::from_str(
            r#"{
                "format": { "duration": "123.456" },
                "streams": [
                    { "codec_type": "video" },
                    { "codec_type": "audio" }
                ]
            }"#,
        )
        .unwrap();

        let candidate = parse_probe_json(&json, Path::new("clip.mp4")).unwrap();
        assert_eq!(candidate.duration_secs, 123.456);
        assert!(candidate.has_audio);
    }

    #[test]
    fn falls_back_to_stream_duration() {
        let json: Value = serde_json::from_str(
            r#"{
                "format": {},
                "streams": [
                    { "codec_type": "video", "duration": "90.0" },
                    { "codec_type": "audio", "duration": "89.5" }
                ]
            }"#,
        )
        .unwrap();

        let candidate = parse_probe_json(&json, Path::new("clip.mkv")).unwrap();
        assert_eq!(candidate.duration_secs, 90.0);
    }

    #[test]
    fn missing_duration_is_an_error() {
        let json: Value = serde_json::from_str(
            r#"{ "format": {}, "streams": [ { "codec_type": "video" } ] }"#,
        )
        .unwrap();

        let result = parse_probe_json(&json, Path::new("bad.mp4"));
        assert!(matches!(result, Err(ProbeError::MissingDuration(_))));
    }

    #[test]
    fn detects_missing_audio() {
        let json: Value = serde_json::from_str(
            r#"{
                "format": { "duration": "200" },
                "streams": [ { "codec_type": "video" } ]
            }"#,
        )
        .unwrap();

        let candidate = parse_probe_json(&json, Path::new("silent.mp4")).unwrap();
        assert!(!candidate.has_audio);
    }
}
