//! External tool discovery.
//!
//! The pipeline shells out to ffmpeg and ffprobe; this module gives
//! front-ends a way to report what is installed before a run starts.

use std::process::Command;

/// Tools the pipeline depends on.
pub const REQUIRED_TOOLS: &[&str] = &["ffmpeg", "ffprobe"];

/// Availability of one external tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCheck {
    pub name: String,
    pub available: bool,
    /// First line of `<tool> -version` output, when available.
    pub version: Option<String>,
}

/// Check one tool by running `<name> -version`.
pub fn check_tool(name: &str) -> ToolCheck {
    match Command::new(name).arg("-version").output() {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .map(|l| l.trim().to_string());
            ToolCheck {
                name: name.to_string(),
                available: true,
                version,
            }
        }
        _ => ToolCheck {
            name: name.to_string(),
            available: false,
            version: None,
        },
    }
}

/// Check every required tool.
pub fn check_dependencies() -> Vec<ToolCheck> {
    REQUIRED_TOOLS.iter().map(|t| check_tool(t)).collect()
}

/// Names of required tools that are not runnable.
pub fn missing_tools() -> Vec<String> {
    check_dependencies()
        .into_iter()
        .filter(|c| !c.available)
        .map(|c| c.name)
        .collect()
}
