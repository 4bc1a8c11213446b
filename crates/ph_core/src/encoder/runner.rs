//! ffmpeg subprocess execution with progress and cancellation.
//!
//! Every invocation pipes progress records on stdout and diagnostics on
//! stderr. Stderr is drained on a helper thread into a bounded tail buffer;
//! the calling thread consumes stdout, reports percentages, and polls the
//! cancel flag between records. On cancel the child is killed and reaped.

use std::collections::VecDeque;
use std::io::{self, BufRead, BufReader};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

use crate::cancel::CancelHandle;

use super::command::FfmpegCommand;
use super::progress::ProgressParser;

/// What a finished (or killed) ffmpeg invocation left behind.
#[derive(Debug)]
pub struct RunOutput {
    pub exit_code: i32,
    pub success: bool,
    pub cancelled: bool,
    /// Last stderr lines, newest last.
    pub stderr_tail: Vec<String>,
}

impl RunOutput {
    /// Tail joined into one diagnostic blob.
    pub fn diagnostic(&self) -> String {
        self.stderr_tail.join("\n")
    }
}

/// Run one ffmpeg invocation to completion.
///
/// `total_secs` scales progress records into percentages; pass the expected
/// output duration, or 0.0 when it is unknown.
pub fn run_ffmpeg(
    command: FfmpegCommand,
    total_secs: f64,
    cancel: &CancelHandle,
    progress: &dyn Fn(u8),
    tail_limit: usize,
) -> io::Result<RunOutput> {
    tracing::debug!("Running: {}", command.display());

    let mut child = Command::new("ffmpeg")
        .args(command.into_args())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let stderr = child.stderr.take();
    let stderr_handle = thread::Builder::new()
        .name("ffmpeg-stderr".to_string())
        .spawn(move || {
            let mut tail: VecDeque<String> = VecDeque::with_capacity(tail_limit);
            if let Some(stderr) = stderr {
                for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                    if tail.len() >= tail_limit {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
            }
            tail.into_iter().collect::<Vec<_>>()
        })?;

    let mut cancelled = false;
    let mut parser = ProgressParser::new(total_secs);

    if let Some(stdout) = child.stdout.take() {
        for line in BufReader::new(stdout).lines().map_while(Result::ok) {
            if cancel.is_cancelled() {
                let _ = child.kill();
                cancelled = true;
                break;
            }
            if let Some(percent) = parser.parse_line(&line) {
                progress(percent);
            }
        }
    }

    // Progress records stop just before exit; keep polling so a cancel
    // arriving here still kills the child.
    let status = loop {
        if !cancelled && cancel.is_cancelled() {
            let _ = child.kill();
            cancelled = true;
        }
        match child.try_wait()? {
            Some(status) => break status,
            None => thread::sleep(Duration::from_millis(50)),
        }
    };

    let stderr_tail = stderr_handle.join().unwrap_or_default();

    Ok(RunOutput {
        exit_code: status.code().unwrap_or(-1),
        success: status.success() && !cancelled,
        cancelled,
        stderr_tail,
    })
}
