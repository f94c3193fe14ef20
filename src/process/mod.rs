//! process
//!
//! Pluggable external process execution.
//!
//! # Design
//!
//! Every external tool this crate talks to (`curl`, `git`, `gh`) is invoked
//! through the [`ProcessRunner`] trait. This is the **single doorway** for
//! process spawning: no other module imports `tokio::process` directly. The
//! indirection exists so that tests can substitute [`fake::FakeRunner`] and
//! exercise the full client stack without touching the network or the
//! filesystem.
//!
//! # Output Model
//!
//! A completed process is reported as a [`ProcessOutput`]: an exit code plus
//! stdout and stderr captured as line arrays. Capture splits the raw stream
//! on `\n`, so output that ends with a newline carries one trailing empty
//! line; [`ProcessOutput::stdout_lines`] and [`ProcessOutput::stderr_lines`]
//! strip that artifact.
//!
//! # Timeouts
//!
//! [`TokioRunner`] enforces a hard deadline: a child that outlives its
//! timeout is killed and reported with the [`TIMEOUT_EXIT_CODE`] sentinel.
//! Callers distinguish "timed out" from ordinary failure by that code alone.

pub mod fake;

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tracing::debug;

/// Sentinel exit code reported when a child is terminated by its timeout.
///
/// Real exit codes are non-negative on every supported platform, so `-1`
/// is unambiguous.
pub const TIMEOUT_EXIT_CODE: i32 = -1;

/// Errors from process execution itself.
///
/// A process that starts and exits (with any code) is not an error at this
/// layer; it is reported through [`ProcessOutput::exit_code`]. These variants
/// cover the cases where no exit code could be obtained at all.
#[derive(Debug, Clone, Error)]
pub enum ProcessError {
    /// The program could not be spawned (not installed, not executable).
    #[error("failed to spawn {program}: {message}")]
    Spawn {
        /// The program that was invoked
        program: String,
        /// The underlying OS error
        message: String,
    },

    /// I/O failed while reading the child's output or awaiting its exit.
    #[error("i/o error while running {program}: {message}")]
    Io {
        /// The program that was invoked
        program: String,
        /// The underlying OS error
        message: String,
    },
}

/// Captured result of one process invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code; [`TIMEOUT_EXIT_CODE`] when the child was killed on deadline.
    pub exit_code: i32,
    /// Stdout split on `\n`, trailing-newline artifact included.
    pub stdout: Vec<String>,
    /// Stderr split on `\n`, trailing-newline artifact included.
    pub stderr: Vec<String>,
}

impl ProcessOutput {
    /// Successful output with the given stdout lines and empty stderr.
    pub fn ok<I, S>(stdout: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            exit_code: 0,
            stdout: stdout.into_iter().map(Into::into).collect(),
            stderr: Vec::new(),
        }
    }

    /// Output for a process that exited with `code`, with stderr lines.
    pub fn failed<I, S>(code: i32, stderr: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            exit_code: code,
            stdout: Vec::new(),
            stderr: stderr.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether the process exited with code zero.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Stdout with a single trailing empty line stripped.
    pub fn stdout_lines(&self) -> &[String] {
        strip_trailing_blank(&self.stdout)
    }

    /// Stderr with a single trailing empty line stripped.
    pub fn stderr_lines(&self) -> &[String] {
        strip_trailing_blank(&self.stderr)
    }
}

/// Strip at most one trailing empty line.
///
/// Splitting a newline-terminated stream on `\n` yields one final empty
/// string; only that artifact is removed, interior blank lines survive.
fn strip_trailing_blank(lines: &[String]) -> &[String] {
    match lines.split_last() {
        Some((last, rest)) if last.is_empty() => rest,
        _ => lines,
    }
}

/// Trait for running external processes to completion.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so a single runner can be shared
/// across async tasks behind an `Arc`.
///
/// # Cancellation
///
/// The returned future must be cancel-safe: dropping it must not leave the
/// child running. [`TokioRunner`] guarantees this via `kill_on_drop`.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run `program` with `args`, waiting at most `timeout` for it to exit.
    ///
    /// # Returns
    ///
    /// The captured [`ProcessOutput`]. A child killed on deadline is reported
    /// with [`TIMEOUT_EXIT_CODE`], not as an `Err`.
    ///
    /// # Errors
    ///
    /// - [`ProcessError::Spawn`] if the program cannot be started
    /// - [`ProcessError::Io`] if output capture or wait fails
    async fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<ProcessOutput, ProcessError>;
}

/// Production runner backed by `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct TokioRunner;

impl TokioRunner {
    /// Create a new runner.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessRunner for TokioRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<ProcessOutput, ProcessError> {
        debug!(program, argc = args.len(), "spawning process");

        let mut child = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ProcessError::Spawn {
                program: program.to_string(),
                message: e.to_string(),
            })?;

        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();

        let stdout_task = tokio::spawn(read_stream(stdout_pipe));
        let stderr_task = tokio::spawn(read_stream(stderr_pipe));

        let exit_code = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(Ok(status)) => {
                // A signal-terminated child reports no code; treat it like
                // the kill-on-deadline path.
                status.code().unwrap_or(TIMEOUT_EXIT_CODE)
            }
            Ok(Err(e)) => {
                return Err(ProcessError::Io {
                    program: program.to_string(),
                    message: e.to_string(),
                });
            }
            Err(_) => {
                // Deadline hit. Kill failures are ignored: the child may
                // have exited in the window between timeout and kill.
                let _ = child.kill().await;
                debug!(program, "process killed on deadline");
                TIMEOUT_EXIT_CODE
            }
        };

        let stdout = join_capture(stdout_task, program).await?;
        let stderr = join_capture(stderr_task, program).await?;

        Ok(ProcessOutput {
            exit_code,
            stdout,
            stderr,
        })
    }
}

/// Read an output pipe to EOF and split it into lines.
async fn read_stream<R>(pipe: Option<R>) -> Vec<String>
where
    R: tokio::io::AsyncRead + Unpin + Send,
{
    let Some(mut pipe) = pipe else {
        return Vec::new();
    };
    let mut raw = Vec::new();
    if pipe.read_to_end(&mut raw).await.is_err() {
        return Vec::new();
    }
    let text = String::from_utf8_lossy(&raw);
    text.split('\n').map(str::to_string).collect()
}

/// Await a capture task, mapping a panicked task to an I/O error.
async fn join_capture(
    task: tokio::task::JoinHandle<Vec<String>>,
    program: &str,
) -> Result<Vec<String>, ProcessError> {
    task.await.map_err(|e| ProcessError::Io {
        program: program.to_string(),
        message: e.to_string(),
    })
}
