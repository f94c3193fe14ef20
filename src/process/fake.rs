//! process::fake
//!
//! Deterministic [`ProcessRunner`] double for tests.
//!
//! # Design
//!
//! `FakeRunner` replays scripted [`ProcessOutput`]s instead of spawning
//! anything. Scripts are keyed by program name and consumed in FIFO order,
//! so a test can enqueue one `git` reply and two `curl` replies and assert
//! afterwards on the recorded argument vectors and call counts.
//!
//! This module is public (not `#[cfg(test)]`) so integration tests under
//! `tests/` can drive the full client stack with it.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{ProcessError, ProcessOutput, ProcessRunner};

/// One recorded invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// The program that was requested
    pub program: String,
    /// The full argument vector
    pub args: Vec<String>,
    /// The timeout the caller asked for
    pub timeout: Duration,
}

/// Scripted output plus an optional artificial delay before delivery.
#[derive(Debug, Clone)]
struct Script {
    output: ProcessOutput,
    delay: Option<Duration>,
}

/// A process runner that replays scripted outputs and records calls.
#[derive(Debug, Default)]
pub struct FakeRunner {
    scripts: Mutex<HashMap<String, Vec<Script>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeRunner {
    /// Create an empty runner. Any call without a matching script fails
    /// with [`ProcessError::Spawn`], which makes unexpected invocations
    /// visible as test failures.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue an output for the next invocation of `program`.
    pub fn enqueue(&self, program: &str, output: ProcessOutput) {
        self.scripts
            .lock()
            .expect("scripts lock poisoned")
            .entry(program.to_string())
            .or_default()
            .push(Script {
                output,
                delay: None,
            });
    }

    /// Enqueue an output that is delivered only after `delay` elapses.
    ///
    /// Used to hold a request in flight so cancellation and interleaving
    /// can be exercised.
    pub fn enqueue_delayed(&self, program: &str, output: ProcessOutput, delay: Duration) {
        self.scripts
            .lock()
            .expect("scripts lock poisoned")
            .entry(program.to_string())
            .or_default()
            .push(Script {
                output,
                delay: Some(delay),
            });
    }

    /// All recorded calls, in invocation order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("calls lock poisoned").clone()
    }

    /// Number of recorded calls for one program.
    pub fn call_count(&self, program: &str) -> usize {
        self.calls
            .lock()
            .expect("calls lock poisoned")
            .iter()
            .filter(|c| c.program == program)
            .count()
    }

    /// Argument vector of the first recorded call for `program`, if any.
    pub fn first_args(&self, program: &str) -> Option<Vec<String>> {
        self.calls
            .lock()
            .expect("calls lock poisoned")
            .iter()
            .find(|c| c.program == program)
            .map(|c| c.args.clone())
    }
}

#[async_trait]
impl ProcessRunner for FakeRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<ProcessOutput, ProcessError> {
        self.calls
            .lock()
            .expect("calls lock poisoned")
            .push(RecordedCall {
                program: program.to_string(),
                args: args.to_vec(),
                timeout,
            });

        let script = {
            let mut scripts = self.scripts.lock().expect("scripts lock poisoned");
            let queue = scripts.get_mut(program);
            match queue {
                Some(q) if !q.is_empty() => q.remove(0),
                _ => {
                    return Err(ProcessError::Spawn {
                        program: program.to_string(),
                        message: "no scripted output".to_string(),
                    })
                }
            }
        };

        if let Some(delay) = script.delay {
            tokio::time::sleep(delay).await;
        }

        Ok(script.output)
    }
}
