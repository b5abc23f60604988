//! Deterministic backend for tests. The submitted code is read as a one-word
//! script instead of being compiled:
//!
//! - `echo` prints stdin back
//! - `sum` prints the sum of the integers on stdin
//! - `print:<text>` prints `<text>`
//! - `compile_error`, `crash` and `timeout` produce the matching verdict
//!
//! Anything else is a runtime error.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::error::SandboxError;
use super::{RunOutcome, RunRequest, SandboxBackend};

pub struct ScriptedBackend {
    name: &'static str,
    unavailable: bool,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            name: "scripted",
            unavailable: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Backend whose infrastructure is always down.
    pub fn unavailable(name: &'static str) -> Self {
        Self {
            name,
            unavailable: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SandboxBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn run(&self, request: &RunRequest) -> Result<RunOutcome, SandboxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(SandboxError::backend(self.name, "backend unavailable"));
        }

        let code = request.code.trim();
        let outcome = match code {
            "echo" => RunOutcome::success(&request.stdin),
            "sum" => {
                let total: i64 = request
                    .stdin
                    .split_whitespace()
                    .filter_map(|n| n.parse::<i64>().ok())
                    .sum();
                RunOutcome::success(&total.to_string())
            }
            "compile_error" => RunOutcome::compilation_error("error: expected ';'"),
            "crash" => RunOutcome::runtime_error("Segmentation fault"),
            "timeout" => RunOutcome::time_limit_exceeded(""),
            _ => match code.strip_prefix("print:") {
                Some(text) => RunOutcome::success(text),
                None => RunOutcome::runtime_error(format!("unknown script: {code}")),
            },
        };
        Ok(outcome)
    }
}
