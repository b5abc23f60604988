pub mod docker;
pub mod error;
pub mod kubernetes;
pub mod language;
pub mod scratch;
#[cfg(any(test, feature = "testing"))]
pub mod scripted;

use std::time::Duration;

use async_trait::async_trait;
use common::Verdict;
use uuid::Uuid;

use error::SandboxError;
use language::Language;

/// One (code, stdin, language) execution handed to a backend.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub execution_id: Uuid,
    pub language: Language,
    pub code: String,
    pub stdin: String,
    /// Wall-clock deadline of the run step.
    pub timeout: Duration,
}

/// Program-level outcome of a run. The verdict is one of `Success`,
/// `Compilation Error`, `Runtime Error` or `Time Limit Exceeded`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub verdict: Verdict,
    pub output: String,
}

impl RunOutcome {
    pub fn success(stdout: &str) -> Self {
        Self {
            verdict: Verdict::Success,
            output: stdout.trim().to_string(),
        }
    }

    pub fn compilation_error(diagnostics: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::CompilationError,
            output: diagnostics.into(),
        }
    }

    pub fn runtime_error(stderr: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::RuntimeError,
            output: stderr.into(),
        }
    }

    pub fn time_limit_exceeded(stderr: &str) -> Self {
        let output = if stderr.trim().is_empty() {
            "Execution timed out".to_string()
        } else {
            stderr.to_string()
        };
        Self {
            verdict: Verdict::TimeLimitExceeded,
            output,
        }
    }
}

/// An isolation strategy able to compile and run one program.
///
/// `Err` is reserved for infrastructure failures, which trigger the executor's
/// fallback. Anything the program itself did is reported as a `RunOutcome`.
#[async_trait]
pub trait SandboxBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, request: &RunRequest) -> Result<RunOutcome, SandboxError>;
}

/// Pick the first non-empty stream, or a fallback message.
pub(crate) fn first_non_empty(primary: &str, fallback: String) -> String {
    if primary.trim().is_empty() {
        fallback
    } else {
        primary.to_string()
    }
}
