pub mod config;
pub mod consumer;
pub mod error;
pub mod handlers;
pub mod models;

pub use config::{BackendKind, SandboxConfig, WorkerAppConfig, WorkerConfig};
pub use error::{Result, WorkerError};
pub use handlers::judge::handle_judge_job;
pub use models::executor::{ExecutionReport, SandboxExecutor};
pub use models::judge::{JudgeOutcome, judge_test_cases, normalize_output, outputs_match};
pub use models::sandbox::error::SandboxError;
pub use models::sandbox::language::Language;
pub use models::sandbox::{RunOutcome, RunRequest, SandboxBackend};
#[cfg(any(test, feature = "testing"))]
pub use models::sandbox::scripted::ScriptedBackend;
