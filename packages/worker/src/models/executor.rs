use std::sync::Arc;
use std::time::{Duration, Instant};

use common::Verdict;
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::sandbox::docker::DockerBackend;
use super::sandbox::error::SandboxError;
use super::sandbox::kubernetes::KubernetesBackend;
use super::sandbox::language::Language;
use super::sandbox::{RunRequest, SandboxBackend};
use crate::config::{BackendKind, SandboxConfig};

/// Result of one execution: `{verdict, output, durationSeconds}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    pub verdict: Verdict,
    pub output: String,
    pub duration_seconds: f64,
}

/// Runs programs on the primary backend, retrying once on the fallback when
/// the primary's infrastructure fails.
#[derive(Clone)]
pub struct SandboxExecutor {
    primary: Arc<dyn SandboxBackend>,
    fallback: Option<Arc<dyn SandboxBackend>>,
    default_timeout: Duration,
}

impl SandboxExecutor {
    pub fn new(primary: Arc<dyn SandboxBackend>) -> Self {
        Self {
            primary,
            fallback: None,
            default_timeout: Duration::from_millis(5000),
        }
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn SandboxBackend>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn from_config(config: &SandboxConfig) -> Self {
        let local: Arc<dyn SandboxBackend> = Arc::new(DockerBackend::new(config.clone()));
        let executor = match config.primary {
            BackendKind::Local => Self::new(local),
            BackendKind::Cluster => {
                let cluster = Self::new(Arc::new(KubernetesBackend::new(config.clone())));
                if config.fallback_enabled {
                    cluster.with_fallback(local)
                } else {
                    cluster
                }
            }
        };
        executor.with_default_timeout(config.run_timeout())
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Execute `code` once with `stdin` piped in.
    ///
    /// An unsupported language yields an `Error` verdict without touching any
    /// backend. `Err` means both backends failed (or the primary failed with no
    /// fallback configured).
    #[instrument(skip(self, code, stdin), fields(execution_id = tracing::field::Empty))]
    pub async fn execute(
        &self,
        code: &str,
        stdin: &str,
        language: &str,
        timeout: Option<Duration>,
    ) -> Result<ExecutionReport, SandboxError> {
        let language = match language.parse::<Language>() {
            Ok(language) => language,
            Err(e) => {
                return Ok(ExecutionReport {
                    verdict: Verdict::Error,
                    output: e.to_string(),
                    duration_seconds: 0.0,
                });
            }
        };

        let request = RunRequest {
            execution_id: Uuid::new_v4(),
            language,
            code: code.to_string(),
            stdin: stdin.to_string(),
            timeout: timeout.unwrap_or(self.default_timeout),
        };
        tracing::Span::current().record(
            "execution_id",
            tracing::field::display(request.execution_id),
        );

        let start = Instant::now();
        let outcome = match self.primary.run(&request).await {
            Ok(outcome) => outcome,
            Err(primary_err) => {
                let Some(fallback) = &self.fallback else {
                    return Err(primary_err);
                };
                warn!(
                    primary = self.primary.name(),
                    fallback = fallback.name(),
                    error = %primary_err,
                    "Primary sandbox failed, falling back"
                );
                fallback
                    .run(&request)
                    .await
                    .map_err(|fallback_err| SandboxError::AllBackendsFailed {
                        primary: primary_err.to_string(),
                        fallback: fallback_err.to_string(),
                    })?
            }
        };
        let duration_seconds = start.elapsed().as_secs_f64();

        info!(verdict = %outcome.verdict, duration_seconds, "Execution finished");

        Ok(ExecutionReport {
            verdict: outcome.verdict,
            output: outcome.output,
            duration_seconds,
        })
    }
}
