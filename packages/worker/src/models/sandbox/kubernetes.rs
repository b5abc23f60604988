use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::error::SandboxError;
use super::language::{INPUT_FILE, Language, SANDBOX_DIR};
use super::{RunOutcome, RunRequest, SandboxBackend, first_non_empty};
use crate::config::SandboxConfig;

const BACKEND: &str = "kubernetes";

/// Printed by the pod script before compiler diagnostics.
pub const COMPILE_ERROR_SENTINEL: &str = "__CODEDUEL_COMPILE_ERROR__";
/// Printed by the pod script before the program's stderr when it fails.
pub const STDERR_SENTINEL: &str = "__CODEDUEL_STDERR__";

/// Terminal state observed for a sandbox pod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed { reason: String },
    Unknown(String),
}

impl PodPhase {
    /// Parse the `<phase>/<reason>` pair printed by the jsonpath query.
    pub fn parse(raw: &str) -> Self {
        let (phase, reason) = raw.trim().split_once('/').unwrap_or((raw.trim(), ""));
        match phase {
            "Pending" | "" => Self::Pending,
            "Running" => Self::Running,
            "Succeeded" => Self::Succeeded,
            "Failed" => Self::Failed {
                reason: reason.to_string(),
            },
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed { .. })
    }
}

/// Cluster backend: one ephemeral `restartPolicy: Never` pod per execution.
pub struct KubernetesBackend {
    config: SandboxConfig,
}

impl KubernetesBackend {
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }

    pub fn pod_name(request: &RunRequest) -> String {
        format!("codeduel-run-{}", request.execution_id)
    }

    /// Script executed as the container command. Source and stdin arrive
    /// through environment variables so no quoting of user code is needed.
    pub fn script(language: Language) -> String {
        let dir = SANDBOX_DIR;
        let mut lines = vec![
            format!("mkdir -p {dir}"),
            format!(
                "printf '%s' \"$CODEDUEL_SOURCE\" > {dir}/{}",
                language.source_file()
            ),
            format!("printf '%s' \"$CODEDUEL_STDIN\" > {dir}/{INPUT_FILE}"),
        ];
        if let Some(compile) = language.compile_command() {
            lines.push(format!("if ! {compile} > {dir}/compile.log 2>&1; then"));
            lines.push(format!("  echo '{COMPILE_ERROR_SENTINEL}'"));
            lines.push(format!("  cat {dir}/compile.log"));
            lines.push("  exit 3".to_string());
            lines.push("fi".to_string());
        }
        lines.push(format!(
            "( {} ) < {dir}/{INPUT_FILE} 2> {dir}/stderr.log",
            language.run_command()
        ));
        lines.push("status=$?".to_string());
        lines.push("if [ $status -ne 0 ]; then".to_string());
        lines.push(format!("  printf '\\n%s\\n' '{STDERR_SENTINEL}'"));
        lines.push(format!("  cat {dir}/stderr.log"));
        lines.push("fi".to_string());
        lines.push("exit $status".to_string());
        lines.join("\n")
    }

    fn deadline_secs(&self, request: &RunRequest) -> u64 {
        let budget = self.config.compile_timeout() + request.timeout;
        budget.as_secs() + u64::from(budget.subsec_nanos() > 0)
    }

    pub fn manifest(&self, request: &RunRequest) -> Value {
        let memory_mb = self.config.compile_memory_mb.max(self.config.run_memory_mb);
        let cpu_millis = (self.config.cpus * 1000.0).round() as u64;
        json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": {
                "name": Self::pod_name(request),
                "namespace": self.config.namespace,
                "labels": {
                    "app": "codeduel-sandbox",
                    "codeduel/language": request.language.name(),
                },
            },
            "spec": {
                "restartPolicy": "Never",
                "automountServiceAccountToken": false,
                "activeDeadlineSeconds": self.deadline_secs(request),
                "containers": [{
                    "name": "runner",
                    "image": self.config.image_for(request.language),
                    "command": ["sh", "-c", Self::script(request.language)],
                    "env": [
                        {"name": "CODEDUEL_SOURCE", "value": request.code},
                        {"name": "CODEDUEL_STDIN", "value": request.stdin},
                    ],
                    "resources": {
                        "limits": {
                            "memory": format!("{memory_mb}Mi"),
                            "cpu": format!("{cpu_millis}m"),
                        },
                    },
                    "volumeMounts": [{"name": "scratch", "mountPath": SANDBOX_DIR}],
                }],
                "volumes": [{"name": "scratch", "emptyDir": {}}],
            },
        })
    }

    /// Map the terminal phase and collected logs to a run outcome. Only the
    /// program's stdout counts as output; its stderr is kept for failures.
    pub fn interpret(phase: &PodPhase, logs: &str) -> RunOutcome {
        if let Some((_, diagnostics)) = logs.split_once(COMPILE_ERROR_SENTINEL) {
            return RunOutcome::compilation_error(diagnostics.trim_start_matches('\n'));
        }
        let (stdout, stderr) = match logs.split_once(STDERR_SENTINEL) {
            Some((out, err)) => (out, err.trim_start_matches('\n')),
            None => (logs, ""),
        };
        match phase {
            PodPhase::Succeeded => RunOutcome::success(stdout),
            PodPhase::Failed { reason } if reason == "DeadlineExceeded" => {
                RunOutcome::time_limit_exceeded(stderr)
            }
            _ => RunOutcome::runtime_error(first_non_empty(
                stderr,
                "Process exited abnormally".to_string(),
            )),
        }
    }

    /// Outcome once the deadline passes without a terminal phase. A pod that
    /// never left `Pending` was not scheduled, which is the cluster's fault.
    fn expired(pod: &str, started: bool) -> Result<RunOutcome, SandboxError> {
        if started {
            Ok(RunOutcome::time_limit_exceeded(""))
        } else {
            Err(SandboxError::backend(
                BACKEND,
                format!("pod {pod} was never scheduled"),
            ))
        }
    }

    async fn kubectl(&self, args: &[&str], stdin: Option<String>) -> Result<String, SandboxError> {
        let mut command = Command::new(&self.config.kubectl_bin);
        command
            .args(args)
            .args(["-n", &self.config.namespace])
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command
            .spawn()
            .map_err(|e| SandboxError::launch(BACKEND, e.to_string()))?;
        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input.as_bytes())
                .await
                .map_err(|e| SandboxError::backend(BACKEND, e.to_string()))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| SandboxError::backend(BACKEND, e.to_string()))?;
        if !output.status.success() {
            return Err(SandboxError::backend(
                BACKEND,
                format!(
                    "kubectl {} failed: {}",
                    args.first().copied().unwrap_or_default(),
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn await_completion(
        &self,
        pod: &str,
        request: &RunRequest,
    ) -> Result<RunOutcome, SandboxError> {
        let deadline = Instant::now()
            + Duration::from_secs(self.config.pod_startup_secs)
            + self.config.compile_timeout()
            + request.timeout;

        let mut started = false;
        let phase = loop {
            let raw = self
                .kubectl(
                    &[
                        "get",
                        "pod",
                        pod,
                        "-o",
                        "jsonpath={.status.phase}/{.status.reason}",
                    ],
                    None,
                )
                .await?;
            let phase = PodPhase::parse(&raw);
            debug!(pod, ?phase, "Polled sandbox pod");
            if phase.is_terminal() {
                break phase;
            }
            started |= phase != PodPhase::Pending;
            if Instant::now() >= deadline {
                return Self::expired(pod, started);
            }
            tokio::time::sleep(self.config.poll_interval()).await;
        };

        let logs = self.kubectl(&["logs", pod], None).await?;
        Ok(Self::interpret(&phase, &logs))
    }

    async fn delete_pod(&self, pod: &str) {
        if let Err(e) = self
            .kubectl(
                &["delete", "pod", pod, "--ignore-not-found", "--wait=false"],
                None,
            )
            .await
        {
            warn!(pod, error = %e, "Failed to delete sandbox pod");
        }
    }
}

#[async_trait]
impl SandboxBackend for KubernetesBackend {
    fn name(&self) -> &'static str {
        BACKEND
    }

    async fn run(&self, request: &RunRequest) -> Result<RunOutcome, SandboxError> {
        let pod = Self::pod_name(request);
        let manifest = serde_json::to_string(&self.manifest(request))
            .map_err(|e| SandboxError::backend(BACKEND, e.to_string()))?;

        let result = match self.kubectl(&["apply", "-f", "-"], Some(manifest)).await {
            Ok(_) => self.await_completion(&pod, request).await,
            Err(e) => Err(e),
        };
        self.delete_pod(&pod).await;
        result
    }
}
