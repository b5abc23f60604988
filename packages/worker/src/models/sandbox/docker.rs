use std::path::PathBuf;
use std::process::{Output, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use super::error::SandboxError;
use super::language::SANDBOX_DIR;
use super::scratch::ScratchDir;
use super::{RunOutcome, RunRequest, SandboxBackend, first_non_empty};
use crate::config::SandboxConfig;

const BACKEND: &str = "docker";

/// Exit status docker itself uses when the daemon rejects `docker run`.
const DOCKER_DAEMON_ERROR: i32 = 125;
/// Prefix the docker CLI puts on its own error lines.
const DOCKER_CLI_PREFIX: &str = "docker: ";

/// A program may exit 125 on its own; only docker's own message marks an
/// infrastructure failure.
fn is_daemon_failure(output: &Output) -> bool {
    output.status.code() == Some(DOCKER_DAEMON_ERROR)
        && String::from_utf8_lossy(&output.stderr)
            .trim_start()
            .starts_with(DOCKER_CLI_PREFIX)
}

enum StepOutput {
    Finished(Output),
    TimedOut,
}

/// Single-host backend: one `docker run --rm` per step against a shared
/// scratch volume.
pub struct DockerBackend {
    config: SandboxConfig,
}

impl DockerBackend {
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }

    fn container_name(request: &RunRequest, step: &str) -> String {
        format!("codeduel-{step}-{}", request.execution_id)
    }

    /// Host-side path bound to the sandbox mount point.
    fn mount_source(&self, request: &RunRequest) -> PathBuf {
        self.config
            .scratch_mount
            .as_ref()
            .unwrap_or(&self.config.scratch_dir)
            .join(request.execution_id.to_string())
    }

    fn base_args(
        &self,
        request: &RunRequest,
        step: &str,
        memory_mb: u32,
        interactive: bool,
    ) -> Vec<String> {
        let mut args = vec!["run".to_string(), "--rm".to_string()];
        if interactive {
            args.push("-i".into());
        }
        args.extend([
            "--name".into(),
            Self::container_name(request, step),
            "--network".into(),
            "none".into(),
            "--memory".into(),
            format!("{memory_mb}m"),
            "--cpus".into(),
            self.config.cpus.to_string(),
            "-v".into(),
            format!("{}:{SANDBOX_DIR}", self.mount_source(request).display()),
            self.config.image_for(request.language),
            "sh".into(),
            "-c".into(),
        ]);
        args
    }

    pub(crate) fn compile_args(&self, request: &RunRequest, command: &str) -> Vec<String> {
        let mut args = self.base_args(request, "compile", self.config.compile_memory_mb, false);
        args.push(command.to_string());
        args
    }

    pub(crate) fn run_args(&self, request: &RunRequest) -> Vec<String> {
        let mut args = self.base_args(request, "run", self.config.run_memory_mb, true);
        args.push(request.language.run_command());
        args
    }

    async fn step(
        &self,
        args: Vec<String>,
        stdin: Option<&str>,
        timeout: Duration,
        container: &str,
    ) -> Result<StepOutput, SandboxError> {
        let mut command = Command::new(&self.config.docker_bin);
        command
            .args(&args)
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
            let data = input.as_bytes().to_vec();
            // Written concurrently so a program that never reads stdin cannot stall the pipe.
            tokio::spawn(async move {
                let _ = pipe.write_all(&data).await;
            });
        }

        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                if is_daemon_failure(&output) {
                    return Err(SandboxError::backend(
                        BACKEND,
                        String::from_utf8_lossy(&output.stderr).trim().to_string(),
                    ));
                }
                Ok(StepOutput::Finished(output))
            }
            Ok(Err(e)) => Err(SandboxError::backend(BACKEND, e.to_string())),
            Err(_) => {
                self.force_remove(container).await;
                Ok(StepOutput::TimedOut)
            }
        }
    }

    async fn force_remove(&self, container: &str) {
        let removal = Command::new(&self.config.docker_bin)
            .args(["rm", "-f", container])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status();

        match tokio::time::timeout(Duration::from_secs(10), removal).await {
            Ok(Ok(_)) => debug!(container, "Removed timed out container"),
            Ok(Err(e)) => warn!(container, error = %e, "Failed to remove container"),
            Err(_) => warn!(container, "Timed out removing container"),
        }
    }

    async fn compile(
        &self,
        request: &RunRequest,
        command: &str,
    ) -> Result<Option<RunOutcome>, SandboxError> {
        let name = Self::container_name(request, "compile");
        let output = self
            .step(
                self.compile_args(request, command),
                None,
                self.config.compile_timeout(),
                &name,
            )
            .await?;

        match output {
            StepOutput::TimedOut => Ok(Some(RunOutcome::compilation_error(
                "Compilation timed out",
            ))),
            StepOutput::Finished(out) if out.status.success() => Ok(None),
            StepOutput::Finished(out) => {
                let stderr = String::from_utf8_lossy(&out.stderr);
                Ok(Some(RunOutcome::compilation_error(first_non_empty(
                    &stderr,
                    format!("Compilation failed: {}", out.status),
                ))))
            }
        }
    }

    async fn execute(&self, request: &RunRequest) -> Result<RunOutcome, SandboxError> {
        let name = Self::container_name(request, "run");
        let output = self
            .step(
                self.run_args(request),
                Some(&request.stdin),
                request.timeout,
                &name,
            )
            .await?;

        Ok(match output {
            StepOutput::TimedOut => RunOutcome::time_limit_exceeded(""),
            StepOutput::Finished(out) if out.status.success() => {
                RunOutcome::success(&String::from_utf8_lossy(&out.stdout))
            }
            StepOutput::Finished(out) => {
                let stderr = String::from_utf8_lossy(&out.stderr);
                RunOutcome::runtime_error(first_non_empty(
                    &stderr,
                    format!("Process exited abnormally: {}", out.status),
                ))
            }
        })
    }
}

#[async_trait]
impl SandboxBackend for DockerBackend {
    fn name(&self) -> &'static str {
        BACKEND
    }

    async fn run(&self, request: &RunRequest) -> Result<RunOutcome, SandboxError> {
        let _scratch = ScratchDir::prepare(
            &self.config.scratch_dir,
            request.execution_id,
            request.language,
            &request.code,
            &request.stdin,
        )
        .await?;

        if let Some(command) = request.language.compile_command()
            && let Some(failed) = self.compile(request, &command).await?
        {
            return Ok(failed);
        }

        self.execute(request).await
    }
}
