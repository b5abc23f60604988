use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub use common::config::MqAppConfig;

use crate::models::sandbox::language::Language;

/// Which isolation strategy runs an execution.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// One `docker run` per step on this host.
    #[default]
    Local,
    /// One Kubernetes pod per execution.
    Cluster,
}

/// Sandbox settings shared by the worker and the server's inline battle judge.
#[derive(Debug, Deserialize, Clone)]
pub struct SandboxConfig {
    #[serde(default)]
    pub primary: BackendKind,
    /// Retry once on the local backend when the cluster backend fails.
    #[serde(default = "default_fallback_enabled")]
    pub fallback_enabled: bool,
    /// Root of the per-execution scratch directories.
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,
    /// Host path of `scratch_dir` when this process itself runs in a container
    /// and shares the directory with sibling containers through a volume.
    #[serde(default)]
    pub scratch_mount: Option<PathBuf>,
    #[serde(default = "default_docker_bin")]
    pub docker_bin: String,
    #[serde(default = "default_kubectl_bin")]
    pub kubectl_bin: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Slack added to the pod deadline for scheduling and image pulls.
    #[serde(default = "default_pod_startup_secs")]
    pub pod_startup_secs: u64,
    #[serde(default = "default_compile_timeout_ms")]
    pub compile_timeout_ms: u64,
    /// Run deadline used when the caller does not pass one.
    #[serde(default = "default_run_timeout_ms")]
    pub run_timeout_ms: u64,
    #[serde(default = "default_compile_memory_mb")]
    pub compile_memory_mb: u32,
    #[serde(default = "default_run_memory_mb")]
    pub run_memory_mb: u32,
    #[serde(default = "default_cpus")]
    pub cpus: f64,
    /// Per-language image overrides keyed by language name.
    #[serde(default)]
    pub images: HashMap<String, String>,
}

fn default_fallback_enabled() -> bool {
    true
}
fn default_scratch_dir() -> PathBuf {
    std::env::temp_dir().join("codeduel")
}
fn default_docker_bin() -> String {
    "docker".into()
}
fn default_kubectl_bin() -> String {
    "kubectl".into()
}
fn default_namespace() -> String {
    "default".into()
}
fn default_poll_interval_ms() -> u64 {
    500
}
fn default_pod_startup_secs() -> u64 {
    30
}
fn default_compile_timeout_ms() -> u64 {
    10_000
}
fn default_run_timeout_ms() -> u64 {
    5_000
}
fn default_compile_memory_mb() -> u32 {
    256
}
fn default_run_memory_mb() -> u32 {
    128
}
fn default_cpus() -> f64 {
    0.5
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            primary: BackendKind::default(),
            fallback_enabled: default_fallback_enabled(),
            scratch_dir: default_scratch_dir(),
            scratch_mount: None,
            docker_bin: default_docker_bin(),
            kubectl_bin: default_kubectl_bin(),
            namespace: default_namespace(),
            poll_interval_ms: default_poll_interval_ms(),
            pod_startup_secs: default_pod_startup_secs(),
            compile_timeout_ms: default_compile_timeout_ms(),
            run_timeout_ms: default_run_timeout_ms(),
            compile_memory_mb: default_compile_memory_mb(),
            run_memory_mb: default_run_memory_mb(),
            cpus: default_cpus(),
            images: HashMap::new(),
        }
    }
}

impl SandboxConfig {
    pub fn image_for(&self, language: Language) -> String {
        self.images
            .get(language.name())
            .cloned()
            .unwrap_or_else(|| language.default_image())
    }

    pub fn compile_timeout(&self) -> Duration {
        Duration::from_millis(self.compile_timeout_ms)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_millis(self.run_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Worker-specific configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct WorkerConfig {
    /// Unique identifier for this worker instance. Default: "worker-1".
    #[serde(default = "default_worker_id")]
    pub id: String,
    /// Jobs judged concurrently. Default: 5.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_worker_id() -> String {
    "worker-1".into()
}
fn default_concurrency() -> usize {
    5
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            id: default_worker_id(),
            concurrency: default_concurrency(),
        }
    }
}

/// Worker application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct WorkerAppConfig {
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub mq: MqAppConfig,
    #[serde(default)]
    pub sandbox: SandboxConfig,
}

impl WorkerAppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("CODEDUEL_CONFIG").unwrap_or_else(|_| "config/config".to_string());

        let s = Config::builder()
            .set_default("worker.id", "worker-1")?
            .set_default("worker.concurrency", 5_i64)?
            .set_default("mq.url", "redis://localhost:6379")?
            .set_default("mq.pool_size", 5_i64)?
            .set_default("mq.queue_name", "judge_jobs")?
            .set_default("mq.result_queue_name", "judge_results")?
            .add_source(File::with_name(&config_path).required(false))
            .add_source(Environment::with_prefix("CODEDUEL").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
