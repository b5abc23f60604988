use serde::Deserialize;

/// Redis MQ settings shared by the server and the worker.
#[derive(Debug, Deserialize, Clone)]
pub struct MqAppConfig {
    /// Server only: when false, submissions are judged in-process.
    #[serde(default = "default_mq_enabled")]
    pub enabled: bool,
    #[serde(default = "default_mq_url")]
    pub url: String,
    #[serde(default = "default_mq_pool_size")]
    pub pool_size: u8,
    /// Queue the server publishes judge jobs on.
    #[serde(default = "default_mq_queue_name")]
    pub queue_name: String,
    /// Queue the worker publishes judge results on.
    #[serde(default = "default_mq_result_queue_name")]
    pub result_queue_name: String,
}

fn default_mq_enabled() -> bool {
    true
}
fn default_mq_url() -> String {
    "redis://localhost:6379".into()
}
fn default_mq_pool_size() -> u8 {
    5
}
fn default_mq_queue_name() -> String {
    "judge_jobs".into()
}
fn default_mq_result_queue_name() -> String {
    "judge_results".into()
}

impl Default for MqAppConfig {
    fn default() -> Self {
        Self {
            enabled: default_mq_enabled(),
            url: default_mq_url(),
            pool_size: default_mq_pool_size(),
            queue_name: default_mq_queue_name(),
            result_queue_name: default_mq_result_queue_name(),
        }
    }
}
