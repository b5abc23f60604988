use std::sync::Arc;

use async_trait::async_trait;
use common::judge_result::JudgeResult;
use common::worker::Task;
use mq::{MqError, ResultPublisher};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{error, instrument};
use worker::SandboxExecutor;
use worker::consumer::process_task;

use super::judge_result::apply_judge_result;
use crate::relay::Relay;
use crate::store::Store;

const LOCAL_QUEUE: &str = "local";

/// Judges tasks inside the server process when the MQ is disabled. Results
/// skip the result queue and are applied directly. At most `concurrency`
/// tasks hold a sandbox at once; the rest wait for a permit.
pub struct LocalJudge {
    store: Arc<dyn Store>,
    relay: Arc<Relay>,
    executor: Arc<SandboxExecutor>,
    permits: Arc<Semaphore>,
}

impl LocalJudge {
    pub fn new(
        store: Arc<dyn Store>,
        relay: Arc<Relay>,
        executor: Arc<SandboxExecutor>,
        concurrency: usize,
    ) -> Self {
        Self {
            store,
            relay,
            executor,
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
        }
    }

    /// Run the task on a background task. The handle is only awaited by tests.
    pub fn spawn(self: &Arc<Self>, task: Task) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let Ok(_permit) = Arc::clone(&this.permits).acquire_owned().await else {
                return;
            };
            this.run(task).await
        })
    }

    #[instrument(skip_all, fields(job_id = %task.id))]
    async fn run(&self, task: Task) {
        if let Err(e) = process_task(task, &self.executor, self, LOCAL_QUEUE).await {
            error!(error = %e, "In-process judging failed");
        }
    }
}

#[async_trait]
impl ResultPublisher for LocalJudge {
    async fn publish_result(&self, _queue: &str, result: &JudgeResult) -> Result<(), MqError> {
        apply_judge_result(self.store.as_ref(), &self.relay, result.clone())
            .await
            .map_err(|e| MqError::Broker(e.to_string()))
    }
}
