use async_trait::async_trait;
use common::judge_result::JudgeResult;
use common::worker::Task;

use crate::error::MqError;
use crate::models::MqQueue;

/// Server side of the job queue.
#[async_trait]
pub trait TaskPublisher: Send + Sync {
    async fn publish_task(&self, queue: &str, task: &Task) -> Result<(), MqError>;
}

/// Worker side of the result queue.
#[async_trait]
pub trait ResultPublisher: Send + Sync {
    async fn publish_result(&self, queue: &str, result: &JudgeResult) -> Result<(), MqError>;
}

#[async_trait]
impl TaskPublisher for MqQueue {
    async fn publish_task(&self, queue: &str, task: &Task) -> Result<(), MqError> {
        self.publish(queue, None, task, None).await?;
        Ok(())
    }
}

#[async_trait]
impl ResultPublisher for MqQueue {
    async fn publish_result(&self, queue: &str, result: &JudgeResult) -> Result<(), MqError> {
        self.publish(queue, None, result, None).await?;
        Ok(())
    }
}
