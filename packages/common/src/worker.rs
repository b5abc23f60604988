use serde::{Deserialize, Serialize};

use crate::mq::Message;

/// Envelope published on the job queue. `task_type` selects the worker
/// handler; `payload` is the typed message body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub task_type: String,
    pub payload: serde_json::Value,
}

impl Task {
    /// Wrap a typed message, reusing its id as the task id.
    pub fn from_message<M: Message>(message: &M) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: message.message_id().to_string(),
            task_type: M::message_type().to_string(),
            payload: serde_json::to_value(message)?,
        })
    }

    /// Decode the payload, checking that the task type matches.
    pub fn into_message<M: Message>(self) -> Result<M, TaskDecodeError> {
        if self.task_type != M::message_type() {
            return Err(TaskDecodeError::TypeMismatch {
                expected: M::message_type(),
                actual: self.task_type,
            });
        }
        serde_json::from_value(self.payload).map_err(TaskDecodeError::Payload)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TaskDecodeError {
    #[error("Task type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: String,
    },

    #[error("Invalid task payload: {0}")]
    Payload(#[source] serde_json::Error),
}
