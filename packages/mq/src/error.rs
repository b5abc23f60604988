use thiserror::Error;

#[derive(Debug, Error)]
pub enum MqError {
    #[error("Broker error: {0}")]
    Broker(String),

    #[error("Failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<broccoli_queue::error::BroccoliError> for MqError {
    fn from(e: broccoli_queue::error::BroccoliError) -> Self {
        MqError::Broker(e.to_string())
    }
}
