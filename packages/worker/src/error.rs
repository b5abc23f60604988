use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("MQ error: {0}")]
    Mq(#[from] mq::MqError),

    #[error("Task error: {0}")]
    Task(#[from] common::worker::TaskDecodeError),
}

pub type Result<T> = std::result::Result<T, WorkerError>;
