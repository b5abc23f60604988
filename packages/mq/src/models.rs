pub use broccoli_queue::{
    brokers::broker::BrokerMessage,
    error::BroccoliError,
    queue::BroccoliQueue,
};
use tracing::info;

use crate::error::MqError;

pub type MqQueue = BroccoliQueue;

pub struct MqConfig {
    pub url: String,
    pub pool_size: u8,
}

impl From<&common::config::MqAppConfig> for MqConfig {
    fn from(cfg: &common::config::MqAppConfig) -> Self {
        Self {
            url: cfg.url.clone(),
            pool_size: cfg.pool_size,
        }
    }
}

pub async fn init_mq(config: MqConfig) -> Result<MqQueue, MqError> {
    let queue = BroccoliQueue::builder(&config.url)
        .pool_connections(config.pool_size)
        .build()
        .await
        .map_err(MqError::from)?;
    info!(pool_size = config.pool_size, "MQ connection pool ready");
    Ok(queue)
}
