use std::sync::Arc;

use anyhow::Context;
use common::worker::Task;
use mq::{BroccoliError, BrokerMessage, MqConfig, init_mq};
use tracing::{error, info};
use worker::consumer::process_task;
use worker::{SandboxExecutor, WorkerAppConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let config = WorkerAppConfig::load().context("Failed to load config")?;
    info!("Worker starting: {}", config.worker.id);

    tokio::fs::create_dir_all(&config.sandbox.scratch_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create scratch dir {}",
                config.sandbox.scratch_dir.display()
            )
        })?;

    let executor = Arc::new(SandboxExecutor::from_config(&config.sandbox));
    info!(
        primary = ?config.sandbox.primary,
        fallback_enabled = config.sandbox.fallback_enabled,
        "Sandbox executor ready"
    );

    let mq = Arc::new(
        init_mq(MqConfig::from(&config.mq))
            .await
            .context("Failed to initialize MQ")?,
    );

    info!(
        queue_name = %config.mq.queue_name,
        result_queue_name = %config.mq.result_queue_name,
        concurrency = config.worker.concurrency,
        "MQ connected"
    );

    let result_queue = config.mq.result_queue_name.clone();
    let mq_for_handler = Arc::clone(&mq);

    let result = mq
        .process_messages(
            &config.mq.queue_name,
            Some(config.worker.concurrency),
            None,
            move |message: BrokerMessage<Task>| {
                let mq = Arc::clone(&mq_for_handler);
                let executor = Arc::clone(&executor);
                let result_queue = result_queue.clone();
                async move {
                    let job_id = message.payload.id.clone();
                    // Failures are logged and acknowledged; jobs are never redelivered.
                    if let Err(e) =
                        process_task(message.payload, &executor, mq.as_ref(), &result_queue).await
                    {
                        error!(job_id = %job_id, error = %e, "Failed to process judge job");
                    }
                    Ok::<(), BroccoliError>(())
                }
            },
        )
        .await;

    if let Err(e) = result {
        error!(error = %e, "Worker stopped unexpectedly");
    }

    Ok(())
}
