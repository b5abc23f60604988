use std::sync::Arc;

use anyhow::Context;
use mq::{MqConfig, TaskPublisher, init_mq};
use server::battle::BattleService;
use server::config::AppConfig;
use server::consumers::{LocalJudge, consume_judge_results};
use server::database::init_db;
use server::relay::Relay;
use server::seed::{ensure_indexes, seed_sample_problems};
use server::state::AppState;
use server::store::{PostgresStore, Store};
use tracing::{Level, info};
use worker::SandboxExecutor;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = Arc::new(AppConfig::load().context("Failed to load config")?);

    let db = init_db(&config.database)
        .await
        .context("Failed to connect to database")?;
    ensure_indexes(&db).await?;
    seed_sample_problems(&db)
        .await
        .context("Failed to seed sample problems")?;
    info!("Database ready");

    let store: Arc<dyn Store> = Arc::new(PostgresStore::new(db));
    let relay = Arc::new(Relay::new(config.relay.channel_capacity));
    let executor = Arc::new(SandboxExecutor::from_config(&config.sandbox));
    info!(
        primary = ?config.sandbox.primary,
        fallback_enabled = config.sandbox.fallback_enabled,
        "Sandbox executor ready"
    );

    let mq: Option<Arc<dyn TaskPublisher>> = if config.mq.enabled {
        let queue = Arc::new(
            init_mq(MqConfig::from(&config.mq))
                .await
                .context("Failed to initialize MQ")?,
        );
        tokio::spawn(consume_judge_results(
            Arc::clone(&store),
            Arc::clone(&relay),
            Arc::clone(&queue),
            config.mq.result_queue_name.clone(),
        ));
        info!(
            queue_name = %config.mq.queue_name,
            result_queue_name = %config.mq.result_queue_name,
            "MQ connected"
        );
        Some(queue)
    } else {
        info!("MQ disabled, judging in-process");
        None
    };

    let battles = BattleService::new(
        Arc::clone(&store),
        Arc::clone(&relay),
        Arc::clone(&executor),
        config.battle.clone(),
    );
    battles.spawn_matchmaking_loop();

    let state = AppState {
        local_judge: Arc::new(LocalJudge::new(
            Arc::clone(&store),
            Arc::clone(&relay),
            executor,
            config.local_judge.concurrency,
        )),
        store,
        relay,
        battles,
        mq,
        config: Arc::clone(&config),
    };

    let app = server::build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server running at http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
