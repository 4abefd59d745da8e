use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use outreach_channels::{
    ChannelConfig, ChannelRegistry, HttpProfileSource, ProfileSource, RateLimiter,
};
use outreach_db::repositories::JobRepo;
use outreach_events::{EventBus, EventPersistence, WebhookDelivery, WebhookDispatcher};
use outreach_pipeline::DiscoveryPipeline;
use outreach_worker::config::WorkerConfig;
use outreach_worker::discovery::DiscoveryRunner;
use outreach_worker::jobs::{JobContext, JobDispatcher, HANDLED_JOB_TYPES};
use outreach_worker::scheduler::SmartScheduler;
use outreach_worker::task_manager::TaskManager;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Claimed jobs older than this are assumed abandoned by a dead worker.
const STALE_JOB_SECS: i64 = 15 * 60;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "outreach_worker=debug".into());
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // --- Configuration ---
    let config = WorkerConfig::from_env().context("DATABASE_URL must be set")?;
    let channel_config = ChannelConfig::from_env();
    tracing::info!(
        max_concurrent_tasks = config.max_concurrent_tasks,
        task_timeout_secs = config.task_timeout.as_secs(),
        "Loaded worker configuration",
    );

    // --- Database ---
    let pool = outreach_db::create_pool(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    outreach_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    outreach_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database ready");

    let released = JobRepo::release_stale(&pool, &HANDLED_JOB_TYPES, STALE_JOB_SECS).await?;
    if released > 0 {
        tracing::warn!(released, "Released stale jobs");
    }

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());
    let persistence_handle =
        tokio::spawn(EventPersistence::run(pool.clone(), event_bus.subscribe()));
    let webhooks = WebhookDispatcher::new(pool.clone(), WebhookDelivery::new()?);
    let webhook_handle = tokio::spawn(webhooks.run(event_bus.subscribe()));

    // --- Channels ---
    let limiter = Arc::new(RateLimiter::default());
    let channels = Arc::new(ChannelRegistry::from_config(&channel_config, Arc::clone(&limiter))?);

    let cancel = CancellationToken::new();

    // --- Job dispatcher ---
    let dispatcher = JobDispatcher::new(
        Arc::new(JobContext {
            pool: pool.clone(),
            channels,
            bus: Arc::clone(&event_bus),
            pipeline: DiscoveryPipeline::new(),
        }),
        config.poll_interval,
    )
    .with_retries(config.task_max_retries, config.task_retry_delay);
    let dispatcher_cancel = cancel.clone();
    let dispatcher_handle = tokio::spawn(async move { dispatcher.run(dispatcher_cancel).await });

    // --- Discovery ---
    let discovery_handle = match &channel_config.profile_source_url {
        Some(url) => {
            let source: Arc<dyn ProfileSource> =
                Arc::new(HttpProfileSource::new(url.clone(), Arc::clone(&limiter)));
            let runner = DiscoveryRunner::new(
                pool.clone(),
                SmartScheduler::new(config.max_concurrent_tasks, config.task_retry_delay),
                TaskManager::new(source, limiter).with_timeout(config.task_timeout),
            )
            .with_interval(config.scheduler_interval)
            .with_max_retries(config.task_max_retries)
            .with_result_retention(config.result_retention);
            let runner_cancel = cancel.clone();
            Some(tokio::spawn(async move { runner.run(runner_cancel).await }))
        }
        None => {
            tracing::warn!("PROFILE_SOURCE_URL not set, discovery tasks will not run");
            None
        }
    };

    shutdown_signal().await;

    // --- Shutdown ---
    cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(10), dispatcher_handle).await;
    if let Some(handle) = discovery_handle {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }

    drop(event_bus);
    let _ = tokio::time::timeout(Duration::from_secs(5), persistence_handle).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), webhook_handle).await;

    tracing::info!("Worker stopped");
    Ok(())
}

/// Wait for SIGINT or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
