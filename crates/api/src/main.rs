use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use outreach_channels::{ChannelConfig, RateLimiter, SlackNotifier};
use outreach_core::conversation::ConversationFlowManager;
use outreach_events::{EventBus, EventPersistence, WebhookDelivery, WebhookDispatcher};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use outreach_api::background::conversation_timeouts;
use outreach_api::config::ServerConfig;
use outreach_api::notifications::ReplyNotifier;
use outreach_api::router::build_app_router;
use outreach_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "outreach_api=debug,tower_http=debug".into());
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // --- Configuration ---
    let config = ServerConfig::from_env();
    let channel_config = ChannelConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = outreach_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    outreach_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    outreach_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database ready");

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());

    let persistence_handle =
        tokio::spawn(EventPersistence::run(pool.clone(), event_bus.subscribe()));

    let delivery = WebhookDelivery::new().expect("Failed to build webhook HTTP client");
    let webhooks = WebhookDispatcher::new(pool.clone(), delivery);
    let webhook_handle = tokio::spawn(webhooks.run(event_bus.subscribe()));

    // Reply alerts go to Slack only when a webhook URL is configured.
    let notifier_handle = match &channel_config.slack_webhook_url {
        Some(url) => {
            let slack = SlackNotifier::new(url.clone(), Arc::new(RateLimiter::default()))
                .expect("Failed to build Slack client");
            let notifier = ReplyNotifier::new(pool.clone(), slack);
            Some(tokio::spawn(notifier.run(event_bus.subscribe())))
        }
        None => {
            tracing::info!("SLACK_WEBHOOK_URL not set, reply alerts disabled");
            None
        }
    };

    // --- Conversations ---
    let conversations = Arc::new(Mutex::new(ConversationFlowManager::default()));
    let timeout_cancel = CancellationToken::new();
    let timeout_handle = tokio::spawn(conversation_timeouts::run(
        Arc::clone(&conversations),
        conversation_timeouts::CHECK_INTERVAL,
        conversation_timeouts::CLOSED_RETENTION,
        timeout_cancel.clone(),
    ));

    tracing::info!("Background services started");

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        event_bus: Arc::clone(&event_bus),
        conversations,
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // Closes every open conversation before the process exits.
    timeout_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), timeout_handle).await;

    drop(event_bus);
    let drain = Duration::from_secs(config.shutdown_timeout_secs);
    let _ = tokio::time::timeout(drain, persistence_handle).await;
    let _ = tokio::time::timeout(drain, webhook_handle).await;
    if let Some(handle) = notifier_handle {
        let _ = tokio::time::timeout(drain, handle).await;
    }
    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
