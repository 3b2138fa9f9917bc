use anyhow::{Context, Result};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use vivid_decks::{
    api::{AppState, create_router},
    config::{Config, LoggingConfig},
    log_system_event,
    DeckStore, FileStorage, NotificationLog, UuidIdSource, Workspace,
};

const NOTIFICATION_CAPACITY: usize = 32;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    // Initialize logging with optional file output
    let _guard = setup_logging(&config.logging)?;

    config.validate()?;

    log_system_event!(startup, component = "server", "Starting vivid decks server");

    let storage = FileStorage::open(&config.storage.directory).with_context(|| {
        format!("cannot open storage directory '{}'", config.storage.directory)
    })?;
    let store = DeckStore::load(
        Box::new(storage),
        Arc::new(UuidIdSource),
        config.storage.seed_policy(),
    )
    .context("cannot load the stored deck collection")?;
    info!(deck_count = store.decks().len(), "Deck store loaded");

    let notifications = Arc::new(NotificationLog::new(NOTIFICATION_CAPACITY));
    let workspace = Workspace::new(store, notifications.clone(), &config.share.base_url);
    let state = AppState::new(workspace, notifications);

    // Build the application router
    let app = create_router(state)
        // CORS middleware
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
        );

    // Start the server
    let addr = config.server.address();
    info!("Server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log_system_event!(shutdown, component = "server", "Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Cannot listen for shutdown signal");
    }
}

fn setup_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    use std::fs;
    use tracing_subscriber::fmt;

    let env_filter = EnvFilter::try_new(&config.level)
        .unwrap_or_else(|_| EnvFilter::new("info,vivid_decks=debug"));

    // Configure console output
    let console_layer = config.console_enabled.then(|| {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(true)
    });

    // Set up file appender with daily rotation (no ANSI colors for files)
    let mut guard = None;
    let file_layer = if config.file_enabled {
        fs::create_dir_all(&config.log_directory).unwrap_or_else(|e| {
            eprintln!("Warning: Could not create logs directory: {}", e);
        });
        let file_appender = tracing_appender::rolling::daily(&config.log_directory, "vivid-decks.log");
        let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);
        guard = Some(file_guard);
        Some(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false)
                .with_writer(non_blocking_file),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("cannot initialize logging")?;

    info!(
        log_directory = %config.log_directory,
        file_enabled = config.file_enabled,
        "Logging initialized"
    );

    Ok(guard)
}
