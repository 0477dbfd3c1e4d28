use std::str::FromStr;

use anyhow::{Context, Result};
use cron::Schedule;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mastofeed::config::Config;
use mastofeed::db::Database;
use mastofeed::mastodon::MastodonClient;
use mastofeed::timeline::TimelinePoller;
use mastofeed::web;

#[tokio::main]
async fn main() {
    // Load .env file if present; LOG_FORMAT and RUST_LOG may come from it.
    let _ = dotenvy::dotenv();

    // No subscriber is installed yet, so this failure must go to stderr.
    if let Err(e) = init_tracing() {
        eprintln!("Fatal error: {e:#}");
        std::process::exit(1);
    }

    if let Err(e) = run().await {
        error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    info!("Starting mastofeed");

    // Load and validate configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    let schedule =
        Schedule::from_str(&config.cron_schedule).context("Invalid CRON_SCHEDULE expression")?;

    info!(
        base_url = %config.mastodon_base_url,
        schedule = %config.cron_schedule,
        "Configuration loaded"
    );

    // Ensure the database directory exists
    if let Some(parent) = config.database_path.parent() {
        tokio::fs::create_dir_all(parent).await.with_context(|| {
            format!("Failed to create database directory: {}", parent.display())
        })?;
    }

    // Initialize database
    let db = Database::new(&config.database_path)
        .await
        .context("Failed to initialize database")?;

    info!("Database initialized");

    let client = MastodonClient::new(&config).context("Failed to build Mastodon client")?;

    let shutdown = CancellationToken::new();

    // Start web server in background
    let web_config = config.clone();
    let web_db = db.clone();
    let web_shutdown = shutdown.clone();
    let web_handle = tokio::spawn(async move {
        if let Err(e) = web::serve(web_config, web_db, web_shutdown).await {
            error!("Web server error: {e:#}");
        }
    });

    // Start timeline polling loop
    let poller = TimelinePoller::new(client, db.clone());
    let poll_shutdown = shutdown.clone();
    let poll_handle = tokio::spawn(async move {
        poller.run(&schedule, poll_shutdown).await;
    });
    info!("Timeline poller started");

    // Wait for shutdown signal
    shutdown_signal().await;

    info!("Shutting down...");

    // Cancel future ticks and let the web server and any in-flight sync
    // cycle drain before closing the pool.
    shutdown.cancel();
    let _ = poll_handle.await;
    let _ = web_handle.await;

    db.pool().close().await;

    info!("Shutdown complete");

    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,mastofeed=debug"));

    // Check if JSON logging is requested
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| matches!(v.to_lowercase().as_str(), "json" | "structured"))
        .unwrap_or(false);

    if use_json {
        // Structured JSON logging for production
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
        // Pretty-printed logging for development
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
