use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use forum_mirror::backup::BackupManager;
use forum_mirror::config::Config;
use forum_mirror::crawler::Crawler;
use forum_mirror::db::Database;
use forum_mirror::forum::HttpForumClient;
use forum_mirror::web;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    init_tracing()?;

    info!("Starting forum-mirror");

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    info!(forum = %config.forum_base_url, "Configuration loaded");

    // Ensure data directories exist
    if let Some(parent) = config.database_path.parent() {
        tokio::fs::create_dir_all(parent).await.with_context(|| {
            format!("Failed to create database directory: {}", parent.display())
        })?;
    }

    let db = Database::new(&config.database_path)
        .await
        .context("Failed to initialize database")?;

    info!("Database initialized");

    // Start backup scheduler if enabled
    let backup_handle = if config.backup_enabled {
        let backup_manager = BackupManager::new(&config);
        info!(
            backup_dir = ?config.backup_dir,
            retention = config.backup_retention_count,
            "Backup scheduler enabled"
        );
        Some(tokio::spawn(async move {
            // Daily check; backups themselves are weekly.
            backup_manager.run_loop(Duration::from_secs(86_400)).await;
        }))
    } else {
        info!("Backup scheduler disabled");
        None
    };

    // Start web server in background
    let web_config = config.clone();
    let web_db = db.clone();
    let web_handle = tokio::spawn(async move {
        if let Err(e) = web::serve(web_config, web_db).await {
            error!("Web server error: {e:#}");
        }
    });

    // Run the crawler in the foreground; a fatal crawl error takes the
    // process down (restarting is an operational concern, not ours).
    if config.scraper_enabled {
        let client = HttpForumClient::new(&config.forum_base_url)
            .context("Failed to build forum client")?;
        let crawler = Crawler::new(client, db);

        tokio::select! {
            result = crawler.run() => {
                result.context("Crawler terminated")?;
            }
            () = shutdown_signal() => {}
        }
    } else {
        info!("Scraper disabled, serving API only");
        shutdown_signal().await;
    }

    info!("Shutting down...");

    web_handle.abort();
    if let Some(handle) = backup_handle {
        handle.abort();
    }

    info!("Shutdown complete");

    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,forum_mirror=debug"));

    // Check if JSON logging is requested
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| matches!(v.to_lowercase().as_str(), "json" | "structured"))
        .unwrap_or(false);

    if use_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
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
