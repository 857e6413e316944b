mod bootstrap;
mod health;
mod reminders;
mod webhook;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use hrdesk_core::config::{AppConfig, LoadOptions};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

fn init_logging(config: &AppConfig) {
    use hrdesk_core::config::LogFormat::*;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Logging needs the loaded config, so it comes up before bootstrap.
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    let (shutdown, shutdown_rx) = watch::channel(false);

    let transport = if app.config.notifications.enabled && app.config.notifications.webhook_url.is_some() {
        "webhook"
    } else {
        "noop"
    };
    let health = health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        app.db_pool.clone(),
        transport,
        shutdown_rx.clone(),
    )
    .await?;
    let sweeper = reminders::spawn(
        Arc::clone(&app.service),
        Duration::from_secs(app.config.server.reminder_interval_secs.max(1)),
        shutdown_rx,
    );

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        notifications = transport,
        "hrdesk-server started"
    );
    tokio::signal::ctrl_c().await?;
    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "hrdesk-server stopping"
    );

    let _ = shutdown.send(true);
    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    let drained = tokio::time::timeout(grace, async {
        let _ = sweeper.await;
        let _ = health.await;
        app.service.drain_notifications().await;
    })
    .await;
    if drained.is_err() {
        tracing::warn!(
            event_name = "system.server.shutdown_timeout",
            correlation_id = "shutdown",
            grace_secs = grace.as_secs(),
            "pending notifications abandoned after the shutdown grace period"
        );
    }

    app.db_pool.close().await;
    Ok(())
}
