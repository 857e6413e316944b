use std::sync::Arc;
use std::time::Duration;

use hrdesk_core::calendar::{CalendarError, HolidayCalendar};
use hrdesk_core::config::{AppConfig, ConfigError};
use hrdesk_core::directory::StaticDirectory;
use hrdesk_core::notify::{NoopDispatcher, NotificationDispatcher};
use hrdesk_db::{connect_from_config, migrations, DbPool};
use hrdesk_engine::{RequestService, ServiceSettings, Stores};
use thiserror::Error;
use tracing::{info, warn};

use crate::webhook::WebhookDispatcher;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub service: Arc<RequestService>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error(transparent)]
    Calendar(#[from] CalendarError),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let calendar = HolidayCalendar::load(config.calendar.holidays_path.as_deref())?;
    if let Some(region) = &config.calendar.default_region {
        if !calendar.knows_region(region) {
            warn!(
                event_name = "system.bootstrap.unknown_region",
                correlation_id = "bootstrap",
                region = %region,
                "default holiday region has no holiday table; only weekends will be skipped"
            );
        }
    }

    let db_pool =
        connect_from_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let directory = StaticDirectory::from_config(&config.directory);
    info!(
        event_name = "system.bootstrap.directory_loaded",
        correlation_id = "bootstrap",
        employees = directory.employee_count(),
        admins = config.directory.admin_users.len(),
        "employee directory loaded"
    );

    let service = RequestService::new(
        Stores::sqlite(db_pool.clone()),
        Arc::new(directory),
        Arc::new(calendar),
        dispatcher_for(&config),
        ServiceSettings::from_config(&config),
    );

    Ok(Application { config, db_pool, service: Arc::new(service) })
}

fn dispatcher_for(config: &AppConfig) -> Arc<dyn NotificationDispatcher> {
    let notifications = &config.notifications;
    match (&notifications.webhook_url, notifications.enabled) {
        (Some(url), true) => {
            info!(
                event_name = "system.bootstrap.notifications",
                correlation_id = "bootstrap",
                transport = "webhook",
                "notifications delivered by webhook"
            );
            Arc::new(WebhookDispatcher::new(
                url.clone(),
                notifications.webhook_token.clone(),
                Duration::from_millis(notifications.attempt_timeout_ms),
            ))
        }
        _ => {
            info!(
                event_name = "system.bootstrap.notifications",
                correlation_id = "bootstrap",
                transport = "noop",
                "notifications disabled"
            );
            Arc::new(NoopDispatcher)
        }
    }
}
