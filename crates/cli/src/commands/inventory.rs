use std::sync::Arc;

use hrdesk_core::audit::AuditEntry;
use hrdesk_core::calendar::HolidayCalendar;
use hrdesk_core::directory::StaticDirectory;
use hrdesk_core::domain::asset::{AssetId, AssetUpdate, EmployeeAsset, NewAsset};
use hrdesk_core::errors::{ApplicationError, InterfaceError};
use hrdesk_core::notify::NoopDispatcher;
use hrdesk_db::connect_from_config;
use hrdesk_engine::{RequestService, ServiceSettings, Stores};
use serde::Serialize;
use uuid::Uuid;

use crate::commands::{
    load_config, runtime, CommandResult, EXIT_CONFIG, EXIT_DB_CONNECTIVITY, EXIT_QUERY,
    EXIT_RUNTIME,
};

const COMMAND: &str = "inventory";

#[derive(Clone, Debug)]
pub enum InventoryAction {
    List { employee: String },
    Show { asset: AssetId, actor: String },
    Trail { asset: AssetId, actor: String },
    Add { actor: String, asset: NewAsset },
    Update { asset: AssetId, actor: String, update: AssetUpdate },
}

#[derive(Debug, Serialize)]
struct AssetListing {
    assets: Vec<EmployeeAsset>,
}

#[derive(Debug, Serialize)]
struct TrailLine {
    message: String,
    #[serde(flatten)]
    entry: AuditEntry,
}

pub fn run(action: InventoryAction) -> CommandResult {
    let config = match load_config(COMMAND) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let calendar = match HolidayCalendar::load(config.calendar.holidays_path.as_deref()) {
        Ok(calendar) => calendar,
        Err(error) => {
            return CommandResult::failure(COMMAND, "holiday_calendar", error.to_string(), EXIT_CONFIG)
        }
    };
    let runtime = match runtime(COMMAND) {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    runtime.block_on(async {
        let pool = match connect_from_config(&config.database).await {
            Ok(pool) => pool,
            Err(error) => {
                return CommandResult::failure(
                    COMMAND,
                    "db_connectivity",
                    error.to_string(),
                    EXIT_DB_CONNECTIVITY,
                )
            }
        };
        let service = RequestService::new(
            Stores::sqlite(pool.clone()),
            Arc::new(StaticDirectory::from_config(&config.directory)),
            Arc::new(calendar),
            Arc::new(NoopDispatcher),
            ServiceSettings::from_config(&config),
        );

        let correlation_id = Uuid::new_v4().to_string();
        let outcome = execute(&service, action).await;
        pool.close().await;
        outcome.unwrap_or_else(|error| interface_failure(&error.into_interface(correlation_id)))
    })
}

async fn execute(
    service: &RequestService,
    action: InventoryAction,
) -> Result<CommandResult, ApplicationError> {
    let result = match action {
        InventoryAction::List { employee } => {
            let assets = service.employee_assets(&employee).await?;
            let message = format!("{} assets held by {}", assets.len(), employee.trim());
            CommandResult::success_with_data(COMMAND, message, AssetListing { assets })
        }
        InventoryAction::Show { asset, actor } => {
            let asset = service.get_asset(&asset, &actor).await?;
            let message = format!("asset {} ({})", asset.id, asset.status.as_str());
            CommandResult::success_with_data(COMMAND, message, asset)
        }
        InventoryAction::Trail { asset, actor } => {
            let entries = service.asset_trail(&asset, &actor).await?;
            let message = format!("{} audit entries for asset {asset}", entries.len());
            let lines: Vec<TrailLine> = entries
                .into_iter()
                .map(|entry| TrailLine { message: entry.display_message(), entry })
                .collect();
            CommandResult::success_with_data(COMMAND, message, lines)
        }
        InventoryAction::Add { actor, asset } => {
            let asset = service.create_asset(&actor, asset).await?;
            let message = format!("asset {} registered for {}", asset.id, asset.employee_email);
            CommandResult::success_with_data(COMMAND, message, asset)
        }
        InventoryAction::Update { asset, actor, update } => {
            let asset = service.update_asset(&asset, &actor, update).await?;
            let message = format!("asset {} at version {}", asset.id, asset.version);
            CommandResult::success_with_data(COMMAND, message, asset)
        }
    };
    Ok(result)
}

fn interface_failure(error: &InterfaceError) -> CommandResult {
    let exit_code = match error {
        InterfaceError::BadRequest { .. } => EXIT_CONFIG,
        InterfaceError::Forbidden { .. }
        | InterfaceError::NotFound { .. }
        | InterfaceError::Conflict { .. } => EXIT_QUERY,
        InterfaceError::ServiceUnavailable { .. } => EXIT_DB_CONNECTIVITY,
        InterfaceError::Internal { .. } => EXIT_RUNTIME,
    };
    CommandResult::failure(
        COMMAND,
        error.error_class(),
        format!("{} {error} (correlation id {})", error.user_message(), error.correlation_id()),
        exit_code,
    )
}
