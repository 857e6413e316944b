pub mod commands;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use hrdesk_core::domain::asset::{AssetId, AssetStatus, AssetUpdate, NewAsset};
use hrdesk_core::domain::payload::AssetCategory;
use rust_decimal::Decimal;
use std::process::ExitCode;

use crate::commands::audit::AuditFilter;
use crate::commands::inventory::InventoryAction;

#[derive(Debug, Parser)]
#[command(
    name = "hrdesk",
    about = "HR Desk operator CLI",
    long_about = "Operate HR Desk storage, inspect configuration, query the working-day calendar, the audit trail and the asset inventory.",
    after_help = "Examples:\n  hrdesk doctor --json\n  hrdesk working-days --region mexico --from 2026-03-09 --to 2026-03-20\n  hrdesk audit --resource-type timeoff_request --action reject\n  hrdesk inventory update --asset 5f0c --as hr@corp.test --status returned"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, holiday data, approver directory and DB connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Count working days in an inclusive date range for a holiday region")]
    WorkingDays {
        #[arg(long)]
        region: String,
        #[arg(long, help = "First day, YYYY-MM-DD")]
        from: NaiveDate,
        #[arg(long, help = "Last day, YYYY-MM-DD")]
        to: NaiveDate,
    },
    #[command(about = "List the holidays of a region for one year")]
    Holidays {
        #[arg(long)]
        region: String,
        #[arg(long)]
        year: i32,
    },
    #[command(about = "List regions with holiday data")]
    Regions,
    #[command(about = "Query the audit trail")]
    Audit(AuditArgs),
    #[command(about = "Inspect and maintain the employee asset inventory")]
    Inventory {
        #[command(subcommand)]
        command: InventoryCommand,
    },
}

#[derive(Debug, Subcommand)]
enum InventoryCommand {
    #[command(about = "List the assets an employee holds")]
    List {
        #[arg(long)]
        employee: String,
    },
    #[command(about = "Show one asset")]
    Show {
        #[arg(long)]
        asset: String,
        #[arg(long = "as", help = "Email of the person asking")]
        actor: String,
    },
    #[command(about = "Show the audit trail of one asset")]
    Trail {
        #[arg(long)]
        asset: String,
        #[arg(long = "as", help = "Email of the person asking")]
        actor: String,
    },
    #[command(about = "Register an asset handed out outside the request workflow")]
    Add {
        #[arg(long = "as", help = "Email of the employee's manager or an admin")]
        actor: String,
        #[arg(long)]
        employee: String,
        #[arg(long, value_parser = parse_category)]
        category: AssetCategory,
        #[arg(long)]
        description: String,
        #[arg(long)]
        serial: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        cost: Option<Decimal>,
        #[arg(long)]
        notes: Option<String>,
    },
    #[command(about = "Change status, holder or details of an asset")]
    Update {
        #[arg(long)]
        asset: String,
        #[arg(long = "as", help = "Email of the holder's manager or an admin")]
        actor: String,
        #[arg(long, value_parser = parse_status, help = "One of active, returned, damaged")]
        status: Option<AssetStatus>,
        #[arg(long, help = "Reassign to this employee")]
        holder: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, help = "Empty string clears it")]
        serial: Option<String>,
        #[arg(long, help = "Empty string clears it")]
        notes: Option<String>,
    },
}

fn parse_category(raw: &str) -> Result<AssetCategory, String> {
    AssetCategory::parse(&raw.trim().to_ascii_lowercase())
        .ok_or_else(|| format!("unknown asset category `{raw}`"))
}

fn parse_status(raw: &str) -> Result<AssetStatus, String> {
    AssetStatus::parse(&raw.trim().to_ascii_lowercase())
        .ok_or_else(|| format!("unknown asset status `{raw}`"))
}

impl From<InventoryCommand> for InventoryAction {
    fn from(command: InventoryCommand) -> Self {
        match command {
            InventoryCommand::List { employee } => Self::List { employee },
            InventoryCommand::Show { asset, actor } => Self::Show { asset: AssetId(asset), actor },
            InventoryCommand::Trail { asset, actor } => Self::Trail { asset: AssetId(asset), actor },
            InventoryCommand::Add {
                actor,
                employee,
                category,
                description,
                serial,
                url,
                cost,
                notes,
            } => Self::Add {
                actor,
                asset: NewAsset {
                    employee_email: employee,
                    category,
                    description,
                    serial_number: serial,
                    purchase_url: url,
                    purchase_cost: cost,
                    notes,
                },
            },
            InventoryCommand::Update { asset, actor, status, holder, description, serial, notes } => {
                Self::Update {
                    asset: AssetId(asset),
                    actor,
                    update: AssetUpdate {
                        status,
                        employee_email: holder,
                        description,
                        serial_number: serial,
                        notes,
                    },
                }
            }
        }
    }
}

#[derive(Debug, Args)]
struct AuditArgs {
    #[arg(long)]
    resource_type: Option<String>,
    #[arg(long)]
    resource_id: Option<String>,
    #[arg(long)]
    actor: Option<String>,
    #[arg(long, help = "One of create, update, delete, approve_manager, approve_admin, reject, ...")]
    action: Option<String>,
    #[arg(long, help = "Inclusive lower bound, RFC 3339")]
    since: Option<String>,
    #[arg(long, help = "Inclusive upper bound, RFC 3339")]
    until: Option<String>,
    #[arg(long)]
    limit: Option<usize>,
    #[arg(long, help = "Count matching entries by action and actor instead of listing them")]
    summary: bool,
}

impl From<AuditArgs> for AuditFilter {
    fn from(args: AuditArgs) -> Self {
        Self {
            resource_type: args.resource_type,
            resource_id: args.resource_id,
            actor: args.actor,
            action: args.action,
            since: args.since,
            until: args.until,
            limit: args.limit,
            summary: args.summary,
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::WorkingDays { region, from, to } => {
            commands::calendar::working_days(&region, from, to)
        }
        Command::Holidays { region, year } => commands::calendar::holidays(&region, year),
        Command::Regions => commands::calendar::regions(),
        Command::Audit(args) => commands::audit::run(&AuditFilter::from(args)),
        Command::Inventory { command } => commands::inventory::run(InventoryAction::from(command)),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
