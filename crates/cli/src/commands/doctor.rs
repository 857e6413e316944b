use hrdesk_core::calendar::HolidayCalendar;
use hrdesk_core::config::{AppConfig, LoadOptions};
use hrdesk_db::connect_from_config;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

const DEPENDENT_CHECKS: [&str; 4] =
    ["holiday_calendar", "approver_directory", "notification_transport", "database_connectivity"];

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_holiday_calendar(&config));
            checks.push(check_directory(&config));
            checks.push(check_notifications(&config));
            checks.push(check_database_connectivity(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.extend(DEPENDENT_CHECKS.into_iter().map(|name| DoctorCheck {
                name,
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            }));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_holiday_calendar(config: &AppConfig) -> DoctorCheck {
    let calendar = match HolidayCalendar::load(config.calendar.holidays_path.as_deref()) {
        Ok(calendar) => calendar,
        Err(error) => {
            return DoctorCheck {
                name: "holiday_calendar",
                status: CheckStatus::Fail,
                details: error.to_string(),
            };
        }
    };

    let regions = calendar.available_regions().len();
    match &config.calendar.default_region {
        Some(region) if !calendar.knows_region(region) => DoctorCheck {
            name: "holiday_calendar",
            status: CheckStatus::Fail,
            details: format!("default region `{region}` has no holiday table"),
        },
        _ => DoctorCheck {
            name: "holiday_calendar",
            status: CheckStatus::Pass,
            details: format!("{regions} regions available"),
        },
    }
}

fn check_directory(config: &AppConfig) -> DoctorCheck {
    let admins = config.directory.admin_users.len();
    let unmanaged = config
        .directory
        .employees
        .iter()
        .filter(|employee| employee.manager_email.is_none())
        .count();

    if admins == 0 {
        return DoctorCheck {
            name: "approver_directory",
            status: CheckStatus::Fail,
            details: "no admin users configured; final approvals are impossible".to_string(),
        };
    }
    DoctorCheck {
        name: "approver_directory",
        status: CheckStatus::Pass,
        details: format!(
            "{admins} admins, {} employees ({unmanaged} without a manager)",
            config.directory.employees.len()
        ),
    }
}

fn check_notifications(config: &AppConfig) -> DoctorCheck {
    let notifications = &config.notifications;
    let details = match (notifications.enabled, &notifications.webhook_url) {
        (true, Some(url)) => format!("webhook delivery to `{url}`"),
        (true, None) => "enabled without a webhook url; notifications are dropped".to_string(),
        (false, _) => "disabled; notifications are dropped".to_string(),
    };
    DoctorCheck { name: "notification_transport", status: CheckStatus::Pass, details }
}

fn check_database_connectivity(config: &AppConfig) -> DoctorCheck {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "database_connectivity",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_from_config(&config.database)
            .await
            .map_err(|error| format!("failed to connect to database: {error}"))?;

        pool.close().await;
        Ok::<(), String>(())
    });

    match result {
        Ok(()) => DoctorCheck {
            name: "database_connectivity",
            status: CheckStatus::Pass,
            details: format!("connected using `{}`", config.database.url),
        },
        Err(error) => {
            DoctorCheck { name: "database_connectivity", status: CheckStatus::Fail, details: error }
        }
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
