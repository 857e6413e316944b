use chrono::{DateTime, Utc};
use hrdesk_core::audit::{AuditAction, AuditEntry, AuditQuery, AuditSummary, DEFAULT_FIND_LIMIT};
use hrdesk_db::{connect_from_config, AuditRepository, SqlAuditRepository};
use serde::Serialize;

use crate::commands::{
    load_config, runtime, CommandResult, EXIT_CONFIG, EXIT_DB_CONNECTIVITY, EXIT_QUERY,
};

/// Raw filter flags as typed on the command line.
#[derive(Clone, Debug, Default)]
pub struct AuditFilter {
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub actor: Option<String>,
    pub action: Option<String>,
    pub since: Option<String>,
    pub until: Option<String>,
    pub limit: Option<usize>,
    pub summary: bool,
}

#[derive(Debug, Serialize)]
struct AuditListing {
    entries: Vec<AuditLine>,
}

#[derive(Debug, Serialize)]
struct AuditLine {
    message: String,
    #[serde(flatten)]
    entry: AuditEntry,
}

impl AuditFilter {
    pub fn to_query(&self) -> Result<AuditQuery, String> {
        let mut query = AuditQuery::default().limit(self.limit.unwrap_or(DEFAULT_FIND_LIMIT));
        if let Some(resource_type) = &self.resource_type {
            query = query.resource_type(resource_type.clone());
        }
        if let Some(resource_id) = &self.resource_id {
            query.resource_id = Some(resource_id.clone());
        }
        if let Some(actor) = &self.actor {
            query = query.actor(actor.trim().to_ascii_lowercase());
        }
        if let Some(action) = &self.action {
            let parsed = AuditAction::parse(action.trim())
                .ok_or_else(|| format!("unknown audit action `{action}`"))?;
            query = query.action(parsed);
        }
        let since = self.since.as_deref().map(|raw| parse_instant("since", raw)).transpose()?;
        let until = self.until.as_deref().map(|raw| parse_instant("until", raw)).transpose()?;
        Ok(query.between(since, until))
    }
}

fn parse_instant(flag: &str, raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|instant| instant.with_timezone(&Utc))
        .map_err(|error| format!("`--{flag}` must be an RFC 3339 timestamp: {error}"))
}

pub fn run(filter: &AuditFilter) -> CommandResult {
    let query = match filter.to_query() {
        Ok(query) => query,
        Err(message) => {
            return CommandResult::failure("audit", "invalid_input", message, EXIT_CONFIG);
        }
    };
    let config = match load_config("audit") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match runtime("audit") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect_from_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), EXIT_DB_CONNECTIVITY))?;
        let repository = SqlAuditRepository::new(pool.clone());
        let outcome = if filter.summary {
            repository.summarize(&query).await.map(Outcome::Summary)
        } else {
            repository.find(&query).await.map(Outcome::Entries)
        };
        pool.close().await;
        outcome.map_err(|error| ("audit_query", error.to_string(), EXIT_QUERY))
    });

    match result {
        Ok(Outcome::Entries(entries)) => {
            let message = format!("{} audit entries", entries.len());
            let entries = entries
                .into_iter()
                .map(|entry| AuditLine { message: entry.display_message(), entry })
                .collect();
            CommandResult::success_with_data("audit", message, AuditListing { entries })
        }
        Ok(Outcome::Summary(summary)) => {
            let message = format!("{} matching audit entries", summary.total);
            CommandResult::success_with_data("audit", message, summary)
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("audit", error_class, message, exit_code)
        }
    }
}

enum Outcome {
    Entries(Vec<AuditEntry>),
    Summary(AuditSummary),
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use hrdesk_core::audit::AuditAction;

    use super::AuditFilter;

    #[test]
    fn flags_translate_into_an_audit_query() {
        let filter = AuditFilter {
            resource_type: Some("timeoff_request".into()),
            actor: Some(" Boss@Corp.Test ".into()),
            action: Some("approve_manager".into()),
            since: Some("2026-03-01T00:00:00Z".into()),
            limit: Some(5),
            ..AuditFilter::default()
        };

        let query = filter.to_query().expect("query");

        assert_eq!(query.resource_type.as_deref(), Some("timeoff_request"));
        assert_eq!(query.actor_email.as_deref(), Some("boss@corp.test"));
        assert_eq!(query.action, Some(AuditAction::ApproveManager));
        assert_eq!(query.since, Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).single());
        assert_eq!(query.until, None);
        assert_eq!(query.limit, 5);
    }

    #[test]
    fn unknown_actions_and_bad_timestamps_are_rejected() {
        let bad_action = AuditFilter { action: Some("archive".into()), ..AuditFilter::default() };
        assert!(bad_action.to_query().expect_err("action").contains("archive"));

        let bad_time = AuditFilter { until: Some("yesterday".into()), ..AuditFilter::default() };
        assert!(bad_time.to_query().expect_err("timestamp").contains("--until"));
    }
}
