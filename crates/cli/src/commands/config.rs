use std::env;
use std::fs;
use std::path::Path;

use hrdesk_core::config::{resolve_config_path, AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value, env_key) in effective_values(&config) {
        let source =
            field_source(key, env_key, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(key, &value, source));
    }

    lines.join("\n")
}

fn effective_values(config: &AppConfig) -> Vec<(&'static str, String, Option<&'static str>)> {
    let unset = || "<unset>".to_string();
    let webhook_token = config
        .notifications
        .webhook_token
        .as_ref()
        .map(|token| redact_token(token.expose_secret()))
        .unwrap_or_else(unset);

    vec![
        ("database.url", config.database.url.clone(), Some("HRDESK_DATABASE_URL")),
        (
            "database.max_connections",
            config.database.max_connections.to_string(),
            Some("HRDESK_DATABASE_MAX_CONNECTIONS"),
        ),
        (
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            Some("HRDESK_DATABASE_TIMEOUT_SECS"),
        ),
        (
            "directory.admin_users",
            config.directory.admin_users.join(","),
            Some("HRDESK_ADMIN_USERS"),
        ),
        ("directory.employees", config.directory.employees.len().to_string(), None),
        (
            "calendar.default_region",
            config.calendar.default_region.clone().unwrap_or_else(unset),
            Some("HRDESK_CALENDAR_DEFAULT_REGION"),
        ),
        (
            "calendar.holidays_path",
            config
                .calendar
                .holidays_path
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_else(unset),
            Some("HRDESK_CALENDAR_HOLIDAYS_PATH"),
        ),
        (
            "notifications.enabled",
            config.notifications.enabled.to_string(),
            Some("HRDESK_NOTIFICATIONS_ENABLED"),
        ),
        (
            "notifications.webhook_url",
            config.notifications.webhook_url.clone().unwrap_or_else(unset),
            Some("HRDESK_NOTIFICATIONS_WEBHOOK_URL"),
        ),
        ("notifications.webhook_token", webhook_token, Some("HRDESK_NOTIFICATIONS_WEBHOOK_TOKEN")),
        (
            "notifications.max_attempts",
            config.notifications.max_attempts.to_string(),
            Some("HRDESK_NOTIFICATIONS_MAX_ATTEMPTS"),
        ),
        (
            "notifications.task_due_days",
            config.notifications.task_due_days.to_string(),
            Some("HRDESK_NOTIFICATIONS_TASK_DUE_DAYS"),
        ),
        (
            "audit.write_attempts",
            config.audit.write_attempts.to_string(),
            Some("HRDESK_AUDIT_WRITE_ATTEMPTS"),
        ),
        (
            "server.bind_address",
            config.server.bind_address.clone(),
            Some("HRDESK_SERVER_BIND_ADDRESS"),
        ),
        (
            "server.health_check_port",
            config.server.health_check_port.to_string(),
            Some("HRDESK_SERVER_HEALTH_CHECK_PORT"),
        ),
        (
            "server.reminder_interval_secs",
            config.server.reminder_interval_secs.to_string(),
            Some("HRDESK_SERVER_REMINDER_INTERVAL_SECS"),
        ),
        ("logging.level", config.logging.level.clone(), Some("HRDESK_LOGGING_LEVEL")),
        (
            "logging.format",
            format!("{:?}", config.logging.format),
            Some("HRDESK_LOGGING_FORMAT"),
        ),
    ]
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_token(token: &str) -> String {
    if token.trim().is_empty() {
        return "<empty>".to_string();
    }
    "<redacted>".to_string()
}

#[cfg(test)]
mod tests {
    use super::{contains_path, redact_token};

    #[test]
    fn tokens_are_never_echoed() {
        assert_eq!(redact_token("  "), "<empty>");
        assert_eq!(redact_token("whsec_0123456789abcd"), "<redacted>");
    }

    #[test]
    fn nested_keys_resolve_through_tables() {
        let doc: toml::Value =
            "[notifications]\nwebhook_url = \"https://hooks.corp.test\"\n".parse().expect("toml");
        assert!(contains_path(&doc, "notifications.webhook_url"));
        assert!(!contains_path(&doc, "notifications.webhook_token"));
    }
}
