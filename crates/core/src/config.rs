use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub directory: DirectoryConfig,
    pub calendar: CalendarConfig,
    pub notifications: NotificationsConfig,
    pub audit: AuditConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DirectoryConfig {
    pub admin_users: Vec<String>,
    pub employees: Vec<EmployeeEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeEntry {
    pub email: String,
    #[serde(default)]
    pub manager_email: Option<String>,
    #[serde(default)]
    pub holiday_region: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CalendarConfig {
    /// Region used for employees without one on record.
    pub default_region: Option<String>,
    pub holidays_path: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct NotificationsConfig {
    pub enabled: bool,
    pub webhook_url: Option<String>,
    pub webhook_token: Option<SecretString>,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub attempt_timeout_ms: u64,
    pub task_due_days: u32,
}

#[derive(Clone, Debug)]
pub struct AuditConfig {
    pub write_attempts: u32,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub health_check_port: u16,
    pub graceful_shutdown_secs: u64,
    pub reminder_interval_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub admin_users: Option<Vec<String>>,
    pub holidays_path: Option<PathBuf>,
    pub notifications_enabled: Option<bool>,
    pub webhook_url: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://hrdesk.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            directory: DirectoryConfig::default(),
            calendar: CalendarConfig::default(),
            notifications: NotificationsConfig {
                enabled: false,
                webhook_url: None,
                webhook_token: None,
                max_attempts: 3,
                base_delay_ms: 2_000,
                max_delay_ms: 60_000,
                attempt_timeout_ms: 5_000,
                task_due_days: 2,
            },
            audit: AuditConfig { write_attempts: 3 },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                health_check_port: 8080,
                graceful_shutdown_secs: 15,
                reminder_interval_secs: 86_400,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("hrdesk.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(directory) = patch.directory {
            if let Some(admin_users) = directory.admin_users {
                self.directory.admin_users = admin_users;
            }
            if let Some(employees) = directory.employees {
                self.directory.employees = employees;
            }
        }

        if let Some(calendar) = patch.calendar {
            if let Some(default_region) = calendar.default_region {
                self.calendar.default_region = Some(default_region);
            }
            if let Some(holidays_path) = calendar.holidays_path {
                self.calendar.holidays_path = Some(holidays_path);
            }
        }

        if let Some(notifications) = patch.notifications {
            if let Some(enabled) = notifications.enabled {
                self.notifications.enabled = enabled;
            }
            if let Some(webhook_url) = notifications.webhook_url {
                self.notifications.webhook_url = Some(webhook_url);
            }
            if let Some(webhook_token_value) = notifications.webhook_token {
                self.notifications.webhook_token = Some(secret_value(webhook_token_value));
            }
            if let Some(max_attempts) = notifications.max_attempts {
                self.notifications.max_attempts = max_attempts;
            }
            if let Some(base_delay_ms) = notifications.base_delay_ms {
                self.notifications.base_delay_ms = base_delay_ms;
            }
            if let Some(max_delay_ms) = notifications.max_delay_ms {
                self.notifications.max_delay_ms = max_delay_ms;
            }
            if let Some(attempt_timeout_ms) = notifications.attempt_timeout_ms {
                self.notifications.attempt_timeout_ms = attempt_timeout_ms;
            }
            if let Some(task_due_days) = notifications.task_due_days {
                self.notifications.task_due_days = task_due_days;
            }
        }

        if let Some(audit) = patch.audit {
            if let Some(write_attempts) = audit.write_attempts {
                self.audit.write_attempts = write_attempts;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
            if let Some(reminder_interval_secs) = server.reminder_interval_secs {
                self.server.reminder_interval_secs = reminder_interval_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("HRDESK_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("HRDESK_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("HRDESK_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("HRDESK_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("HRDESK_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("HRDESK_ADMIN_USERS") {
            self.directory.admin_users = split_list(&value);
        }

        if let Some(value) = read_env("HRDESK_CALENDAR_DEFAULT_REGION") {
            self.calendar.default_region = Some(value);
        }
        if let Some(value) = read_env("HRDESK_CALENDAR_HOLIDAYS_PATH") {
            self.calendar.holidays_path = Some(PathBuf::from(value));
        }

        if let Some(value) = read_env("HRDESK_NOTIFICATIONS_ENABLED") {
            self.notifications.enabled = parse_bool("HRDESK_NOTIFICATIONS_ENABLED", &value)?;
        }
        if let Some(value) = read_env("HRDESK_NOTIFICATIONS_WEBHOOK_URL") {
            self.notifications.webhook_url = Some(value);
        }
        if let Some(value) = read_env("HRDESK_NOTIFICATIONS_WEBHOOK_TOKEN") {
            self.notifications.webhook_token = Some(secret_value(value));
        }
        if let Some(value) = read_env("HRDESK_NOTIFICATIONS_MAX_ATTEMPTS") {
            self.notifications.max_attempts =
                parse_u32("HRDESK_NOTIFICATIONS_MAX_ATTEMPTS", &value)?;
        }
        if let Some(value) = read_env("HRDESK_NOTIFICATIONS_BASE_DELAY_MS") {
            self.notifications.base_delay_ms =
                parse_u64("HRDESK_NOTIFICATIONS_BASE_DELAY_MS", &value)?;
        }
        if let Some(value) = read_env("HRDESK_NOTIFICATIONS_MAX_DELAY_MS") {
            self.notifications.max_delay_ms =
                parse_u64("HRDESK_NOTIFICATIONS_MAX_DELAY_MS", &value)?;
        }
        if let Some(value) = read_env("HRDESK_NOTIFICATIONS_ATTEMPT_TIMEOUT_MS") {
            self.notifications.attempt_timeout_ms =
                parse_u64("HRDESK_NOTIFICATIONS_ATTEMPT_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = read_env("HRDESK_NOTIFICATIONS_TASK_DUE_DAYS") {
            self.notifications.task_due_days =
                parse_u32("HRDESK_NOTIFICATIONS_TASK_DUE_DAYS", &value)?;
        }

        if let Some(value) = read_env("HRDESK_AUDIT_WRITE_ATTEMPTS") {
            self.audit.write_attempts = parse_u32("HRDESK_AUDIT_WRITE_ATTEMPTS", &value)?;
        }

        if let Some(value) = read_env("HRDESK_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("HRDESK_SERVER_HEALTH_CHECK_PORT") {
            self.server.health_check_port = parse_u16("HRDESK_SERVER_HEALTH_CHECK_PORT", &value)?;
        }
        if let Some(value) = read_env("HRDESK_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("HRDESK_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }
        if let Some(value) = read_env("HRDESK_SERVER_REMINDER_INTERVAL_SECS") {
            self.server.reminder_interval_secs =
                parse_u64("HRDESK_SERVER_REMINDER_INTERVAL_SECS", &value)?;
        }

        let log_level = read_env("HRDESK_LOGGING_LEVEL").or_else(|| read_env("HRDESK_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("HRDESK_LOGGING_FORMAT").or_else(|| read_env("HRDESK_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(admin_users) = overrides.admin_users {
            self.directory.admin_users = admin_users;
        }
        if let Some(holidays_path) = overrides.holidays_path {
            self.calendar.holidays_path = Some(holidays_path);
        }
        if let Some(enabled) = overrides.notifications_enabled {
            self.notifications.enabled = enabled;
        }
        if let Some(webhook_url) = overrides.webhook_url {
            self.notifications.webhook_url = Some(webhook_url);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_directory(&self.directory)?;
        validate_notifications(&self.notifications)?;
        validate_audit(&self.audit)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("hrdesk.toml"), PathBuf::from("config/hrdesk.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_directory(directory: &DirectoryConfig) -> Result<(), ConfigError> {
    let malformed = directory
        .admin_users
        .iter()
        .chain(directory.employees.iter().map(|employee| &employee.email))
        .find(|email| !email.contains('@'));
    if let Some(email) = malformed {
        return Err(ConfigError::Validation(format!(
            "directory entries must be email addresses, got `{email}`"
        )));
    }
    Ok(())
}

fn validate_notifications(notifications: &NotificationsConfig) -> Result<(), ConfigError> {
    if notifications.enabled {
        let url = notifications.webhook_url.as_deref().map(str::trim).unwrap_or_default();
        if url.is_empty() {
            return Err(ConfigError::Validation(
                "notifications.webhook_url is required when notifications are enabled"
                    .to_string(),
            ));
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "notifications.webhook_url must start with http:// or https://".to_string(),
            ));
        }
        let blank_token = notifications
            .webhook_token
            .as_ref()
            .is_some_and(|token| token.expose_secret().trim().is_empty());
        if blank_token {
            return Err(ConfigError::Validation(
                "notifications.webhook_token must not be blank when set".to_string(),
            ));
        }
    }

    if notifications.max_attempts == 0 || notifications.max_attempts > 10 {
        return Err(ConfigError::Validation(
            "notifications.max_attempts must be in range 1..=10".to_string(),
        ));
    }

    if notifications.base_delay_ms > notifications.max_delay_ms {
        return Err(ConfigError::Validation(
            "notifications.base_delay_ms must not exceed notifications.max_delay_ms".to_string(),
        ));
    }

    if notifications.attempt_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "notifications.attempt_timeout_ms must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_audit(audit: &AuditConfig) -> Result<(), ConfigError> {
    if audit.write_attempts == 0 || audit.write_attempts > 10 {
        return Err(ConfigError::Validation(
            "audit.write_attempts must be in range 1..=10".to_string(),
        ));
    }
    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.health_check_port == 0 {
        return Err(ConfigError::Validation(
            "server.health_check_port must be greater than zero".to_string(),
        ));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    if server.reminder_interval_secs < 60 {
        return Err(ConfigError::Validation(
            "server.reminder_interval_secs must be at least 60".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    directory: Option<DirectoryPatch>,
    calendar: Option<CalendarPatch>,
    notifications: Option<NotificationsPatch>,
    audit: Option<AuditPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct DirectoryPatch {
    admin_users: Option<Vec<String>>,
    employees: Option<Vec<EmployeeEntry>>,
}

#[derive(Debug, Default, Deserialize)]
struct CalendarPatch {
    default_region: Option<String>,
    holidays_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct NotificationsPatch {
    enabled: Option<bool>,
    webhook_url: Option<String>,
    webhook_token: Option<String>,
    max_attempts: Option<u32>,
    base_delay_ms: Option<u64>,
    max_delay_ms: Option<u64>,
    attempt_timeout_ms: Option<u64>,
    task_due_days: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct AuditPatch {
    write_attempts: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    health_check_port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
    reminder_interval_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_are_valid_without_file_or_env() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(!config.notifications.enabled, "notifications should default to disabled")?;
        ensure(config.notifications.max_attempts == 3, "three delivery attempts by default")?;
        ensure(config.notifications.task_due_days == 2, "reminder tasks are due in two days")?;
        ensure(config.audit.write_attempts == 3, "three audit write attempts by default")?;
        ensure(config.server.reminder_interval_secs == 86_400, "reminders run daily")?;
        ensure(config.directory.admin_users.is_empty(), "no admins by default")?;
        ensure(
            matches!(config.logging.format, LogFormat::Compact),
            "default logging format should be compact",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_HRDESK_WEBHOOK_TOKEN", "token-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("hrdesk.toml");
            fs::write(
                &path,
                r#"
[notifications]
enabled = true
webhook_url = "https://hooks.example.test/hr"
webhook_token = "${TEST_HRDESK_WEBHOOK_TOKEN}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config
                    .notifications
                    .webhook_token
                    .as_ref()
                    .is_some_and(|token| token.expose_secret() == "token-from-env"),
                "webhook token should be loaded from environment",
            )
        })();

        clear_vars(&["TEST_HRDESK_WEBHOOK_TOKEN"]);
        result
    }

    #[test]
    fn directory_section_reads_employees_and_admin_env_list() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("HRDESK_ADMIN_USERS", " hr@corp.test, ,root@corp.test ");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("hrdesk.toml");
            fs::write(
                &path,
                r#"
[directory]
admin_users = ["file-admin@corp.test"]

[[directory.employees]]
email = "ana@corp.test"
manager_email = "mo@corp.test"
holiday_region = "mexico"

[[directory.employees]]
email = "mo@corp.test"

[calendar]
default_region = "madrid"
holidays_path = "holidays.toml"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.directory.admin_users == vec!["hr@corp.test", "root@corp.test"],
                "env admin list should win and drop blanks",
            )?;
            ensure(config.directory.employees.len() == 2, "both employees should load")?;
            ensure(
                config.directory.employees[1].manager_email.is_none(),
                "manager email is optional",
            )?;
            ensure(
                config.calendar.default_region.as_deref() == Some("madrid"),
                "default region should come from file",
            )?;
            ensure(
                config.calendar.holidays_path == Some(PathBuf::from("holidays.toml")),
                "holidays path should come from file",
            )
        })();

        clear_vars(&["HRDESK_ADMIN_USERS"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("HRDESK_LOG_LEVEL", "warn");
        env::set_var("HRDESK_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )
        })();

        clear_vars(&["HRDESK_LOG_LEVEL", "HRDESK_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("HRDESK_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("HRDESK_AUDIT_WRITE_ATTEMPTS", "5");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("hrdesk.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[audit]
write_attempts = 2

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(config.audit.write_attempts == 5, "env audit attempts should win over file")
        })();

        clear_vars(&["HRDESK_DATABASE_URL", "HRDESK_AUDIT_WRITE_ATTEMPTS"]);
        result
    }

    #[test]
    fn enabled_notifications_require_webhook_url() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("HRDESK_NOTIFICATIONS_ENABLED", "true");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("notifications.webhook_url")
            );
            ensure(has_message, "validation failure should mention notifications.webhook_url")
        })();

        clear_vars(&["HRDESK_NOTIFICATIONS_ENABLED"]);
        result
    }

    #[test]
    fn malformed_numeric_env_is_reported_with_key() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("HRDESK_NOTIFICATIONS_MAX_ATTEMPTS", "three");

        let result = match AppConfig::load(LoadOptions::default()) {
            Err(ConfigError::InvalidEnvOverride { key, .. }) => ensure(
                key == "HRDESK_NOTIFICATIONS_MAX_ATTEMPTS",
                "error should name the offending variable",
            ),
            Err(other) => Err(format!("unexpected error: {other}")),
            Ok(_) => Err("expected an invalid override error".to_string()),
        };

        clear_vars(&["HRDESK_NOTIFICATIONS_MAX_ATTEMPTS"]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("HRDESK_NOTIFICATIONS_WEBHOOK_TOKEN", "hook-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(
                !debug.contains("hook-secret-value"),
                "debug output should not contain the webhook token",
            )
        })();

        clear_vars(&["HRDESK_NOTIFICATIONS_WEBHOOK_TOKEN"]);
        result
    }
}
