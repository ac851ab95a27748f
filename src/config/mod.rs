// pantrykeeper/src/config/mod.rs
use chrono::{NaiveTime, Weekday};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::errors::ConfigError;
use crate::scheduler::WeeklySchedule;

pub const DEFAULT_CONFIG_FILE: &str = "config.json";
const DEFAULT_BACKUP_DIR: &str = "backups";
const DEFAULT_RETENTION_DAYS: i64 = 30;
const DEFAULT_BACKUP_PREFIX: &str = "jorbites_backup";
const DEFAULT_DATABASE_NAME: &str = "jorbites";
const DEFAULT_DUMP_TOOL: &str = "mongodump";
const DEFAULT_DUMP_TIMEOUT_SECS: u64 = 4 * 60 * 60;
const DEFAULT_BACKUP_DAY: &str = "sunday";
const DEFAULT_BACKUP_TIME: &str = "02:00";
const DEFAULT_CHECK_INTERVAL_SECS: u64 = 60;
const DEFAULT_LOG_FILE: &str = "logs/backup.log";
const DEFAULT_SCHEDULER_LOG_FILE: &str = "logs/scheduler.log";
const DEFAULT_SMTP_SERVER: &str = "smtp.gmail.com";
const DEFAULT_SMTP_PORT: u16 = 587;

/// Looks up a single configuration key. Empty values count as unset.
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

pub fn env_lookup(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

// Structs for deserializing config.json
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JsonEmailConfig {
    pub enabled: Option<bool>,
    pub smtp_server: Option<String>,
    pub smtp_port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawJsonConfig {
    pub database_url: Option<String>,
    pub backup_dir: Option<PathBuf>,
    pub retention_days: Option<i64>,
    pub backup_prefix: Option<String>,
    pub default_database_name: Option<String>,
    pub dump_tool: Option<String>,
    pub dump_timeout_secs: Option<u64>,
    pub backup_day: Option<String>,
    pub backup_time: Option<String>,
    pub scheduler_check_interval_secs: Option<u64>,
    pub log_file: Option<PathBuf>,
    pub scheduler_log_file: Option<PathBuf>,
    #[serde(default)]
    pub email: JsonEmailConfig,
}

impl RawJsonConfig {
    /// Reads the JSON config file if it exists. A missing file is an empty config.
    pub fn load_optional(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Ok(Self::default());
        }
        let config_content = fs::read_to_string(config_path).map_err(|cause| ConfigError::Read {
            path: config_path.to_path_buf(),
            cause,
        })?;
        serde_json::from_str(&config_content).map_err(|cause| ConfigError::Parse {
            path: config_path.to_path_buf(),
            cause,
        })
    }
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub enabled: bool,
    pub smtp_server: String,
    pub smtp_port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub to: Option<String>,
}

/// Read-only view over the email settings, recomputed on every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailConfigStatus {
    pub enabled: bool,
    pub configured: bool,
    pub missing_fields: Vec<&'static str>,
}

/// Credentials that are known to be complete.
#[derive(Debug, Clone, Copy)]
pub struct EmailCredentials<'a> {
    pub user: &'a str,
    pub password: &'a str,
    pub to: &'a str,
}

impl EmailConfig {
    /// Never fails: an unparseable flag or port falls back to its default with a warning,
    /// so a broken email section can never block a backup.
    pub fn load(raw: &RawJsonConfig, lookup: Lookup<'_>) -> Self {
        let json = &raw.email;
        let enabled = match lookup("EMAIL_ENABLED") {
            Some(v) => parse_bool(&v).unwrap_or_else(|| {
                log::warn!("Ignoring invalid EMAIL_ENABLED value '{}'", v);
                true
            }),
            None => json.enabled.unwrap_or(true),
        };
        let smtp_port = match lookup("SMTP_PORT") {
            Some(v) => v.trim().parse().unwrap_or_else(|_| {
                log::warn!("Ignoring invalid SMTP_PORT value '{}', using {}", v, DEFAULT_SMTP_PORT);
                DEFAULT_SMTP_PORT
            }),
            None => json.smtp_port.unwrap_or(DEFAULT_SMTP_PORT),
        };
        let non_empty = |s: &String| !s.trim().is_empty();

        EmailConfig {
            enabled,
            smtp_server: lookup("SMTP_SERVER")
                .or_else(|| json.smtp_server.clone().filter(non_empty))
                .unwrap_or_else(|| DEFAULT_SMTP_SERVER.to_string()),
            smtp_port,
            user: lookup("EMAIL_USER").or_else(|| json.user.clone().filter(non_empty)),
            password: lookup("EMAIL_PASSWORD").or_else(|| json.password.clone().filter(non_empty)),
            to: lookup("EMAIL_TO").or_else(|| json.to.clone().filter(non_empty)),
        }
    }

    pub fn status(&self) -> EmailConfigStatus {
        let missing_fields: Vec<&'static str> = [
            ("EMAIL_USER", &self.user),
            ("EMAIL_PASSWORD", &self.password),
            ("EMAIL_TO", &self.to),
        ]
        .into_iter()
        .filter(|(_, value)| value.as_deref().is_none_or(|v| v.trim().is_empty()))
        .map(|(name, _)| name)
        .collect();

        EmailConfigStatus {
            enabled: self.enabled,
            configured: missing_fields.is_empty(),
            missing_fields,
        }
    }

    /// Returns the credentials only when all three fields are present and non-empty.
    pub fn credentials(&self) -> Option<EmailCredentials<'_>> {
        fn present(v: &Option<String>) -> Option<&str> {
            v.as_deref().filter(|s| !s.trim().is_empty())
        }
        Some(EmailCredentials {
            user: present(&self.user)?,
            password: present(&self.password)?,
            to: present(&self.to)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct BackupConfig {
    pub database_url: String,
    pub backup_dir: PathBuf,
    pub retention: chrono::Duration,
    pub backup_prefix: String,
    pub default_database_name: String,
    pub dump_tool: String,
    pub dump_timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub schedule: WeeklySchedule,
    pub check_interval: Duration,
}

/// Built once at startup and passed by reference; nothing else reads the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backup: BackupConfig,
    pub scheduler: SchedulerConfig,
    pub email: EmailConfig,
    pub log_file: PathBuf,
    /// Used instead of `log_file` while running as the weekly scheduler.
    pub scheduler_log_file: PathBuf,
}

impl AppConfig {
    pub fn load(raw: &RawJsonConfig, lookup: Lookup<'_>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL")
            .or_else(|| raw.database_url.clone().filter(|s| !s.trim().is_empty()))
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let retention_days = parse_or("RETENTION_DAYS", lookup, raw.retention_days, DEFAULT_RETENTION_DAYS)?;
        if retention_days < 0 {
            return Err(ConfigError::Invalid {
                key: "RETENTION_DAYS",
                value: retention_days.to_string(),
                reason: "must not be negative".to_string(),
            });
        }
        let retention = chrono::Duration::try_days(retention_days).ok_or_else(|| ConfigError::Invalid {
            key: "RETENTION_DAYS",
            value: retention_days.to_string(),
            reason: "too large".to_string(),
        })?;

        let dump_timeout_secs =
            parse_or("DUMP_TIMEOUT_SECS", lookup, raw.dump_timeout_secs, DEFAULT_DUMP_TIMEOUT_SECS)?;

        let backup = BackupConfig {
            database_url,
            backup_dir: lookup("BACKUP_DIR")
                .map(PathBuf::from)
                .or_else(|| raw.backup_dir.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_BACKUP_DIR)),
            retention,
            backup_prefix: string_or("BACKUP_PREFIX", lookup, &raw.backup_prefix, DEFAULT_BACKUP_PREFIX),
            default_database_name: string_or(
                "DEFAULT_DATABASE_NAME",
                lookup,
                &raw.default_database_name,
                DEFAULT_DATABASE_NAME,
            ),
            dump_tool: string_or("DUMP_TOOL", lookup, &raw.dump_tool, DEFAULT_DUMP_TOOL),
            dump_timeout: (dump_timeout_secs > 0).then(|| Duration::from_secs(dump_timeout_secs)),
        };

        let day_value = string_or("BACKUP_DAY", lookup, &raw.backup_day, DEFAULT_BACKUP_DAY);
        let day = Weekday::from_str(day_value.trim()).map_err(|_| ConfigError::Invalid {
            key: "BACKUP_DAY",
            value: day_value.clone(),
            reason: "expected a weekday name such as 'sunday'".to_string(),
        })?;
        let time_value = string_or("BACKUP_TIME", lookup, &raw.backup_time, DEFAULT_BACKUP_TIME);
        let time = NaiveTime::parse_from_str(time_value.trim(), "%H:%M").map_err(|e| ConfigError::Invalid {
            key: "BACKUP_TIME",
            value: time_value.clone(),
            reason: e.to_string(),
        })?;
        let check_interval_secs = parse_or(
            "SCHEDULER_CHECK_INTERVAL",
            lookup,
            raw.scheduler_check_interval_secs,
            DEFAULT_CHECK_INTERVAL_SECS,
        )?;
        if check_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "SCHEDULER_CHECK_INTERVAL",
                value: "0".to_string(),
                reason: "must be at least one second".to_string(),
            });
        }

        Ok(AppConfig {
            backup,
            scheduler: SchedulerConfig {
                schedule: WeeklySchedule::new(day, time),
                check_interval: Duration::from_secs(check_interval_secs),
            },
            email: EmailConfig::load(raw, lookup),
            log_file: log_file_path(raw, lookup),
            scheduler_log_file: scheduler_log_file_path(raw, lookup),
        })
    }
}

/// Resolved separately from `AppConfig` so logging can start before a config error is reported.
pub fn log_file_path(raw: &RawJsonConfig, lookup: Lookup<'_>) -> PathBuf {
    lookup("LOG_FILE")
        .map(PathBuf::from)
        .or_else(|| raw.log_file.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE))
}

pub fn scheduler_log_file_path(raw: &RawJsonConfig, lookup: Lookup<'_>) -> PathBuf {
    lookup("SCHEDULER_LOG_FILE")
        .map(PathBuf::from)
        .or_else(|| raw.scheduler_log_file.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SCHEDULER_LOG_FILE))
}

pub fn config_file_path(lookup: Lookup<'_>) -> PathBuf {
    lookup("CONFIG_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

fn string_or(key: &str, lookup: Lookup<'_>, json: &Option<String>, default: &str) -> String {
    lookup(key)
        .or_else(|| json.clone().filter(|s| !s.trim().is_empty()))
        .unwrap_or_else(|| default.to_string())
}

fn parse_or<T>(key: &'static str, lookup: Lookup<'_>, json: Option<T>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(value) => {
            let parsed = value.trim().parse::<T>();
            parsed.map_err(|e| ConfigError::Invalid {
                key,
                value,
                reason: e.to_string(),
            })
        }
        None => Ok(json.unwrap_or(default)),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
