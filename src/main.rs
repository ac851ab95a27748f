//! Pantry Keeper
//!
//! Weekly MongoDB backups: dump, archive, retention cleanup and failure emails.

// pantrykeeper/src/main.rs
mod backup;
mod config;
mod errors;
mod notify;
mod scheduler;
mod utils;

use anyhow::{Context, Result};
use config::{AppConfig, EmailConfig, Lookup, RawJsonConfig, env_lookup};
use errors::ConfigError;
use log::{error, info};
use notify::{EmailNotifier, Notifier, log_email_status};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

/// What the process was asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Schedule,
    RunOnce,
    Status,
}

fn parse_mode(arg: Option<&str>) -> Option<Mode> {
    match arg.map(str::trim) {
        None | Some("schedule") => Some(Mode::Schedule),
        Some("run") | Some("backup") => Some(Mode::RunOnce),
        Some("status") => Some(Mode::Status),
        Some(_) => None,
    }
}

/// Main entry point. Only configuration problems produce a nonzero exit code;
/// a failed backup job is logged and emailed instead.
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    match run_app().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_app() -> Result<()> {
    dotenv::dotenv().ok();

    let args: Vec<String> = env::args().collect();
    let choice = args.get(1).map(String::as_str);
    let Some(mode) = parse_mode(choice) else {
        println!("Usage: pantrykeeper [schedule|run|status]");
        anyhow::bail!("Invalid operation choice: {}", choice.unwrap_or_default());
    };

    let config_path = config::config_file_path(&env_lookup);
    let raw_config = match RawJsonConfig::load_optional(&config_path) {
        Ok(raw_config) => raw_config,
        Err(e) => {
            // Only the environment is left to say where to log and whom to email.
            let env_only = RawJsonConfig::default();
            utils::logging::init(&log_file_for(mode, &env_only, &env_lookup));
            let notifier = EmailNotifier::smtp(EmailConfig::load(&env_only, &env_lookup));
            report_startup_failure(&notifier, &e).await;
            return Err(e).with_context(|| format!("Failed to load configuration from {}", config_path.display()));
        }
    };
    utils::logging::init(&log_file_for(mode, &raw_config, &env_lookup));

    let app_config = match AppConfig::load(&raw_config, &env_lookup) {
        Ok(app_config) => app_config,
        Err(e) => {
            let notifier = EmailNotifier::smtp(EmailConfig::load(&raw_config, &env_lookup));
            report_startup_failure(&notifier, &e).await;
            return Err(e).context("Invalid configuration");
        }
    };
    log_email_status(&app_config.email.status());

    match mode {
        Mode::Status => print_status(&app_config),
        Mode::RunOnce => {
            match backup::run_backup_flow(&app_config).await {
                backup::logic::JobOutcome::Completed { archive, .. } => {
                    info!("Manual backup finished: {}", archive.display());
                }
                backup::logic::JobOutcome::Failed { stage, message, .. } => {
                    info!("Manual backup failed during {} stage: {}", stage, message);
                }
            }
        }
        Mode::Schedule => {
            info!("Pantry Keeper Scheduler started");
            let app_config = &app_config;
            scheduler::run_scheduler(
                app_config.scheduler.schedule,
                app_config.scheduler.check_interval,
                move || async move {
                    backup::run_backup_flow(app_config).await;
                },
                async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        error!("Failed to listen for shutdown signal: {}", e);
                        std::future::pending::<()>().await;
                    }
                },
            )
            .await;
        }
    }
    Ok(())
}

fn log_file_for(mode: Mode, raw_config: &RawJsonConfig, lookup: Lookup<'_>) -> PathBuf {
    match mode {
        Mode::Schedule => config::scheduler_log_file_path(raw_config, lookup),
        Mode::RunOnce | Mode::Status => config::log_file_path(raw_config, lookup),
    }
}

/// Logs a fatal configuration error and makes one best-effort attempt to email it.
async fn report_startup_failure(notifier: &impl Notifier, e: &ConfigError) {
    error!("Configuration error: {}", e);
    notifier.notify_failure(&format!("Script failed: {}", e), None).await;
}

fn print_status(app_config: &AppConfig) {
    let connection = utils::connection::parse_uri(
        &app_config.backup.database_url,
        &app_config.backup.default_database_name,
    );
    let email = app_config.email.status();
    println!("Database:         {}", connection.redacted());
    println!("Backup directory: {}", app_config.backup.backup_dir.display());
    println!("Retention:        {} days", app_config.backup.retention.num_days());
    println!("Schedule:         {}", app_config.scheduler.schedule);
    println!("Log file:         {}", app_config.log_file.display());
    println!("Scheduler log:    {}", app_config.scheduler_log_file.display());
    println!("Email enabled:    {}", email.enabled);
    println!("Email configured: {}", email.configured);
    if !email.missing_fields.is_empty() {
        println!("Missing:          {}", email.missing_fields.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingNotifier {
        messages: RefCell<Vec<String>>,
    }

    impl Notifier for RecordingNotifier {
        async fn notify_failure(&self, error_message: &str, backup_name: Option<&str>) {
            assert!(backup_name.is_none());
            self.messages.borrow_mut().push(error_message.to_string());
        }
    }

    #[tokio::test]
    async fn test_unreadable_config_file_is_reported_once() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ \"retention_days\": ")?;
        let err = RawJsonConfig::load_optional(&path).unwrap_err();
        let notifier = RecordingNotifier::default();

        report_startup_failure(&notifier, &err).await;

        let messages = notifier.messages.borrow();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with("Script failed: Failed to parse config file"));
        Ok(())
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!(parse_mode(None), Some(Mode::Schedule));
        assert_eq!(parse_mode(Some("schedule")), Some(Mode::Schedule));
        assert_eq!(parse_mode(Some("run")), Some(Mode::RunOnce));
        assert_eq!(parse_mode(Some("backup")), Some(Mode::RunOnce));
        assert_eq!(parse_mode(Some(" status ")), Some(Mode::Status));
        assert_eq!(parse_mode(Some("restore")), None);
    }

    #[test]
    fn test_scheduler_mode_logs_to_its_own_file() {
        let raw = RawJsonConfig {
            log_file: Some(PathBuf::from("/srv/pantry/backup.log")),
            scheduler_log_file: Some(PathBuf::from("/srv/pantry/scheduler.log")),
            ..RawJsonConfig::default()
        };
        let no_env = |_: &str| None::<String>;
        assert_eq!(log_file_for(Mode::Schedule, &raw, &no_env), PathBuf::from("/srv/pantry/scheduler.log"));
        assert_eq!(log_file_for(Mode::RunOnce, &raw, &no_env), PathBuf::from("/srv/pantry/backup.log"));
        assert_eq!(log_file_for(Mode::Status, &raw, &no_env), PathBuf::from("/srv/pantry/backup.log"));
    }
}
