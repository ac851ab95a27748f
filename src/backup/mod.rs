pub(crate) mod archive; // tarball creation
pub(crate) mod db_dump; // external dump tool
pub(crate) mod logic; // job orchestration
pub(crate) mod retention; // expired archive cleanup

use crate::config::AppConfig;
use crate::notify::EmailNotifier;
use archive::TarGzArchiver;
use db_dump::MongoDump;
use logic::{BackupJob, JobOutcome};
use retention::FsRetentionSweeper;

/// Public entry point for one backup job, wired with the real dump tool,
/// archiver, sweeper and SMTP notifier.
pub async fn run_backup_flow(app_config: &AppConfig) -> JobOutcome {
    let backup_config = &app_config.backup;
    let mut job = BackupJob::new(
        backup_config,
        MongoDump::new(backup_config.dump_tool.clone(), backup_config.dump_timeout),
        TarGzArchiver,
        FsRetentionSweeper::new(backup_config.backup_prefix.clone()),
        EmailNotifier::smtp(app_config.email.clone()),
    );
    let outcome = job.run().await;
    log::debug!(
        "Backup job ended in stage {} (success: {})",
        job.stage(),
        outcome.is_success()
    );
    outcome
}
