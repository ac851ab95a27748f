// pantrykeeper/src/backup/db_dump.rs
use log::{debug, info};
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;

use crate::errors::DumpError;
use crate::utils::find_executable;

/// Runs the external dump tool that fills a destination directory.
pub trait DumpRunner {
    async fn run_dump(&self, connection_uri: &str, destination_dir: &Path) -> Result<(), DumpError>;
}

/// Invokes `<tool> --uri <uri> --out <dir>` and waits for it to exit.
#[derive(Debug, Clone)]
pub struct MongoDump {
    tool: String,
    timeout: Option<Duration>,
}

impl MongoDump {
    pub fn new(tool: impl Into<String>, timeout: Option<Duration>) -> Self {
        MongoDump {
            tool: tool.into(),
            timeout,
        }
    }
}

impl DumpRunner for MongoDump {
    async fn run_dump(&self, connection_uri: &str, destination_dir: &Path) -> Result<(), DumpError> {
        let tool_path = find_executable(&self.tool).map_err(|cause| DumpError::ToolNotFound {
            tool: self.tool.clone(),
            cause,
        })?;
        debug!("Found {} executable at: {}", self.tool, tool_path.display());
        info!("Dumping database to {} using {}...", destination_dir.display(), self.tool);

        let mut command = Command::new(&tool_path);
        command
            .arg("--uri")
            .arg(connection_uri)
            .arg("--out")
            .arg(destination_dir)
            .kill_on_drop(true);

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, command.output())
                .await
                .map_err(|_| DumpError::TimedOut {
                    tool: self.tool.clone(),
                    limit,
                })?,
            None => command.output().await,
        }
        .map_err(|cause| DumpError::Spawn {
            tool: self.tool.clone(),
            cause,
        })?;

        if !output.status.success() {
            return Err(DumpError::Failed {
                tool: self.tool.clone(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        info!("✓ {} finished successfully", self.tool);
        Ok(())
    }
}
