use std::path::PathBuf;
use thiserror::Error;

/// Startup configuration problems. These are the only errors allowed to stop the process.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("Invalid value for {key}: '{value}' ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("Failed to read config file '{path}': {cause}")]
    Read { path: PathBuf, cause: std::io::Error },

    #[error("Failed to parse config file '{path}': {cause}")]
    Parse {
        path: PathBuf,
        cause: serde_json::Error,
    },
}

#[derive(Error, Debug)]
pub enum DumpError {
    #[error("{tool} executable not found in PATH: {cause}")]
    ToolNotFound { tool: String, cause: which::Error },

    #[error("Failed to execute {tool}: {cause}")]
    Spawn { tool: String, cause: std::io::Error },

    #[error("{tool} timed out after {limit:?}")]
    TimedOut {
        tool: String,
        limit: std::time::Duration,
    },

    #[error("{tool} failed (exit code {}): {stderr}", describe_code(.code))]
    Failed {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },
}

fn describe_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "none, killed by signal".to_string(), |c| c.to_string())
}

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Source for archival is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Source directory has no usable name: {0}")]
    InvalidName(PathBuf),

    #[error("Archive already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("Failed to walk directory {path}: {cause}")]
    Walk {
        path: PathBuf,
        cause: walkdir::Error,
    },

    #[error("{context}: {cause}")]
    Io {
        context: String,
        cause: std::io::Error,
    },
}

impl ArchiveError {
    pub(crate) fn io(context: impl Into<String>, cause: std::io::Error) -> Self {
        ArchiveError::Io {
            context: context.into(),
            cause,
        }
    }
}

#[derive(Error, Debug)]
pub enum SweepError {
    #[error("Failed to read backup directory '{path}': {cause}")]
    ReadDir { path: PathBuf, cause: std::io::Error },
}

/// Never escalated past the notifier; only ever logged.
#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Invalid email address '{address}': {cause}")]
    Address {
        address: String,
        cause: lettre::address::AddressError,
    },

    #[error("Failed to build email: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}
