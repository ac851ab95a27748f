pub mod connection;
pub mod logging;
pub mod naming;

use std::path::PathBuf;
use which::which;

/// Finds an executable by name in the system PATH, or checks an explicit path.
pub fn find_executable(tool: &str) -> Result<PathBuf, which::Error> {
    which(tool)
}
