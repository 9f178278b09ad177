//! Well-known filesystem locations.
//!
//! - `~/.weave` is the per-user home (overridable with `WEAVE_HOME`)
//! - `~/.weave/mcp_config.yaml` is the secondary server configuration file
//! - `.agent/.env` then `.env` in the working directory hold host env overrides

use std::env;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Environment variable overriding the per-user weave home.
pub const WEAVE_HOME_ENV: &str = "WEAVE_HOME";

/// File name of the secondary server configuration inside the weave home.
pub const MCP_CONFIG_FILE: &str = "mcp_config.yaml";

/// Errors that can occur during path resolution.
#[derive(Debug, Error)]
pub enum PathError {
    /// Could not determine the user's home directory.
    #[error("Cannot determine home directory")]
    NoHomeDir,

    /// Failed to get the current working directory.
    #[error("Cannot determine current directory: {0}")]
    CurrentDirError(String),
}

/// The per-user weave directory.
///
/// `WEAVE_HOME` wins when set; otherwise `~/.weave`. The directory is not
/// created here: readers treat a missing directory as "no configuration".
pub fn weave_home() -> Result<PathBuf, PathError> {
    if let Some(path) = env::var_os(WEAVE_HOME_ENV).filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }

    let home = dirs::home_dir().ok_or(PathError::NoHomeDir)?;
    Ok(home.join(".weave"))
}

/// Default location of the secondary server configuration file.
pub fn mcp_config_path() -> Result<PathBuf, PathError> {
    Ok(weave_home()?.join(MCP_CONFIG_FILE))
}

/// Candidate `.env` files for a working directory, in lookup order.
pub fn env_file_candidates(cwd: &Path) -> [PathBuf; 2] {
    [cwd.join(".agent").join(".env"), cwd.join(".env")]
}

/// First existing `.env` file for the current working directory.
pub fn find_env_file() -> Result<Option<PathBuf>, PathError> {
    let cwd = env::current_dir().map_err(|e| PathError::CurrentDirError(e.to_string()))?;
    Ok(env_file_candidates(&cwd)
        .into_iter()
        .find(|candidate| candidate.is_file()))
}
