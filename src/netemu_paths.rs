//! Home-based storage paths for daemon configuration and logs.
//!
//! Everything lives under `~/.netemu/` unless `NETEMU_HOME` points
//! elsewhere:
//! - `daemon.yaml` - Daemon configuration
//! - `logs/netemud.log` - Daemon log when running detached

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// The name of the netemu directory under the user's home.
const NETEMU_DIR: &str = ".netemu";

/// Environment variable overriding the netemu home directory.
pub const NETEMU_HOME_ENV: &str = "NETEMU_HOME";

/// Returns the netemu home directory: `$NETEMU_HOME` or `~/.netemu/`.
///
/// Creates the directory if it doesn't exist.
pub fn netemu_home_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os(NETEMU_HOME_ENV) {
        Some(home) if !home.is_empty() => PathBuf::from(home),
        _ => dirs::home_dir()
            .context("Could not determine home directory")?
            .join(NETEMU_DIR),
    };
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create netemu directory: {}", dir.display()))?;
    Ok(dir)
}

/// Returns the default daemon configuration path: `<home>/daemon.yaml`
pub fn daemon_config_path() -> Result<PathBuf> {
    Ok(netemu_home_dir()?.join("daemon.yaml"))
}

/// Returns the daemon log path: `<home>/logs/netemud.log`
///
/// Creates the logs directory if it doesn't exist.
pub fn daemon_log_path() -> Result<PathBuf> {
    let logs = netemu_home_dir()?.join("logs");
    fs::create_dir_all(&logs)
        .with_context(|| format!("Failed to create logs directory: {}", logs.display()))?;
    Ok(logs.join("netemud.log"))
}

#[cfg(test)]
#[path = "netemu_paths_tests.rs"]
mod tests;
