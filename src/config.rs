use crate::emulator::session::Location;
use crate::netemu_paths;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Environment override for the API listen address.
pub const LISTEN_ENV: &str = "NETEMU_LISTEN";

/// Environment override for the event stream listen address.
pub const STREAM_LISTEN_ENV: &str = "NETEMU_STREAM_LISTEN";

/// Daemon settings. Every field has a default so an empty file is valid.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DaemonConfig {
    /// Address of the unary API. Default: 127.0.0.1:50051
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    /// Address observers connect to for event streams. Default: 127.0.0.1:50052
    #[serde(default = "default_stream_listen")]
    pub stream_listen: SocketAddr,
    /// Maximum number of concurrently open event streams. Default: 10
    #[serde(default = "default_max_streams")]
    pub max_streams: usize,
    /// Directory under which session workspaces are created.
    /// Default: the system temp dir
    #[serde(default = "std::env::temp_dir")]
    pub workspace_root: PathBuf,
    /// Keep session workspaces after teardown. Default: false
    #[serde(default)]
    pub preserve_workspaces: bool,
    /// Log filter used when `RUST_LOG` is unset. Default: "info"
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Reference location given to every new session.
    #[serde(default)]
    pub default_location: Location,
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 50051))
}

fn default_stream_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 50052))
}

fn default_max_streams() -> usize {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            stream_listen: default_stream_listen(),
            max_streams: default_max_streams(),
            workspace_root: std::env::temp_dir(),
            preserve_workspaces: false,
            log_level: default_log_level(),
            default_location: Location::default(),
        }
    }
}

impl DaemonConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file as YAML: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Resolves the configuration: an explicit path must exist; otherwise
    /// `<home>/daemon.yaml` is used when present, else the defaults.
    /// Environment overrides are applied last.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load(path)?,
            None => {
                let path = netemu_paths::daemon_config_path()?;
                if path.exists() {
                    Self::load(&path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(listen) = std::env::var(LISTEN_ENV) {
            self.listen = listen
                .parse()
                .with_context(|| format!("Invalid {}: {}", LISTEN_ENV, listen))?;
        }
        if let Ok(listen) = std::env::var(STREAM_LISTEN_ENV) {
            self.stream_listen = listen
                .parse()
                .with_context(|| format!("Invalid {}: {}", STREAM_LISTEN_ENV, listen))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.max_streams == 0 {
            anyhow::bail!("max_streams must be at least 1");
        }
        if self.listen == self.stream_listen {
            anyhow::bail!(
                "listen and stream_listen must differ (both are {})",
                self.listen
            );
        }
        Ok(())
    }
}
