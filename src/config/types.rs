//! Core configuration types and loading.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use super::limits::BanListLimit;
use super::xlines::XLinesConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Daemon configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server identity.
    #[serde(default)]
    pub server: ServerConfig,
    /// Ban line subsystem settings and configured lines.
    #[serde(default)]
    pub xlines: XLinesConfig,
    /// Per-channel list limits, first matching `chan` glob wins.
    #[serde(default)]
    pub banlist: Vec<BanListLimit>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Server identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server name (e.g., "irc.straylight.net"), used as the numeric prefix.
    #[serde(default = "default_server_name")]
    pub name: String,
    /// Network name (e.g., "Straylight").
    #[serde(default = "default_network")]
    pub network: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            network: default_network(),
        }
    }
}

fn default_server_name() -> String {
    "irc.local".to_string()
}

fn default_network() -> String {
    "LocalNet".to_string()
}
