//! Configuration file management.
//!
//! Settings resolve in this order: command-line flag, environment variable,
//! config file, built-in default. Environment variables are read by clap, so
//! by the time a [`Cli`] reaches this module the first two are already merged.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use radoneye_core::{ClientConfig, HistoryScale};
use radoneye_types::RoundingPolicy;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cli::Cli;

/// Configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Default device address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,

    /// Bluetooth adapter index
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adapter: Option<usize>,

    /// Connection timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout: Option<u64>,

    /// Status and history read timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_timeout: Option<u64>,

    /// "rounded" or "exact"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rounding: Option<RoundingPolicy>,

    /// "euler" or "legacy"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_scale: Option<HistoryScale>,
}

impl Config {
    /// Get the default config file path
    pub fn path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("radoneye")
            .join("config.toml")
    }

    /// Load config from `path`. A missing file yields the default config.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config file at {}", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    /// Load config from `path`, falling back to defaults on any error.
    pub fn load(path: &Path) -> Self {
        Self::load_from(path).unwrap_or_else(|e| {
            warn!("{:#}", e);
            Self::default()
        })
    }

    /// Save config to `path`, creating parent directories as needed
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        fs::write(path, self.to_toml()?)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    /// Set one key from its string form.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "device" => self.device = Some(value.to_string()),
            "adapter" => self.adapter = Some(parse_number(key, value)?),
            "connect_timeout" => self.connect_timeout = Some(parse_number(key, value)?),
            "read_timeout" => self.read_timeout = Some(parse_number(key, value)?),
            "rounding" => {
                self.rounding = Some(match value.to_ascii_lowercase().as_str() {
                    "rounded" => RoundingPolicy::Rounded,
                    "exact" => RoundingPolicy::Exact,
                    _ => bail!("Invalid rounding '{value}': expected 'rounded' or 'exact'"),
                });
            }
            "history_scale" => {
                self.history_scale = Some(match value.to_ascii_lowercase().as_str() {
                    "euler" => HistoryScale::Euler,
                    "legacy" => HistoryScale::Legacy,
                    _ => bail!("Invalid history scale '{value}': expected 'euler' or 'legacy'"),
                });
            }
            _ => bail!("Unknown config key '{key}'"),
        }
        Ok(())
    }

    /// Clear one key.
    pub fn unset(&mut self, key: &str) -> Result<()> {
        match key {
            "device" => self.device = None,
            "adapter" => self.adapter = None,
            "connect_timeout" => self.connect_timeout = None,
            "read_timeout" => self.read_timeout = None,
            "rounding" => self.rounding = None,
            "history_scale" => self.history_scale = None,
            _ => bail!("Unknown config key '{key}'"),
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid value for {key}: '{value}' is not a number"))
}

/// Resolve the device from the argument (or env var), then the config.
pub fn resolve_device(device: Option<&str>, config: &Config) -> Option<String> {
    device
        .map(str::to_string)
        .or_else(|| config.device.clone())
}

/// Resolve the adapter index from the flag, then the config.
pub fn resolve_adapter(cli: &Cli, config: &Config) -> Option<usize> {
    cli.adapter.or(config.adapter)
}

/// Build the client configuration from flags and the config file.
pub fn resolve_client_config(cli: &Cli, config: &Config) -> ClientConfig {
    let mut client = ClientConfig::default();

    if let Some(secs) = cli.connect_timeout.or(config.connect_timeout) {
        client = client.connect_timeout(Duration::from_secs(secs));
    }
    if let Some(secs) = cli.read_timeout.or(config.read_timeout) {
        let timeout = Duration::from_secs(secs);
        client = client.status_timeout(timeout).history_timeout(timeout);
    }

    let rounding = if cli.no_rounding {
        RoundingPolicy::Exact
    } else {
        config.rounding.unwrap_or_default()
    };
    client = client.rounding(rounding);

    if let Some(scale) = config.history_scale {
        client = client.history_scale(scale);
    }
    client
}
