//! Configuration management

use crate::error::{Result, ThreatclError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "THREATCL_CONFIG";

/// Environment variable overriding the HTTP listen address
pub const ADDR_ENV: &str = "THREATCL_ADDR";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Directory holding threat model files
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// Recognized file extensions (without the dot)
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Filesystem watch configuration
    #[serde(default)]
    pub watch: WatchConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address, e.g. `127.0.0.1:8080`
    #[serde(default = "default_addr")]
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
        }
    }
}

/// Filesystem watch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Keep the index live while serving
    #[serde(default = "default_watch_enabled")]
    pub enabled: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: default_watch_enabled(),
        }
    }
}

fn default_extensions() -> Vec<String> {
    crate::parser::DEFAULT_EXTENSIONS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_watch_enabled() -> bool {
    true
}

impl Config {
    /// Load config from `$THREATCL_CONFIG` or the default path, then apply
    /// environment overrides. A missing file means defaults.
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::default_path());
        let mut config = Self::load_from(&path)?;
        config.apply_env();
        Ok(config)
    }

    /// Load config from an explicit path without env overrides
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::with_defaults());
        }
        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::with_defaults());
        }
        let config: Config = serde_yaml::from_str(&content).map_err(|e| {
            ThreatclError::Config(format!("invalid config {}: {}", path.display(), e))
        })?;
        if config.extensions.is_empty() {
            return Err(ThreatclError::Config(
                "at least one extension must be configured".to_string(),
            ));
        }
        Ok(config)
    }

    /// Defaults with the extension list filled in
    pub fn with_defaults() -> Self {
        Self {
            extensions: default_extensions(),
            ..Self::default()
        }
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CONFIG_DIR_NAME)
            .join("config.yml")
    }

    fn apply_env(&mut self) {
        if let Ok(addr) = std::env::var(ADDR_ENV) {
            if !addr.trim().is_empty() {
                self.server.addr = addr;
            }
        }
    }

    /// Root directory, falling back to the current directory
    pub fn root_or_cwd(&self) -> PathBuf {
        self.root.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}
