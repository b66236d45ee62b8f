//! Configuration module for Armory
//!
//! Handles loading configuration from multiple sources, later ones winning:
//! - Default values
//! - User configuration (~/.armory/config.toml)
//! - Project configuration (./armory.toml)
//! - An explicit path (`--config` or `ARMORY_CONFIG`), which replaces the
//!   search above
//! - Environment variables

use crate::error::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Interpreter used to run wrapped tools and pip
    pub python: String,

    /// Directory holding wrapped tool checkouts
    pub tools_dir: PathBuf,

    /// Abort runs when dependencies cannot be resolved
    pub strict: bool,

    /// Re-check dependencies after installing and fail closed
    pub verify_after_install: bool,

    /// Seconds allowed for dependency installation, 0 for no limit
    pub install_timeout: u64,

    /// Seconds allowed for the wrapped tool, 0 for no limit
    pub exec_timeout: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            python: "python3".to_string(),
            tools_dir: PathBuf::from("tools"),
            strict: false,
            verify_after_install: false,
            install_timeout: 600,
            exec_timeout: 0,
        }
    }
}

/// Partial configuration as read from a file; absent keys keep earlier values
#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigFile {
    python: Option<String>,
    tools_dir: Option<PathBuf>,
    strict: Option<bool>,
    verify_after_install: Option<bool>,
    install_timeout: Option<u64>,
    exec_timeout: Option<u64>,
}

impl Config {
    /// Load configuration from all sources
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Config::default();

        for path in Self::get_config_paths(config_path) {
            if path.exists() {
                tracing::debug!("Loading configuration from {}", path.display());
                config.merge_from_file(&path)?;
            } else if config_path == Some(&path) {
                return Err(Error::FileNotFound(path));
            }
        }

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Get the list of configuration file paths to check
    fn get_config_paths(explicit_path: Option<&PathBuf>) -> Vec<PathBuf> {
        if let Some(path) = explicit_path {
            return vec![path.clone()];
        }

        let mut paths = Vec::new();
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".armory/config.toml"));
        }
        paths.push(PathBuf::from("armory.toml"));
        paths
    }

    /// Merge configuration from a file
    fn merge_from_file(&mut self, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let file: ConfigFile = match extension {
            "yml" | "yaml" => serde_yaml::from_str(&content)?,
            "json" => serde_json::from_str(&content)?,
            _ => toml::from_str(&content)?,
        };

        self.merge(file);
        Ok(())
    }

    fn merge(&mut self, other: ConfigFile) {
        if let Some(python) = other.python {
            self.python = python;
        }
        if let Some(tools_dir) = other.tools_dir {
            self.tools_dir = tools_dir;
        }
        if let Some(strict) = other.strict {
            self.strict = strict;
        }
        if let Some(verify) = other.verify_after_install {
            self.verify_after_install = verify;
        }
        if let Some(timeout) = other.install_timeout {
            self.install_timeout = timeout;
        }
        if let Some(timeout) = other.exec_timeout {
            self.exec_timeout = timeout;
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        // ARMORY_PYTHON
        if let Ok(python) = std::env::var("ARMORY_PYTHON") {
            self.python = python;
        }

        // ARMORY_TOOLS_DIR
        if let Ok(dir) = std::env::var("ARMORY_TOOLS_DIR") {
            self.tools_dir = PathBuf::from(dir);
        }

        // ARMORY_STRICT
        if let Ok(value) = std::env::var("ARMORY_STRICT") {
            self.strict = parse_bool("ARMORY_STRICT", &value)?;
        }

        // ARMORY_VERIFY_INSTALL
        if let Ok(value) = std::env::var("ARMORY_VERIFY_INSTALL") {
            self.verify_after_install = parse_bool("ARMORY_VERIFY_INSTALL", &value)?;
        }

        // ARMORY_INSTALL_TIMEOUT
        if let Ok(value) = std::env::var("ARMORY_INSTALL_TIMEOUT") {
            self.install_timeout = parse_secs("ARMORY_INSTALL_TIMEOUT", &value)?;
        }

        // ARMORY_EXEC_TIMEOUT
        if let Ok(value) = std::env::var("ARMORY_EXEC_TIMEOUT") {
            self.exec_timeout = parse_secs("ARMORY_EXEC_TIMEOUT", &value)?;
        }

        Ok(())
    }

    /// Install timeout, `None` when unlimited
    pub fn install_timeout(&self) -> Option<Duration> {
        secs(self.install_timeout)
    }

    /// Tool execution timeout, `None` when unlimited
    pub fn exec_timeout(&self) -> Option<Duration> {
        secs(self.exec_timeout)
    }

    /// Load from a specific file only
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Config::default();
        config.merge_from_file(path.as_ref())?;
        Ok(config)
    }
}

fn secs(value: u64) -> Option<Duration> {
    (value > 0).then(|| Duration::from_secs(value))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" | "" => Ok(false),
        _ => Err(Error::InvalidConfig {
            key: key.to_string(),
            message: format!("'{}' is not a boolean", value),
        }),
    }
}

fn parse_secs(key: &str, value: &str) -> Result<u64> {
    value.trim().parse().map_err(|_| Error::InvalidConfig {
        key: key.to_string(),
        message: format!("'{}' is not a number of seconds", value),
    })
}
