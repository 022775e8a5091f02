//! Configuration management for Stepwright.
//!
//! Handles loading and saving configuration from TOML files.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::workflow::ContentMode;

/// Project-local config file name.
pub const LOCAL_CONFIG_FILE: &str = ".stepwright.toml";

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "STEPWRIGHT_CONFIG";

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Workflow engine settings
    pub workflow: WorkflowConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

/// Workflow engine settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Directory for step artifacts; relative paths resolve against the
    /// document's directory. Artifacts sit next to the document when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,

    /// How artifact content is produced
    pub content_mode: ContentMode,
}

impl WorkflowConfig {
    /// Output directory with `~` and environment variables expanded.
    pub fn resolved_output_dir(&self) -> Option<PathBuf> {
        let dir = self.output_dir.as_deref()?.trim();
        if dir.is_empty() {
            return None;
        }
        let expanded = shellexpand::full(dir).map_or_else(|_| dir.into(), |s| s.into_owned());
        Some(PathBuf::from(expanded))
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log filter when neither `--verbose` nor `RUST_LOG` is set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "warn".to_string() }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// Looks for config in:
    /// 1. `explicit` (from `--config` or `STEPWRIGHT_CONFIG`)
    /// 2. `.stepwright.toml` in current directory
    /// 3. `~/.config/stepwright/config.toml`
    /// 4. Falls back to defaults
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        match Self::resolve_path(explicit) {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// The config file `load` would read, if any.
    ///
    /// An explicit path is returned even when it does not exist so that
    /// loading reports it.
    pub fn resolve_path(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Some(local_config);
        }

        Self::global_config_path().filter(|path| path.exists())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to the global config file.
    pub fn save(&self) -> anyhow::Result<PathBuf> {
        let config_path = Self::global_config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        if let Some(dir) = config_path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(config_path)
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("stepwright"))
    }

    /// Get the global config file path.
    pub fn global_config_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("config.toml"))
    }
}
