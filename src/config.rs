//! Configuration loading and management
//!
//! Handles parsing of the `config.toml` file, found at `--config` or in the
//! platform config directory (e.g. `~/.config/todo/config.toml`).

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::task::Priority;

/// Name of the configuration file inside the config directory
pub const CONFIG_FILE: &str = "config.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Task defaults
    #[serde(default)]
    pub tasks: TasksConfig,
}

/// Where task data lives
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    /// Data directory; the platform data dir when unset
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

/// Task configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TasksConfig {
    /// Priority for `todo add` without `--priority`
    #[serde(default = "default_priority")]
    pub default_priority: String,
}

fn default_priority() -> String {
    Priority::default().as_str().to_string()
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            default_priority: default_priority(),
        }
    }
}

impl TasksConfig {
    /// Parsed `default_priority`
    pub fn priority(&self) -> Result<Priority> {
        self.default_priority.parse().map_err(|_| {
            Error::InvalidConfig(format!(
                "tasks.default_priority: invalid priority '{}' (expected HIGH|MEDIUM|LOW)",
                self.default_priority
            ))
        })
    }

    fn validate(&self) -> Result<()> {
        self.priority().map(|_| ())
    }
}

impl StorageConfig {
    fn validate(&self) -> Result<()> {
        if let Some(dir) = &self.data_dir {
            if dir.as_os_str().is_empty() {
                return Err(Error::InvalidConfig(
                    "storage.data_dir cannot be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "todo")
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit path, or from the platform default location.
    ///
    /// An explicit path must exist and be valid. The default location is
    /// optional, and a broken default file falls back to defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let Some(path) = Self::default_path() else {
            return Ok(Self::default());
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        match Self::load(&path) {
            Ok(config) => Ok(config),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "using default config");
                Ok(Self::default())
            }
        }
    }

    /// Platform location of `config.toml`
    pub fn default_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    /// Data directory: `override_dir` (flag or env), then config, then the
    /// platform data dir.
    pub fn data_dir(&self, override_dir: Option<&Path>) -> Result<PathBuf> {
        if let Some(dir) = override_dir {
            return Ok(dir.to_path_buf());
        }
        if let Some(dir) = &self.storage.data_dir {
            return Ok(dir.clone());
        }
        project_dirs()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or(Error::DataDirUnavailable)
    }

    fn validate(&self) -> Result<()> {
        self.storage.validate()?;
        self.tasks.validate()?;
        Ok(())
    }
}
