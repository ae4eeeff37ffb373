//! Settings Storage
//!
//! This module handles persistent storage of application settings:
//! the default result limit, where profiles and exports live, and the
//! log filter.

use crate::error::{DbConsoleError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings file name
const SETTINGS_FILE: &str = "config.toml";

/// Profiles file name (unless overridden in the settings)
const PROFILES_FILE: &str = "profiles.toml";

/// Row limit applied to unbounded reads when nothing else is configured
pub const DEFAULT_RESULT_LIMIT: u64 = 1000;

fn default_result_limit() -> u64 {
    DEFAULT_RESULT_LIMIT
}

/// Persistent settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Row limit appended to reads without their own LIMIT
    #[serde(default = "default_result_limit")]
    pub result_limit: u64,
    /// Override for the profiles file location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profiles_file: Option<PathBuf>,
    /// Directory used by `/export` when given a bare file name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_dir: Option<PathBuf>,
    /// tracing filter directive, e.g. `db_console=debug`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            result_limit: DEFAULT_RESULT_LIMIT,
            profiles_file: None,
            export_dir: None,
            log_filter: None,
        }
    }
}

impl Settings {
    /// Get the configuration directory path
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| {
                DbConsoleError::Config("could not find configuration directory".to_string())
            })?
            .join("db-console");

        fs::create_dir_all(&config_dir)?;

        Ok(config_dir)
    }

    /// Get the settings file path
    pub fn settings_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(SETTINGS_FILE))
    }

    /// Resolve where connection profiles are stored
    pub fn profiles_path(&self) -> Result<PathBuf> {
        match &self.profiles_file {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::config_dir()?.join(PROFILES_FILE)),
        }
    }

    /// Load settings from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::settings_file()?)
    }

    /// Load settings from a file, returning defaults if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content).map_err(|e| {
            DbConsoleError::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;

        Ok(settings)
    }

    /// Save settings to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::settings_file()?)
    }

    /// Save settings to a file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}
