//! Settings for the data directory, logging, imports and listings
//!
//! Layers, lowest precedence first: built-in defaults, the TOML file
//! (`~/.config/quette/config.toml`, `QUETTE_CONFIG` or `--config`), then
//! `QUETTE_*` environment variables.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

use crate::backup::ImportMode;
use crate::storage::RecordKey;

const ENV_PREFIX: &str = "QUETTE";

/// Number of ratings shown by `recent` when not specified
const DEFAULT_RECENT_LIMIT: usize = 4;

/// User settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the ratings and collections records
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Log file (defaults to `<data_dir>/debug.log`)
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Mode used by `import` when none is given
    #[serde(default)]
    pub import_mode: ImportMode,

    /// How many ratings `recent` lists
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_file: None,
            import_mode: ImportMode::default(),
            recent_limit: DEFAULT_RECENT_LIMIT,
        }
    }
}

impl Config {
    /// Load from the default file location
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load from an explicit path if given, otherwise the default location
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load from `path`, falling back to defaults when it doesn't exist
    ///
    /// Creates the data directory if needed.
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Parse settings from TOML text, then apply the environment
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var(format!("{}_LOG_FILE", ENV_PREFIX)) {
            self.log_file = if val.is_empty() {
                None
            } else {
                Some(PathBuf::from(val))
            };
        }

        if let Ok(val) = std::env::var(format!("{}_IMPORT_MODE", ENV_PREFIX)) {
            match val.parse() {
                Ok(mode) => self.import_mode = mode,
                Err(e) => warn!("Ignoring {}_IMPORT_MODE: {}", ENV_PREFIX, e),
            }
        }

        if let Ok(val) = std::env::var(format!("{}_RECENT_LIMIT", ENV_PREFIX)) {
            match val.parse() {
                Ok(limit) => self.recent_limit = limit,
                Err(e) => warn!("Ignoring {}_RECENT_LIMIT: {}", ENV_PREFIX, e),
            }
        }
    }

    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Write to the default config file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Write to `path`, creating its directory
    pub fn save_to_path(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;
        Ok(())
    }

    /// Default config file, or QUETTE_CONFIG when set
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("quette")
            .join("config.toml")
    }

    /// Path of the file holding a record
    pub fn record_path(&self, key: RecordKey) -> PathBuf {
        self.data_dir.join(key.file_name())
    }

    /// Log file, falling back to `<data_dir>/debug.log`
    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join("debug.log"))
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("quette")
}

fn default_recent_limit() -> usize {
    DEFAULT_RECENT_LIMIT
}
