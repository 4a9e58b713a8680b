//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! Got has a single user-level configuration file at
//! `<got root>/config.toml`. A missing file means all defaults.
//!
//! # Keys
//!
//! The `got config` command reads and writes individual keys:
//! - `clone_root` - where new clones go (default `<got root>/repos`)
//! - `deps_file` - dependency-declaration file name (default `deps.got`)
//! - `interactive` - prompt by default (default `true`)
//! - `secrets.provider` - `file` or `keychain` (default `file`)
//!
//! # Example
//!
//! ```no_run
//! use got::core::config::Config;
//! use got::core::paths::GotPaths;
//!
//! let paths = GotPaths::from_env().expect("home directory");
//! let config = Config::load(&paths).unwrap();
//! println!("clones go under {}", config.clone_root().display());
//! ```

pub mod schema;

pub use schema::{GotConfig, SecretsConfig};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::paths::GotPaths;

/// Default dependency-declaration file name.
pub const DEFAULT_DEPS_FILE: &str = "deps.got";

/// Keys accepted by [`Config::get`] and [`Config::set`].
pub const KEYS: &[&str] = &["clone_root", "deps_file", "interactive", "secrets.provider"];

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("failed to write config file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("configuration key not found: {0}")]
    UnknownKey(String),
}

/// Loaded configuration plus the paths it was resolved against.
#[derive(Debug, Clone)]
pub struct Config {
    /// Values from the config file
    pub settings: GotConfig,
    /// Storage locations
    paths: GotPaths,
}

impl Config {
    /// Load configuration from `<root>/config.toml`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed, or
    /// validated. A missing file is not an error.
    pub fn load(paths: &GotPaths) -> Result<Self, ConfigError> {
        let path = paths.config_path();
        let settings = if path.exists() {
            Self::read_config(&path)?
        } else {
            GotConfig::default()
        };
        settings.validate()?;

        Ok(Self {
            settings,
            paths: paths.clone(),
        })
    }

    /// Build a configuration from explicit settings.
    pub fn with_settings(paths: GotPaths, settings: GotConfig) -> Self {
        Self { settings, paths }
    }

    fn read_config(path: &Path) -> Result<GotConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Write the configuration atomically.
    ///
    /// Creates parent directories if needed. Uses atomic write
    /// (write to temp file, then rename) to prevent corruption.
    pub fn write(&self) -> Result<PathBuf, ConfigError> {
        let path = self.paths.config_path();
        write_toml_atomic(&path, &self.settings)?;
        Ok(path)
    }

    // =========================================================================
    // Accessors with defaults
    // =========================================================================

    /// The storage locations this config was loaded from.
    pub fn paths(&self) -> &GotPaths {
        &self.paths
    }

    /// Root directory for new clones.
    pub fn clone_root(&self) -> PathBuf {
        self.settings
            .clone_root
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(|| self.paths.default_clone_root())
    }

    /// Dependency-declaration file name.
    pub fn deps_file(&self) -> &str {
        self.settings
            .deps_file
            .as_deref()
            .unwrap_or(DEFAULT_DEPS_FILE)
    }

    /// Check if interactive mode is enabled by default.
    pub fn interactive(&self) -> bool {
        self.settings.interactive.unwrap_or(true)
    }

    /// Get the secrets provider.
    ///
    /// Defaults to "file" if not configured.
    pub fn secrets_provider(&self) -> &str {
        self.settings
            .secrets
            .as_ref()
            .and_then(|s| s.provider.as_deref())
            .unwrap_or("file")
    }

    // =========================================================================
    // Key access
    // =========================================================================

    /// Get the effective value of a key as a string.
    pub fn get(&self, key: &str) -> Result<String, ConfigError> {
        match key {
            "clone_root" => Ok(self.clone_root().display().to_string()),
            "deps_file" => Ok(self.deps_file().to_string()),
            "interactive" => Ok(self.interactive().to_string()),
            "secrets.provider" => Ok(self.secrets_provider().to_string()),
            _ => Err(ConfigError::UnknownKey(key.to_string())),
        }
    }

    /// Set a key, validating the resulting configuration.
    ///
    /// The change is in memory only; call [`Config::write`] to persist.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut updated = self.settings.clone();
        match key {
            "clone_root" => updated.clone_root = Some(value.to_string()),
            "deps_file" => updated.deps_file = Some(value.to_string()),
            "interactive" => {
                let flag = value.parse::<bool>().map_err(|_| {
                    ConfigError::InvalidValue(format!(
                        "interactive must be true or false, got '{}'",
                        value
                    ))
                })?;
                updated.interactive = Some(flag);
            }
            "secrets.provider" => {
                updated.secrets = Some(SecretsConfig {
                    provider: Some(value.to_string()),
                })
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        updated.validate()?;
        self.settings = updated;
        Ok(())
    }

    /// All keys with their effective values, in a stable order.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        KEYS.iter()
            .filter_map(|key| self.get(key).ok().map(|v| (*key, v)))
            .collect()
    }
}

/// Write a TOML document atomically (temp file + rename).
pub(crate) fn write_toml_atomic<T: serde::Serialize>(
    path: &Path,
    value: &T,
) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;
    }

    let contents =
        toml::to_string_pretty(value).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

    let temp_path = path.with_extension("toml.tmp");
    let mut file = fs::File::create(&temp_path).map_err(|e| ConfigError::WriteError {
        path: temp_path.clone(),
        source: e,
    })?;

    file.write_all(contents.as_bytes())
        .map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

    file.sync_all().map_err(|e| ConfigError::WriteError {
        path: temp_path.clone(),
        source: e,
    })?;

    fs::rename(&temp_path, path).map_err(|e| ConfigError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(())
}
