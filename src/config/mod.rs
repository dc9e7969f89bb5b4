//! config
//!
//! Settings schema and loading.
//!
//! # Design
//!
//! Settings are immutable snapshots: [`SettingsLoader::read_settings`] is
//! called at the start of every operation and returns an `Arc` to a fully
//! validated tree, or `None` when the file is missing or invalid. A settings
//! file edited mid-flight never corrupts an in-progress operation; it is
//! simply picked up by the next one.
//!
//! "Not configured" is never fatal — callers treat `None` as "operation
//! skipped" and surface a notification instead of an error.

mod schema;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

pub use schema::{
    AppSettings, AuthMethod, BitbucketServerSettings, CloneType, CodeHostKind, CodeHostSettings,
    ForkPolicy, GithubComSettings, GithubSearchSettings, HostAuth, HttpsOverride, KeepLocalRepos,
    SearchHostKind, SearchHostSettings, SourcegraphSettings,
};

/// Errors from settings parsing and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the settings file.
    #[error("failed to read settings: {0}")]
    Io(String),

    /// The file is not valid TOML for the schema.
    #[error("failed to parse settings: {0}")]
    Parse(String),

    /// A value violates a schema invariant.
    #[error("invalid settings value: {0}")]
    InvalidValue(String),
}

/// Source of settings snapshots.
pub trait SettingsLoader: Send + Sync {
    /// Read and validate the current settings.
    ///
    /// Returns `None` when no valid settings exist. Implementations log the
    /// reason; callers only see "not configured".
    fn read_settings(&self) -> Option<Arc<AppSettings>>;
}

/// Loads settings from a TOML file on every call.
pub struct TomlSettingsLoader {
    path: PathBuf,
}

impl TomlSettingsLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default settings location: `<config dir>/repoherd/config.toml`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("repoherd")
            .join("config.toml")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse and validate, returning the error for display.
    pub fn try_read(&self) -> Result<AppSettings, ConfigError> {
        let raw = std::fs::read_to_string(&self.path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", self.path.display(), e)))?;
        let settings: AppSettings =
            toml::from_str(&raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}

impl SettingsLoader for TomlSettingsLoader {
    fn read_settings(&self) -> Option<Arc<AppSettings>> {
        match self.try_read() {
            Ok(settings) => Some(Arc::new(settings)),
            Err(ConfigError::Io(_)) => None,
            Err(e) => {
                log::warn!("settings file rejected: {}", e);
                None
            }
        }
    }
}

/// Fixed settings, for tests and embedding.
pub struct StaticSettingsLoader {
    settings: Arc<AppSettings>,
}

impl StaticSettingsLoader {
    pub fn new(settings: AppSettings) -> Self {
        Self {
            settings: Arc::new(settings),
        }
    }
}

impl SettingsLoader for StaticSettingsLoader {
    fn read_settings(&self) -> Option<Arc<AppSettings>> {
        Some(Arc::clone(&self.settings))
    }
}

/// Loader that always reports "not configured".
pub struct UnconfiguredLoader;

impl SettingsLoader for UnconfiguredLoader {
    fn read_settings(&self) -> Option<Arc<AppSettings>> {
        None
    }
}
