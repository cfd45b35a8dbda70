//! Persisted user preferences.
//!
//! Preferences are layered with figment, later layers winning:
//!
//! 1. Built-in defaults
//! 2. The preferences file (`preferences.toml` in the platform config dir)
//! 3. `DOCSIFT_`-prefixed environment variables (e.g. `DOCSIFT_THRESHOLD=4`)
//!
//! Loading never fails: a missing or unreadable file falls back to the
//! defaults. Saving writes the file as TOML.

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::similarity::DEFAULT_THRESHOLD;

/// Name of the preferences file inside the config directory.
pub const PREFERENCES_FILE: &str = "preferences.toml";

/// Prefix of environment variables that override preferences.
pub const ENV_PREFIX: &str = "DOCSIFT_";

/// Errors raised while loading or saving preferences.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No home/config directory could be determined.
    #[error("Failed to determine the configuration directory")]
    NoConfigDir,

    /// The layered configuration could not be extracted.
    #[error("Invalid preferences: {0}")]
    Extract(#[from] Box<figment::Error>),

    /// The preferences could not be serialised.
    #[error("Failed to serialise preferences: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Reading or writing the preferences file failed.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Preferences file path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// User preferences that survive between sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Hamming-distance threshold for grouping.
    pub threshold: u32,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl Preferences {
    /// Default platform-specific preferences path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoConfigDir`] when no home directory is known.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let dirs = ProjectDirs::from("com", "docsift", "docsift").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join(PREFERENCES_FILE))
    }

    /// The figment stack for a given preferences file.
    #[must_use]
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    /// Load from `path` (or the default path), falling back to defaults.
    #[must_use]
    pub fn load(path: Option<&Path>) -> Self {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Ok(p) => p,
                Err(e) => {
                    log::debug!("{}, using default preferences", e);
                    return Self::default();
                }
            },
        };
        match Self::load_from(&path) {
            Ok(prefs) => prefs,
            Err(e) => {
                log::debug!("Failed to load preferences, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Load from a specific file with the full layering.
    ///
    /// A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Extract`] for a malformed file or override.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        Self::figment(path)
            .extract()
            .map_err(|e| ConfigError::Extract(Box::new(e)))
    }

    /// Save to `path` (or the default path), creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be written.
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save to a specific file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(io_err)?;
        log::debug!("Saved preferences to {}", path.display());
        Ok(())
    }
}
