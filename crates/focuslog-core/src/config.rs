//! TOML-based application configuration.
//!
//! Holds the local installation's identity and push delivery preferences.
//! Stored at `~/.config/focuslog/config.toml`; a missing file is replaced by
//! a freshly generated default (including a new owner id) and written back so
//! the identity stays stable across runs.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::owner::OwnerId;
use crate::storage::data_dir;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot write config at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error(transparent)]
    Store(#[from] crate::error::StoreError),
}

/// Push delivery preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    /// `TTL` header in seconds for outgoing push messages.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u32,
    /// Contact URI advertised to push services (`mailto:` or `https:`).
    #[serde(default)]
    pub subject: Option<String>,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/focuslog/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Identity all records created by this installation belong to.
    #[serde(default = "OwnerId::generate")]
    pub owner_id: OwnerId,
    #[serde(default)]
    pub push: PushConfig,
}

fn default_ttl_secs() -> u32 {
    60
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            subject: None,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            owner_id: OwnerId::generate(),
            push: PushConfig::default(),
        }
    }
}

impl AppConfig {
    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing a fresh default on first run.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed, or if the
    /// generated default cannot be written back.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        Self::load_from(&path)
    }

    /// Load from an explicit path, writing a fresh default when absent.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(_) => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }
}
