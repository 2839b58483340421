//! Database configuration
//!
//! A [`DatabaseConfig`] can be built in code (usually through
//! [`crate::DatabaseBuilder`]) or loaded from TOML:
//!
//! ```toml
//! path = "/var/lib/rawkv"
//! lineage_policy = "continue"
//!
//! [durability]
//! mode = "strict"
//! ```
//!
//! Every key is optional. A config without `path` opens an ephemeral
//! database.

use rawkv_core::StoreError;
use rawkv_durability::DurabilityMode;
use rawkv_storage::LineagePolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading failures
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Config file path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Contents are not a valid config
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config could not be rendered
    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    /// Values parse but do not make sense together
    #[error("{0}")]
    Invalid(String),
}

impl From<ConfigError> for StoreError {
    fn from(e: ConfigError) -> Self {
        StoreError::InvalidConfig(e.to_string())
    }
}

/// Settings for opening a [`crate::Database`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Data directory; `None` for an ephemeral database
    pub path: Option<PathBuf>,
    /// Sequence lineage after remove-then-recreate
    pub lineage_policy: LineagePolicy,
    /// WAL fsync policy
    pub durability: DurabilityMode,
}

impl DatabaseConfig {
    /// Parse a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: DatabaseConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    /// Check if this config opens an ephemeral database
    pub fn is_ephemeral(&self) -> bool {
        self.path.is_none()
    }

    /// Reject settings that parse but cannot work
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let DurabilityMode::Batched { batch_size, .. } = self.durability {
            if batch_size == 0 {
                return Err(ConfigError::Invalid(
                    "durability.batch_size must be at least 1".to_string(),
                ));
            }
        }
        if matches!(&self.path, Some(p) if p.as_os_str().is_empty()) {
            return Err(ConfigError::Invalid("path must not be empty".to_string()));
        }
        Ok(())
    }
}
