//! Store configuration.
//!
//! Configuration is deliberately small: where the gallery tree lives and
//! how long generated identifiers may grow. Rendition envelopes and JPEG
//! quality are application logic, not configuration — they are constants
//! in [`crate::ingest`].
//!
//! A config file is optional and sparse:
//!
//! ```toml
//! # gallerist.toml — defaults shown
//! root_dir = "galleries"
//! max_id_length = 30
//! ```
//!
//! Unknown keys are rejected to catch typos early. The `GALLERIES_ROOT_DIR`
//! environment variable overrides `root_dir` regardless of source, so a
//! deployment can relocate the tree without touching the file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Environment variable overriding the galleries root directory.
pub const ROOT_DIR_ENV: &str = "GALLERIES_ROOT_DIR";

/// Settings for a [`GalleryStore`](crate::store::GalleryStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Root directory holding one subdirectory per gallery.
    pub root_dir: PathBuf,
    /// Upper bound on generated gallery identifiers, suffixes included.
    pub max_id_length: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("galleries"),
            max_id_length: 30,
        }
    }
}

impl StoreConfig {
    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply the `GALLERIES_ROOT_DIR` environment override, if set.
    pub fn apply_env(self) -> Self {
        self.with_root_override(std::env::var(ROOT_DIR_ENV).ok())
    }

    fn with_root_override(mut self, root: Option<String>) -> Self {
        if let Some(dir) = root
            && !dir.is_empty()
        {
            self.root_dir = PathBuf::from(dir);
        }
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_id_length == 0 {
            return Err(ConfigError::Validation(
                "max_id_length must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
