//! Runtime configuration
//!
//! Typed configuration with defaults and a builder, rather than a
//! free-floating settings map.

use std::path::PathBuf;

/// Top-level runtime configuration for the connector subsystems.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Directory holding the metadata database file.
    pub data_dir: PathBuf,
    /// Maximum number of `TaskResult` rows retained per task.
    pub history_retention: u32,
}

impl RuntimeConfig {
    /// Builds a config rooted at the default data directory
    /// (`<user_home>/.sercha/data`).
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            data_dir: default_data_dir(),
            history_retention: 100,
        }
    }

    /// Builds a config rooted at an explicit data directory (primarily
    /// for tests).
    #[must_use]
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            ..Self::with_defaults()
        }
    }

    /// The path of the metadata database file within `data_dir`.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("metadata.db")
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Resolves the default data directory: `<user_home>/.sercha/data`.
fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".sercha")
        .join("data")
}
