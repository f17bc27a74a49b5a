//! Storage configuration.
//!
//! `StoreConfig` is deserialized from TOML. Every key is optional:
//!
//! ```toml
//! path = "warden.db"
//! table = "policy_rule"
//! busy_timeout_ms = 5000
//! operation_timeout_ms = 30000
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use warden_contracts::error::{AdapterError, AdapterResult};

use crate::schema::{validate_table_name, DEFAULT_TABLE};

/// Where and how the adapter stores rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database file.
    pub path: PathBuf,

    /// Policy table name. Used by every operation, load and save alike.
    pub table: String,

    /// How long a statement waits on another connection's lock.
    pub busy_timeout_ms: u64,

    /// Deadline for a whole adapter operation. `0` disables it.
    pub operation_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("warden.db"),
            table: DEFAULT_TABLE.to_string(),
            busy_timeout_ms: 5_000,
            operation_timeout_ms: 30_000,
        }
    }
}

impl StoreConfig {
    /// Default configuration pointing at `path`.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Parse `s` as TOML and validate the result.
    ///
    /// Returns `AdapterError::Config` if the TOML is malformed, has unexpected
    /// value types, or names an unusable table.
    pub fn from_toml_str(s: &str) -> AdapterResult<Self> {
        let config: StoreConfig = toml::from_str(s).map_err(|e| AdapterError::Config {
            reason: format!("failed to parse store config TOML: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read the file at `path` and parse it as TOML store configuration.
    pub fn from_file(path: &Path) -> AdapterResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| AdapterError::Config {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Check values that deserialization alone cannot.
    pub fn validate(&self) -> AdapterResult<()> {
        validate_table_name(&self.table)?;
        if self.path.as_os_str().is_empty() {
            return Err(AdapterError::Config {
                reason: "database path must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// The per-operation deadline, or `None` when disabled.
    pub fn operation_timeout(&self) -> Option<Duration> {
        (self.operation_timeout_ms > 0).then(|| Duration::from_millis(self.operation_timeout_ms))
    }
}
