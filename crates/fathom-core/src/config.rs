//! Query configuration.
//!
//! Applications provide a [`QueryConfig`] when opening a search scope. Every
//! field has a default, so an empty TOML document is a valid configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{BooleanOperator, FailedLoadPolicy};

/// Query configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Page size used by `fetch()` when no limit was set.
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Operator combining bare simple-query-string terms.
    #[serde(default)]
    pub default_operator: BooleanOperator,

    /// Largest edit distance accepted by fuzzy predicates.
    #[serde(default = "default_max_edit_distance")]
    pub max_edit_distance: u8,

    /// Policy for hits whose entity failed to load.
    #[serde(default)]
    pub failed_load_policy: FailedLoadPolicy,

    /// Log compiled native queries at trace level.
    #[serde(default)]
    pub log_native_queries: bool,
}

fn default_limit() -> usize {
    10
}

fn default_max_edit_distance() -> u8 {
    2
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            default_operator: BooleanOperator::default(),
            max_edit_distance: default_max_edit_distance(),
            failed_load_policy: FailedLoadPolicy::default(),
            log_native_queries: false,
        }
    }
}

impl QueryConfig {
    /// Parses a configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: QueryConfig =
            toml::from_str(content).map_err(|e| Error::config(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        log::debug!("Loading query config from {}", path.display());
        Self::from_toml_str(&content)
    }

    /// Checks value ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.default_limit == 0 {
            return Err(Error::config("default_limit must be greater than 0"));
        }
        if self.max_edit_distance > 2 {
            return Err(Error::config(format!(
                "max_edit_distance must be 0, 1 or 2, got {}",
                self.max_edit_distance
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
