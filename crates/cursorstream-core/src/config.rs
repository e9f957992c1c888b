//! Runtime configuration for cursor streaming.
//!
//! Every field has a default; a TOML document only needs to name what it
//! overrides.

use serde::Deserialize;
use std::{fs, path::Path};
use thiserror::Error as ThisError;

///
/// CONSTANTS
///

/// Prefix for generated cursor names.
pub const DEFAULT_NAME_PREFIX: &str = "cursor_";

/// PostgreSQL truncates identifiers beyond `NAMEDATALEN - 1` bytes.
pub const DEFAULT_MAX_IDENTIFIER_LEN: usize = 63;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

///
/// StreamConfig
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StreamConfig {
    pub cursor: CursorConfig,
    pub grouping: GroupingConfig,
}

impl StreamConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;

        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let prefix = &self.cursor.name_prefix;

        if prefix.is_empty() {
            return Err(ConfigError::Invalid(
                "cursor.name_prefix must not be empty".to_string(),
            ));
        }
        if prefix.contains('\0') {
            return Err(ConfigError::Invalid(
                "cursor.name_prefix must not contain NUL".to_string(),
            ));
        }

        // u64::MAX has 20 digits; generated names must always fit.
        if prefix.len() + 20 > self.cursor.max_identifier_len {
            return Err(ConfigError::Invalid(format!(
                "cursor.name_prefix '{prefix}' leaves no room for a generated suffix within {} bytes",
                self.cursor.max_identifier_len
            )));
        }

        Ok(())
    }
}

///
/// CursorConfig
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CursorConfig {
    pub name_prefix: String,
    pub max_identifier_len: usize,
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self {
            name_prefix: DEFAULT_NAME_PREFIX.to_string(),
            max_identifier_len: DEFAULT_MAX_IDENTIFIER_LEN,
        }
    }
}

///
/// GroupingConfig
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GroupingConfig {
    pub clustering: ClusteringMode,
}

///
/// ClusteringMode
///
/// How the grouper treats a root key that reappears after its group closed.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ClusteringMode {
    /// Trust the query ordering; a recurring key starts a second group.
    #[default]
    Assume,

    /// Remember emitted keys and fail on recurrence. Memory grows with the
    /// number of distinct root keys.
    Verify,
}

///
/// TESTS
///
