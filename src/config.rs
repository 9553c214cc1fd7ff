//! Walk configuration.
//!
//! Policy knobs are passed to each [`crate::Walker`] instead of living in
//! globals, so walks with different settings can share a process. The
//! struct deserializes from TOML with every field optional:
//!
//! ```toml
//! check_encoding = true
//! save_bad_input = false
//! max_depth = 32
//! body_threshold = 1048576
//! temp_dir = "/var/tmp/mimewalk"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::buffer::DEFAULT_THRESHOLD;
use crate::error::ConfigError;

/// Default limit on how many entity levels a walk descends.
pub const DEFAULT_MAX_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkConfig {
    /// Fail on bodies whose transfer encoding does not decode, instead of
    /// passing the encoded bytes through.
    pub check_encoding: bool,
    /// Keep a copy of entities that fail to parse or decode.
    pub save_bad_input: bool,
    /// Deepest entity nesting a walk accepts.
    pub max_depth: usize,
    /// Bodies up to this many bytes stay in memory.
    pub body_threshold: usize,
    /// Directory for spilled bodies and kept bad input (system temp if unset).
    pub temp_dir: Option<PathBuf>,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            check_encoding: true,
            save_bad_input: false,
            max_depth: DEFAULT_MAX_DEPTH,
            body_threshold: DEFAULT_THRESHOLD,
            temp_dir: None,
        }
    }
}

impl WalkConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::Invalid {
                key: "max_depth".into(),
                details: "must be at least 1".into(),
            });
        }
        if let Some(dir) = &self.temp_dir
            && dir.as_os_str().is_empty()
        {
            return Err(ConfigError::Invalid {
                key: "temp_dir".into(),
                details: "must not be empty".into(),
            });
        }
        Ok(())
    }
}
