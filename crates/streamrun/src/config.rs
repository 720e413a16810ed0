//! # Stream Configuration
//!
//! Loaded once at startup from TOML:
//!
//! ```toml
//! stream_id = "trainer-0"
//! workers = 4
//! queue_capacity = 1024
//!
//! [run]
//! id = "run-1"
//! project = "vision"
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use streamrun_core::RunMetadata;

use crate::error::ConfigError;

/// Default number of worker threads.
pub const DEFAULT_WORKERS: usize = 4;

/// Default capacity of the input queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Configuration for a [`Stream`](crate::Stream).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StreamConfig {
    /// Name used in logs.
    pub stream_id: String,
    /// Number of worker threads.
    pub workers: usize,
    /// Records the input queue holds before `submit` blocks.
    pub queue_capacity: usize,
    /// Run to bind at startup, if known ahead of time.
    pub run: Option<RunMetadata>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            stream_id: "stream".to_owned(),
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            run: None,
        }
    }
}

impl StreamConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] for malformed TOML or unknown keys, including
    /// keys under `[run]`. [`ConfigError::Invalid`] if validation fails.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] for an empty `stream_id`, zero `workers` or
    /// zero `queue_capacity`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stream_id.trim().is_empty() {
            return Err(ConfigError::Invalid("stream_id must not be empty".to_owned()));
        }
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".to_owned()));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid("queue_capacity must be at least 1".to_owned()));
        }
        Ok(())
    }
}
