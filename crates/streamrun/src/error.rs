//! # Stream Error Types

use std::path::PathBuf;

use streamrun_core::{AlreadyBoundError, NotBoundError, RunStateError};
use thiserror::Error;

/// Errors loading or validating a [`StreamConfig`](crate::StreamConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// File that was read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config parsed but a value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors from a running [`Stream`](crate::Stream).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// Run handle misuse: double init or access before init.
    #[error(transparent)]
    RunState(#[from] RunStateError),

    /// The stream no longer accepts records.
    #[error("stream is closed")]
    Closed,

    /// The input queue is full and no workers are running to drain it.
    #[error("stream queue is full and no workers are running")]
    NotStarted,

    /// The OS refused to start a worker thread.
    #[error("failed to spawn stream worker {worker}: {reason}")]
    Spawn {
        /// Index of the worker that failed to start.
        worker: usize,
        /// OS error message.
        reason: String,
    },

    /// Workers were spawned twice.
    #[error("stream workers are already running")]
    WorkersAlreadyRunning,

    /// A worker thread panicked before shutdown.
    #[error("stream worker {0} panicked")]
    WorkerPanicked(usize),
}

impl From<AlreadyBoundError> for StreamError {
    fn from(err: AlreadyBoundError) -> Self {
        Self::RunState(err.into())
    }
}

impl From<NotBoundError> for StreamError {
    fn from(err: NotBoundError) -> Self {
        Self::RunState(err.into())
    }
}

/// Result type for stream operations.
pub type StreamResult<T> = Result<T, StreamError>;

/// Top-level error for the binary.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The stream failed.
    #[error(transparent)]
    Stream(#[from] StreamError),
}
