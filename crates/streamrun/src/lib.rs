//! # STREAMRUN
//!
//! A stream session bound to exactly one run.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  init_run(m)   ┌───────────────────┐
//! │  Init path   │───────────────>│ GuardedRunHandle  │
//! └──────────────┘                └─────────┬─────────┘
//!                                           │ get()
//! ┌──────────────┐   Record   ┌─────────────┴─────────┐   StampedRecord
//! │   submit()   │──────────> │  Worker 1..N threads  │──────────────> outputs()
//! └──────────────┘  (bounded) └───────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `config`: Stream configuration and TOML loading
//! - `error`: Config and stream error types
//! - `record`: Work items and their run-stamped form
//! - `stream`: The session itself

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod record;
pub mod stream;

// Re-export the core
pub use streamrun_core as core;

pub use config::StreamConfig;
pub use error::{ConfigError, Error, StreamError, StreamResult};
pub use record::{Record, StampedRecord};
pub use stream::{Stream, StreamStats};
