//! # STREAMRUN Core
//!
//! Run-identifying state for a single stream session.
//!
//! A session binds its run metadata exactly once. Any number of worker
//! threads read it afterwards. Reading before the bind, or binding twice,
//! is a programming-sequence bug and is reported as a distinct error.
//!
//! ## Architecture Rules
//!
//! 1. **One shared mutable slot** - All access goes through [`GuardedRunHandle`]
//! 2. **Monotonic state** - `Unbound` → `Bound`, never back
//! 3. **Fail fast** - No retries, no logging, no silent overwrite
//!
//! ## Example
//!
//! ```rust
//! use streamrun_core::{GuardedRunHandle, RunId, RunMetadata};
//!
//! let handle: GuardedRunHandle = GuardedRunHandle::new();
//! assert!(handle.get().is_err());
//!
//! let run = RunMetadata::new(RunId::new("run-1").unwrap()).with_project("demo");
//! handle.bind(run).unwrap();
//! assert_eq!(handle.get().unwrap().id.as_str(), "run-1");
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod error;
pub mod metadata;
pub mod sync;

pub use error::{AlreadyBoundError, MetadataError, NotBoundError, RunStateError, RunStateResult};
pub use metadata::{RunId, RunMetadata};
pub use sync::{GuardedRunHandle, HandleState};
