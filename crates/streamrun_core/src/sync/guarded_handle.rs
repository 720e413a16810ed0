//! # Guarded Run Handle
//!
//! Race-free one-shot assignment with shared reads afterwards.
//!
//! ## Thread Safety
//!
//! - `bind`: takes the lock, checks the slot, stores on success
//! - `get`: takes the lock, clones the `Arc` out, releases
//!
//! The lock is never held across I/O or a suspension point, and never
//! while running caller code: the metadata is converted into an `Arc`
//! before the lock is taken.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{AlreadyBoundError, NotBoundError};
use crate::metadata::RunMetadata;

/// Observable state of a [`GuardedRunHandle`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HandleState {
    /// No run bound yet. Initial state.
    Unbound,
    /// A run is bound. Terminal state.
    Bound,
}

/// Holds a session's run metadata, bound exactly once.
///
/// The handle owns the slot, not the metadata. Readers receive a shared
/// `Arc` to the same allocation that was bound.
///
/// ## Usage
///
/// ```rust
/// use std::sync::Arc;
/// use streamrun_core::{GuardedRunHandle, RunId, RunMetadata};
///
/// let handle = Arc::new(GuardedRunHandle::<RunMetadata>::new());
///
/// // Session initialization
/// handle.bind(RunMetadata::new(RunId::new("run-1").unwrap())).unwrap();
///
/// // Any worker, any thread
/// let worker_view = Arc::clone(&handle);
/// std::thread::spawn(move || {
///     let run = worker_view.get().unwrap();
///     assert_eq!(run.id.as_str(), "run-1");
/// })
/// .join()
/// .unwrap();
/// ```
pub struct GuardedRunHandle<M = RunMetadata> {
    /// `None` until the first successful bind, `Some` forever after.
    slot: Mutex<Option<Arc<M>>>,
}

impl<M> GuardedRunHandle<M> {
    /// Creates an unbound handle.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Binds the run metadata.
    ///
    /// Accepts an owned value or an existing `Arc`; binding an `Arc` keeps
    /// its identity, so [`get`](Self::get) returns a pointer-equal clone.
    ///
    /// # Errors
    ///
    /// Returns [`AlreadyBoundError`] if a run is already bound. The bound
    /// value is not touched and `metadata` is dropped.
    pub fn bind(&self, metadata: impl Into<Arc<M>>) -> Result<(), AlreadyBoundError> {
        let metadata = metadata.into();

        let mut slot = self.slot.lock();
        if slot.is_some() {
            return Err(AlreadyBoundError);
        }
        *slot = Some(metadata);
        Ok(())
    }

    /// Returns the bound run metadata.
    ///
    /// # Errors
    ///
    /// Returns [`NotBoundError`] if called before a successful
    /// [`bind`](Self::bind).
    pub fn get(&self) -> Result<Arc<M>, NotBoundError> {
        self.slot.lock().as_ref().map(Arc::clone).ok_or(NotBoundError)
    }

    /// Returns the current state.
    ///
    /// Only `Bound` is stable: an `Unbound` answer may be stale by the
    /// time the caller acts on it.
    #[must_use]
    pub fn state(&self) -> HandleState {
        if self.slot.lock().is_some() {
            HandleState::Bound
        } else {
            HandleState::Unbound
        }
    }

    /// Returns whether a run is bound.
    #[inline]
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.state() == HandleState::Bound
    }
}

impl<M> Default for GuardedRunHandle<M> {
    fn default() -> Self {
        Self::new()
    }
}

// The metadata is opaque here, so only the state is printed.
impl<M> fmt::Debug for GuardedRunHandle<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardedRunHandle")
            .field("state", &self.state())
            .finish()
    }
}
