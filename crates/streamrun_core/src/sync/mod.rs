//! # Synchronization Primitives for Stream Sessions
//!
//! ## The Problem
//!
//! ```text
//! Init path:      BIND run metadata (once)
//! Worker 1..N:    READ run metadata (many times, any thread)
//!
//! Ambient global:   anyone can overwrite it, nil reads look like "no run"
//! ```
//!
//! ## The Solution: A Guarded One-Shot Slot
//!
//! ```text
//! Unbound ──bind(m)──> Bound(m)
//!    │                    │
//!    └─get() → NotBound   ├─get()   → m
//!                         └─bind(_) → AlreadyBound, m kept
//! ```
//!
//! One mutex, one optional field, two accessors.

mod guarded_handle;

pub use guarded_handle::{GuardedRunHandle, HandleState};
