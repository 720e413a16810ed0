//! # Records
//!
//! What callers submit to a stream, and what workers emit once the record
//! has been tagged with the bound run.

use streamrun_core::{RunId, RunMetadata};

/// A unit of work submitted to a [`Stream`](crate::Stream).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    /// Step relative to the start of this process.
    pub step: u64,
    /// Opaque payload.
    pub payload: String,
}

impl Record {
    /// Creates a record.
    #[must_use]
    pub fn new(step: u64, payload: impl Into<String>) -> Self {
        Self {
            step,
            payload: payload.into(),
        }
    }

    /// Tags this record with `run`.
    ///
    /// Steps are offset by the run's starting step so a resumed run keeps
    /// counting where it left off.
    #[must_use]
    pub fn stamp(self, run: &RunMetadata) -> StampedRecord {
        StampedRecord {
            run_id: run.id.clone(),
            project: run.project.clone(),
            step: run.starting_step.saturating_add(self.step),
            payload: self.payload,
        }
    }
}

/// A record tagged with the run it belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StampedRecord {
    /// Run the record belongs to.
    pub run_id: RunId,
    /// Project of that run.
    pub project: Option<String>,
    /// Absolute step within the run.
    pub step: u64,
    /// Opaque payload.
    pub payload: String,
}
