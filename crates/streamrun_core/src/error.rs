//! # Run State Error Types
//!
//! Both handle errors are logic errors: the caller sequenced its calls
//! wrong. Neither is transient and neither should be retried.

use thiserror::Error;

/// Returned by [`GuardedRunHandle::bind`](crate::GuardedRunHandle::bind)
/// when the handle already holds a run.
///
/// The existing value is left intact.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("stream: run is already bound")]
pub struct AlreadyBoundError;

/// Returned by [`GuardedRunHandle::get`](crate::GuardedRunHandle::get)
/// when no run has been bound yet.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("stream: no run bound, session has not finished initializing")]
pub struct NotBoundError;

/// Either handle error, for callers that propagate both with `?`.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStateError {
    /// Double initialization.
    #[error(transparent)]
    AlreadyBound(#[from] AlreadyBoundError),

    /// Accessed too early.
    #[error(transparent)]
    NotBound(#[from] NotBoundError),
}

/// Errors building a [`RunMetadata`](crate::RunMetadata) record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    /// Run ids identify the run server-side and cannot be blank.
    #[error("run id must not be empty")]
    EmptyRunId,
}

/// Result type for operations that may hit either handle error.
pub type RunStateResult<T> = Result<T, RunStateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_convert_into_umbrella() {
        let err: RunStateError = AlreadyBoundError.into();
        assert_eq!(err, RunStateError::AlreadyBound(AlreadyBoundError));

        let err: RunStateError = NotBoundError.into();
        assert_eq!(err, RunStateError::NotBound(NotBoundError));
    }

    #[test]
    fn test_error_messages_are_distinct() {
        let already = RunStateError::from(AlreadyBoundError).to_string();
        let not_bound = RunStateError::from(NotBoundError).to_string();
        assert_eq!(already, "stream: run is already bound");
        assert!(not_bound.starts_with("stream: no run bound"));
        assert_ne!(already, not_bound);
    }
}
