//! Error types for pagestore-core

use thiserror::Error;

use crate::catalog::Operation;

/// Outcome of one logical operation.
pub type OperationResult<T> = Result<T, StoreError>;

/// Failure kinds surfaced by the store.
///
/// A missing page is not an error: lookups return `Ok(None)`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The catalog has no statement for this operation.
    #[error("no statement configured for operation '{0}'")]
    UnknownOperation(Operation),

    /// The pool could not hand out a connection (exhausted, closed, or backend unreachable).
    #[error("connection unavailable: {0}")]
    ConnectionUnavailable(String),

    #[error("parameter binding for '{operation}': expected {expected} parameter(s), got {actual}")]
    ParameterBinding {
        operation: Operation,
        expected: usize,
        actual: usize,
    },

    /// The backend rejected or failed the statement.
    #[error("statement execution failed: {0}")]
    Execution(String),

    #[error("operation '{0}' was cancelled before completing")]
    Cancelled(Operation),

    #[error("configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Any failure while acquiring counts as the pool being unable to supply a lease.
    pub(crate) fn from_acquire(err: sqlx::Error) -> Self {
        StoreError::ConnectionUnavailable(err.to_string())
    }

    /// Whether a caller may reasonably retry the operation later.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::ConnectionUnavailable(_))
    }
}

/// Errors raised while a statement runs on a leased connection.
///
/// Acquisition goes through [`StoreError::from_acquire`] instead, so anything
/// reaching this conversion is an execution failure.
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Execution(err.to_string())
    }
}

impl From<toml::de::Error> for StoreError {
    fn from(err: toml::de::Error) -> Self {
        StoreError::Config(err.to_string())
    }
}
