//! Error types for handle operations.

/// Every connection attempt failed.
#[derive(Debug, thiserror::Error)]
#[error("could not connect after {attempts} attempt(s): {source}")]
pub struct ConnectionExhaustedError<E> {
    /// Total number of attempts made.
    pub attempts: u32,
    /// Error returned by the last attempt.
    pub source: E,
}

/// Errors returned by [`Connector::connect`](crate::Connector::connect).
#[derive(Debug, thiserror::Error)]
pub enum ConnectError<E> {
    /// Every permitted attempt failed.
    #[error(transparent)]
    Exhausted(#[from] ConnectionExhaustedError<E>),

    /// An attempt failed with an error the connection policy does not retry.
    #[error("connect attempt {attempt} failed with a non-retryable error: {source}")]
    NotRetryable {
        /// The attempt that failed.
        attempt: u32,
        /// Error returned by that attempt.
        source: E,
    },

    /// The handle is shutting down or already closed.
    #[error("handle is closed")]
    Closed,
}

impl<E> ConnectError<E> {
    /// Number of attempts made, zero when the handle was closed.
    pub fn attempts(&self) -> u32 {
        match self {
            ConnectError::Exhausted(err) => err.attempts,
            ConnectError::NotRetryable { attempt, .. } => *attempt,
            ConnectError::Closed => 0,
        }
    }

    /// Returns true if the connection policy's attempt cap was reached.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, ConnectError::Exhausted(_))
    }
}

/// Errors returned by
/// [`UnitOfWork::run_with_retry`](crate::UnitOfWork::run_with_retry).
///
/// The failing variants carry the endpoint's own error untouched so callers
/// can still tell a constraint violation from a timeout.
#[derive(Debug, thiserror::Error)]
pub enum OperationError<E> {
    /// Every permitted attempt failed.
    #[error("operation failed after {attempts} attempt(s): {source}")]
    Exhausted {
        /// Total number of attempts made.
        attempts: u32,
        /// Error returned by the last attempt.
        source: E,
    },

    /// An attempt failed with an error the operation policy does not retry.
    #[error("operation attempt {attempt} failed with a non-retryable error: {source}")]
    NotRetryable {
        /// The attempt that failed.
        attempt: u32,
        /// Error returned by that attempt.
        source: E,
    },

    /// Shutdown has begun; the operation was not started.
    #[error("handle is shutting down; operation refused")]
    ShuttingDown,
}

impl<E> OperationError<E> {
    /// Number of attempts made before giving up. `ShuttingDown` reports
    /// zero.
    pub fn attempts(&self) -> u32 {
        match self {
            OperationError::Exhausted { attempts, .. } => *attempts,
            OperationError::NotRetryable { attempt, .. } => *attempt,
            OperationError::ShuttingDown => 0,
        }
    }

    /// Borrows the underlying error, if an attempt was made.
    pub fn cause(&self) -> Option<&E> {
        match self {
            OperationError::Exhausted { source, .. } | OperationError::NotRetryable { source, .. } => {
                Some(source)
            }
            OperationError::ShuttingDown => None,
        }
    }

    /// Returns the underlying error unchanged, if an attempt was made.
    pub fn into_cause(self) -> Option<E> {
        match self {
            OperationError::Exhausted { source, .. } | OperationError::NotRetryable { source, .. } => {
                Some(source)
            }
            OperationError::ShuttingDown => None,
        }
    }

    /// Returns true if the operation policy's attempt cap was reached.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, OperationError::Exhausted { .. })
    }
}

/// Releasing the handle failed.
///
/// Shutdown still completes: the handle is marked closed and the process
/// may exit.
#[derive(Debug, thiserror::Error)]
#[error("failed to release handle {handle}: {source}")]
pub struct ShutdownFailure<E> {
    /// Name of the handle.
    pub handle: String,
    /// Error returned by the endpoint's close.
    pub source: E,
}
