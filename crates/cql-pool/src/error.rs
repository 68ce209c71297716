//! Pool error types.

use thiserror::Error;

/// Errors raised when constructing a pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// `max_connections` must allow at least one connection.
    #[error("max_connections must be at least 1")]
    ZeroMaxConnections,

    /// `core_connections` cannot exceed `max_connections`.
    #[error("core_connections ({core}) exceeds max_connections ({max})")]
    CoreExceedsMax {
        /// Configured core connection count.
        core: usize,
        /// Configured maximum connection count.
        max: usize,
    },

    /// `max_simultaneous_creation` must allow at least one spawn.
    #[error("max_simultaneous_creation must be at least 1")]
    ZeroSimultaneousCreation,
}

/// Failures a connection or the pool reports for one request attempt.
///
/// [`TransportError::WriteFailed`] is the one retryable case: the request
/// never reached the server, so it is redistributed to another host
/// instead of being surfaced to the caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The request could not be written to the socket.
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// The connection closed while the request was in flight.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// The pool rejected the request because its pending queue is full or
    /// the pool is closing.
    #[error("request queue full")]
    QueueFull,

    /// An internal driver failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TransportError {
    /// Whether this failure means the request never reached the server and
    /// is safe to retry elsewhere.
    #[must_use]
    pub fn is_write_error(&self) -> bool {
        matches!(self, Self::WriteFailed(_))
    }
}
