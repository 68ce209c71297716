//! Pool configuration.

use std::time::Duration;

use crate::error::PoolError;

/// Configuration for a per-host connection pool.
///
/// All limits are fixed for the lifetime of the pool.
///
/// # Example
///
/// ```rust
/// use cql_pool::PoolConfig;
/// use std::time::Duration;
///
/// let config = PoolConfig::new()
///     .core_connections(2)
///     .max_connections(8)
///     .connect_timeout(Duration::from_secs(5));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of connections spawned at pool construction, and the refill
    /// target when the ready set drains to zero.
    pub core_connections: usize,
    /// Upper bound on ready plus in-progress connections.
    pub max_connections: usize,
    /// Upper bound on connections establishing at the same time, enforced
    /// for opportunistic spawns.
    pub max_simultaneous_creation: usize,
    /// Upper bound on requests queued waiting for a connection.
    pub max_pending_requests: usize,
    /// How long a queued request waits for a connection before it expires
    /// and is redistributed.
    pub connect_timeout: Duration,
}

impl PoolConfig {
    /// Create a configuration with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self {
            core_connections: 2,
            max_connections: 8,
            max_simultaneous_creation: 1,
            max_pending_requests: 128,
            connect_timeout: Duration::from_secs(5),
        }
    }

    /// Set the number of core connections.
    #[must_use]
    pub fn core_connections(mut self, count: usize) -> Self {
        self.core_connections = count;
        self
    }

    /// Set the maximum number of connections.
    #[must_use]
    pub fn max_connections(mut self, count: usize) -> Self {
        self.max_connections = count;
        self
    }

    /// Set the maximum number of simultaneously establishing connections.
    #[must_use]
    pub fn max_simultaneous_creation(mut self, count: usize) -> Self {
        self.max_simultaneous_creation = count;
        self
    }

    /// Set the maximum number of queued requests.
    #[must_use]
    pub fn max_pending_requests(mut self, count: usize) -> Self {
        self.max_pending_requests = count;
        self
    }

    /// Set the queued-request expiry timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Check the configuration for consistency.
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.max_connections == 0 {
            return Err(PoolError::ZeroMaxConnections);
        }
        if self.core_connections > self.max_connections {
            return Err(PoolError::CoreExceedsMax {
                core: self.core_connections,
                max: self.max_connections,
            });
        }
        if self.max_simultaneous_creation == 0 {
            return Err(PoolError::ZeroSimultaneousCreation);
        }
        Ok(())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new()
    }
}
