//! # cql-pool
//!
//! Per-host connection pool for a CQL wire-protocol client.
//!
//! The pool multiplexes application requests across a bounded set of
//! persistent connections to one host. It owns the connection lifecycle
//! (spawn, ready, close, defunct), applies backpressure through a bounded
//! pending-request queue with timeout-driven expiry, and drives a
//! protocol-aware retry path for recoverable per-request failures: write
//! errors and queue expiry are redistributed to another host, and
//! server-side "unprepared statement" errors are re-prepared and retried
//! on the same connection without the caller noticing.
//!
//! ## Features
//!
//! - Least-busy dispatch across multiplexed connection streams
//! - Bounded pending-request queue with per-request expiry timers
//! - Opportunistic pool growth up to configurable limits
//! - Per-request response routing with re-prepare-and-retry
//! - Actor-style event loop binding each pool to one runtime task
//!
//! ## Example
//!
//! ```rust,ignore
//! use cql_pool::{Pool, PoolConfig, PoolRunner};
//!
//! let config = PoolConfig::new()
//!     .core_connections(2)
//!     .max_connections(8);
//!
//! let pool = Pool::new(host, config, factory, timers, listener)?;
//! let (handle, events) = cql_pool::runner::channel();
//! tokio::spawn(PoolRunner::new(pool, events).run());
//!
//! handle.submit(request_handler);
//! ```
//!
//! The pool never opens sockets, encodes frames, or chooses hosts; those
//! concerns enter through the [`Connection`], [`ConnectionFactory`],
//! [`RequestHandler`], and [`PoolListener`] seams.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod connection;
pub mod error;
pub mod pool;
pub mod request;
pub mod router;
pub mod runner;
pub mod timer;

#[cfg(test)]
pub(crate) mod testing;

// Configuration
pub use config::PoolConfig;

// Error types
pub use error::{PoolError, TransportError};

// Collaborator seams
pub use connection::{Connection, ConnectionFactory, ConnectionId, Host};
pub use request::{PoolListener, RequestHandler, RequestId, RetryPolicy};
pub use timer::{TimerHandle, TimerScheduler, TokioTimers};

// Pool types
pub use pool::{Pool, PoolStatus};
pub use router::ResponseRouter;
pub use runner::{PoolEvent, PoolHandle, PoolRunner};
