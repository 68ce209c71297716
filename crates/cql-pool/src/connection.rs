//! Connection seam: the contract a physical link must satisfy to be pooled.

use std::net::SocketAddr;

use crate::router::ResponseRouter;

/// Identity of the remote endpoint a pool serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Host {
    address: SocketAddr,
}

impl Host {
    /// Create a host identity from a socket address.
    #[must_use]
    pub fn new(address: SocketAddr) -> Self {
        Self { address }
    }

    /// The host's socket address.
    #[must_use]
    pub fn address(&self) -> SocketAddr {
        self.address
    }
}

impl std::fmt::Display for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.address.fmt(f)
    }
}

/// Stable id the pool assigns to each connection it owns.
///
/// Connections and routers refer to the pool's connections by id rather
/// than by reference, so close events cannot leave dangling links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// One physical link to a host, multiplexing requests over streams.
///
/// A connection fires a connected event exactly once and a closed event
/// exactly once over its lifetime; the embedder delivers both to the
/// owning pool as [`PoolEvent`](crate::runner::PoolEvent)s on the pool's
/// task.
pub trait Connection: Send {
    /// Start the connect/handshake sequence. Completion is reported
    /// through the connected event, whether or not it succeeded.
    fn connect(&mut self);

    /// Whether the handshake completed and the connection accepts requests.
    fn is_ready(&self) -> bool;

    /// Whether a close has been requested or is in progress.
    fn is_closing(&self) -> bool;

    /// Whether the connection failed irrecoverably, as opposed to a clean
    /// close.
    fn is_defunct(&self) -> bool;

    /// Mark the connection irrecoverably failed and begin closing it.
    fn defunct(&mut self);

    /// Number of request streams currently free.
    fn available_streams(&self) -> usize;

    /// Request a clean close. The closed event follows asynchronously.
    fn close(&mut self);

    /// Dispatch one request attempt.
    ///
    /// The connection takes ownership of the router, holds it until the
    /// attempt completes, and invokes exactly one of its completion
    /// methods on the pool's task. If no stream is free the router is
    /// handed back unconsumed.
    fn execute(&mut self, router: ResponseRouter) -> Result<(), ResponseRouter>;
}

/// Creates connections for a pool; the pool itself never opens sockets.
pub trait ConnectionFactory: Send {
    /// Create a connection to `host`, tagged with the pool-assigned `id`.
    fn create(&mut self, host: &Host, id: ConnectionId) -> Box<dyn Connection>;
}
