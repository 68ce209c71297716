//! Actor-style event loop binding a pool to one runtime task.
//!
//! All pool state is mutated from a single task: producers (the session
//! layer, connection transports, timers) send [`PoolEvent`]s through a
//! [`PoolHandle`], and the [`PoolRunner`] applies them in arrival order.
//! This gives the pool its no-locks invariant on a multi-threaded runtime.

use tokio::sync::mpsc;

use crate::connection::ConnectionId;
use crate::error::TransportError;
use crate::pool::Pool;
use crate::request::{RequestHandler, RequestId};

/// A completion raised off-task (by a connection transport) that must run
/// against the pool on its own task.
pub type Completion = Box<dyn FnOnce(&mut Pool) + Send>;

/// An event applied to a pool on its task.
pub enum PoolEvent {
    /// A caller hands a request to the pool.
    Submit(Box<dyn RequestHandler>),
    /// A connection finished its connect attempt.
    ConnectionConnected(ConnectionId),
    /// A connection finished closing.
    ConnectionClosed(ConnectionId),
    /// A queued request's expiry timer fired.
    RequestTimeout(RequestId),
    /// Run a router completion against the pool.
    Complete(Completion),
    /// Close the pool.
    Close,
}

impl std::fmt::Debug for PoolEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Submit(_) => f.write_str("Submit"),
            Self::ConnectionConnected(id) => write!(f, "ConnectionConnected({id})"),
            Self::ConnectionClosed(id) => write!(f, "ConnectionClosed({id})"),
            Self::RequestTimeout(id) => write!(f, "RequestTimeout({id})"),
            Self::Complete(_) => f.write_str("Complete"),
            Self::Close => f.write_str("Close"),
        }
    }
}

/// Create the event channel for one pool.
#[must_use]
pub fn channel() -> (PoolHandle, mpsc::UnboundedReceiver<PoolEvent>) {
    let (events, receiver) = mpsc::unbounded_channel();
    (PoolHandle { events }, receiver)
}

/// Cloneable sender half of a pool's event queue.
#[derive(Clone)]
pub struct PoolHandle {
    events: mpsc::UnboundedSender<PoolEvent>,
}

impl PoolHandle {
    /// Hand a request to the pool.
    ///
    /// `Err` returns the handler if the pool's runner is gone.
    pub fn submit(
        &self,
        handler: Box<dyn RequestHandler>,
    ) -> Result<(), Box<dyn RequestHandler>> {
        match self.events.send(PoolEvent::Submit(handler)) {
            Ok(()) => Ok(()),
            Err(err) => match err.0 {
                PoolEvent::Submit(handler) => Err(handler),
                _ => unreachable!(),
            },
        }
    }

    /// Deliver a connection's connected event.
    pub fn connection_connected(&self, id: ConnectionId) -> bool {
        self.send(PoolEvent::ConnectionConnected(id))
    }

    /// Deliver a connection's closed event.
    pub fn connection_closed(&self, id: ConnectionId) -> bool {
        self.send(PoolEvent::ConnectionClosed(id))
    }

    /// Run a router completion against the pool on its task.
    pub fn complete(&self, completion: Completion) -> bool {
        self.send(PoolEvent::Complete(completion))
    }

    /// Ask the pool to close.
    pub fn close(&self) -> bool {
        self.send(PoolEvent::Close)
    }

    pub(crate) fn send(&self, event: PoolEvent) -> bool {
        self.events.send(event).is_ok()
    }
}

/// Owns a pool and applies its events in arrival order.
pub struct PoolRunner {
    pool: Pool,
    events: mpsc::UnboundedReceiver<PoolEvent>,
}

impl PoolRunner {
    /// Bind a pool to its event receiver.
    #[must_use]
    pub fn new(pool: Pool, events: mpsc::UnboundedReceiver<PoolEvent>) -> Self {
        Self { pool, events }
    }

    /// The pool being driven.
    #[must_use]
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Apply events until the pool finishes closing (or every handle is
    /// dropped), then return the pool.
    pub async fn run(mut self) -> Pool {
        while let Some(event) = self.events.recv().await {
            self.apply(event);
            if self.pool.is_closed() {
                break;
            }
        }
        self.pool
    }

    fn apply(&mut self, event: PoolEvent) {
        tracing::trace!(host = %self.pool.host(), event = ?event, "pool event");
        match event {
            PoolEvent::Submit(handler) => {
                if let Err(handler) = self.pool.submit(handler) {
                    // Saturation is a terminal failure for this attempt;
                    // the caller decides whether to try another pool.
                    handler.on_error(TransportError::QueueFull);
                }
            }
            PoolEvent::ConnectionConnected(id) => self.pool.on_connection_connect(id),
            PoolEvent::ConnectionClosed(id) => self.pool.on_connection_close(id),
            PoolEvent::RequestTimeout(id) => self.pool.on_request_timeout(id),
            PoolEvent::Complete(completion) => completion(&mut self.pool),
            PoolEvent::Close => self.pool.close(),
        }
    }
}
