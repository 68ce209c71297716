//! Per-host connection pool: lifecycle, dispatch, and backpressure.

use std::collections::VecDeque;

use hashbrown::HashMap;

use crate::config::PoolConfig;
use crate::connection::{Connection, ConnectionFactory, ConnectionId, Host};
use crate::error::PoolError;
use crate::request::{PoolListener, RequestHandler, RequestId, RetryPolicy};
use crate::router::ResponseRouter;
use crate::timer::{TimerHandle, TimerScheduler};

/// A request parked in the pending queue, together with its expiry timer.
struct QueuedRequest {
    id: RequestId,
    handler: Box<dyn RequestHandler>,
    timer: TimerHandle,
}

/// Connection pool for a single host.
///
/// The pool owns its connections in an id-keyed arena and tracks which of
/// them are ready for dispatch and which are still establishing. Requests
/// that cannot be dispatched immediately wait in a bounded FIFO queue,
/// each guarded by an expiry timer. All methods expect to be called from
/// one task; the pool holds no locks.
///
/// Lifecycle events (connected, closed, request expiry) arrive through
/// [`on_connection_connect`](Pool::on_connection_connect),
/// [`on_connection_close`](Pool::on_connection_close), and
/// [`on_request_timeout`](Pool::on_request_timeout), typically delivered
/// by a [`PoolRunner`](crate::runner::PoolRunner).
pub struct Pool {
    host: Host,
    config: PoolConfig,
    connections: HashMap<ConnectionId, Box<dyn Connection>>,
    ready: Vec<ConnectionId>,
    pending_connect: Vec<ConnectionId>,
    pending_requests: VecDeque<QueuedRequest>,
    closing: bool,
    closed_notified: bool,
    next_connection_id: u64,
    next_request_id: u64,
    factory: Box<dyn ConnectionFactory>,
    timers: Box<dyn TimerScheduler>,
    listener: Box<dyn PoolListener>,
}

impl Pool {
    /// Create a pool and spawn its core connections.
    pub fn new(
        host: Host,
        config: PoolConfig,
        factory: Box<dyn ConnectionFactory>,
        timers: Box<dyn TimerScheduler>,
        listener: Box<dyn PoolListener>,
    ) -> Result<Self, PoolError> {
        config.validate()?;

        let mut pool = Self {
            host,
            config,
            connections: HashMap::new(),
            ready: Vec::new(),
            pending_connect: Vec::new(),
            pending_requests: VecDeque::new(),
            closing: false,
            closed_notified: false,
            next_connection_id: 1,
            next_request_id: 1,
            factory,
            timers,
            listener,
        };

        tracing::info!(
            host = %pool.host,
            core = pool.config.core_connections,
            max = pool.config.max_connections,
            "connection pool created"
        );

        for _ in 0..pool.config.core_connections {
            pool.spawn_connection();
        }

        Ok(pool)
    }

    /// The host this pool serves.
    #[must_use]
    pub fn host(&self) -> &Host {
        &self.host
    }

    /// Whether the pool is closing or closed.
    #[must_use]
    pub fn is_closing(&self) -> bool {
        self.closing
    }

    /// Whether the pool has finished closing and notified its listener.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed_notified
    }

    /// A snapshot of the pool's occupancy.
    #[must_use]
    pub fn status(&self) -> PoolStatus {
        PoolStatus {
            ready: self.ready.len(),
            pending_connect: self.pending_connect.len(),
            pending_requests: self.pending_requests.len(),
            max_connections: self.config.max_connections,
        }
    }

    /// Hand one request to the pool: dispatch it to a ready connection if
    /// possible, otherwise park it in the pending queue.
    ///
    /// `Err` returns the handler when the pool is saturated (closing, or
    /// the queue is full); the caller decides how to fail or re-route it.
    pub fn submit(
        &mut self,
        handler: Box<dyn RequestHandler>,
    ) -> Result<(), Box<dyn RequestHandler>> {
        match self.borrow_connection() {
            Some(id) => match self.execute_on_connection(id, handler) {
                Ok(()) => Ok(()),
                // Lost the race for the last stream; fall back to the queue.
                Err(handler) => self.wait_for_connection(handler),
            },
            None => self.wait_for_connection(handler),
        }
    }

    /// Spawn one connection unconditionally (unless closing).
    fn spawn_connection(&mut self) {
        if self.closing {
            return;
        }

        let id = ConnectionId::new(self.next_connection_id);
        self.next_connection_id += 1;

        let mut connection = self.factory.create(&self.host, id);
        connection.connect();
        self.connections.insert(id, connection);
        self.pending_connect.push(id);

        tracing::debug!(host = %self.host, connection = %id, "spawning connection");
    }

    /// Spawn one more connection if both creation limits allow it.
    fn maybe_spawn_connection(&mut self) {
        if self.pending_connect.len() >= self.config.max_simultaneous_creation {
            return;
        }
        if self.ready.len() + self.pending_connect.len() >= self.config.max_connections {
            return;
        }
        self.spawn_connection();
    }

    /// A connection finished its connect attempt, successfully or not.
    pub fn on_connection_connect(&mut self, id: ConnectionId) {
        self.pending_connect.retain(|c| *c != id);
        // Signals "this host attempted a connection", not "succeeded".
        self.listener.on_host_connected(&self.host);

        if self.closing {
            if let Some(connection) = self.connections.get_mut(&id) {
                connection.close();
            }
            return;
        }

        let ready = self
            .connections
            .get(&id)
            .is_some_and(|connection| connection.is_ready());
        if ready {
            tracing::debug!(host = %self.host, connection = %id, "connection ready");
            self.ready.push(id);
            self.dispatch_queued_request(id);
        } else {
            tracing::debug!(host = %self.host, connection = %id, "connect attempt failed");
        }
    }

    /// A connection finished closing and leaves the pool for good.
    pub fn on_connection_close(&mut self, id: ConnectionId) {
        self.ready.retain(|c| *c != id);
        self.pending_connect.retain(|c| *c != id);

        let defunct = self
            .connections
            .remove(&id)
            .is_some_and(|connection| connection.is_defunct());
        if defunct {
            // A single irrecoverable connection failure closes the whole
            // pool for this host.
            tracing::warn!(host = %self.host, connection = %id, "connection defunct, closing pool");
            self.closing = true;
        }

        self.maybe_finish_closing();
    }

    /// While closing, ask remaining ready connections to close and notify
    /// the listener once everything has drained.
    fn maybe_finish_closing(&mut self) {
        if !self.closing {
            return;
        }

        let ready: Vec<ConnectionId> = self.ready.clone();
        for id in ready {
            if let Some(connection) = self.connections.get_mut(&id) {
                if !connection.is_closing() {
                    connection.close();
                }
            }
        }

        if self.ready.is_empty()
            && self.pending_connect.is_empty()
            && self.pending_requests.is_empty()
            && !self.closed_notified
        {
            self.closed_notified = true;
            tracing::info!(host = %self.host, "connection pool closed");
            self.listener.on_host_closed(&self.host);
        }
    }

    /// Close the pool: no new connections are spawned and every connection
    /// is asked to close.
    pub fn close(&mut self) {
        self.closing = true;
        let ready: Vec<ConnectionId> = self.ready.clone();
        for id in ready {
            if let Some(connection) = self.connections.get_mut(&id) {
                connection.close();
            }
        }
        self.maybe_finish_closing();
    }

    /// Pick a ready connection for dispatch, growing the pool
    /// opportunistically.
    ///
    /// Returns `None` when the caller must queue instead: the pool is
    /// closing, no connection is ready yet, or the least-busy candidate
    /// has no free stream.
    pub fn borrow_connection(&mut self) -> Option<ConnectionId> {
        if self.closing {
            return None;
        }

        if self.ready.is_empty() {
            // Refill toward the core count; anything already establishing
            // counts against it.
            let want = self
                .config
                .core_connections
                .saturating_sub(self.pending_connect.len());
            for _ in 0..want {
                self.spawn_connection();
            }
            return None;
        }

        self.maybe_spawn_connection();
        self.find_least_busy()
    }

    /// The ready connection with the most free streams, or `None` if that
    /// candidate has none free (or lost readiness) at selection time.
    fn find_least_busy(&self) -> Option<ConnectionId> {
        let id = self.ready.iter().copied().max_by_key(|id| {
            self.connections
                .get(id)
                .map_or(0, |connection| connection.available_streams())
        })?;
        let connection = self.connections.get(&id)?;
        if connection.is_ready() && connection.available_streams() > 0 {
            Some(id)
        } else {
            None
        }
    }

    /// Wrap the handler in a response router and hand it to the
    /// connection. `Err` returns the handler if the connection has no free
    /// stream by dispatch time (or is gone).
    pub fn execute_on_connection(
        &mut self,
        id: ConnectionId,
        handler: Box<dyn RequestHandler>,
    ) -> Result<(), Box<dyn RequestHandler>> {
        self.execute_router(id, ResponseRouter::attempt(id, handler))
            .map_err(ResponseRouter::into_handler)
    }

    pub(crate) fn execute_router(
        &mut self,
        id: ConnectionId,
        router: ResponseRouter,
    ) -> Result<(), ResponseRouter> {
        match self.connections.get_mut(&id) {
            Some(connection) => connection.execute(router),
            None => Err(router),
        }
    }

    /// Park a request in the pending queue with an expiry timer.
    ///
    /// `Err` returns the handler when the pool is closing or the queue is
    /// at its limit; the request is not queued.
    pub fn wait_for_connection(
        &mut self,
        handler: Box<dyn RequestHandler>,
    ) -> Result<(), Box<dyn RequestHandler>> {
        if self.closing || self.pending_requests.len() >= self.config.max_pending_requests {
            return Err(handler);
        }

        let id = RequestId::new(self.next_request_id);
        self.next_request_id += 1;
        let timer = self.timers.start(self.config.connect_timeout, id);
        self.pending_requests.push_back(QueuedRequest { id, handler, timer });

        tracing::debug!(
            host = %self.host,
            request = %id,
            queued = self.pending_requests.len(),
            "request waiting for connection"
        );
        Ok(())
    }

    /// A queued request's expiry timer fired before a connection freed up.
    ///
    /// The handler leaves the queue exactly once; a stale fire after the
    /// request was dispatched finds nothing and is a no-op.
    pub fn on_request_timeout(&mut self, id: RequestId) {
        let Some(position) = self.pending_requests.iter().position(|q| q.id == id) else {
            return;
        };
        if let Some(queued) = self.pending_requests.remove(position) {
            tracing::debug!(host = %self.host, request = %id, "queued request expired");
            self.listener
                .redistribute(queued.handler, RetryPolicy::RetryWithNextHost);
        }
        self.maybe_finish_closing();
    }

    /// Dispatch the head of the pending queue onto `id`, cancelling its
    /// expiry timer. A dispatch that fails after dequeue is redistributed,
    /// never re-queued here.
    pub fn dispatch_queued_request(&mut self, id: ConnectionId) {
        let Some(queued) = self.pending_requests.pop_front() else {
            return;
        };
        self.timers.stop(queued.timer);
        tracing::trace!(host = %self.host, connection = %id, request = %queued.id, "dispatching queued request");
        if let Err(handler) = self.execute_on_connection(id, queued.handler) {
            tracing::warn!(host = %self.host, connection = %id, "dispatch after dequeue failed");
            self.listener
                .redistribute(handler, RetryPolicy::RetryWithNextHost);
        }
    }

    pub(crate) fn redistribute(&mut self, handler: Box<dyn RequestHandler>, policy: RetryPolicy) {
        self.listener.redistribute(handler, policy);
    }

    pub(crate) fn mark_defunct(&mut self, id: ConnectionId) {
        if let Some(connection) = self.connections.get_mut(&id) {
            connection.defunct();
        }
    }

    pub(crate) fn connection_is_ready(&self, id: ConnectionId) -> bool {
        self.connections
            .get(&id)
            .is_some_and(|connection| connection.is_ready())
    }

    #[cfg(test)]
    pub(crate) fn ready_ids(&self) -> &[ConnectionId] {
        &self.ready
    }

    #[cfg(test)]
    pub(crate) fn pending_connect_ids(&self) -> &[ConnectionId] {
        &self.pending_connect
    }
}

/// Snapshot of a pool's occupancy.
#[derive(Debug, Clone, Copy)]
pub struct PoolStatus {
    /// Connections ready for dispatch.
    pub ready: usize,
    /// Connections still establishing.
    pub pending_connect: usize,
    /// Requests waiting in the pending queue.
    pub pending_requests: usize,
    /// Configured connection limit.
    pub max_connections: usize,
}

impl PoolStatus {
    /// Whether the pool cannot grow any further.
    #[must_use]
    pub fn is_at_capacity(&self) -> bool {
        self.ready + self.pending_connect >= self.max_connections
    }
}
