//! Shared fakes for pool and router tests.
//!
//! The fakes record every observable effect (connection calls, listener
//! callbacks, timer starts/stops, and request outcomes) so tests can
//! assert on exactly-once delivery and ordering.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use cql_protocol::{Opcode, Request, Response};

use crate::config::PoolConfig;
use crate::connection::{Connection, ConnectionFactory, ConnectionId, Host};
use crate::error::{PoolError, TransportError};
use crate::pool::Pool;
use crate::request::{PoolListener, RequestHandler, RequestId, RetryPolicy};
use crate::router::ResponseRouter;
use crate::timer::{TimerHandle, TimerScheduler};

/// A terminal effect observed by a fake handler or listener.
#[derive(Debug, Clone)]
pub(crate) enum Outcome {
    /// `on_set` was invoked with this response.
    Set { handler: u64, response: Response },
    /// `on_error` was invoked with this error.
    Failed { handler: u64, error: TransportError },
    /// `on_timeout` was invoked.
    TimedOut { handler: u64 },
    /// The handler was handed to the retry path.
    Redistributed { handler: u64, policy: RetryPolicy },
}

impl Outcome {
    fn handler(&self) -> u64 {
        match self {
            Self::Set { handler, .. }
            | Self::Failed { handler, .. }
            | Self::TimedOut { handler }
            | Self::Redistributed { handler, .. } => *handler,
        }
    }
}

/// The outcomes recorded for one handler id.
pub(crate) fn outcomes_for(outcomes: &[Outcome], handler: u64) -> Vec<Outcome> {
    outcomes
        .iter()
        .filter(|o| o.handler() == handler)
        .cloned()
        .collect()
}

pub(crate) fn test_host() -> Host {
    Host::new("127.0.0.1:9042".parse().unwrap())
}

/// Shared, externally mutable state of one fake connection.
pub(crate) struct FakeConnState {
    ready: AtomicBool,
    closing: AtomicBool,
    defunct: AtomicBool,
    streams: AtomicUsize,
    connect_calls: AtomicUsize,
    close_calls: AtomicUsize,
    executed: Mutex<Vec<ResponseRouter>>,
}

impl FakeConnState {
    fn new() -> Self {
        Self {
            ready: AtomicBool::new(false),
            closing: AtomicBool::new(false),
            defunct: AtomicBool::new(false),
            streams: AtomicUsize::new(128),
            connect_calls: AtomicUsize::new(0),
            close_calls: AtomicUsize::new(0),
            executed: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub(crate) fn set_defunct(&self, defunct: bool) {
        self.defunct.store(defunct, Ordering::SeqCst);
    }

    pub(crate) fn set_streams(&self, streams: usize) {
        self.streams.store(streams, Ordering::SeqCst);
    }

    pub(crate) fn defunct_marked(&self) -> bool {
        self.defunct.load(Ordering::SeqCst)
    }

    pub(crate) fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn executed_len(&self) -> usize {
        self.executed.lock().unwrap().len()
    }

    /// Pop the oldest router dispatched to this connection, as the
    /// transport would when its response arrives.
    pub(crate) fn take_router(&self) -> Option<ResponseRouter> {
        let mut executed = self.executed.lock().unwrap();
        if executed.is_empty() {
            None
        } else {
            Some(executed.remove(0))
        }
    }
}

struct FakeConnection {
    state: Arc<FakeConnState>,
}

impl Connection for FakeConnection {
    fn connect(&mut self) {
        self.state.connect_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn is_ready(&self) -> bool {
        self.state.ready.load(Ordering::SeqCst)
    }

    fn is_closing(&self) -> bool {
        self.state.closing.load(Ordering::SeqCst)
    }

    fn is_defunct(&self) -> bool {
        self.state.defunct.load(Ordering::SeqCst)
    }

    fn defunct(&mut self) {
        self.state.defunct.store(true, Ordering::SeqCst);
        self.state.closing.store(true, Ordering::SeqCst);
    }

    fn available_streams(&self) -> usize {
        self.state.streams.load(Ordering::SeqCst)
    }

    fn close(&mut self) {
        self.state.close_calls.fetch_add(1, Ordering::SeqCst);
        self.state.closing.store(true, Ordering::SeqCst);
    }

    fn execute(&mut self, router: ResponseRouter) -> Result<(), ResponseRouter> {
        let streams = self.state.streams.load(Ordering::SeqCst);
        if streams == 0 {
            return Err(router);
        }
        self.state.streams.store(streams - 1, Ordering::SeqCst);
        self.state.executed.lock().unwrap().push(router);
        Ok(())
    }
}

struct FakeFactory {
    created: Arc<Mutex<Vec<(ConnectionId, Arc<FakeConnState>)>>>,
}

impl ConnectionFactory for FakeFactory {
    fn create(&mut self, _host: &Host, id: ConnectionId) -> Box<dyn Connection> {
        let state = Arc::new(FakeConnState::new());
        self.created.lock().unwrap().push((id, Arc::clone(&state)));
        Box::new(FakeConnection { state })
    }
}

struct FakeListener {
    log: Arc<Mutex<Vec<Outcome>>>,
    connected: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl PoolListener for FakeListener {
    fn on_host_connected(&mut self, _host: &Host) {
        self.connected.fetch_add(1, Ordering::SeqCst);
    }

    fn on_host_closed(&mut self, _host: &Host) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }

    fn redistribute(&mut self, handler: Box<dyn RequestHandler>, policy: RetryPolicy) {
        let handler = handler_id(handler.as_ref());
        self.log
            .lock()
            .unwrap()
            .push(Outcome::Redistributed { handler, policy });
    }
}

/// Fake handlers encode their id in the request body so the listener can
/// identify a redistributed handler without widening the trait.
fn handler_id(handler: &dyn RequestHandler) -> u64 {
    let body = handler.request().body;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&body[..8]);
    u64::from_be_bytes(buf)
}

pub(crate) struct FakeHandler {
    id: u64,
    log: Arc<Mutex<Vec<Outcome>>>,
}

impl RequestHandler for FakeHandler {
    fn request(&self) -> Request {
        Request::new(Opcode::Query, Bytes::copy_from_slice(&self.id.to_be_bytes()))
    }

    fn prepare_request(&self) -> Request {
        Request::prepare(Bytes::copy_from_slice(&self.id.to_be_bytes()))
    }

    fn on_set(self: Box<Self>, response: Response) {
        self.log.lock().unwrap().push(Outcome::Set {
            handler: self.id,
            response,
        });
    }

    fn on_error(self: Box<Self>, error: TransportError) {
        self.log.lock().unwrap().push(Outcome::Failed {
            handler: self.id,
            error,
        });
    }

    fn on_timeout(self: Box<Self>) {
        self.log
            .lock()
            .unwrap()
            .push(Outcome::TimedOut { handler: self.id });
    }
}

#[derive(Default)]
struct TimerLog {
    started: Vec<(RequestId, Duration)>,
    stopped: Vec<TimerHandle>,
}

struct FakeTimers {
    log: Arc<Mutex<TimerLog>>,
    next_id: u64,
}

impl TimerScheduler for FakeTimers {
    fn start(&mut self, delay: Duration, request: RequestId) -> TimerHandle {
        self.log.lock().unwrap().started.push((request, delay));
        let handle = TimerHandle::new(self.next_id);
        self.next_id += 1;
        handle
    }

    fn stop(&mut self, handle: TimerHandle) {
        self.log.lock().unwrap().stopped.push(handle);
    }
}

/// Observation side of a test pool: everything the fakes record, plus a
/// factory for fresh fake handlers.
pub(crate) struct Probes {
    created: Arc<Mutex<Vec<(ConnectionId, Arc<FakeConnState>)>>>,
    log: Arc<Mutex<Vec<Outcome>>>,
    connected: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
    timers: Arc<Mutex<TimerLog>>,
    next_handler_id: u64,
}

impl Probes {
    /// The shared state of every connection the factory has created, in
    /// creation order.
    pub(crate) fn created(&self) -> Vec<Arc<FakeConnState>> {
        self.created
            .lock()
            .unwrap()
            .iter()
            .map(|(_, state)| Arc::clone(state))
            .collect()
    }

    pub(crate) fn connection_id(&self, index: usize) -> ConnectionId {
        self.created.lock().unwrap()[index].0
    }

    pub(crate) fn new_handler(&mut self) -> Box<FakeHandler> {
        let id = self.next_handler_id;
        self.next_handler_id += 1;
        Box::new(FakeHandler {
            id,
            log: Arc::clone(&self.log),
        })
    }

    pub(crate) fn outcomes(&self) -> Vec<Outcome> {
        self.log.lock().unwrap().clone()
    }

    pub(crate) fn hosts_connected(&self) -> usize {
        self.connected.load(Ordering::SeqCst)
    }

    pub(crate) fn hosts_closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn timers_started(&self) -> usize {
        self.timers.lock().unwrap().started.len()
    }

    pub(crate) fn timers_stopped(&self) -> usize {
        self.timers.lock().unwrap().stopped.len()
    }

    /// The request id of the most recently queued request.
    pub(crate) fn last_queued_request(&self) -> RequestId {
        self.timers.lock().unwrap().started.last().unwrap().0
    }
}

/// A pool wired to recording fakes, plus helpers for the common moves.
pub(crate) struct TestHarness {
    pool: Pool,
    probes: Probes,
}

impl TestHarness {
    pub(crate) fn new(config: PoolConfig) -> Self {
        Self::try_new(config).unwrap()
    }

    pub(crate) fn try_new(config: PoolConfig) -> Result<Self, PoolError> {
        Self::build(config, None)
    }

    /// Build a harness whose pool uses the given timer scheduler instead
    /// of the recording fake.
    pub(crate) fn with_timers(config: PoolConfig, timers: Box<dyn TimerScheduler>) -> Self {
        Self::build(config, Some(timers)).unwrap()
    }

    fn build(
        config: PoolConfig,
        timers: Option<Box<dyn TimerScheduler>>,
    ) -> Result<Self, PoolError> {
        let created = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::new(Mutex::new(Vec::new()));
        let connected = Arc::new(AtomicUsize::new(0));
        let closed = Arc::new(AtomicUsize::new(0));
        let timer_log = Arc::new(Mutex::new(TimerLog::default()));

        let timers = timers.unwrap_or_else(|| {
            Box::new(FakeTimers {
                log: Arc::clone(&timer_log),
                next_id: 0,
            })
        });
        let pool = Pool::new(
            test_host(),
            config,
            Box::new(FakeFactory {
                created: Arc::clone(&created),
            }),
            timers,
            Box::new(FakeListener {
                log: Arc::clone(&log),
                connected: Arc::clone(&connected),
                closed: Arc::clone(&closed),
            }),
        )?;

        Ok(Self {
            pool,
            probes: Probes {
                created,
                log,
                connected,
                closed,
                timers: timer_log,
                next_handler_id: 0,
            },
        })
    }

    /// Split into the pool and its probes, e.g. to hand the pool to a
    /// runner.
    pub(crate) fn into_parts(self) -> (Pool, Probes) {
        (self.pool, self.probes)
    }

    pub(crate) fn pool(&self) -> &Pool {
        &self.pool
    }

    pub(crate) fn pool_mut(&mut self) -> &mut Pool {
        &mut self.pool
    }

    pub(crate) fn created(&self) -> Vec<Arc<FakeConnState>> {
        self.probes.created()
    }

    pub(crate) fn connection_id(&self, index: usize) -> ConnectionId {
        self.probes.connection_id(index)
    }

    /// Mark the `index`-th created connection ready and deliver its
    /// connected event.
    pub(crate) fn connect_ready(&mut self, index: usize) -> ConnectionId {
        let id = self.probes.connection_id(index);
        self.probes.created()[index].set_ready(true);
        self.pool.on_connection_connect(id);
        id
    }

    /// Queue a fresh handler through `wait_for_connection`.
    pub(crate) fn submit_waits(&mut self) -> Result<(), ()> {
        let handler = self.probes.new_handler();
        self.pool.wait_for_connection(handler).map_err(|_| ())
    }

    /// Hand a fresh handler to `Pool::submit`.
    pub(crate) fn pool_submit(&mut self) -> Result<(), ()> {
        let handler = self.probes.new_handler();
        self.pool.submit(handler).map_err(|_| ())
    }

    /// Pop the oldest router dispatched to the `index`-th connection.
    pub(crate) fn take_router(&self, index: usize) -> ResponseRouter {
        self.probes.created()[index].take_router().unwrap()
    }

    pub(crate) fn outcomes(&self) -> Vec<Outcome> {
        self.probes.outcomes()
    }

    pub(crate) fn hosts_connected(&self) -> usize {
        self.probes.hosts_connected()
    }

    pub(crate) fn hosts_closed(&self) -> usize {
        self.probes.hosts_closed()
    }

    pub(crate) fn timers_started(&self) -> usize {
        self.probes.timers_started()
    }

    pub(crate) fn timers_stopped(&self) -> usize {
        self.probes.timers_stopped()
    }

    pub(crate) fn last_queued_request(&self) -> RequestId {
        self.probes.last_queued_request()
    }
}
