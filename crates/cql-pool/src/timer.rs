//! Timer seam: one-shot expiry timers for queued requests.

use std::time::Duration;

use hashbrown::HashMap;

use crate::request::RequestId;
use crate::runner::{PoolEvent, PoolHandle};

/// Handle to a started timer, used to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

impl TimerHandle {
    /// Create a handle from a scheduler-assigned id.
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// The scheduler-assigned id.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Schedules one-shot expiry timers on behalf of a pool.
///
/// A timer fires at most once, delivering a
/// [`PoolEvent::RequestTimeout`](crate::runner::PoolEvent) for its request
/// to the pool's task. A stopped timer never fires.
pub trait TimerScheduler: Send {
    /// Start a timer that expires the queued request after `delay`.
    fn start(&mut self, delay: Duration, request: RequestId) -> TimerHandle;

    /// Cancel a running timer. Cancelling an already fired timer is a
    /// no-op.
    fn stop(&mut self, handle: TimerHandle);
}

/// [`TimerScheduler`] backed by the tokio runtime.
///
/// Each timer is a spawned sleep task that sends the timeout event through
/// the pool's handle; stopping a timer aborts the task.
pub struct TokioTimers {
    handle: PoolHandle,
    tasks: HashMap<u64, tokio::task::JoinHandle<()>>,
    next_id: u64,
}

impl TokioTimers {
    /// Create a scheduler delivering timeouts through `handle`.
    #[must_use]
    pub fn new(handle: PoolHandle) -> Self {
        Self {
            handle,
            tasks: HashMap::new(),
            next_id: 0,
        }
    }
}

impl TimerScheduler for TokioTimers {
    fn start(&mut self, delay: Duration, request: RequestId) -> TimerHandle {
        // Drop bookkeeping for timers that already fired.
        self.tasks.retain(|_, task| !task.is_finished());

        let id = self.next_id;
        self.next_id += 1;
        let handle = self.handle.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            handle.send(PoolEvent::RequestTimeout(request));
        });
        self.tasks.insert(id, task);
        TimerHandle::new(id)
    }

    fn stop(&mut self, handle: TimerHandle) {
        if let Some(task) = self.tasks.remove(&handle.id()) {
            task.abort();
        }
    }
}
