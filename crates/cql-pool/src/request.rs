//! Request seam: the caller-facing contract for one pooled request.

use cql_protocol::{Request, Response};

use crate::connection::Host;
use crate::error::TransportError;

/// Stable id the pool assigns to each queued request, used to associate
/// its expiry timer without keeping a second handle to the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(u64);

impl RequestId {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// One caller-issued request and its completion hooks.
///
/// The handler is a single-owner handle: it moves from the caller into the
/// pool, from the pool into a router, and from there either into exactly
/// one terminal hook or into the redistribution path. The terminal hooks
/// consume the box, so completing a request twice does not compile.
pub trait RequestHandler: Send {
    /// The outbound message for this attempt.
    fn request(&self) -> Request;

    /// The `PREPARE` message that re-prepares this request's statement.
    ///
    /// Invoked only when the server reports the statement unprepared on
    /// the connection that received the request.
    fn prepare_request(&self) -> Request;

    /// The request completed with a server response (a result, or a
    /// terminal error frame the caller must interpret).
    fn on_set(self: Box<Self>, response: Response);

    /// The request failed with a non-retryable transport error.
    fn on_error(self: Box<Self>, error: TransportError);

    /// The in-flight request timed out waiting for its response.
    fn on_timeout(self: Box<Self>);
}

/// How a redistributed request should be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum RetryPolicy {
    /// Re-route the request to the next host in the query plan.
    RetryWithNextHost,
}

/// Callbacks a pool raises toward its owner.
///
/// `on_host_connected` signals that a connect attempt to the host
/// completed, not that it succeeded; readiness is tracked per connection.
pub trait PoolListener: Send {
    /// A connection to the host finished its connect attempt.
    fn on_host_connected(&mut self, host: &Host);

    /// The pool finished closing: no connections or queued requests remain.
    fn on_host_closed(&mut self, host: &Host);

    /// A retryable request is handed back for routing to another pool.
    /// The listener takes ownership of the handler.
    fn redistribute(&mut self, handler: Box<dyn RequestHandler>, policy: RetryPolicy);
}
