//! Per-request response routing and protocol-aware retry.

use cql_protocol::{Request, Response};

use crate::connection::ConnectionId;
use crate::error::TransportError;
use crate::pool::Pool;
use crate::request::{RequestHandler, RetryPolicy};

/// The kind of dispatch attempt a router is driving.
enum Attempt {
    /// A caller-issued request.
    Execute(Box<dyn RequestHandler>),
    /// The re-prepare issued after an unprepared error, still carrying the
    /// original handler so the request can be re-issued once the statement
    /// is prepared again.
    Prepare(Box<dyn RequestHandler>),
}

impl Attempt {
    fn into_handler(self) -> Box<dyn RequestHandler> {
        match self {
            Self::Execute(handler) | Self::Prepare(handler) => handler,
        }
    }
}

/// Routes one connection response for one dispatch attempt.
///
/// A router owns its request handler for exactly one attempt. Completion
/// methods consume the router and move the handler into exactly one of:
/// a terminal handler hook, the redistribution path, or a follow-up
/// attempt (the re-prepare). Double completion therefore does not compile.
///
/// Completions take the owning [`Pool`] as explicit context; the router
/// itself holds only the connection's id.
pub struct ResponseRouter {
    connection: ConnectionId,
    attempt: Attempt,
}

impl ResponseRouter {
    /// Router for a caller request dispatched on `connection`.
    pub(crate) fn attempt(connection: ConnectionId, handler: Box<dyn RequestHandler>) -> Self {
        Self {
            connection,
            attempt: Attempt::Execute(handler),
        }
    }

    /// The connection this attempt is bound to.
    #[must_use]
    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    /// The outbound message for this attempt.
    #[must_use]
    pub fn request(&self) -> Request {
        match &self.attempt {
            Attempt::Execute(handler) => handler.request(),
            Attempt::Prepare(handler) => handler.prepare_request(),
        }
    }

    /// Unwrap the router into its request handler, e.g. after the
    /// connection rejected the dispatch.
    #[must_use]
    pub fn into_handler(self) -> Box<dyn RequestHandler> {
        self.attempt.into_handler()
    }

    /// A response frame arrived for this attempt.
    pub fn on_result(self, pool: &mut Pool, response: Response) {
        let Self { connection, attempt } = self;
        match attempt {
            Attempt::Execute(handler) => match response {
                Response::Error { code, .. } if code.is_unprepared() => {
                    // Re-prepare on the same connection; the caller is not
                    // completed until the retried attempt resolves.
                    tracing::debug!(connection = %connection, "statement unprepared, re-preparing");
                    let prepare = Self {
                        connection,
                        attempt: Attempt::Prepare(handler),
                    };
                    if let Err(router) = pool.execute_router(connection, prepare) {
                        pool.redistribute(router.into_handler(), RetryPolicy::RetryWithNextHost);
                    }
                }
                Response::Result(_) | Response::Error { .. } => handler.on_set(response),
                Response::Other { .. } => {
                    // Not a legal response to a request: complete the
                    // caller with what arrived and take the connection out
                    // of service.
                    tracing::warn!(
                        connection = %connection,
                        opcode = %response.opcode(),
                        "unexpected response opcode"
                    );
                    handler.on_set(response);
                    pool.mark_defunct(connection);
                }
            },
            Attempt::Prepare(handler) => match response {
                Response::Result(_) => {
                    // Statement prepared again; re-issue the original
                    // request as a fresh attempt on the same connection.
                    if let Err(handler) = pool.execute_on_connection(connection, handler) {
                        pool.redistribute(handler, RetryPolicy::RetryWithNextHost);
                    }
                }
                Response::Error { .. } => handler.on_set(response),
                Response::Other { .. } => {
                    tracing::warn!(
                        connection = %connection,
                        opcode = %response.opcode(),
                        "unexpected response opcode"
                    );
                    handler.on_set(response);
                    pool.mark_defunct(connection);
                }
            },
        }
        Self::finish_request(pool, connection);
    }

    /// The connection reported a transport failure for this attempt.
    pub fn on_error(self, pool: &mut Pool, error: TransportError) {
        let Self { connection, attempt } = self;
        let handler = attempt.into_handler();
        if error.is_write_error() {
            // The request never reached the server; retry it elsewhere
            // instead of failing the caller.
            tracing::debug!(connection = %connection, %error, "write failed, redistributing");
            pool.redistribute(handler, RetryPolicy::RetryWithNextHost);
        } else {
            handler.on_error(error);
        }
        Self::finish_request(pool, connection);
    }

    /// The in-flight attempt timed out waiting for its response.
    pub fn on_timeout(self, pool: &mut Pool) {
        let Self { connection, attempt } = self;
        attempt.into_handler().on_timeout();
        Self::finish_request(pool, connection);
    }

    /// Every completion frees a stream; drain one queued request onto the
    /// connection if it is still in service.
    fn finish_request(pool: &mut Pool, connection: ConnectionId) {
        if pool.connection_is_ready(connection) {
            pool.dispatch_queued_request(connection);
        }
    }
}
