//! Opaque request and response message values.
//!
//! Framing and body encoding live elsewhere; these types carry exactly the
//! fields that routing layers inspect, with the body kept as opaque bytes.

use bytes::Bytes;

use crate::error_code::ErrorCode;
use crate::opcode::Opcode;

/// An outbound message: an opcode plus an already encoded body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Frame opcode.
    pub opcode: Opcode,
    /// Encoded frame body.
    pub body: Bytes,
}

impl Request {
    /// Create a request from an opcode and an encoded body.
    #[must_use]
    pub fn new(opcode: Opcode, body: Bytes) -> Self {
        Self { opcode, body }
    }

    /// Create a `PREPARE` request with the given encoded body.
    #[must_use]
    pub fn prepare(body: Bytes) -> Self {
        Self::new(Opcode::Prepare, body)
    }
}

/// An inbound message as seen after decoding, reduced to what routing
/// decisions need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// A `RESULT` frame; the body is opaque to routing.
    Result(Bytes),
    /// An `ERROR` frame with its server error code and message.
    Error {
        /// Server error code.
        code: ErrorCode,
        /// Human-readable server message.
        message: String,
    },
    /// Any other frame, unexpected as a response to a request.
    Other {
        /// Frame opcode.
        opcode: Opcode,
        /// Encoded frame body.
        body: Bytes,
    },
}

impl Response {
    /// The opcode of this response.
    #[must_use]
    pub fn opcode(&self) -> Opcode {
        match self {
            Self::Result(_) => Opcode::Result,
            Self::Error { .. } => Opcode::Error,
            Self::Other { opcode, .. } => *opcode,
        }
    }
}
