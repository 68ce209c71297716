//! # cql-protocol
//!
//! Shared vocabulary of the CQL binary protocol: frame opcodes, server
//! error codes, and opaque request/response message values.
//!
//! This crate deliberately does not implement framing, encoding, or
//! decoding. It exists so that components which *route* messages (such as
//! the per-host connection pool) can inspect the pieces of a frame that
//! drive routing decisions (the opcode and, for error frames, the server
//! error code) without depending on a full codec.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod error_code;
pub mod message;
pub mod opcode;

pub use error::ProtocolError;
pub use error_code::ErrorCode;
pub use message::{Request, Response};
pub use opcode::Opcode;
