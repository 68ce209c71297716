//! Server-side error codes carried by ERROR frames.

use crate::error::ProtocolError;

/// Error code of a CQL `ERROR` response.
///
/// Only the code is interpreted by routing layers; the accompanying
/// payload is opaque to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ErrorCode {
    /// Something unexpected happened server-side.
    ServerError = 0x0000,
    /// The message violated the protocol.
    ProtocolError = 0x000A,
    /// Authentication failed.
    BadCredentials = 0x0100,
    /// Not enough replicas were alive to satisfy the consistency level.
    Unavailable = 0x1000,
    /// The coordinator is overloaded.
    Overloaded = 0x1001,
    /// The coordinator is bootstrapping.
    IsBootstrapping = 0x1002,
    /// A truncation operation failed.
    TruncateError = 0x1003,
    /// A write request timed out server-side.
    WriteTimeout = 0x1100,
    /// A read request timed out server-side.
    ReadTimeout = 0x1200,
    /// The query string could not be parsed.
    SyntaxError = 0x2000,
    /// The user is not authorized for the operation.
    Unauthorized = 0x2100,
    /// The query is syntactically correct but invalid.
    Invalid = 0x2200,
    /// The query is invalid because of a configuration issue.
    ConfigError = 0x2300,
    /// The keyspace or table already exists.
    AlreadyExists = 0x2400,
    /// The prepared statement id is unknown to this node and must be
    /// prepared again before execution.
    Unprepared = 0x2500,
}

impl ErrorCode {
    /// The wire value of this error code.
    #[must_use]
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Whether this error can be recovered by re-preparing the statement
    /// on the same connection and retrying.
    #[must_use]
    pub fn is_unprepared(self) -> bool {
        self == Self::Unprepared
    }
}

impl TryFrom<u32> for ErrorCode {
    type Error = ProtocolError;

    fn try_from(value: u32) -> Result<Self, ProtocolError> {
        match value {
            0x0000 => Ok(Self::ServerError),
            0x000A => Ok(Self::ProtocolError),
            0x0100 => Ok(Self::BadCredentials),
            0x1000 => Ok(Self::Unavailable),
            0x1001 => Ok(Self::Overloaded),
            0x1002 => Ok(Self::IsBootstrapping),
            0x1003 => Ok(Self::TruncateError),
            0x1100 => Ok(Self::WriteTimeout),
            0x1200 => Ok(Self::ReadTimeout),
            0x2000 => Ok(Self::SyntaxError),
            0x2100 => Ok(Self::Unauthorized),
            0x2200 => Ok(Self::Invalid),
            0x2300 => Ok(Self::ConfigError),
            0x2400 => Ok(Self::AlreadyExists),
            0x2500 => Ok(Self::Unprepared),
            other => Err(ProtocolError::InvalidErrorCode(other)),
        }
    }
}
