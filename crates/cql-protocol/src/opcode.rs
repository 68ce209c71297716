//! CQL frame opcodes.

use crate::error::ProtocolError;

/// Opcode of a CQL binary protocol frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Server error response.
    Error = 0x00,
    /// Client startup request.
    Startup = 0x01,
    /// Server ready response.
    Ready = 0x02,
    /// Server authentication challenge.
    Authenticate = 0x03,
    /// Client credentials.
    Credentials = 0x04,
    /// Client options request.
    Options = 0x05,
    /// Server supported-options response.
    Supported = 0x06,
    /// Client query request.
    Query = 0x07,
    /// Server result response.
    Result = 0x08,
    /// Client prepare request.
    Prepare = 0x09,
    /// Client execute (prepared statement) request.
    Execute = 0x0A,
    /// Client event registration request.
    Register = 0x0B,
    /// Server push event.
    Event = 0x0C,
}

impl Opcode {
    /// The wire value of this opcode.
    #[must_use]
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Opcode {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, ProtocolError> {
        match value {
            0x00 => Ok(Self::Error),
            0x01 => Ok(Self::Startup),
            0x02 => Ok(Self::Ready),
            0x03 => Ok(Self::Authenticate),
            0x04 => Ok(Self::Credentials),
            0x05 => Ok(Self::Options),
            0x06 => Ok(Self::Supported),
            0x07 => Ok(Self::Query),
            0x08 => Ok(Self::Result),
            0x09 => Ok(Self::Prepare),
            0x0A => Ok(Self::Execute),
            0x0B => Ok(Self::Register),
            0x0C => Ok(Self::Event),
            other => Err(ProtocolError::InvalidOpcode(other)),
        }
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Error => "ERROR",
            Self::Startup => "STARTUP",
            Self::Ready => "READY",
            Self::Authenticate => "AUTHENTICATE",
            Self::Credentials => "CREDENTIALS",
            Self::Options => "OPTIONS",
            Self::Supported => "SUPPORTED",
            Self::Query => "QUERY",
            Self::Result => "RESULT",
            Self::Prepare => "PREPARE",
            Self::Execute => "EXECUTE",
            Self::Register => "REGISTER",
            Self::Event => "EVENT",
        };
        f.write_str(name)
    }
}
