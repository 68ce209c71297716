//! Protocol-level error types.

use thiserror::Error;

/// Errors that can occur while interpreting protocol values.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Invalid frame opcode value.
    #[error("invalid opcode: {0:#04x}")]
    InvalidOpcode(u8),

    /// Invalid server error code value.
    #[error("invalid error code: {0:#06x}")]
    InvalidErrorCode(u32),
}
