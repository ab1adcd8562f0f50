//! Protocol-level errors.

use thiserror::Error;

/// Result alias for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while building or interpreting frames.
///
/// None of these are produced by the device itself; a device-side failure is
/// reported through [`crate::Status::DeviceError`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A field does not fit inside an 18-byte frame.
    #[error("field at offset {offset} with width {width} exceeds frame length")]
    FieldOutOfBounds { offset: usize, width: usize },

    /// Byte 0 of a request is not a catalogued opcode.
    #[error("unknown opcode: {0}")]
    UnknownOpcode(u8),

    /// A request frame was decoded as a command it does not belong to.
    #[error("unexpected opcode: expected {expected}, got {actual}")]
    UnexpectedOpcode { expected: u8, actual: u8 },

    /// A response field carries a value outside its enumeration.
    #[error("invalid value {value} for {field}")]
    InvalidValue { field: &'static str, value: u8 },
}
