//! Request and response frames.
//!
//! Both directions use the same 18-byte shape. Request byte 0 is the opcode,
//! response byte 0 the status. Everything else is payload, zero-filled unless
//! a field says otherwise.

use crate::error::{ProtocolError, ProtocolResult};
use crate::field::{Field, FieldValue};
use crate::ids::{DISCONNECT_BYTE, Opcode, STATUS_ERR, STATUS_OK};
use std::fmt;

/// Length of every frame on the wire.
pub const FRAME_LEN: usize = 18;

fn write_field<T: FieldValue>(
    bytes: &mut [u8; FRAME_LEN],
    field: Field<T>,
    value: &T,
) -> ProtocolResult<()> {
    let slot = field
        .range(FRAME_LEN)
        .and_then(|range| bytes.get_mut(range))
        .ok_or(ProtocolError::FieldOutOfBounds {
            offset: field.offset(),
            width: field.width(),
        })?;
    value.encode(slot);
    Ok(())
}

fn read_field<T: FieldValue>(bytes: &[u8; FRAME_LEN], field: Field<T>) -> ProtocolResult<T> {
    field
        .range(FRAME_LEN)
        .and_then(|range| bytes.get(range))
        .and_then(T::decode)
        .ok_or(ProtocolError::FieldOutOfBounds {
            offset: field.offset(),
            width: field.width(),
        })
}

fn hex_dump(bytes: &[u8], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{b:02X}")?;
    }
    Ok(())
}

/// Outbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Request {
    bytes: [u8; FRAME_LEN],
}

impl Request {
    /// Zero-filled request for `opcode`.
    pub const fn new(opcode: Opcode) -> Self {
        let mut bytes = [0u8; FRAME_LEN];
        bytes[0] = opcode as u8;
        Self { bytes }
    }

    /// The disconnect pseudo-frame: all bytes `0xFF`.
    ///
    /// Sent to a socket peer before an intentional close. Its reply is not
    /// validated.
    pub const fn disconnect() -> Self {
        Self {
            bytes: [DISCONNECT_BYTE; FRAME_LEN],
        }
    }

    pub const fn from_bytes(bytes: [u8; FRAME_LEN]) -> Self {
        Self { bytes }
    }

    pub const fn opcode_byte(&self) -> u8 {
        self.bytes[0]
    }

    /// Catalogued opcode, or `None` for the disconnect frame and unknown bytes.
    pub fn opcode(&self) -> Option<Opcode> {
        Opcode::try_from(self.opcode_byte()).ok()
    }

    pub fn is_disconnect(&self) -> bool {
        self.bytes.iter().all(|&b| b == DISCONNECT_BYTE)
    }

    pub const fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.bytes
    }

    pub const fn into_bytes(self) -> [u8; FRAME_LEN] {
        self.bytes
    }

    /// Write a field.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::FieldOutOfBounds`] when the field does not fit
    /// in the frame.
    pub fn set<T: FieldValue>(&mut self, field: Field<T>, value: T) -> ProtocolResult<&mut Self> {
        write_field(&mut self.bytes, field, &value)?;
        Ok(self)
    }

    /// Read a field back.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::FieldOutOfBounds`] when the field does not fit
    /// in the frame.
    pub fn get<T: FieldValue>(&self, field: Field<T>) -> ProtocolResult<T> {
        read_field(&self.bytes, field)
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        hex_dump(&self.bytes, f)
    }
}

/// Status carried in response byte 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// `'O'`
    Ok,
    /// `'E'`: the device rejected the command.
    DeviceError,
    /// Anything else. Treated as a transport failure.
    Invalid(u8),
}

impl Status {
    pub const fn from_byte(byte: u8) -> Self {
        match byte {
            STATUS_OK => Status::Ok,
            STATUS_ERR => Status::DeviceError,
            other => Status::Invalid(other),
        }
    }

    /// `true` for `'O'` and `'E'`.
    pub const fn is_well_formed(self) -> bool {
        !matches!(self, Status::Invalid(_))
    }
}

/// Inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Response {
    bytes: [u8; FRAME_LEN],
}

impl Response {
    pub const fn from_bytes(bytes: [u8; FRAME_LEN]) -> Self {
        Self { bytes }
    }

    /// Successful response with a zero payload.
    pub const fn ok() -> Self {
        let mut bytes = [0u8; FRAME_LEN];
        bytes[0] = STATUS_OK;
        Self { bytes }
    }

    /// Device-error response with a zero payload.
    pub const fn device_error() -> Self {
        let mut bytes = [0u8; FRAME_LEN];
        bytes[0] = STATUS_ERR;
        Self { bytes }
    }

    pub const fn status_byte(&self) -> u8 {
        self.bytes[0]
    }

    pub const fn status(&self) -> Status {
        Status::from_byte(self.status_byte())
    }

    pub const fn is_well_formed(&self) -> bool {
        self.status().is_well_formed()
    }

    pub const fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.bytes
    }

    /// Write a payload field. Used to build device replies in tests and
    /// simulators.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::FieldOutOfBounds`] when the field does not fit
    /// in the frame.
    pub fn set<T: FieldValue>(&mut self, field: Field<T>, value: T) -> ProtocolResult<&mut Self> {
        write_field(&mut self.bytes, field, &value)?;
        Ok(self)
    }

    /// Read a payload field.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::FieldOutOfBounds`] when the field does not fit
    /// in the frame.
    pub fn get<T: FieldValue>(&self, field: Field<T>) -> ProtocolResult<T> {
        read_field(&self.bytes, field)
    }
}

impl From<[u8; FRAME_LEN]> for Response {
    fn from(bytes: [u8; FRAME_LEN]) -> Self {
        Self::from_bytes(bytes)
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        hex_dump(&self.bytes, f)
    }
}
