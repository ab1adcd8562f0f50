//! Transports carrying SARK-110 frames.
//!
//! Three interchangeable variants implement [`Transport`]: USB HID
//! ([`HidTransport`]), Bluetooth LE GATT ([`BleTransport`]) and raw TCP
//! ([`SocketTransport`]). Each moves whole 18-byte frames and knows nothing
//! about opcodes, status bytes or retries; that lives in `sark110-client`.
//!
//! The hardware edges are traits as well ([`HidPort`]/[`HidDevice`] and
//! [`GattLink`]) so every variant can be driven by the mocks in [`mock`].

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod ble;
pub mod device_info;
pub mod hid;
#[cfg(feature = "hid")]
pub mod hidapi_port;
pub mod mock;
pub mod socket;

pub use ble::{BleConfig, BleTransport, GattLink, NotificationSlot};
pub use device_info::HidDeviceInfo;
pub use hid::{HidConfig, HidDevice, HidPort, HidTransport};
#[cfg(feature = "hid")]
pub use hidapi_port::HidApiPort;
pub use socket::{SocketConfig, SocketTransport};

use sark110_protocol::FRAME_LEN;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Transport not open")]
    NotOpen,

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Failed to open transport: {0}")]
    OpenFailed(String),

    #[error("Failed to write frame: {0}")]
    WriteFailed(String),

    #[error("Failed to read frame: {0}")]
    ReadFailed(String),

    #[error("Timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    #[error("Short read: expected {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },

    #[error("Peer disconnected")]
    Disconnected,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// `true` when the link itself is gone and only a reopen can help.
    pub fn is_link_lost(&self) -> bool {
        matches!(
            self,
            TransportError::NotOpen | TransportError::Disconnected | TransportError::Io(_)
        )
    }
}

pub type TransportResult<T> = Result<T, TransportError>;

/// Which transport a session uses. Fixed for the session's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Hid,
    Ble,
    Socket,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Hid => f.write_str("hid"),
            TransportKind::Ble => f.write_str("ble"),
            TransportKind::Socket => f.write_str("socket"),
        }
    }
}

/// Frame-level link to one or more devices.
///
/// `device` selects among several HID devices opened by one transport. BLE
/// and socket transports carry a single peer and ignore it.
pub trait Transport: Send {
    fn kind(&self) -> TransportKind;

    /// Open the link. Returns how many devices are reachable.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when no device could be opened.
    fn open(&mut self) -> TransportResult<usize>;

    /// Send one frame.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when the frame could not be written.
    fn send(&mut self, device: usize, frame: &[u8; FRAME_LEN]) -> TransportResult<()>;

    /// Receive one frame into `frame`.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when no complete frame arrived.
    fn receive(&mut self, device: usize, frame: &mut [u8; FRAME_LEN]) -> TransportResult<()>;

    /// Release the link. Never fails; errors are logged.
    fn close(&mut self);

    fn is_open(&self) -> bool;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn kind(&self) -> TransportKind {
        (**self).kind()
    }

    fn open(&mut self) -> TransportResult<usize> {
        (**self).open()
    }

    fn send(&mut self, device: usize, frame: &[u8; FRAME_LEN]) -> TransportResult<()> {
        (**self).send(device, frame)
    }

    fn receive(&mut self, device: usize, frame: &mut [u8; FRAME_LEN]) -> TransportResult<()> {
        (**self).receive(device, frame)
    }

    fn close(&mut self) {
        (**self).close();
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = TransportError::Timeout { timeout_ms: 220 };
        assert_eq!(err.to_string(), "Timed out after 220 ms");

        let err = TransportError::ShortRead {
            expected: 18,
            actual: 7,
        };
        insta::assert_snapshot!(err, @"Short read: expected 18 bytes, got 7");
    }

    #[test]
    fn test_link_lost_classification() {
        assert!(TransportError::Disconnected.is_link_lost());
        assert!(TransportError::NotOpen.is_link_lost());
        assert!(!TransportError::Timeout { timeout_ms: 1 }.is_link_lost());
    }

    #[test]
    fn test_kind_serde() -> Result<(), serde_json::Error> {
        assert_eq!(serde_json::to_string(&TransportKind::Ble)?, "\"ble\"");
        let kind: TransportKind = serde_json::from_str("\"socket\"")?;
        assert_eq!(kind, TransportKind::Socket);
        assert_eq!(TransportKind::Hid.to_string(), "hid");
        Ok(())
    }
}
