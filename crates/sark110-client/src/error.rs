//! Client error taxonomy.
//!
//! Two failure classes reach callers: [`CommError`] (the link did not deliver
//! a well-formed reply) and [`SarkError::Device`] (the device answered `'E'`).
//! Both map onto the legacy integer return codes through
//! [`SarkError::legacy_code`].

use sark110_protocol::{Opcode, ProtocolError};
use sark110_transport::{TransportError, TransportKind};
use thiserror::Error;

/// Legacy return code for success.
pub const LEGACY_OK: i32 = 1;
/// Legacy return code for a communication failure.
pub const LEGACY_COMM_ERROR: i32 = -1;
/// Legacy return code for a device-reported failure.
pub const LEGACY_DEVICE_ERROR: i32 = -2;

/// Transport-level failure of an exchange or of connection setup.
#[derive(Debug, Error)]
pub enum CommError {
    #[error("Session is not connected")]
    NotConnected,

    #[error("Failed to connect over {kind}: {source}")]
    Connect {
        kind: TransportKind,
        #[source]
        source: TransportError,
    },

    #[error("Send failed: {0}")]
    Send(#[source] TransportError),

    #[error("Receive failed: {0}")]
    Receive(#[source] TransportError),

    #[error("Malformed status byte 0x{0:02X}")]
    MalformedStatus(u8),

    #[error("Exchange over {kind} failed after {attempts} attempts: {last}")]
    Exhausted {
        kind: TransportKind,
        attempts: u32,
        #[source]
        last: Box<CommError>,
    },
}

impl CommError {
    /// The innermost transport error, if any.
    pub fn transport_error(&self) -> Option<&TransportError> {
        match self {
            CommError::Connect { source, .. } => Some(source),
            CommError::Send(e) | CommError::Receive(e) => Some(e),
            CommError::Exhausted { last, .. } => last.transport_error(),
            CommError::NotConnected | CommError::MalformedStatus(_) => None,
        }
    }

    /// Attempts consumed before giving up. A single failed attempt counts 1.
    pub fn attempts(&self) -> u32 {
        match self {
            CommError::Exhausted { attempts, .. } => *attempts,
            CommError::NotConnected | CommError::Connect { .. } => 0,
            _ => 1,
        }
    }
}

/// Top-level error of the command API.
#[derive(Debug, Error)]
pub enum SarkError {
    #[error("Communication error: {0}")]
    Comm(#[from] CommError),

    /// The device answered with status `'E'`.
    #[error("Device rejected {opcode}")]
    Device { opcode: Opcode },

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SarkError {
    pub fn config(msg: impl Into<String>) -> Self {
        SarkError::Config(msg.into())
    }

    /// Legacy integer code: `-2` for device errors, `-1` for
    /// everything else.
    pub fn legacy_code(&self) -> i32 {
        match self {
            SarkError::Device { .. } => LEGACY_DEVICE_ERROR,
            SarkError::Comm(_) | SarkError::Protocol(_) | SarkError::Config(_) => {
                LEGACY_COMM_ERROR
            }
        }
    }

    /// Whether calling again (possibly after reconnecting) may succeed.
    ///
    /// Device errors are final: the device declined the command.
    pub fn is_retryable(&self) -> bool {
        match self {
            SarkError::Comm(e) => !matches!(e, CommError::NotConnected),
            SarkError::Device { .. } | SarkError::Protocol(_) | SarkError::Config(_) => false,
        }
    }

    pub fn is_device_error(&self) -> bool {
        matches!(self, SarkError::Device { .. })
    }

    pub fn is_comm_error(&self) -> bool {
        matches!(self, SarkError::Comm(_))
    }
}

pub type SarkResult<T> = Result<T, SarkError>;

/// Collapse a result onto the legacy return codes (1, -1, -2).
pub fn legacy_status<T>(result: &SarkResult<T>) -> i32 {
    match result {
        Ok(_) => LEGACY_OK,
        Err(e) => e.legacy_code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_codes() {
        let ok: SarkResult<()> = Ok(());
        assert_eq!(legacy_status(&ok), 1);

        let comm: SarkResult<()> = Err(CommError::MalformedStatus(0).into());
        assert_eq!(legacy_status(&comm), -1);

        let device: SarkResult<()> = Err(SarkError::Device {
            opcode: Opcode::MeasRx,
        });
        assert_eq!(legacy_status(&device), -2);

        let config: SarkResult<()> = Err(SarkError::config("bad"));
        assert_eq!(legacy_status(&config), -1);
    }

    #[test]
    fn test_retry_classification() {
        assert!(SarkError::from(CommError::MalformedStatus(1)).is_retryable());
        assert!(!SarkError::from(CommError::NotConnected).is_retryable());
        assert!(
            !SarkError::Device {
                opcode: Opcode::Version
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_exhausted_message() {
        let err = CommError::Exhausted {
            kind: TransportKind::Hid,
            attempts: 5,
            last: Box::new(CommError::Receive(TransportError::Timeout { timeout_ms: 220 })),
        };
        insta::assert_snapshot!(
            err,
            @"Exchange over hid failed after 5 attempts: Receive failed: Timed out after 220 ms"
        );
        assert_eq!(err.attempts(), 5);
        assert!(matches!(
            err.transport_error(),
            Some(TransportError::Timeout { timeout_ms: 220 })
        ));
    }

    #[test]
    fn test_device_error_message() {
        let err = SarkError::Device {
            opcode: Opcode::Buzzer,
        };
        assert_eq!(err.to_string(), "Device rejected buzzer (20)");
        assert!(err.is_device_error());
        assert!(!err.is_comm_error());
    }
}
