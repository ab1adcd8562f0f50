//! SARK-110 opcodes, status bytes and transport identifiers.
//!
//! Opcode values follow the device firmware's remote-command table. Gaps in
//! the numbering (13-19, 22-49, 51-59) are unused by the firmware.

use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Response status byte for a successful command (`'O'`).
pub const STATUS_OK: u8 = b'O';

/// Response status byte for a command the device rejected (`'E'`).
pub const STATUS_ERR: u8 = b'E';

/// Fill byte of the disconnect pseudo-frame.
pub const DISCONNECT_BYTE: u8 = 0xFF;

/// TCP port the device's network bridge listens on.
pub const DEFAULT_TCP_PORT: u16 = 8888;

/// GATT service exposing the remote-command characteristic
/// (`49535343-fe7d-4ae5-8fa9-9fafd205e455`).
pub const GATT_SERVICE_UUID: u128 = 0x4953_5343_fe7d_4ae5_8fa9_9faf_d205_e455;

/// USB HID identifiers of the remote-command interface.
pub mod hid_signature {
    /// STMicroelectronics vendor ID.
    pub const VENDOR_ID: u16 = 0x0483;
    pub const PRODUCT_ID: u16 = 0x5750;
    /// Vendor-defined usage page of the command collection.
    pub const USAGE_PAGE: u16 = 0xFFB0;
    pub const USAGE: u16 = 0x0300;

    /// Send timeout for one HID report, in milliseconds.
    pub const SEND_TIMEOUT_MS: u64 = 100;
    /// Receive timeout for one HID report, in milliseconds.
    pub const RECEIVE_TIMEOUT_MS: u64 = 220;
}

/// Remote command opcodes (request byte 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    Version = 1,
    MeasRx = 2,
    MeasVector = 3,
    SignalGen = 4,
    MeasRf = 5,
    MeasVectorThru = 6,
    BatteryStatus = 7,
    DiskInfo = 8,
    DiskVolume = 9,
    SetSetting = 10,
    GetSetting = 11,
    MeasRxEff = 12,
    Buzzer = 20,
    GetKey = 21,
    DeviceReset = 50,
    Gpio = 60,
}

impl Opcode {
    /// Every opcode, in catalog order.
    pub const ALL: [Opcode; 16] = [
        Opcode::Version,
        Opcode::MeasRx,
        Opcode::MeasVector,
        Opcode::SignalGen,
        Opcode::MeasRf,
        Opcode::MeasVectorThru,
        Opcode::BatteryStatus,
        Opcode::DiskInfo,
        Opcode::DiskVolume,
        Opcode::SetSetting,
        Opcode::GetSetting,
        Opcode::MeasRxEff,
        Opcode::Buzzer,
        Opcode::GetKey,
        Opcode::DeviceReset,
        Opcode::Gpio,
    ];

    /// Wire value of the opcode.
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Short command name used in logs.
    pub const fn name(self) -> &'static str {
        match self {
            Opcode::Version => "version",
            Opcode::MeasRx => "meas_rx",
            Opcode::MeasVector => "meas_vector",
            Opcode::SignalGen => "signal_gen",
            Opcode::MeasRf => "meas_rf",
            Opcode::MeasVectorThru => "meas_vector_thru",
            Opcode::BatteryStatus => "battery_status",
            Opcode::DiskInfo => "disk_info",
            Opcode::DiskVolume => "disk_volume",
            Opcode::SetSetting => "set_setting",
            Opcode::GetSetting => "get_setting",
            Opcode::MeasRxEff => "meas_rx_eff",
            Opcode::Buzzer => "buzzer",
            Opcode::GetKey => "get_key",
            Opcode::DeviceReset => "device_reset",
            Opcode::Gpio => "gpio",
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Opcode::ALL
            .iter()
            .copied()
            .find(|op| op.as_u8() == value)
            .ok_or(ProtocolError::UnknownOpcode(value))
    }
}

impl From<Opcode> for u8 {
    fn from(op: Opcode) -> Self {
        op.as_u8()
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.as_u8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_values() {
        assert_eq!(Opcode::Version.as_u8(), 1);
        assert_eq!(Opcode::MeasRxEff.as_u8(), 12);
        assert_eq!(Opcode::Buzzer.as_u8(), 20);
        assert_eq!(Opcode::GetKey.as_u8(), 21);
        assert_eq!(Opcode::DeviceReset.as_u8(), 50);
        assert_eq!(Opcode::Gpio.as_u8(), 60);
    }

    #[test]
    fn test_opcode_try_from_round_trip() -> Result<(), ProtocolError> {
        for op in Opcode::ALL {
            assert_eq!(Opcode::try_from(op.as_u8())?, op);
        }
        Ok(())
    }

    #[test]
    fn test_opcode_try_from_unknown() {
        assert_eq!(Opcode::try_from(0), Err(ProtocolError::UnknownOpcode(0)));
        assert_eq!(Opcode::try_from(13), Err(ProtocolError::UnknownOpcode(13)));
        assert_eq!(
            Opcode::try_from(0xFF),
            Err(ProtocolError::UnknownOpcode(0xFF))
        );
    }

    #[test]
    fn test_gatt_uuid_text_form() {
        let text = format!("{GATT_SERVICE_UUID:032x}");
        assert_eq!(text, "49535343fe7d4ae58fa99fafd205e455");
    }

    #[test]
    fn test_opcode_display() {
        assert_eq!(Opcode::MeasRx.to_string(), "meas_rx (2)");
    }
}
