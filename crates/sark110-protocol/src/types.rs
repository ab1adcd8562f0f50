//! Decoded response values and request parameters.

use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};

/// Firmware protocol version and build string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolVersion {
    pub protocol: u16,
    pub firmware: [u8; 15],
}

impl ProtocolVersion {
    /// Firmware string up to the first NUL, decoded lossily.
    pub fn firmware_str(&self) -> String {
        nul_terminated(&self.firmware)
    }
}

/// Result of an R/X measurement.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Impedance {
    /// Resistance in ohms.
    pub r: f32,
    /// Reactance in ohms.
    pub x: f32,
    pub s21_re: f32,
    pub s21_im: f32,
}

/// One (R, X) pair from the efficient measurement, widened from half floats.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ImpedancePoint {
    pub r: f32,
    pub x: f32,
}

/// Four consecutive points starting at the requested frequency, spaced by
/// the requested step.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EfficientSweep {
    pub points: [ImpedancePoint; 4],
}

/// Raw detector vector (magnitude/phase of voltage and current).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VectorSample {
    pub mag_v: f32,
    pub phase_v: f32,
    pub mag_i: f32,
    pub phase_i: f32,
}

/// Transmission measurement between output and input ports.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ThruSample {
    pub mag_vout: f32,
    pub phase_vout: f32,
    pub mag_vin: f32,
    pub phase_vin: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatteryStatus {
    /// Non-zero when USB power is present.
    pub vbus: u8,
    /// Battery voltage as reported by the ADC.
    pub voltage: u16,
    pub charger: u8,
}

/// Storage capacity, in the device's units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DiskInfo {
    pub total: u32,
    pub free: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskVolume {
    pub raw: [u8; 17],
}

impl DiskVolume {
    /// Volume label up to the first NUL, decoded lossily.
    pub fn label(&self) -> String {
        nul_terminated(&self.raw)
    }
}

fn nul_terminated(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(bytes.get(..end).unwrap_or_default()).into_owned()
}

/// Measurement calibration selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Calibration {
    /// Apply the device's stored calibration.
    #[default]
    Calibrated = 1,
    /// Uncalibrated detector output.
    Raw = 2,
}

/// Device settings addressable by set/get setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Setting {
    Sampling = 0,
    Filter = 1,
    Run = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum GpioMode {
    InputPullUp = 0,
    InputPullDown = 1,
    InputFloating = 2,
    OutputPushPull = 3,
}

impl TryFrom<u8> for GpioMode {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(GpioMode::InputPullUp),
            1 => Ok(GpioMode::InputPullDown),
            2 => Ok(GpioMode::InputFloating),
            3 => Ok(GpioMode::OutputPushPull),
            other => Err(ProtocolError::InvalidValue {
                field: "gpio mode",
                value: other,
            }),
        }
    }
}

/// One GPIO operation. The wire form is `op @1, port @2, arg @3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GpioCommand {
    Mode { port: u8, mode: GpioMode },
    Write { port: u8, level: u8 },
    Read { port: u8 },
}

impl GpioCommand {
    pub const OP_MODE: u8 = 0;
    pub const OP_WRITE: u8 = 1;
    pub const OP_READ: u8 = 2;

    /// `(op, port, arg)` as written to the frame.
    pub const fn wire(self) -> (u8, u8, u8) {
        match self {
            GpioCommand::Mode { port, mode } => (Self::OP_MODE, port, mode as u8),
            GpioCommand::Write { port, level } => (Self::OP_WRITE, port, level),
            GpioCommand::Read { port } => (Self::OP_READ, port, 0),
        }
    }
}
