//! SARK-110 remote protocol: fixed 18-byte frames, field codec and command catalog.
//!
//! This crate is intentionally I/O-free and allocation-free. It provides pure
//! functions and types that can be tested and fuzzed without hardware or any
//! HID, BLE or socket plumbing.
//!
//! # Layout
//!
//! - [`codec`]: little-endian integer/float packing and the device's
//!   half-precision float conversion
//! - [`field`]: typed field handles (`Field<T>`) and their wire kinds
//! - [`frame`]: [`Request`] and [`Response`] frames
//! - [`ids`]: opcodes, status bytes and transport identifiers
//! - [`catalog`]: per-opcode request/response layouts
//! - [`commands`]: one typed [`Command`] per catalog entry
//! - [`types`]: decoded response values
//!
//! # Example
//!
//! ```
//! use sark110_protocol::{Calibration, Command, MeasureRx, Opcode};
//!
//! let request = MeasureRx::new(14_000_000, Calibration::Calibrated, 4).to_request()?;
//! assert_eq!(request.opcode(), Some(Opcode::MeasRx));
//! assert_eq!(&request.as_bytes()[1..7], &[0x80, 0x9F, 0xD5, 0x00, 1, 4]);
//! # Ok::<(), sark110_protocol::ProtocolError>(())
//! ```

#![deny(static_mut_refs)]

pub mod catalog;
pub mod codec;
pub mod commands;
pub mod error;
pub mod field;
pub mod frame;
pub mod ids;
pub mod types;

pub use catalog::{CATALOG, CommandDescriptor, FieldSpec, descriptor};
pub use codec::{f16_to_f32, f32_to_f16};
pub use commands::{
    Buzzer, Command, DeviceReset, GetBatteryStatus, GetDiskInfo, GetDiskVolume, GetKey,
    GetSetting, GetVersion, Gpio, MeasureRf, MeasureRx, MeasureRxEfficient, MeasureVector,
    MeasureVectorThru, SetSetting, SignalGenerator,
};
pub use error::{ProtocolError, ProtocolResult};
pub use field::{Field, FieldKind, FieldValue, Half};
pub use frame::{FRAME_LEN, Request, Response, Status};
pub use ids::{
    DEFAULT_TCP_PORT, GATT_SERVICE_UUID, Opcode, STATUS_ERR, STATUS_OK, hid_signature,
};
pub use types::{
    BatteryStatus, Calibration, DiskInfo, DiskVolume, EfficientSweep, GpioCommand, GpioMode,
    Impedance, ImpedancePoint, ProtocolVersion, Setting, ThruSample, VectorSample,
};
