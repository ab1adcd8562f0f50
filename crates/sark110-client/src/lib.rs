//! Host-side client for the SARK-110 antenna analyzer.
//!
//! This crate sits on top of `sark110-protocol` (frames and commands) and
//! `sark110-transport` (HID, BLE and TCP links) and adds:
//!
//! - [`Session`]: one transport, one lock, one frame in flight
//! - the per-transport retry engine configured by [`RetryPolicy`]
//! - [`Sark110`]: typed command methods with device and communication
//!   errors kept apart
//!
//! # Example
//!
//! ```no_run
//! use sark110_client::{Sark110, SessionConfig};
//! use sark110_protocol::Calibration;
//!
//! # fn main() -> Result<(), sark110_client::SarkError> {
//! let config = SessionConfig::new().with_server("192.168.1.40");
//! let analyzer = Sark110::connect_socket(&config)?;
//! let z = analyzer.measure_rx(14_000_000, Calibration::Calibrated, 1)?;
//! println!("R = {:.1} X = {:.1}", z.r, z.x);
//! analyzer.close();
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod device;
pub mod error;
mod retry;
pub mod session;

pub use config::{ExchangePlan, RetryPolicy, SessionConfig};
pub use device::Sark110;
pub use error::{
    CommError, LEGACY_COMM_ERROR, LEGACY_DEVICE_ERROR, LEGACY_OK, SarkError, SarkResult,
    legacy_status,
};
pub use session::{Session, SessionState};
