//! [`HidPort`] backed by the `hidapi` crate.

use crate::device_info::HidDeviceInfo;
use crate::hid::{HidDevice, HidPort};
use crate::{TransportError, TransportResult};
use hidapi::HidApi;
use std::ffi::CString;

/// Input report buffer. The command interface uses 64-byte reports.
const READ_BUFFER_LEN: usize = 64;

pub struct HidApiPort {
    api: HidApi,
}

impl HidApiPort {
    /// # Errors
    ///
    /// Returns [`TransportError::OpenFailed`] when the HID library cannot be
    /// initialised.
    pub fn new() -> TransportResult<Self> {
        let api = HidApi::new()
            .map_err(|e| TransportError::OpenFailed(format!("failed to initialise HID API: {e}")))?;
        Ok(Self { api })
    }
}

impl HidPort for HidApiPort {
    fn list_devices(&mut self) -> TransportResult<Vec<HidDeviceInfo>> {
        self.api
            .refresh_devices()
            .map_err(|e| TransportError::OpenFailed(format!("HID enumeration failed: {e}")))?;

        Ok(self
            .api
            .device_list()
            .map(|dev| {
                let mut info = HidDeviceInfo::new(
                    dev.vendor_id(),
                    dev.product_id(),
                    dev.path().to_string_lossy(),
                )
                .with_usage(dev.usage_page(), dev.usage());
                if let Some(serial) = dev.serial_number() {
                    info = info.with_serial(serial);
                }
                if let Some(name) = dev.product_string() {
                    info = info.with_product_name(name);
                }
                info
            })
            .collect())
    }

    fn open_device(&mut self, info: &HidDeviceInfo) -> TransportResult<Box<dyn HidDevice>> {
        let path = CString::new(info.path.as_str())
            .map_err(|e| TransportError::DeviceNotFound(format!("{}: {e}", info.path)))?;
        let device = self
            .api
            .open_path(&path)
            .map_err(|e| TransportError::OpenFailed(format!("{}: {e}", info.path)))?;
        Ok(Box::new(HidApiDevice {
            device: Some(device),
            info: info.clone(),
        }))
    }
}

struct HidApiDevice {
    device: Option<hidapi::HidDevice>,
    info: HidDeviceInfo,
}

impl HidApiDevice {
    fn handle(&self) -> TransportResult<&hidapi::HidDevice> {
        self.device.as_ref().ok_or(TransportError::NotOpen)
    }
}

impl HidDevice for HidApiDevice {
    // hidapi writes block until the report is queued, so the timeout is
    // advisory here.
    fn write_report(&mut self, data: &[u8], _timeout_ms: u64) -> TransportResult<usize> {
        self.handle()?
            .write(data)
            .map_err(|e| TransportError::WriteFailed(e.to_string()))
    }

    fn read_report(&mut self, timeout_ms: u64) -> TransportResult<Vec<u8>> {
        let mut buf = vec![0u8; READ_BUFFER_LEN];
        let timeout = i32::try_from(timeout_ms).unwrap_or(i32::MAX);
        let n = self
            .handle()?
            .read_timeout(&mut buf, timeout)
            .map_err(|e| TransportError::ReadFailed(e.to_string()))?;
        buf.truncate(n);
        Ok(buf)
    }

    fn device_info(&self) -> &HidDeviceInfo {
        &self.info
    }

    fn close(&mut self) {
        self.device = None;
    }
}
