//! USB HID transport.
//!
//! The analyzer exposes its command channel as a vendor-defined HID
//! collection. Each frame travels as one output report (report ID `0x00`
//! followed by the 18 frame bytes) and each reply as one input report whose
//! first 18 bytes are the frame.

use crate::device_info::HidDeviceInfo;
use crate::{Transport, TransportError, TransportKind, TransportResult};
use sark110_protocol::{FRAME_LEN, hid_signature};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Report ID prepended to every output report.
pub const REPORT_ID: u8 = 0x00;

/// An opened HID device.
pub trait HidDevice: Send {
    /// Write one output report, report ID included. Returns bytes written.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when the write fails or times out.
    fn write_report(&mut self, data: &[u8], timeout_ms: u64) -> TransportResult<usize>;

    /// Read one input report. An empty vector means nothing arrived in time.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when the read fails.
    fn read_report(&mut self, timeout_ms: u64) -> TransportResult<Vec<u8>>;

    fn device_info(&self) -> &HidDeviceInfo;

    fn close(&mut self);
}

/// Enumerates and opens HID devices.
pub trait HidPort: Send {
    /// # Errors
    ///
    /// Returns a [`TransportError`] when enumeration fails.
    fn list_devices(&mut self) -> TransportResult<Vec<HidDeviceInfo>>;

    /// # Errors
    ///
    /// Returns a [`TransportError`] when the device cannot be opened.
    fn open_device(&mut self, info: &HidDeviceInfo) -> TransportResult<Box<dyn HidDevice>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HidConfig {
    pub vendor_id: u16,
    pub product_id: u16,
    pub usage_page: u16,
    pub usage: u16,
    /// Upper bound on devices opened by one transport.
    pub max_devices: usize,
    pub send_timeout_ms: u64,
    pub receive_timeout_ms: u64,
}

impl Default for HidConfig {
    fn default() -> Self {
        Self {
            vendor_id: hid_signature::VENDOR_ID,
            product_id: hid_signature::PRODUCT_ID,
            usage_page: hid_signature::USAGE_PAGE,
            usage: hid_signature::USAGE,
            max_devices: 1,
            send_timeout_ms: hid_signature::SEND_TIMEOUT_MS,
            receive_timeout_ms: hid_signature::RECEIVE_TIMEOUT_MS,
        }
    }
}

impl HidConfig {
    pub fn with_max_devices(mut self, max_devices: usize) -> Self {
        self.max_devices = max_devices;
        self
    }

    fn matches(&self, info: &HidDeviceInfo) -> bool {
        info.matches(self.vendor_id, self.product_id, self.usage_page, self.usage)
    }
}

pub struct HidTransport<P: HidPort> {
    port: P,
    config: HidConfig,
    devices: Vec<Box<dyn HidDevice>>,
}

impl<P: HidPort> HidTransport<P> {
    pub fn new(port: P, config: HidConfig) -> Self {
        Self {
            port,
            config,
            devices: Vec::new(),
        }
    }

    pub fn config(&self) -> &HidConfig {
        &self.config
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    fn device_mut(&mut self, index: usize) -> TransportResult<&mut Box<dyn HidDevice>> {
        if self.devices.is_empty() {
            return Err(TransportError::NotOpen);
        }
        let count = self.devices.len();
        self.devices
            .get_mut(index)
            .ok_or_else(|| TransportError::DeviceNotFound(format!("index {index} of {count}")))
    }
}

impl<P: HidPort> Transport for HidTransport<P> {
    fn kind(&self) -> TransportKind {
        TransportKind::Hid
    }

    fn open(&mut self) -> TransportResult<usize> {
        self.close();

        let candidates: Vec<HidDeviceInfo> = self
            .port
            .list_devices()?
            .into_iter()
            .filter(|info| self.config.matches(info))
            .take(self.config.max_devices)
            .collect();

        for info in &candidates {
            match self.port.open_device(info) {
                Ok(device) => {
                    debug!(device = %info.display_name(), path = %info.path, "Opened HID device");
                    self.devices.push(device);
                }
                Err(e) => warn!(
                    device = %info.display_name(),
                    path = %info.path,
                    error = %e,
                    "Failed to open HID device"
                ),
            }
        }

        if self.devices.is_empty() {
            return Err(TransportError::DeviceNotFound(format!(
                "{:04x}:{:04x} usage {:04x}:{:04x}",
                self.config.vendor_id,
                self.config.product_id,
                self.config.usage_page,
                self.config.usage
            )));
        }

        info!(devices = self.devices.len(), "HID transport open");
        Ok(self.devices.len())
    }

    fn send(&mut self, device: usize, frame: &[u8; FRAME_LEN]) -> TransportResult<()> {
        let timeout_ms = self.config.send_timeout_ms;
        let mut report = [REPORT_ID; FRAME_LEN + 1];
        if let Some(payload) = report.get_mut(1..) {
            payload.copy_from_slice(frame);
        }

        let written = self.device_mut(device)?.write_report(&report, timeout_ms)?;
        if written < report.len() {
            return Err(TransportError::WriteFailed(format!(
                "wrote {written} of {} bytes",
                report.len()
            )));
        }
        Ok(())
    }

    fn receive(&mut self, device: usize, frame: &mut [u8; FRAME_LEN]) -> TransportResult<()> {
        let timeout_ms = self.config.receive_timeout_ms;
        let report = self.device_mut(device)?.read_report(timeout_ms)?;

        match report.get(..FRAME_LEN) {
            Some(bytes) => {
                frame.copy_from_slice(bytes);
                Ok(())
            }
            None if report.is_empty() => Err(TransportError::Timeout { timeout_ms }),
            None => Err(TransportError::ShortRead {
                expected: FRAME_LEN,
                actual: report.len(),
            }),
        }
    }

    fn close(&mut self) {
        if self.devices.is_empty() {
            return;
        }
        for device in &mut self.devices {
            debug!(device = %device.device_info().display_name(), "Closing HID device");
            device.close();
        }
        self.devices.clear();
        info!("HID transport closed");
    }

    fn is_open(&self) -> bool {
        !self.devices.is_empty()
    }
}

impl<P: HidPort> Drop for HidTransport<P> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockHidDevice, MockHidPort};

    fn sark_port(count: usize) -> (MockHidPort, Vec<MockHidDevice>) {
        let mut port = MockHidPort::new();
        let mut handles = Vec::new();
        for i in 0..count {
            let device = MockHidDevice::new(HidDeviceInfo::sark110(format!("/dev/hidraw{i}")));
            handles.push(device.clone());
            port.add_device(device);
        }
        (port, handles)
    }

    #[test]
    fn test_open_filters_by_signature() -> TransportResult<()> {
        let (mut port, _handles) = sark_port(1);
        port.add_device(MockHidDevice::new(HidDeviceInfo::new(0x046d, 0xc24f, "/dev/hidraw9")));
        port.add_device(MockHidDevice::new(
            HidDeviceInfo::sark110("/dev/hidraw8").with_usage(0x0001, 0x0002),
        ));

        let mut transport = HidTransport::new(port, HidConfig::default().with_max_devices(4));
        assert_eq!(transport.open()?, 1);
        assert!(transport.is_open());
        Ok(())
    }

    #[test]
    fn test_open_respects_max_devices() -> TransportResult<()> {
        let (port, _handles) = sark_port(3);
        let mut transport = HidTransport::new(port, HidConfig::default().with_max_devices(2));
        assert_eq!(transport.open()?, 2);
        Ok(())
    }

    #[test]
    fn test_open_without_devices_fails() {
        let mut transport = HidTransport::new(MockHidPort::new(), HidConfig::default());
        let result = transport.open();
        assert!(matches!(result, Err(TransportError::DeviceNotFound(_))));
        assert!(!transport.is_open());
    }

    #[test]
    fn test_send_prepends_report_id() -> TransportResult<()> {
        let (port, handles) = sark_port(1);
        let mut transport = HidTransport::new(port, HidConfig::default());
        transport.open()?;

        let mut frame = [0u8; FRAME_LEN];
        frame[0] = 1;
        transport.send(0, &frame)?;

        let history = handles.first().map(MockHidDevice::write_history).unwrap_or_default();
        assert_eq!(history.len(), 1);
        let report = history.first().cloned().unwrap_or_default();
        assert_eq!(report.len(), FRAME_LEN + 1);
        assert_eq!(&report[..2], &[REPORT_ID, 1]);
        Ok(())
    }

    #[test]
    fn test_send_rejects_truncated_report() -> TransportResult<()> {
        let (port, handles) = sark_port(1);
        let mut transport = HidTransport::new(port, HidConfig::default());
        transport.open()?;
        if let Some(h) = handles.first() {
            h.short_writes(1);
        }

        // 18 of 19 bytes loses the last frame byte.
        let result = transport.send(0, &[1u8; FRAME_LEN]);
        assert!(matches!(result, Err(TransportError::WriteFailed(_))));
        transport.send(0, &[1u8; FRAME_LEN])?;
        Ok(())
    }

    #[test]
    fn test_receive_takes_first_frame_bytes() -> TransportResult<()> {
        let (port, handles) = sark_port(1);
        let mut transport = HidTransport::new(port, HidConfig::default());
        transport.open()?;

        let mut report = vec![b'O'; 64];
        report[1] = 7;
        if let Some(h) = handles.first() {
            h.queue_read(report);
        }

        let mut frame = [0u8; FRAME_LEN];
        transport.receive(0, &mut frame)?;
        assert_eq!(&frame[..2], &[b'O', 7]);
        Ok(())
    }

    #[test]
    fn test_receive_short_and_empty_reports() -> TransportResult<()> {
        let (port, handles) = sark_port(1);
        let mut transport = HidTransport::new(port, HidConfig::default());
        transport.open()?;
        if let Some(h) = handles.first() {
            h.queue_read(vec![b'O'; 5]);
            h.queue_read(Vec::new());
        }

        let mut frame = [0u8; FRAME_LEN];
        let short = transport.receive(0, &mut frame);
        assert!(matches!(
            short,
            Err(TransportError::ShortRead {
                expected: 18,
                actual: 5
            })
        ));
        let empty = transport.receive(0, &mut frame);
        assert!(matches!(
            empty,
            Err(TransportError::Timeout { timeout_ms: 220 })
        ));
        Ok(())
    }

    #[test]
    fn test_device_index_range_checked() -> TransportResult<()> {
        let (port, _handles) = sark_port(2);
        let mut transport = HidTransport::new(port, HidConfig::default().with_max_devices(2));
        transport.open()?;

        let frame = [0u8; FRAME_LEN];
        transport.send(1, &frame)?;
        let result = transport.send(2, &frame);
        assert!(matches!(result, Err(TransportError::DeviceNotFound(_))));
        Ok(())
    }

    #[test]
    fn test_send_before_open() {
        let mut transport = HidTransport::new(MockHidPort::new(), HidConfig::default());
        let result = transport.send(0, &[0u8; FRAME_LEN]);
        assert!(matches!(result, Err(TransportError::NotOpen)));
    }

    #[test]
    fn test_close_closes_every_device() -> TransportResult<()> {
        let (port, handles) = sark_port(2);
        let mut transport = HidTransport::new(port, HidConfig::default().with_max_devices(2));
        transport.open()?;
        transport.close();
        assert!(!transport.is_open());
        assert!(handles.iter().all(|h| !h.is_connected()));
        Ok(())
    }
}
