//! Bluetooth LE transport.
//!
//! The analyzer exposes one GATT service with a single characteristic that is
//! both writable and notifiable. A request is one write; the reply arrives as
//! a notification, which the platform stack hands to a [`NotificationSlot`].
//! `receive` blocks on the slot's condition variable instead of polling.

use crate::{Transport, TransportError, TransportKind, TransportResult};
use parking_lot::{Condvar, Mutex};
use sark110_protocol::{FRAME_LEN, GATT_SERVICE_UUID};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace};
use uuid::Uuid;

/// Bytes kept from one notification. Anything longer is cut.
pub const NOTIFICATION_CAPACITY: usize = 100;

struct Inbox {
    data: [u8; NOTIFICATION_CAPACITY],
    len: usize,
    fresh: bool,
}

/// Latest notification plus an "arrived" signal.
///
/// The platform callback calls [`publish`](Self::publish); the transport waits
/// in [`wait_frame`](Self::wait_frame).
pub struct NotificationSlot {
    inbox: Mutex<Inbox>,
    arrived: Condvar,
}

impl Default for NotificationSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationSlot {
    pub fn new() -> Self {
        Self {
            inbox: Mutex::new(Inbox {
                data: [0; NOTIFICATION_CAPACITY],
                len: 0,
                fresh: false,
            }),
            arrived: Condvar::new(),
        }
    }

    /// Store a notification, replacing any unread one, and wake the waiter.
    pub fn publish(&self, data: &[u8]) {
        let len = data.len().min(NOTIFICATION_CAPACITY);
        {
            let mut inbox = self.inbox.lock();
            if let (Some(dst), Some(src)) = (inbox.data.get_mut(..len), data.get(..len)) {
                dst.copy_from_slice(src);
            }
            inbox.len = len;
            inbox.fresh = true;
        }
        trace!(len, "BLE notification");
        self.arrived.notify_all();
    }

    /// Drop any unread notification.
    pub fn clear(&self) {
        let mut inbox = self.inbox.lock();
        inbox.fresh = false;
        inbox.len = 0;
    }

    pub fn has_pending(&self) -> bool {
        self.inbox.lock().fresh
    }

    /// Wait up to `timeout` for a notification and copy its first 18 bytes.
    ///
    /// # Errors
    ///
    /// [`TransportError::Timeout`] when nothing arrives in time and
    /// [`TransportError::ShortRead`] when the notification is shorter than a
    /// frame. Either way the notification is consumed.
    pub fn wait_frame(&self, out: &mut [u8; FRAME_LEN], timeout: Duration) -> TransportResult<()> {
        let mut inbox = self.inbox.lock();
        let waited = self
            .arrived
            .wait_while_for(&mut inbox, |inbox| !inbox.fresh, timeout);
        if waited.timed_out() && !inbox.fresh {
            return Err(TransportError::Timeout {
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            });
        }

        inbox.fresh = false;
        match inbox.data.get(..FRAME_LEN) {
            Some(bytes) if inbox.len >= FRAME_LEN => {
                out.copy_from_slice(bytes);
                Ok(())
            }
            _ => Err(TransportError::ShortRead {
                expected: FRAME_LEN,
                actual: inbox.len,
            }),
        }
    }
}

/// Platform GATT client bound to one peripheral.
pub trait GattLink: Send {
    /// Connect, resolve `service`, subscribe to its notifiable characteristic
    /// and route notifications into `sink`.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when the peripheral or service is missing.
    fn connect(&mut self, service: Uuid, sink: Arc<NotificationSlot>) -> TransportResult<()>;

    /// Write to the characteristic.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when the write is rejected.
    fn write(&mut self, data: &[u8]) -> TransportResult<()>;

    fn disconnect(&mut self);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BleConfig {
    pub service_uuid: Uuid,
    /// Bound on the wait for a reply notification.
    pub receive_timeout_ms: u64,
    /// Pause after connecting before the first write.
    pub settle_delay_ms: u64,
}

impl Default for BleConfig {
    fn default() -> Self {
        Self {
            service_uuid: Uuid::from_u128(GATT_SERVICE_UUID),
            receive_timeout_ms: 200,
            settle_delay_ms: 1000,
        }
    }
}

pub struct BleTransport<L: GattLink> {
    link: L,
    config: BleConfig,
    slot: Arc<NotificationSlot>,
    open: bool,
}

impl<L: GattLink> BleTransport<L> {
    pub fn new(link: L, config: BleConfig) -> Self {
        Self {
            link,
            config,
            slot: Arc::new(NotificationSlot::new()),
            open: false,
        }
    }

    pub fn config(&self) -> &BleConfig {
        &self.config
    }
}

impl<L: GattLink> Transport for BleTransport<L> {
    fn kind(&self) -> TransportKind {
        TransportKind::Ble
    }

    fn open(&mut self) -> TransportResult<usize> {
        self.close();
        self.slot.clear();

        self.link
            .connect(self.config.service_uuid, Arc::clone(&self.slot))?;
        self.open = true;

        if self.config.settle_delay_ms > 0 {
            std::thread::sleep(Duration::from_millis(self.config.settle_delay_ms));
        }
        info!(service = %self.config.service_uuid, "BLE transport open");
        Ok(1)
    }

    fn send(&mut self, _device: usize, frame: &[u8; FRAME_LEN]) -> TransportResult<()> {
        if !self.open {
            return Err(TransportError::NotOpen);
        }
        self.slot.clear();
        self.link.write(frame)
    }

    fn receive(&mut self, _device: usize, frame: &mut [u8; FRAME_LEN]) -> TransportResult<()> {
        if !self.open {
            return Err(TransportError::NotOpen);
        }
        self.slot
            .wait_frame(frame, Duration::from_millis(self.config.receive_timeout_ms))
    }

    fn close(&mut self) {
        if !self.open {
            return;
        }
        self.link.disconnect();
        self.open = false;
        debug!("BLE transport closed");
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

impl<L: GattLink> Drop for BleTransport<L> {
    fn drop(&mut self) {
        self.close();
    }
}
