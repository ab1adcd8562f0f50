//! In-memory stand-ins for the hardware edges and for whole transports.
//!
//! All mocks are cheap to clone; clones share state so a test can keep a
//! handle while the transport owns another.

use crate::ble::{GattLink, NotificationSlot};
use crate::device_info::HidDeviceInfo;
use crate::hid::{HidDevice, HidPort};
use crate::{Transport, TransportError, TransportKind, TransportResult};
use parking_lot::Mutex;
use sark110_protocol::FRAME_LEN;
use std::collections::VecDeque;
use std::sync::Arc;
use uuid::Uuid;

// ── HID ─────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockHidDevice {
    info: HidDeviceInfo,
    read_queue: Arc<Mutex<VecDeque<Vec<u8>>>>,
    write_history: Arc<Mutex<Vec<Vec<u8>>>>,
    connected: Arc<Mutex<bool>>,
    short_writes: Arc<Mutex<usize>>,
}

impl MockHidDevice {
    pub fn new(info: HidDeviceInfo) -> Self {
        Self {
            info,
            read_queue: Arc::new(Mutex::new(VecDeque::new())),
            write_history: Arc::new(Mutex::new(Vec::new())),
            connected: Arc::new(Mutex::new(true)),
            short_writes: Arc::new(Mutex::new(0)),
        }
    }

    /// Make the next `count` writes report one byte fewer than requested.
    pub fn short_writes(&self, count: usize) {
        *self.short_writes.lock() = count;
    }

    pub fn queue_read(&self, data: Vec<u8>) {
        self.read_queue.lock().push_back(data);
    }

    pub fn write_history(&self) -> Vec<Vec<u8>> {
        self.write_history.lock().clone()
    }

    pub fn disconnect(&self) {
        *self.connected.lock() = false;
    }

    pub fn reconnect(&self) {
        *self.connected.lock() = true;
    }

    pub fn is_connected(&self) -> bool {
        *self.connected.lock()
    }
}

impl HidDevice for MockHidDevice {
    fn write_report(&mut self, data: &[u8], _timeout_ms: u64) -> TransportResult<usize> {
        if !self.is_connected() {
            return Err(TransportError::Disconnected);
        }
        self.write_history.lock().push(data.to_vec());
        let mut short = self.short_writes.lock();
        if *short > 0 {
            *short -= 1;
            return Ok(data.len().saturating_sub(1));
        }
        Ok(data.len())
    }

    fn read_report(&mut self, _timeout_ms: u64) -> TransportResult<Vec<u8>> {
        if !self.is_connected() {
            return Err(TransportError::Disconnected);
        }
        // An empty queue behaves like a read that timed out.
        Ok(self.read_queue.lock().pop_front().unwrap_or_default())
    }

    fn device_info(&self) -> &HidDeviceInfo {
        &self.info
    }

    fn close(&mut self) {
        self.disconnect();
    }
}

#[derive(Default)]
pub struct MockHidPort {
    devices: Vec<MockHidDevice>,
}

impl MockHidPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_device(&mut self, device: MockHidDevice) {
        self.devices.push(device);
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }
}

impl HidPort for MockHidPort {
    fn list_devices(&mut self) -> TransportResult<Vec<HidDeviceInfo>> {
        Ok(self.devices.iter().map(|d| d.info.clone()).collect())
    }

    fn open_device(&mut self, info: &HidDeviceInfo) -> TransportResult<Box<dyn HidDevice>> {
        let device = self
            .devices
            .iter()
            .find(|d| d.info.path == info.path)
            .ok_or_else(|| TransportError::DeviceNotFound(info.path.clone()))?;
        device.reconnect();
        Ok(Box::new(device.clone()))
    }
}

// ── BLE ─────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct GattState {
    connected: bool,
    connects: usize,
    disconnects: usize,
    writes: Vec<Vec<u8>>,
    replies: VecDeque<Vec<u8>>,
    fail_connect: bool,
    sink: Option<Arc<NotificationSlot>>,
}

/// GATT link that answers every write with the next queued notification.
///
/// A write with no queued reply produces no notification, so the transport's
/// receive runs into its timeout.
#[derive(Clone, Default)]
pub struct MockGattLink {
    state: Arc<Mutex<GattState>>,
}

impl MockGattLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_reply(&self, data: Vec<u8>) {
        self.state.lock().replies.push_back(data);
    }

    pub fn set_fail_connect(&self, fail: bool) {
        self.state.lock().fail_connect = fail;
    }

    /// Push a notification outside any write, as a chatty peripheral would.
    pub fn notify(&self, data: &[u8]) {
        let sink = self.state.lock().sink.clone();
        if let Some(sink) = sink {
            sink.publish(data);
        }
    }

    pub fn connects(&self) -> usize {
        self.state.lock().connects
    }

    pub fn disconnects(&self) -> usize {
        self.state.lock().disconnects
    }

    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state.lock().writes.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().connected
    }
}

impl GattLink for MockGattLink {
    fn connect(&mut self, service: Uuid, sink: Arc<NotificationSlot>) -> TransportResult<()> {
        let mut state = self.state.lock();
        if state.fail_connect {
            return Err(TransportError::OpenFailed(format!(
                "GATT service {service} not found"
            )));
        }
        state.connected = true;
        state.connects += 1;
        state.sink = Some(sink);
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> TransportResult<()> {
        let (sink, reply) = {
            let mut state = self.state.lock();
            if !state.connected {
                return Err(TransportError::NotOpen);
            }
            state.writes.push(data.to_vec());
            (state.sink.clone(), state.replies.pop_front())
        };
        if let (Some(sink), Some(reply)) = (sink, reply) {
            sink.publish(&reply);
        }
        Ok(())
    }

    fn disconnect(&mut self) {
        let mut state = self.state.lock();
        if state.connected {
            state.connected = false;
            state.disconnects += 1;
            state.sink = None;
        }
    }
}

// ── Whole transport ─────────────────────────────────────────────────────────

/// One scripted outcome of a send/receive pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Send succeeds and receive yields this frame.
    Reply([u8; FRAME_LEN]),
    SendFails,
    ReceiveFails,
}

/// Everything the transport was asked to do, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Open,
    Send([u8; FRAME_LEN]),
    Receive,
    Close,
}

#[derive(Default)]
struct ScriptState {
    steps: VecDeque<Step>,
    pending: Option<Step>,
    events: Vec<Event>,
    open: bool,
    open_failures: usize,
    devices: usize,
}

/// Transport that replays a script of steps.
///
/// Each `send` consumes the next step. When the script runs out, every send
/// succeeds and every receive times out.
#[derive(Clone)]
pub struct ScriptedTransport {
    kind: TransportKind,
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedTransport {
    pub fn new(kind: TransportKind) -> Self {
        Self {
            kind,
            state: Arc::new(Mutex::new(ScriptState {
                devices: 1,
                ..ScriptState::default()
            })),
        }
    }

    pub fn with_devices(self, devices: usize) -> Self {
        self.state.lock().devices = devices;
        self
    }

    pub fn push(&self, step: Step) -> &Self {
        self.state.lock().steps.push_back(step);
        self
    }

    pub fn push_reply(&self, frame: [u8; FRAME_LEN]) -> &Self {
        self.push(Step::Reply(frame))
    }

    pub fn push_repeated(&self, step: Step, times: usize) -> &Self {
        let mut state = self.state.lock();
        state.steps.extend(std::iter::repeat_n(step, times));
        drop(state);
        self
    }

    /// Make the next `count` opens fail.
    pub fn fail_opens(&self, count: usize) {
        self.state.lock().open_failures = count;
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.lock().events.clone()
    }

    pub fn sent_frames(&self) -> Vec<[u8; FRAME_LEN]> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Send(frame) => Some(frame),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, wanted: fn(&Event) -> bool) -> usize {
        self.state.lock().events.iter().filter(|e| wanted(e)).count()
    }

    pub fn remaining_steps(&self) -> usize {
        self.state.lock().steps.len()
    }
}

impl Transport for ScriptedTransport {
    fn kind(&self) -> TransportKind {
        self.kind
    }

    fn open(&mut self) -> TransportResult<usize> {
        let mut state = self.state.lock();
        state.events.push(Event::Open);
        if state.open_failures > 0 {
            state.open_failures -= 1;
            return Err(TransportError::OpenFailed("scripted open failure".into()));
        }
        state.open = true;
        Ok(state.devices)
    }

    fn send(&mut self, device: usize, frame: &[u8; FRAME_LEN]) -> TransportResult<()> {
        let mut state = self.state.lock();
        state.events.push(Event::Send(*frame));
        if !state.open {
            return Err(TransportError::NotOpen);
        }
        if device >= state.devices {
            return Err(TransportError::DeviceNotFound(format!("index {device}")));
        }
        let step = state.steps.pop_front();
        state.pending = step;
        match step {
            Some(Step::SendFails) => Err(TransportError::WriteFailed("scripted".into())),
            _ => Ok(()),
        }
    }

    fn receive(&mut self, _device: usize, frame: &mut [u8; FRAME_LEN]) -> TransportResult<()> {
        let mut state = self.state.lock();
        state.events.push(Event::Receive);
        if !state.open {
            return Err(TransportError::NotOpen);
        }
        match state.pending.take() {
            Some(Step::Reply(reply)) => {
                *frame = reply;
                Ok(())
            }
            Some(Step::ReceiveFails) => Err(TransportError::ReadFailed("scripted".into())),
            Some(Step::SendFails) | None => Err(TransportError::Timeout { timeout_ms: 0 }),
        }
    }

    fn close(&mut self) {
        let mut state = self.state.lock();
        state.events.push(Event::Close);
        state.open = false;
    }

    fn is_open(&self) -> bool {
        self.state.lock().open
    }
}
