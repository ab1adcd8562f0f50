//! Session lifecycle and the serialized exchange path.
//!
//! A [`Session`] owns exactly one transport for its whole life. Every exchange
//! takes the link lock and keeps it through all retries, reconnects and
//! sleeps, so at most one frame is in flight per session. Lifecycle state
//! lives behind its own short-held lock and can be read while an exchange is
//! running.

use crate::config::RetryPolicy;
use crate::error::{CommError, SarkResult};
use crate::retry;
use parking_lot::Mutex;
use sark110_protocol::{FRAME_LEN, Request, Response};
use sark110_transport::{Transport, TransportKind};
use std::fmt;
use tracing::{debug, info, warn};

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    Exchanging,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Disconnected => f.write_str("disconnected"),
            SessionState::Connecting => f.write_str("connecting"),
            SessionState::Connected => f.write_str("connected"),
            SessionState::Exchanging => f.write_str("exchanging"),
        }
    }
}

#[derive(Clone, Copy)]
struct Status {
    state: SessionState,
    devices: usize,
}

pub struct Session {
    kind: TransportKind,
    policy: RetryPolicy,
    // Lock order: `link` before `status`. `status` is never held across I/O.
    link: Mutex<Box<dyn Transport>>,
    status: Mutex<Status>,
}

impl Session {
    /// Wrap `transport` in a disconnected session.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SarkError::Config`] when `policy` has a zero attempt
    /// budget.
    pub fn new(transport: Box<dyn Transport>, policy: RetryPolicy) -> SarkResult<Self> {
        policy.validate()?;
        Ok(Self {
            kind: transport.kind(),
            policy,
            link: Mutex::new(transport),
            status: Mutex::new(Status {
                state: SessionState::Disconnected,
                devices: 0,
            }),
        })
    }

    pub fn kind(&self) -> TransportKind {
        self.kind
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Current state. Never waits for a running exchange.
    pub fn state(&self) -> SessionState {
        self.status.lock().state
    }

    /// Devices reachable through the transport; 0 while disconnected.
    pub fn device_count(&self) -> usize {
        self.status.lock().devices
    }

    fn set_status(&self, state: SessionState, devices: usize) {
        *self.status.lock() = Status { state, devices };
    }

    fn set_state(&self, state: SessionState) {
        self.status.lock().state = state;
    }

    /// Open the transport. Returns the number of devices found (always 1 for
    /// BLE and socket).
    ///
    /// Connecting an already connected session reopens the transport.
    ///
    /// # Errors
    ///
    /// [`CommError::Connect`] when the transport cannot be opened. The session
    /// is left disconnected.
    pub fn connect(&self) -> Result<usize, CommError> {
        let mut link = self.link.lock();
        self.set_status(SessionState::Connecting, 0);

        match link.open() {
            Ok(devices) => {
                self.set_status(SessionState::Connected, devices);
                info!(transport = %self.kind, devices, "Session connected");
                Ok(devices)
            }
            Err(source) => {
                link.close();
                self.set_status(SessionState::Disconnected, 0);
                warn!(transport = %self.kind, error = %source, "Session connect failed");
                Err(CommError::Connect {
                    kind: self.kind,
                    source,
                })
            }
        }
    }

    /// Send `request` to `device` and wait for a well-formed reply, retrying
    /// as the session's policy dictates for its transport.
    ///
    /// A reply with status `'E'` is returned as is; deciding what it means is
    /// up to the caller.
    ///
    /// # Errors
    ///
    /// [`CommError::NotConnected`] before [`connect`](Self::connect) or after
    /// [`close`](Self::close); otherwise whatever the retry plan gave up with.
    pub fn send_receive(&self, device: usize, request: &Request) -> Result<Response, CommError> {
        let mut link = self.link.lock();
        {
            let mut status = self.status.lock();
            if status.state != SessionState::Connected {
                return Err(CommError::NotConnected);
            }
            status.state = SessionState::Exchanging;
        }

        let plan = self.policy.plan_for(self.kind, request.opcode_byte());
        let result = retry::run(link.as_mut(), device, request, plan);
        self.set_state(SessionState::Connected);
        result
    }

    /// Tear the session down. Best effort; never fails.
    ///
    /// A socket peer is first told about the disconnect with the all-`0xFF`
    /// frame. Whatever happens to that exchange is ignored.
    pub fn close(&self) {
        let mut link = self.link.lock();
        if self.state() == SessionState::Disconnected {
            return;
        }

        if self.kind == TransportKind::Socket {
            notify_disconnect(link.as_mut());
        }
        link.close();
        self.set_status(SessionState::Disconnected, 0);
        info!(transport = %self.kind, "Session closed");
    }
}

fn notify_disconnect(transport: &mut dyn Transport) {
    let frame = Request::disconnect();
    if let Err(e) = transport.send(0, frame.as_bytes()) {
        debug!(error = %e, "Disconnect notification not sent");
        return;
    }
    let mut reply = [0u8; FRAME_LEN];
    if let Err(e) = transport.receive(0, &mut reply) {
        debug!(error = %e, "No reply to disconnect notification");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("kind", &self.kind)
            .field("state", &self.state())
            .field("policy", &self.policy)
            .finish()
    }
}
