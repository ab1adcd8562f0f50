//! TCP transport.
//!
//! The network bridge forwards raw frames: exactly 18 bytes each way, no
//! length prefix. Reads block until the whole frame has arrived unless a read
//! timeout is configured.

use crate::{Transport, TransportError, TransportKind, TransportResult};
use sark110_protocol::{DEFAULT_TCP_PORT, FRAME_LEN};
use serde::{Deserialize, Serialize};
use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocketConfig {
    pub host: String,
    pub port: u16,
    /// Give up on each resolved address after this long.
    pub connect_timeout_ms: u64,
    /// OS-level read timeout. `None` blocks indefinitely.
    pub read_timeout_ms: Option<u64>,
    pub nodelay: bool,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_TCP_PORT,
            connect_timeout_ms: 3000,
            read_timeout_ms: None,
            nodelay: true,
        }
    }
}

impl SocketConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_read_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.read_timeout_ms = Some(timeout_ms);
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

pub struct SocketTransport {
    config: SocketConfig,
    stream: Option<TcpStream>,
}

impl SocketTransport {
    pub fn new(config: SocketConfig) -> Self {
        Self {
            config,
            stream: None,
        }
    }

    pub fn config(&self) -> &SocketConfig {
        &self.config
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.stream.as_ref().and_then(|s| s.peer_addr().ok())
    }

    fn connect_any(&self) -> TransportResult<TcpStream> {
        let endpoint = self.config.endpoint();
        let timeout = Duration::from_millis(self.config.connect_timeout_ms);
        let addrs = (self.config.host.as_str(), self.config.port)
            .to_socket_addrs()
            .map_err(|e| TransportError::OpenFailed(format!("cannot resolve {endpoint}: {e}")))?;

        let mut last_error = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    debug!(%addr, error = %e, "TCP connect attempt failed");
                    last_error = Some(e);
                }
            }
        }

        Err(match last_error {
            Some(e) if e.kind() == ErrorKind::TimedOut => TransportError::Timeout {
                timeout_ms: self.config.connect_timeout_ms,
            },
            Some(e) => TransportError::OpenFailed(format!("cannot connect to {endpoint}: {e}")),
            None => TransportError::OpenFailed(format!("{endpoint} resolved to no address")),
        })
    }

    fn stream(&mut self) -> TransportResult<&mut TcpStream> {
        self.stream.as_mut().ok_or(TransportError::NotOpen)
    }
}

impl Transport for SocketTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Socket
    }

    fn open(&mut self) -> TransportResult<usize> {
        self.close();

        let stream = self.connect_any()?;
        if self.config.nodelay {
            stream.set_nodelay(true)?;
        }
        stream.set_read_timeout(self.config.read_timeout_ms.map(Duration::from_millis))?;

        info!(endpoint = %self.config.endpoint(), "Socket transport open");
        self.stream = Some(stream);
        Ok(1)
    }

    fn send(&mut self, _device: usize, frame: &[u8; FRAME_LEN]) -> TransportResult<()> {
        self.stream()?
            .write_all(frame)
            .map_err(|e| TransportError::WriteFailed(e.to_string()))
    }

    fn receive(&mut self, _device: usize, frame: &mut [u8; FRAME_LEN]) -> TransportResult<()> {
        let timeout_ms = self.config.read_timeout_ms.unwrap_or(0);
        self.stream()?.read_exact(frame).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => TransportError::Disconnected,
            ErrorKind::WouldBlock | ErrorKind::TimedOut => TransportError::Timeout { timeout_ms },
            _ => TransportError::ReadFailed(e.to_string()),
        })
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.shutdown(Shutdown::Write) {
                // The peer may already have gone away.
                warn!(error = %e, "Socket shutdown failed");
            }
            debug!("Socket transport closed");
        }
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }
}

impl Drop for SocketTransport {
    fn drop(&mut self) {
        self.close();
    }
}
