//! Session configuration.
//!
//! Everything serializes with `#[serde(default)]`, so a config file only needs
//! the keys it changes. Durations are plain millisecond integers.

use crate::error::{SarkError, SarkResult};
use sark110_protocol::Opcode;
use sark110_transport::{BleConfig, HidConfig, SocketConfig, TransportKind};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Attempt budgets per transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Send/receive attempts over HID.
    pub hid_attempts: u32,
    /// Send/receive attempts per BLE connection.
    pub ble_inner_attempts: u32,
    /// BLE connections tried per exchange. The link is closed and reopened
    /// between consecutive ones.
    pub ble_outer_attempts: u32,
    /// Outer budget for the version query, which fails fast on a peer that
    /// does not speak the protocol.
    pub ble_version_outer_attempts: u32,
    /// Pause between closing and reopening the BLE link.
    pub ble_reconnect_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            hid_attempts: 5,
            ble_inner_attempts: 2,
            ble_outer_attempts: 5,
            ble_version_outer_attempts: 1,
            ble_reconnect_delay_ms: 50,
        }
    }
}

/// How one exchange is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangePlan {
    /// One send/receive; any failure is final.
    Single,
    /// Up to `attempts` send/receive pairs on the same link.
    Repeat { attempts: u32 },
    /// Up to `outer` rounds of `inner` attempts, reconnecting between rounds.
    Reconnect {
        inner: u32,
        outer: u32,
        delay: Duration,
    },
}

impl ExchangePlan {
    /// Upper bound on send/receive pairs.
    pub fn max_attempts(&self) -> u32 {
        match *self {
            ExchangePlan::Single => 1,
            ExchangePlan::Repeat { attempts } => attempts,
            ExchangePlan::Reconnect { inner, outer, .. } => inner.saturating_mul(outer),
        }
    }
}

impl RetryPolicy {
    /// Reject zero attempt budgets, which would fail every exchange without
    /// touching the link.
    ///
    /// # Errors
    ///
    /// Returns [`SarkError::Config`] naming the first zero budget.
    pub fn validate(&self) -> SarkResult<()> {
        let budgets = [
            ("retry.hid_attempts", self.hid_attempts),
            ("retry.ble_inner_attempts", self.ble_inner_attempts),
            ("retry.ble_outer_attempts", self.ble_outer_attempts),
            (
                "retry.ble_version_outer_attempts",
                self.ble_version_outer_attempts,
            ),
        ];
        match budgets.iter().find(|(_, v)| *v == 0) {
            Some((key, _)) => Err(SarkError::config(format!("{key} must be at least 1"))),
            None => Ok(()),
        }
    }

    pub fn plan_for(&self, kind: TransportKind, opcode: u8) -> ExchangePlan {
        match kind {
            TransportKind::Socket => ExchangePlan::Single,
            TransportKind::Hid => ExchangePlan::Repeat {
                attempts: self.hid_attempts,
            },
            TransportKind::Ble => {
                let outer = if opcode == Opcode::Version.as_u8() {
                    self.ble_version_outer_attempts
                } else {
                    self.ble_outer_attempts
                };
                ExchangePlan::Reconnect {
                    inner: self.ble_inner_attempts,
                    outer,
                    delay: Duration::from_millis(self.ble_reconnect_delay_ms),
                }
            }
        }
    }
}

/// Complete configuration of one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub retry: RetryPolicy,
    pub hid: HidConfig,
    pub ble: BleConfig,
    pub socket: SocketConfig,
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_hid(mut self, hid: HidConfig) -> Self {
        self.hid = hid;
        self
    }

    pub fn with_ble(mut self, ble: BleConfig) -> Self {
        self.ble = ble;
        self
    }

    pub fn with_socket(mut self, socket: SocketConfig) -> Self {
        self.socket = socket;
        self
    }

    /// Shorthand for a socket endpoint on the default port.
    pub fn with_server(mut self, host: impl Into<String>) -> Self {
        self.socket.host = host.into();
        self
    }

    pub fn with_max_devices(mut self, max_devices: usize) -> Self {
        self.hid.max_devices = max_devices;
        self
    }

    /// Reject budgets and timeouts that would make every exchange fail.
    ///
    /// # Errors
    ///
    /// Returns [`SarkError::Config`] naming the first offending key.
    pub fn validate(&self) -> SarkResult<()> {
        self.retry.validate()?;

        let timeouts = [
            ("hid.send_timeout_ms", self.hid.send_timeout_ms),
            ("hid.receive_timeout_ms", self.hid.receive_timeout_ms),
            ("ble.receive_timeout_ms", self.ble.receive_timeout_ms),
            ("socket.connect_timeout_ms", self.socket.connect_timeout_ms),
            (
                "socket.read_timeout_ms",
                self.socket.read_timeout_ms.unwrap_or(u64::MAX),
            ),
        ];
        if let Some((key, _)) = timeouts.iter().find(|(_, v)| *v == 0) {
            return Err(SarkError::config(format!("{key} must be non-zero")));
        }

        if self.hid.max_devices == 0 {
            return Err(SarkError::config("hid.max_devices must be at least 1"));
        }
        if self.socket.host.is_empty() {
            return Err(SarkError::config("socket.host must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_plans() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.plan_for(TransportKind::Socket, 2),
            ExchangePlan::Single
        );
        assert_eq!(
            policy.plan_for(TransportKind::Hid, 2),
            ExchangePlan::Repeat { attempts: 5 }
        );
        assert_eq!(
            policy.plan_for(TransportKind::Ble, 2),
            ExchangePlan::Reconnect {
                inner: 2,
                outer: 5,
                delay: Duration::from_millis(50)
            }
        );
        assert_eq!(policy.plan_for(TransportKind::Ble, 1).max_attempts(), 2);
        assert_eq!(policy.plan_for(TransportKind::Ble, 3).max_attempts(), 10);
    }

    #[test]
    fn test_validate_defaults() {
        assert!(SessionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_budget() {
        let config = SessionConfig::default().with_retry(RetryPolicy {
            ble_outer_attempts: 0,
            ..RetryPolicy::default()
        });
        let err = config.validate().err().map(|e| e.to_string());
        assert_eq!(
            err.as_deref(),
            Some("Configuration error: retry.ble_outer_attempts must be at least 1")
        );
    }

    #[test]
    fn test_policy_validate_names_zero_budget() {
        let policy = RetryPolicy {
            hid_attempts: 0,
            ..RetryPolicy::default()
        };
        let err = policy.validate().err().map(|e| e.to_string());
        assert_eq!(
            err.as_deref(),
            Some("Configuration error: retry.hid_attempts must be at least 1")
        );
        assert!(RetryPolicy::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_timeouts() {
        let mut config = SessionConfig::default();
        config.socket.read_timeout_ms = Some(0);
        assert!(config.validate().is_err());

        let mut config = SessionConfig::default();
        config.hid.receive_timeout_ms = 0;
        assert!(config.validate().is_err());

        assert!(SessionConfig::default().with_max_devices(0).validate().is_err());
        assert!(SessionConfig::default().with_server("").validate().is_err());
    }

    #[test]
    fn test_serde_partial_document() -> Result<(), serde_json::Error> {
        let config: SessionConfig = serde_json::from_str(
            r#"{ "retry": { "ble_outer_attempts": 3 }, "socket": { "host": "10.0.0.7" } }"#,
        )?;
        assert_eq!(config.retry.ble_outer_attempts, 3);
        assert_eq!(config.retry.ble_inner_attempts, 2);
        assert_eq!(config.socket.port, 8888);
        assert_eq!(config.socket.endpoint(), "10.0.0.7:8888");
        Ok(())
    }

    #[test]
    fn test_serde_round_trip() -> Result<(), serde_json::Error> {
        let config = SessionConfig::default()
            .with_server("sark.local")
            .with_max_devices(2);
        let json = serde_json::to_string(&config)?;
        let back: SessionConfig = serde_json::from_str(&json)?;
        assert_eq!(back, config);
        Ok(())
    }
}
