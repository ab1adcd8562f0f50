//! Command API over a connected session.

use crate::config::SessionConfig;
use crate::error::{CommError, SarkError, SarkResult};
use crate::session::Session;
use sark110_protocol::{
    BatteryStatus, Buzzer, Calibration, Command, DeviceReset, DiskInfo, DiskVolume,
    EfficientSweep, GetBatteryStatus, GetDiskInfo, GetDiskVolume, GetKey, GetSetting, GetVersion,
    Gpio, GpioCommand, GpioMode, Impedance, MeasureRf, MeasureRx, MeasureRxEfficient,
    MeasureVector, MeasureVectorThru, ProtocolVersion, SetSetting, Setting, SignalGenerator,
    Status, ThruSample, VectorSample,
};
use sark110_transport::{BleTransport, GattLink, SocketTransport, Transport, TransportKind};
use std::sync::Arc;
use tracing::{debug, info};

/// A SARK-110 reachable through one session.
///
/// Clones share the session; [`with_device`](Self::with_device) picks which
/// of several HID units a handle talks to.
#[derive(Debug, Clone)]
pub struct Sark110 {
    session: Arc<Session>,
    device: usize,
}

impl Sark110 {
    /// Validate `config`, wrap `transport` in a session and connect it.
    ///
    /// # Errors
    ///
    /// [`SarkError::Config`] for an unusable configuration, otherwise
    /// [`CommError::Connect`] when the transport does not open.
    pub fn connect(transport: Box<dyn Transport>, config: &SessionConfig) -> SarkResult<Self> {
        config.validate()?;
        let session = Session::new(transport, config.retry.clone())?;
        let devices = session.connect()?;
        info!(transport = %session.kind(), devices, "SARK-110 connected");
        Ok(Self {
            session: Arc::new(session),
            device: 0,
        })
    }

    /// Connect to a remote unit over TCP using `config.socket`.
    ///
    /// # Errors
    ///
    /// See [`connect`](Self::connect).
    pub fn connect_socket(config: &SessionConfig) -> SarkResult<Self> {
        Self::connect(
            Box::new(SocketTransport::new(config.socket.clone())),
            config,
        )
    }

    /// Connect over Bluetooth LE through `link` using `config.ble`.
    ///
    /// # Errors
    ///
    /// See [`connect`](Self::connect).
    pub fn connect_ble<L: GattLink + 'static>(link: L, config: &SessionConfig) -> SarkResult<Self> {
        Self::connect(
            Box::new(BleTransport::new(link, config.ble.clone())),
            config,
        )
    }

    /// Connect to every matching USB unit, up to `config.hid.max_devices`.
    ///
    /// # Errors
    ///
    /// See [`connect`](Self::connect). Also fails when the HID backend cannot
    /// be initialized.
    #[cfg(feature = "hid")]
    pub fn connect_hid(config: &SessionConfig) -> SarkResult<Self> {
        use sark110_transport::{HidApiPort, HidTransport};

        let port = HidApiPort::new().map_err(|source| CommError::Connect {
            kind: TransportKind::Hid,
            source,
        })?;
        Self::connect(
            Box::new(HidTransport::new(port, config.hid.clone())),
            config,
        )
    }

    /// A handle addressing device `index` on the same session.
    ///
    /// The index is checked on every exchange, not here.
    pub fn with_device(&self, index: usize) -> Self {
        Self {
            session: Arc::clone(&self.session),
            device: index,
        }
    }

    pub fn device_index(&self) -> usize {
        self.device
    }

    pub fn device_count(&self) -> usize {
        self.session.device_count()
    }

    pub fn transport_kind(&self) -> TransportKind {
        self.session.kind()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Close the shared session. Every clone is affected.
    pub fn close(&self) {
        self.session.close();
    }

    /// Run one command and decode its reply.
    ///
    /// # Errors
    ///
    /// - [`SarkError::Comm`] when no well-formed reply arrived
    /// - [`SarkError::Device`] when the device answered `'E'`
    /// - [`SarkError::Protocol`] when the request or payload does not fit
    pub fn execute<C: Command>(&self, command: &C) -> SarkResult<C::Output> {
        let request = command.to_request()?;
        let response = self.session.send_receive(self.device, &request)?;
        match response.status() {
            Status::Ok => Ok(C::decode(&response)?),
            Status::DeviceError => {
                debug!(opcode = %C::OPCODE, device = self.device, "Device reported error");
                Err(SarkError::Device { opcode: C::OPCODE })
            }
            Status::Invalid(byte) => Err(CommError::MalformedStatus(byte).into()),
        }
    }

    // ── Named operations ────────────────────────────────────────────────────

    pub fn version(&self) -> SarkResult<ProtocolVersion> {
        self.execute(&GetVersion)
    }

    /// Measure impedance at `freq_hz`, averaging `samples` readings.
    pub fn measure_rx(&self, freq_hz: u32, cal: Calibration, samples: u8) -> SarkResult<Impedance> {
        self.execute(&MeasureRx::new(freq_hz, cal, samples))
    }

    /// Four impedance points starting at `freq_hz`, `step_hz` apart.
    pub fn measure_rx_efficient(
        &self,
        freq_hz: u32,
        step_hz: u32,
        cal: Calibration,
        samples: u8,
    ) -> SarkResult<EfficientSweep> {
        self.execute(&MeasureRxEfficient::new(freq_hz, cal, samples, step_hz))
    }

    pub fn measure_vector(&self, freq_hz: u32) -> SarkResult<VectorSample> {
        self.execute(&MeasureVector { freq_hz })
    }

    pub fn measure_rf(&self, freq_hz: u32) -> SarkResult<VectorSample> {
        self.execute(&MeasureRf { freq_hz })
    }

    pub fn measure_vector_thru(&self, freq_hz: u32) -> SarkResult<ThruSample> {
        self.execute(&MeasureVectorThru { freq_hz })
    }

    pub fn signal_generator(&self, freq_hz: u32, level: u16, gain: u8) -> SarkResult<()> {
        self.execute(&SignalGenerator {
            freq_hz,
            level,
            gain,
        })
    }

    pub fn battery_status(&self) -> SarkResult<BatteryStatus> {
        self.execute(&GetBatteryStatus)
    }

    pub fn get_key(&self) -> SarkResult<u8> {
        self.execute(&GetKey)
    }

    pub fn disk_info(&self) -> SarkResult<DiskInfo> {
        self.execute(&GetDiskInfo)
    }

    pub fn disk_volume(&self) -> SarkResult<DiskVolume> {
        self.execute(&GetDiskVolume)
    }

    pub fn set_setting(&self, setting: Setting, value: u8) -> SarkResult<()> {
        self.execute(&SetSetting { setting, value })
    }

    pub fn get_setting(&self, setting: Setting) -> SarkResult<u8> {
        self.execute(&GetSetting { setting })
    }

    /// Sound the buzzer. `freq_hz == 0` selects the default tone.
    pub fn buzzer(&self, freq_hz: u16, duration_ms: u16) -> SarkResult<()> {
        self.execute(&Buzzer {
            freq_hz,
            duration_ms,
        })
    }

    pub fn reset(&self) -> SarkResult<()> {
        self.execute(&DeviceReset)
    }

    pub fn gpio_mode(&self, port: u8, mode: GpioMode) -> SarkResult<()> {
        self.execute(&Gpio(GpioCommand::Mode { port, mode }))
            .map(|_| ())
    }

    pub fn gpio_write(&self, port: u8, level: bool) -> SarkResult<()> {
        self.execute(&Gpio(GpioCommand::Write {
            port,
            level: u8::from(level),
        }))
        .map(|_| ())
    }

    pub fn gpio_read(&self, port: u8) -> SarkResult<bool> {
        self.execute(&Gpio(GpioCommand::Read { port }))
            .map(|value| value != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sark110_protocol::catalog::layout;
    use sark110_protocol::{FRAME_LEN, Opcode, Response};
    use sark110_transport::mock::{Event, ScriptedTransport};

    fn connected(kind: TransportKind) -> SarkResult<(Sark110, ScriptedTransport)> {
        let script = ScriptedTransport::new(kind);
        let device = Sark110::connect(Box::new(script.clone()), &SessionConfig::default())?;
        Ok((device, script))
    }

    #[test]
    fn test_execute_decodes_ok_reply() -> Result<(), Box<dyn std::error::Error>> {
        let (device, script) = connected(TransportKind::Hid)?;
        let mut reply = Response::ok();
        reply.set(layout::get_key::KEY, 4)?;
        script.push_reply(*reply.as_bytes());

        assert_eq!(device.get_key()?, 4);
        let sent = script.sent_frames();
        assert_eq!(
            sent.first().and_then(|f| f.first()).copied(),
            Some(Opcode::GetKey.as_u8())
        );
        Ok(())
    }

    #[test]
    fn test_device_error_maps_to_device_variant() -> SarkResult<()> {
        let (device, script) = connected(TransportKind::Hid)?;
        script.push_reply(*Response::device_error().as_bytes());

        let result = device.buzzer(0, 100);
        assert!(matches!(
            result,
            Err(SarkError::Device {
                opcode: Opcode::Buzzer
            })
        ));
        assert_eq!(script.count(|e| matches!(e, Event::Send(_))), 1);
        Ok(())
    }

    #[test]
    fn test_gpio_encodes_operation() -> Result<(), Box<dyn std::error::Error>> {
        let (device, script) = connected(TransportKind::Socket)?;
        let mut reply = Response::ok();
        reply.set(layout::gpio::VALUE, 1)?;
        script.push_reply(*Response::ok().as_bytes());
        script.push_reply(*reply.as_bytes());

        device.gpio_write(3, true)?;
        assert!(device.gpio_read(3)?);

        let sent = script.sent_frames();
        let head = sent.first().and_then(|f| f.get(..4));
        assert_eq!(head, Some(&[Opcode::Gpio.as_u8(), GpioCommand::OP_WRITE, 3, 1][..]));
        assert_eq!(sent.first().map(|f| f.len()), Some(FRAME_LEN));
        Ok(())
    }

    #[test]
    fn test_handles_share_one_session() -> SarkResult<()> {
        let (device, script) = connected(TransportKind::Hid)?;
        let other = device.with_device(0);
        other.close();
        assert!(matches!(
            device.get_key(),
            Err(SarkError::Comm(CommError::NotConnected))
        ));
        assert_eq!(script.count(|e| matches!(e, Event::Close)), 1);
        Ok(())
    }

    #[test]
    fn test_invalid_config_rejected_before_open() {
        let script = ScriptedTransport::new(TransportKind::Hid);
        let config = SessionConfig::default().with_max_devices(0);
        let result = Sark110::connect(Box::new(script.clone()), &config);
        assert!(matches!(result, Err(SarkError::Config(_))));
        assert!(script.events().is_empty());
    }
}
