//! Typed commands.
//!
//! Each catalog entry has a command type that knows how to fill its request
//! frame and how to read its response payload. Status handling is left to the
//! caller: `decode` is only invoked on a response whose status is `'O'`.

use crate::catalog::{CommandDescriptor, descriptor, layout};
use crate::error::ProtocolResult;
use crate::frame::{Request, Response};
use crate::ids::Opcode;
use crate::types::{
    BatteryStatus, Calibration, DiskInfo, DiskVolume, EfficientSweep, GpioCommand,
    Impedance, ImpedancePoint, ProtocolVersion, Setting, ThruSample, VectorSample,
};

/// A remote command with a typed request and response.
pub trait Command {
    const OPCODE: Opcode;

    type Output;

    /// Write request fields. The opcode byte is already set.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::ProtocolError`] if a field does not fit the frame.
    fn encode(&self, _request: &mut Request) -> ProtocolResult<()> {
        Ok(())
    }

    /// Read the payload of a successful response.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::ProtocolError`] if a field does not fit the frame or
    /// carries an out-of-range value.
    fn decode(response: &Response) -> ProtocolResult<Self::Output>;

    /// Build the complete request frame.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`Command::encode`].
    fn to_request(&self) -> ProtocolResult<Request> {
        let mut request = Request::new(Self::OPCODE);
        self.encode(&mut request)?;
        Ok(request)
    }

    fn descriptor() -> &'static CommandDescriptor {
        descriptor(Self::OPCODE)
    }
}

/// Query protocol version and firmware string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetVersion;

impl Command for GetVersion {
    const OPCODE: Opcode = Opcode::Version;
    type Output = ProtocolVersion;

    fn decode(response: &Response) -> ProtocolResult<ProtocolVersion> {
        Ok(ProtocolVersion {
            protocol: response.get(layout::version::PROTOCOL)?,
            firmware: response.get(layout::version::FIRMWARE)?,
        })
    }
}

/// Measure R/X at one frequency, averaging `samples` readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeasureRx {
    pub freq_hz: u32,
    pub cal: Calibration,
    pub samples: u8,
}

impl MeasureRx {
    pub const fn new(freq_hz: u32, cal: Calibration, samples: u8) -> Self {
        Self {
            freq_hz,
            cal,
            samples,
        }
    }
}

impl Command for MeasureRx {
    const OPCODE: Opcode = Opcode::MeasRx;
    type Output = Impedance;

    fn encode(&self, request: &mut Request) -> ProtocolResult<()> {
        request
            .set(layout::FREQ, self.freq_hz)?
            .set(layout::meas_rx::CAL, self.cal as u8)?
            .set(layout::meas_rx::SAMPLES, self.samples)?;
        Ok(())
    }

    fn decode(response: &Response) -> ProtocolResult<Impedance> {
        Ok(Impedance {
            r: response.get(layout::meas_rx::R)?,
            x: response.get(layout::meas_rx::X)?,
            s21_re: response.get(layout::meas_rx::S21_RE)?,
            s21_im: response.get(layout::meas_rx::S21_IM)?,
        })
    }
}

/// Measure four R/X points in one frame, packed as half floats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeasureRxEfficient {
    pub freq_hz: u32,
    pub cal: Calibration,
    pub samples: u8,
    pub step_hz: u32,
}

impl MeasureRxEfficient {
    pub const fn new(freq_hz: u32, cal: Calibration, samples: u8, step_hz: u32) -> Self {
        Self {
            freq_hz,
            cal,
            samples,
            step_hz,
        }
    }
}

impl Command for MeasureRxEfficient {
    const OPCODE: Opcode = Opcode::MeasRxEff;
    type Output = EfficientSweep;

    fn encode(&self, request: &mut Request) -> ProtocolResult<()> {
        request
            .set(layout::FREQ, self.freq_hz)?
            .set(layout::meas_rx_eff::CAL, self.cal as u8)?
            .set(layout::meas_rx_eff::SAMPLES, self.samples)?
            .set(layout::meas_rx_eff::STEP, self.step_hz)?;
        Ok(())
    }

    fn decode(response: &Response) -> ProtocolResult<EfficientSweep> {
        let mut sweep = EfficientSweep::default();
        for (point, (r, x)) in sweep.points.iter_mut().zip(layout::meas_rx_eff::POINTS) {
            *point = ImpedancePoint {
                r: response.get(r)?.to_f32(),
                x: response.get(x)?.to_f32(),
            };
        }
        Ok(sweep)
    }
}

fn decode_quad(response: &Response) -> ProtocolResult<[f32; 4]> {
    Ok([
        response.get(layout::quad::A)?,
        response.get(layout::quad::B)?,
        response.get(layout::quad::C)?,
        response.get(layout::quad::D)?,
    ])
}

/// Raw detector vector at one frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeasureVector {
    pub freq_hz: u32,
}

impl Command for MeasureVector {
    const OPCODE: Opcode = Opcode::MeasVector;
    type Output = VectorSample;

    fn encode(&self, request: &mut Request) -> ProtocolResult<()> {
        request.set(layout::FREQ, self.freq_hz)?;
        Ok(())
    }

    fn decode(response: &Response) -> ProtocolResult<VectorSample> {
        let [mag_v, phase_v, mag_i, phase_i] = decode_quad(response)?;
        Ok(VectorSample {
            mag_v,
            phase_v,
            mag_i,
            phase_i,
        })
    }
}

/// RF detector vector at one frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeasureRf {
    pub freq_hz: u32,
}

impl Command for MeasureRf {
    const OPCODE: Opcode = Opcode::MeasRf;
    type Output = VectorSample;

    fn encode(&self, request: &mut Request) -> ProtocolResult<()> {
        request.set(layout::FREQ, self.freq_hz)?;
        Ok(())
    }

    fn decode(response: &Response) -> ProtocolResult<VectorSample> {
        MeasureVector::decode(response)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeasureVectorThru {
    pub freq_hz: u32,
}

impl Command for MeasureVectorThru {
    const OPCODE: Opcode = Opcode::MeasVectorThru;
    type Output = ThruSample;

    fn encode(&self, request: &mut Request) -> ProtocolResult<()> {
        request.set(layout::FREQ, self.freq_hz)?;
        Ok(())
    }

    fn decode(response: &Response) -> ProtocolResult<ThruSample> {
        let [mag_vout, phase_vout, mag_vin, phase_vin] = decode_quad(response)?;
        Ok(ThruSample {
            mag_vout,
            phase_vout,
            mag_vin,
            phase_vin,
        })
    }
}

/// Drive the signal generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalGenerator {
    pub freq_hz: u32,
    pub level: u16,
    pub gain: u8,
}

impl Command for SignalGenerator {
    const OPCODE: Opcode = Opcode::SignalGen;
    type Output = ();

    fn encode(&self, request: &mut Request) -> ProtocolResult<()> {
        request
            .set(layout::FREQ, self.freq_hz)?
            .set(layout::signal_gen::LEVEL, self.level)?
            .set(layout::signal_gen::GAIN, self.gain)?;
        Ok(())
    }

    fn decode(_response: &Response) -> ProtocolResult<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetBatteryStatus;

impl Command for GetBatteryStatus {
    const OPCODE: Opcode = Opcode::BatteryStatus;
    type Output = BatteryStatus;

    fn decode(response: &Response) -> ProtocolResult<BatteryStatus> {
        Ok(BatteryStatus {
            vbus: response.get(layout::battery::VBUS)?,
            voltage: response.get(layout::battery::VOLTAGE)?,
            charger: response.get(layout::battery::CHARGER)?,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetDiskInfo;

impl Command for GetDiskInfo {
    const OPCODE: Opcode = Opcode::DiskInfo;
    type Output = DiskInfo;

    fn decode(response: &Response) -> ProtocolResult<DiskInfo> {
        Ok(DiskInfo {
            total: response.get(layout::disk_info::TOTAL)?,
            free: response.get(layout::disk_info::FREE)?,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetDiskVolume;

impl Command for GetDiskVolume {
    const OPCODE: Opcode = Opcode::DiskVolume;
    type Output = DiskVolume;

    fn decode(response: &Response) -> ProtocolResult<DiskVolume> {
        Ok(DiskVolume {
            raw: response.get(layout::disk_volume::NAME)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetSetting {
    pub setting: Setting,
    pub value: u8,
}

impl Command for SetSetting {
    const OPCODE: Opcode = Opcode::SetSetting;
    type Output = ();

    fn encode(&self, request: &mut Request) -> ProtocolResult<()> {
        request
            .set(layout::setting::SETTING, self.setting as u8)?
            .set(layout::setting::VALUE, self.value)?;
        Ok(())
    }

    fn decode(_response: &Response) -> ProtocolResult<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetSetting {
    pub setting: Setting,
}

impl Command for GetSetting {
    const OPCODE: Opcode = Opcode::GetSetting;
    type Output = u8;

    fn encode(&self, request: &mut Request) -> ProtocolResult<()> {
        request.set(layout::setting::SETTING, self.setting as u8)?;
        Ok(())
    }

    fn decode(response: &Response) -> ProtocolResult<u8> {
        response.get(layout::setting::RESULT)
    }
}

/// Sound the buzzer. A zero frequency uses the firmware default tone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Buzzer {
    pub freq_hz: u16,
    pub duration_ms: u16,
}

impl Command for Buzzer {
    const OPCODE: Opcode = Opcode::Buzzer;
    type Output = ();

    fn encode(&self, request: &mut Request) -> ProtocolResult<()> {
        request
            .set(layout::buzzer::FREQ, self.freq_hz)?
            .set(layout::buzzer::DURATION, self.duration_ms)?;
        Ok(())
    }

    fn decode(_response: &Response) -> ProtocolResult<()> {
        Ok(())
    }
}

/// Read the last key pressed on the device keypad.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetKey;

impl Command for GetKey {
    const OPCODE: Opcode = Opcode::GetKey;
    type Output = u8;

    fn decode(response: &Response) -> ProtocolResult<u8> {
        response.get(layout::get_key::KEY)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceReset;

impl Command for DeviceReset {
    const OPCODE: Opcode = Opcode::DeviceReset;
    type Output = ();

    fn decode(_response: &Response) -> ProtocolResult<()> {
        Ok(())
    }
}

/// GPIO mode/write/read. The response value is meaningful only for reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gpio(pub GpioCommand);

impl Command for Gpio {
    const OPCODE: Opcode = Opcode::Gpio;
    type Output = u8;

    fn encode(&self, request: &mut Request) -> ProtocolResult<()> {
        let (op, port, arg) = self.0.wire();
        request
            .set(layout::gpio::OP, op)?
            .set(layout::gpio::PORT, port)?
            .set(layout::gpio::ARG, arg)?;
        Ok(())
    }

    fn decode(response: &Response) -> ProtocolResult<u8> {
        response.get(layout::gpio::VALUE)
    }
}
