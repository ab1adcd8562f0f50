//! Static command catalog: request and response layout per opcode.
//!
//! The typed handles in the `layout` submodules are what the command
//! encoders use. [`CATALOG`] describes the same layouts as data so they can be
//! listed, validated and rendered.

use crate::field::{Field, FieldKind, Half};
use crate::frame::FRAME_LEN;
use crate::ids::Opcode;
use serde::Serialize;
use std::fmt;

/// One field of a request or response layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub offset: usize,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn end(&self) -> usize {
        self.offset + self.kind.width()
    }
}

/// Request and response layout of one opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommandDescriptor {
    pub opcode: Opcode,
    pub name: &'static str,
    pub request: &'static [FieldSpec],
    pub response: &'static [FieldSpec],
}

impl CommandDescriptor {
    /// Check that every field lies inside the payload (bytes 1..18) and that
    /// no two fields of the same direction overlap.
    pub fn is_consistent(&self) -> bool {
        layout_is_consistent(self.request) && layout_is_consistent(self.response)
    }
}

fn layout_is_consistent(fields: &[FieldSpec]) -> bool {
    let in_bounds = fields.iter().all(|f| f.offset >= 1 && f.end() <= FRAME_LEN);
    let disjoint = fields.iter().enumerate().all(|(i, a)| {
        fields
            .iter()
            .skip(i + 1)
            .all(|b| a.end() <= b.offset || b.end() <= a.offset)
    });
    in_bounds && disjoint
}

impl fmt::Display for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list(fields: &[FieldSpec], f: &mut fmt::Formatter<'_>) -> fmt::Result {
            if fields.is_empty() {
                return f.write_str("-");
            }
            for (i, field) in fields.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{} {}@{}", field.kind, field.name, field.offset)?;
            }
            Ok(())
        }
        write!(f, "{} ({}) req: ", self.name, self.opcode.as_u8())?;
        list(self.request, f)?;
        f.write_str(" | resp: ")?;
        list(self.response, f)
    }
}

/// Field handles per command.
pub mod layout {
    use super::*;

    /// Frequency in Hz, shared by every measurement request.
    pub const FREQ: Field<u32> = Field::at(1);

    pub mod version {
        use super::*;
        pub const PROTOCOL: Field<u16> = Field::at(1);
        pub const FIRMWARE: Field<[u8; 15]> = Field::at(3);
    }

    pub mod meas_rx {
        use super::*;
        pub const CAL: Field<u8> = Field::at(5);
        pub const SAMPLES: Field<u8> = Field::at(6);

        pub const R: Field<f32> = Field::at(1);
        pub const X: Field<f32> = Field::at(5);
        pub const S21_RE: Field<f32> = Field::at(9);
        pub const S21_IM: Field<f32> = Field::at(13);
    }

    pub mod meas_rx_eff {
        use super::*;
        pub const CAL: Field<u8> = Field::at(5);
        pub const SAMPLES: Field<u8> = Field::at(6);
        pub const STEP: Field<u32> = Field::at(7);

        /// `(R, X)` half-float pairs at offsets 1, 5, 9 and 13.
        pub const POINTS: [(Field<Half>, Field<Half>); 4] = [
            (Field::at(1), Field::at(3)),
            (Field::at(5), Field::at(7)),
            (Field::at(9), Field::at(11)),
            (Field::at(13), Field::at(15)),
        ];
    }

    /// Four consecutive f32 values at 1, 5, 9, 13. Shared by the vector, RF
    /// and thru measurements.
    pub mod quad {
        use super::*;
        pub const A: Field<f32> = Field::at(1);
        pub const B: Field<f32> = Field::at(5);
        pub const C: Field<f32> = Field::at(9);
        pub const D: Field<f32> = Field::at(13);
    }

    pub mod signal_gen {
        use super::*;
        pub const LEVEL: Field<u16> = Field::at(5);
        pub const GAIN: Field<u8> = Field::at(7);
    }

    pub mod battery {
        use super::*;
        pub const VBUS: Field<u8> = Field::at(1);
        pub const VOLTAGE: Field<u16> = Field::at(2);
        pub const CHARGER: Field<u8> = Field::at(4);
    }

    pub mod disk_info {
        use super::*;
        pub const TOTAL: Field<u32> = Field::at(1);
        pub const FREE: Field<u32> = Field::at(5);
    }

    pub mod disk_volume {
        use super::*;
        pub const NAME: Field<[u8; 17]> = Field::at(1);
    }

    pub mod setting {
        use super::*;
        pub const SETTING: Field<u8> = Field::at(1);
        pub const VALUE: Field<u8> = Field::at(2);
        /// Response value of get setting.
        pub const RESULT: Field<u8> = Field::at(1);
    }

    pub mod buzzer {
        use super::*;
        pub const FREQ: Field<u16> = Field::at(1);
        pub const DURATION: Field<u16> = Field::at(3);
    }

    pub mod get_key {
        use super::*;
        pub const KEY: Field<u8> = Field::at(1);
    }

    pub mod gpio {
        use super::*;
        pub const OP: Field<u8> = Field::at(1);
        pub const PORT: Field<u8> = Field::at(2);
        pub const ARG: Field<u8> = Field::at(3);
        pub const VALUE: Field<u8> = Field::at(1);
    }
}

use layout::*;

const NONE: &[FieldSpec] = &[];

const FREQ_ONLY: &[FieldSpec] = &[FREQ.spec("freq")];

static VERSION: CommandDescriptor = CommandDescriptor {
    opcode: Opcode::Version,
    name: "version",
    request: NONE,
    response: &[
        version::PROTOCOL.spec("protocol"),
        version::FIRMWARE.spec("firmware"),
    ],
};

static MEAS_RX: CommandDescriptor = CommandDescriptor {
    opcode: Opcode::MeasRx,
    name: "meas_rx",
    request: &[
        FREQ.spec("freq"),
        meas_rx::CAL.spec("cal"),
        meas_rx::SAMPLES.spec("samples"),
    ],
    response: &[
        meas_rx::R.spec("r"),
        meas_rx::X.spec("x"),
        meas_rx::S21_RE.spec("s21_re"),
        meas_rx::S21_IM.spec("s21_im"),
    ],
};

static MEAS_VECTOR: CommandDescriptor = CommandDescriptor {
    opcode: Opcode::MeasVector,
    name: "meas_vector",
    request: FREQ_ONLY,
    response: &[
        quad::A.spec("mag_v"),
        quad::B.spec("phase_v"),
        quad::C.spec("mag_i"),
        quad::D.spec("phase_i"),
    ],
};

static SIGNAL_GEN: CommandDescriptor = CommandDescriptor {
    opcode: Opcode::SignalGen,
    name: "signal_gen",
    request: &[
        FREQ.spec("freq"),
        signal_gen::LEVEL.spec("level"),
        signal_gen::GAIN.spec("gain"),
    ],
    response: NONE,
};

static MEAS_RF: CommandDescriptor = CommandDescriptor {
    opcode: Opcode::MeasRf,
    name: "meas_rf",
    request: FREQ_ONLY,
    response: &[
        quad::A.spec("mag_v"),
        quad::B.spec("phase_v"),
        quad::C.spec("mag_i"),
        quad::D.spec("phase_i"),
    ],
};

static MEAS_VECTOR_THRU: CommandDescriptor = CommandDescriptor {
    opcode: Opcode::MeasVectorThru,
    name: "meas_vector_thru",
    request: FREQ_ONLY,
    response: &[
        quad::A.spec("mag_vout"),
        quad::B.spec("phase_vout"),
        quad::C.spec("mag_vin"),
        quad::D.spec("phase_vin"),
    ],
};

static BATTERY_STATUS: CommandDescriptor = CommandDescriptor {
    opcode: Opcode::BatteryStatus,
    name: "battery_status",
    request: NONE,
    response: &[
        battery::VBUS.spec("vbus"),
        battery::VOLTAGE.spec("voltage"),
        battery::CHARGER.spec("charger"),
    ],
};

static DISK_INFO: CommandDescriptor = CommandDescriptor {
    opcode: Opcode::DiskInfo,
    name: "disk_info",
    request: NONE,
    response: &[
        disk_info::TOTAL.spec("total"),
        disk_info::FREE.spec("free"),
    ],
};

static DISK_VOLUME: CommandDescriptor = CommandDescriptor {
    opcode: Opcode::DiskVolume,
    name: "disk_volume",
    request: NONE,
    response: &[disk_volume::NAME.spec("name")],
};

static SET_SETTING: CommandDescriptor = CommandDescriptor {
    opcode: Opcode::SetSetting,
    name: "set_setting",
    request: &[
        setting::SETTING.spec("setting"),
        setting::VALUE.spec("value"),
    ],
    response: NONE,
};

static GET_SETTING: CommandDescriptor = CommandDescriptor {
    opcode: Opcode::GetSetting,
    name: "get_setting",
    request: &[setting::SETTING.spec("setting")],
    response: &[setting::RESULT.spec("value")],
};

static MEAS_RX_EFF: CommandDescriptor = CommandDescriptor {
    opcode: Opcode::MeasRxEff,
    name: "meas_rx_eff",
    request: &[
        FREQ.spec("freq"),
        meas_rx_eff::CAL.spec("cal"),
        meas_rx_eff::SAMPLES.spec("samples"),
        meas_rx_eff::STEP.spec("step"),
    ],
    response: &[
        meas_rx_eff::POINTS[0].0.spec("r0"),
        meas_rx_eff::POINTS[0].1.spec("x0"),
        meas_rx_eff::POINTS[1].0.spec("r1"),
        meas_rx_eff::POINTS[1].1.spec("x1"),
        meas_rx_eff::POINTS[2].0.spec("r2"),
        meas_rx_eff::POINTS[2].1.spec("x2"),
        meas_rx_eff::POINTS[3].0.spec("r3"),
        meas_rx_eff::POINTS[3].1.spec("x3"),
    ],
};

static BUZZER: CommandDescriptor = CommandDescriptor {
    opcode: Opcode::Buzzer,
    name: "buzzer",
    request: &[
        buzzer::FREQ.spec("freq"),
        buzzer::DURATION.spec("duration"),
    ],
    response: NONE,
};

static GET_KEY: CommandDescriptor = CommandDescriptor {
    opcode: Opcode::GetKey,
    name: "get_key",
    request: NONE,
    response: &[get_key::KEY.spec("key")],
};

static DEVICE_RESET: CommandDescriptor = CommandDescriptor {
    opcode: Opcode::DeviceReset,
    name: "device_reset",
    request: NONE,
    response: NONE,
};

static GPIO: CommandDescriptor = CommandDescriptor {
    opcode: Opcode::Gpio,
    name: "gpio",
    request: &[
        gpio::OP.spec("op"),
        gpio::PORT.spec("port"),
        gpio::ARG.spec("arg"),
    ],
    response: &[gpio::VALUE.spec("value")],
};

/// Every command, in opcode order.
pub static CATALOG: [&CommandDescriptor; 16] = [
    &VERSION,
    &MEAS_RX,
    &MEAS_VECTOR,
    &SIGNAL_GEN,
    &MEAS_RF,
    &MEAS_VECTOR_THRU,
    &BATTERY_STATUS,
    &DISK_INFO,
    &DISK_VOLUME,
    &SET_SETTING,
    &GET_SETTING,
    &MEAS_RX_EFF,
    &BUZZER,
    &GET_KEY,
    &DEVICE_RESET,
    &GPIO,
];

/// Layout of `opcode`.
pub fn descriptor(opcode: Opcode) -> &'static CommandDescriptor {
    match opcode {
        Opcode::Version => &VERSION,
        Opcode::MeasRx => &MEAS_RX,
        Opcode::MeasVector => &MEAS_VECTOR,
        Opcode::SignalGen => &SIGNAL_GEN,
        Opcode::MeasRf => &MEAS_RF,
        Opcode::MeasVectorThru => &MEAS_VECTOR_THRU,
        Opcode::BatteryStatus => &BATTERY_STATUS,
        Opcode::DiskInfo => &DISK_INFO,
        Opcode::DiskVolume => &DISK_VOLUME,
        Opcode::SetSetting => &SET_SETTING,
        Opcode::GetSetting => &GET_SETTING,
        Opcode::MeasRxEff => &MEAS_RX_EFF,
        Opcode::Buzzer => &BUZZER,
        Opcode::GetKey => &GET_KEY,
        Opcode::DeviceReset => &DEVICE_RESET,
        Opcode::Gpio => &GPIO,
    }
}
