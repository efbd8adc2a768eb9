//! Field registry
//!
//! Static table describing every loggable quantity: its element count, its
//! binary element type, how many text columns it renders to, and the three
//! routines that move it through the logger (sample encoder, header writer
//! and data writer). Keeping all of that in one table means the layout
//! compiler, the sampler and the renderer can never disagree on field order.

mod encode;
mod format;

use crate::config::LoggerConfig;
use crate::render::LineBuf;
use crate::sampling::TelemetrySource;

pub use format::{read_f32, read_i16, read_i32, read_i8, read_u16, read_u32};

/// Number of entries in the registry
pub const FIELD_COUNT: usize = 19;

/// Largest encoded size of a single field in bytes (the line sensor block)
pub const MAX_FIELD_BYTES: usize = 44;

/// Number of values carried by the free-form `Extra` field
pub const EXTRA_VALUES: usize = 4;

/// Binary element type of a logged field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    F32,
    F64,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
}

impl ElementType {
    /// Size of one element in bytes
    pub const fn size(self) -> usize {
        match self {
            Self::F32 => core::mem::size_of::<f32>(),
            Self::F64 => core::mem::size_of::<f64>(),
            Self::I8 => core::mem::size_of::<i8>(),
            Self::U8 => core::mem::size_of::<u8>(),
            Self::I16 => core::mem::size_of::<i16>(),
            Self::U16 => core::mem::size_of::<u16>(),
            Self::I32 => core::mem::size_of::<i32>(),
            Self::U32 => core::mem::size_of::<u32>(),
        }
    }
}

/// Identifier of a loggable field.
///
/// The discriminant is the field's position in the fixed enumeration order
/// and its bit index in the persisted enabled-set bitmap. Reordering these
/// variants is a breaking change to the stored configuration format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum FieldId {
    Time = 0,
    Mission,
    Acc,
    Gyro,
    Mag,
    MotorVelRef,
    MotorVoltage,
    MotorCurrent,
    Encoder,
    WheelVel,
    TurnRate,
    Pose,
    LineSensor,
    IrDistance,
    Battery,
    Timing,
    ControlTime,
    Extra,
    Chirp,
}

impl FieldId {
    /// All fields in fixed enumeration order
    pub const ALL: [FieldId; FIELD_COUNT] = [
        Self::Time,
        Self::Mission,
        Self::Acc,
        Self::Gyro,
        Self::Mag,
        Self::MotorVelRef,
        Self::MotorVoltage,
        Self::MotorCurrent,
        Self::Encoder,
        Self::WheelVel,
        Self::TurnRate,
        Self::Pose,
        Self::LineSensor,
        Self::IrDistance,
        Self::Battery,
        Self::Timing,
        Self::ControlTime,
        Self::Extra,
        Self::Chirp,
    ];

    /// Position in the enumeration (and bit index in the enabled bitmap)
    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Static descriptor for this field
    pub fn descriptor(self) -> &'static FieldDescriptor {
        &FIELDS[self.index()]
    }
}

/// Writes the current value of a field from the telemetry source into `out`.
/// `out` is exactly the field's byte size.
pub type EncodeFn = fn(&dyn TelemetrySource, &mut [u8]);

/// Writes a `%`-prefixed legend line starting at the given 1-based column.
pub type HeaderFn = fn(u16, &mut LineBuf, &LoggerConfig) -> core::fmt::Result;

/// Writes the field's stored bytes as space-separated text, with trailing separator.
pub type DataFn = fn(&[u8], &mut LineBuf, &LoggerConfig) -> core::fmt::Result;

/// Immutable description of one loggable field
pub struct FieldDescriptor {
    pub id: FieldId,
    /// Short name used by the command help and debug output
    pub name: &'static str,
    /// Number of elements stored per row
    pub count: u8,
    pub kind: ElementType,
    /// Number of text columns the field occupies in a rendered row
    pub columns: u8,
    pub encode: EncodeFn,
    pub header: HeaderFn,
    pub data: DataFn,
}

impl FieldDescriptor {
    /// Stored size of the field in bytes.
    ///
    /// A zero-sized element type would make every field share one offset,
    /// so the stride never drops below one byte.
    pub const fn byte_size(&self) -> usize {
        let stride = self.kind.size();
        let stride = if stride == 0 { 1 } else { stride };
        self.count as usize * stride
    }
}

/// Returns `(element_count, element_type)` for a field.
pub fn describe(field: FieldId) -> (u8, ElementType) {
    let desc = field.descriptor();
    (desc.count, desc.kind)
}

/// Looks a field up by its raw identifier. Unknown identifiers yield `None`.
pub fn describe_raw(id: usize) -> Option<(u8, ElementType)> {
    FieldId::from_index(id).map(describe)
}

macro_rules! field {
    (
        $id:ident, $name:literal, $count:expr, $kind:ident, $cols:expr,
        $enc:path, $head:path, $data:path $(,)?
    ) => {
        FieldDescriptor {
            id: FieldId::$id,
            name: $name,
            count: $count,
            kind: ElementType::$kind,
            columns: $cols,
            encode: $enc,
            header: $head,
            data: $data,
        }
    };
}

/// The registry, indexed by [`FieldId::index`]
pub static FIELDS: [FieldDescriptor; FIELD_COUNT] = [
    field!(Time, "time", 1, F32, 1, encode::time, format::time_header, format::time_data),
    field!(
        Mission,
        "mis",
        4,
        I16,
        4,
        encode::mission,
        format::mission_header,
        format::mission_data,
    ),
    field!(Acc, "acc", 3, F32, 3, encode::acc, format::acc_header, format::acc_data),
    field!(Gyro, "gyro", 3, F32, 3, encode::gyro, format::gyro_header, format::gyro_data),
    field!(Mag, "mag", 3, F32, 3, encode::mag, format::mag_header, format::mag_data),
    field!(
        MotorVelRef,
        "motref",
        2,
        F32,
        2,
        encode::motor_vel_ref,
        format::motor_vel_ref_header,
        format::motor_vel_ref_data,
    ),
    field!(
        MotorVoltage,
        "motv",
        2,
        I16,
        2,
        encode::motor_voltage,
        format::motor_voltage_header,
        format::motor_voltage_data,
    ),
    field!(
        MotorCurrent,
        "mota",
        3,
        F32,
        3,
        encode::motor_current,
        format::motor_current_header,
        format::motor_current_data,
    ),
    field!(
        Encoder,
        "enc",
        2,
        U32,
        2,
        encode::encoder,
        format::encoder_header,
        format::encoder_data,
    ),
    field!(
        WheelVel,
        "vel",
        2,
        F32,
        2,
        encode::wheel_vel,
        format::wheel_vel_header,
        format::wheel_vel_data,
    ),
    field!(
        TurnRate,
        "turnr",
        1,
        F32,
        1,
        encode::turn_rate,
        format::turn_rate_header,
        format::turn_rate_data,
    ),
    field!(Pose, "pose", 4, F32, 4, encode::pose, format::pose_header, format::pose_data),
    field!(
        LineSensor,
        "line",
        22,
        U16,
        18,
        encode::line_sensor,
        format::line_sensor_header,
        format::line_sensor_data,
    ),
    field!(
        IrDistance,
        "dist",
        2,
        U32,
        2,
        encode::ir_distance,
        format::ir_distance_header,
        format::ir_distance_data,
    ),
    field!(
        Battery,
        "batt",
        1,
        U16,
        1,
        encode::battery,
        format::battery_header,
        format::battery_data,
    ),
    field!(Timing, "time2", 7, U32, 7, encode::timing, format::timing_header, format::timing_data),
    field!(
        ControlTime,
        "ctime",
        3,
        I32,
        3,
        encode::control_time,
        format::control_time_header,
        format::control_time_data,
    ),
    field!(
        Extra,
        "ex",
        EXTRA_VALUES as u8,
        F32,
        EXTRA_VALUES as u8,
        encode::extra,
        format::extra_header,
        format::extra_data,
    ),
    field!(Chirp, "chirp", 4, F32, 4, encode::chirp, format::chirp_header, format::chirp_data),
];
