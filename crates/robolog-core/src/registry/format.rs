//! Text formatting for each field, in header (legend) and data form.
//!
//! Header lines are MATLAB comments (`%`) naming the 1-based columns a field
//! occupies, data text is the values separated by spaces with a trailing
//! separator so fields can be appended back to back.

use core::fmt::{self, Write as _};

use crate::config::LoggerConfig;
use crate::render::LineBuf;
use crate::units;

pub fn read_f32(data: &[u8], index: usize) -> f32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&data[index * 4..index * 4 + 4]);
    f32::from_le_bytes(bytes)
}

pub fn read_u32(data: &[u8], index: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&data[index * 4..index * 4 + 4]);
    u32::from_le_bytes(bytes)
}

pub fn read_i32(data: &[u8], index: usize) -> i32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&data[index * 4..index * 4 + 4]);
    i32::from_le_bytes(bytes)
}

pub fn read_u16(data: &[u8], index: usize) -> u16 {
    u16::from_le_bytes([data[index * 2], data[index * 2 + 1]])
}

pub fn read_i16(data: &[u8], index: usize) -> i16 {
    i16::from_le_bytes([data[index * 2], data[index * 2 + 1]])
}

pub fn read_i8(data: &[u8], index: usize) -> i8 {
    data[index] as i8
}

/// Writes `% <columns> <text>\r\n`. Up to four columns are listed one by
/// one, wider fields as a `first .. last` range.
fn legend(out: &mut LineBuf, first: u16, count: u8, text: fmt::Arguments<'_>) -> fmt::Result {
    out.write_char('%')?;
    if count <= 4 {
        for c in 0..count as u16 {
            write!(out, " {:2}", first + c)?;
        }
        if count == 1 {
            out.write_str("   ")?;
        }
    } else {
        write!(out, " {:2} .. {:2}", first, first + count as u16 - 1)?;
    }
    write!(out, " {}\r\n", text)
}

pub(super) fn time_header(col: u16, out: &mut LineBuf, cfg: &LoggerConfig) -> fmt::Result {
    legend(
        out,
        col,
        1,
        format_args!("time [sec], from {} ({})", cfg.robot_name, cfg.device_id),
    )
}

pub(super) fn time_data(data: &[u8], out: &mut LineBuf, _: &LoggerConfig) -> fmt::Result {
    write!(out, "{:.4} ", read_f32(data, 0))
}

pub(super) fn mission_header(col: u16, out: &mut LineBuf, _: &LoggerConfig) -> fmt::Result {
    legend(
        out,
        col,
        4,
        format_args!("Mission state, thread, line, events (bit-flags)"),
    )
}

pub(super) fn mission_data(data: &[u8], out: &mut LineBuf, _: &LoggerConfig) -> fmt::Result {
    write!(
        out,
        "{} {} {} 0x{:x} ",
        read_i16(data, 0),
        read_i8(data, 2),
        read_i8(data, 3),
        read_u32(data, 1)
    )
}

pub(super) fn acc_header(col: u16, out: &mut LineBuf, _: &LoggerConfig) -> fmt::Result {
    legend(out, col, 3, format_args!("Acc x,y,z [m/s2]"))
}

pub(super) fn acc_data(data: &[u8], out: &mut LineBuf, _: &LoggerConfig) -> fmt::Result {
    write!(
        out,
        "{:.6} {:.6} {:.6} ",
        read_f32(data, 0),
        read_f32(data, 1),
        read_f32(data, 2)
    )
}

pub(super) fn gyro_header(col: u16, out: &mut LineBuf, _: &LoggerConfig) -> fmt::Result {
    legend(out, col, 3, format_args!("Gyro x,y,z [deg/s]"))
}

pub(super) fn gyro_data(data: &[u8], out: &mut LineBuf, _: &LoggerConfig) -> fmt::Result {
    write!(
        out,
        "{:.4} {:.4} {:.4} ",
        read_f32(data, 0),
        read_f32(data, 1),
        read_f32(data, 2)
    )
}

pub(super) fn mag_header(col: u16, out: &mut LineBuf, _: &LoggerConfig) -> fmt::Result {
    legend(out, col, 3, format_args!("Mag x,y,z"))
}

pub(super) fn mag_data(data: &[u8], out: &mut LineBuf, _: &LoggerConfig) -> fmt::Result {
    write!(
        out,
        "{} {} {} ",
        read_f32(data, 0),
        read_f32(data, 1),
        read_f32(data, 2)
    )
}

pub(super) fn motor_vel_ref_header(col: u16, out: &mut LineBuf, _: &LoggerConfig) -> fmt::Result {
    legend(out, col, 2, format_args!("Motor velocity ref left, right"))
}

pub(super) fn motor_vel_ref_data(data: &[u8], out: &mut LineBuf, _: &LoggerConfig) -> fmt::Result {
    write!(out, "{:.4} {:.4} ", read_f32(data, 0), read_f32(data, 1))
}

pub(super) fn motor_voltage_header(col: u16, out: &mut LineBuf, _: &LoggerConfig) -> fmt::Result {
    legend(out, col, 2, format_args!("Motor voltage [V] left, right"))
}

/// Stored as millivolts
pub(super) fn motor_voltage_data(data: &[u8], out: &mut LineBuf, _: &LoggerConfig) -> fmt::Result {
    write!(
        out,
        "{:.2} {:.2} ",
        units::millivolts_to_volts(read_i16(data, 0)),
        units::millivolts_to_volts(read_i16(data, 1))
    )
}

pub(super) fn motor_current_header(col: u16, out: &mut LineBuf, _: &LoggerConfig) -> fmt::Result {
    legend(
        out,
        col,
        3,
        format_args!("Motor current left, right, supply [A]"),
    )
}

pub(super) fn motor_current_data(data: &[u8], out: &mut LineBuf, _: &LoggerConfig) -> fmt::Result {
    write!(
        out,
        "{:.3} {:.3} {:.3} ",
        read_f32(data, 0),
        read_f32(data, 1),
        read_f32(data, 2)
    )
}

pub(super) fn encoder_header(col: u16, out: &mut LineBuf, _: &LoggerConfig) -> fmt::Result {
    legend(out, col, 2, format_args!("Encoder left, right"))
}

/// Stored as 32-bit words, but the counters are signed
pub(super) fn encoder_data(data: &[u8], out: &mut LineBuf, _: &LoggerConfig) -> fmt::Result {
    write!(out, "{} {} ", read_i32(data, 0), read_i32(data, 1))
}

pub(super) fn wheel_vel_header(col: u16, out: &mut LineBuf, _: &LoggerConfig) -> fmt::Result {
    legend(out, col, 2, format_args!("Wheel velocity [m/s] left, right"))
}

pub(super) fn wheel_vel_data(data: &[u8], out: &mut LineBuf, _: &LoggerConfig) -> fmt::Result {
    write!(out, "{:.4} {:.4} ", read_f32(data, 0), read_f32(data, 1))
}

pub(super) fn turn_rate_header(col: u16, out: &mut LineBuf, _: &LoggerConfig) -> fmt::Result {
    legend(out, col, 1, format_args!("Turnrate [r/s]"))
}

pub(super) fn turn_rate_data(data: &[u8], out: &mut LineBuf, _: &LoggerConfig) -> fmt::Result {
    write!(out, "{:.4} ", read_f32(data, 0))
}

pub(super) fn pose_header(col: u16, out: &mut LineBuf, _: &LoggerConfig) -> fmt::Result {
    legend(out, col, 4, format_args!("Pose x,y,h,tilt [m,m,rad,rad]"))
}

pub(super) fn pose_data(data: &[u8], out: &mut LineBuf, _: &LoggerConfig) -> fmt::Result {
    write!(
        out,
        "{:.4} {:.4} {:.6} {:.6} ",
        read_f32(data, 0),
        read_f32(data, 1),
        read_f32(data, 2),
        read_f32(data, 3)
    )
}

pub(super) fn line_sensor_header(col: u16, out: &mut LineBuf, _: &LoggerConfig) -> fmt::Result {
    legend(
        out,
        col,
        18,
        format_args!(
            "Edge sensor: left pos, right pos, valid, values d d d d d d d d, \
             white, used, LEDhigh, xingValue, xlcnt, lvcnt, edgeAngle"
        ),
    )
}

/// See [`crate::sampling::LineSensorReading`] for the packed layout
pub(super) fn line_sensor_data(data: &[u8], out: &mut LineBuf, _: &LoggerConfig) -> fmt::Result {
    let flags = data[36];
    let flag = |mask: u8| u8::from((flags & mask) == mask);
    write!(
        out,
        "{:.4} {:.4} {}  ",
        read_f32(data, 4),
        read_f32(data, 5),
        flag(0x08)
    )?;
    for i in 0..8 {
        write!(out, "{} ", read_i16(data, i))?;
    }
    write!(
        out,
        " {} {} {} {:.2} {} {} {} ",
        flag(0x02),
        flag(0x01),
        flag(0x10),
        read_f32(data, 6),
        read_i8(data, 38),
        read_i8(data, 39),
        read_f32(data, 8)
    )
}

pub(super) fn ir_distance_header(col: u16, out: &mut LineBuf, _: &LoggerConfig) -> fmt::Result {
    legend(out, col, 2, format_args!("Distance sensor [m]"))
}

pub(super) fn ir_distance_data(data: &[u8], out: &mut LineBuf, cfg: &LoggerConfig) -> fmt::Result {
    write!(
        out,
        "{:.3} {:.3} ",
        units::ir_distance(read_u32(data, 0), cfg.ir_calibration[0]),
        units::ir_distance(read_u32(data, 1), cfg.ir_calibration[1])
    )
}

pub(super) fn battery_header(col: u16, out: &mut LineBuf, _: &LoggerConfig) -> fmt::Result {
    legend(out, col, 1, format_args!("Battery voltage [V]"))
}

pub(super) fn battery_data(data: &[u8], out: &mut LineBuf, cfg: &LoggerConfig) -> fmt::Result {
    write!(
        out,
        "{:.2} ",
        units::battery_volts(read_u16(data, 0), cfg.battery_volts_per_count)
    )
}

pub(super) fn timing_header(col: u16, out: &mut LineBuf, _: &LoggerConfig) -> fmt::Result {
    legend(
        out,
        col,
        7,
        format_args!("timing [CPU_clock(us), ad, sensor, control, end, T-sample, load o/oo]"),
    )
}

pub(super) fn timing_data(data: &[u8], out: &mut LineBuf, _: &LoggerConfig) -> fmt::Result {
    write!(
        out,
        "{} {} {} {} {} {} {} ",
        read_u32(data, 0),
        units::stage_time(read_u32(data, 1)),
        units::stage_time(read_u32(data, 2)),
        units::stage_time(read_u32(data, 3)),
        units::stage_time(read_u32(data, 4)),
        read_i32(data, 5),
        units::stage_time(read_u32(data, 6))
    )
}

pub(super) fn control_time_header(col: u16, out: &mut LineBuf, _: &LoggerConfig) -> fmt::Result {
    legend(
        out,
        col,
        3,
        format_args!("read sensor time, ctrl time, cycle end [ms]"),
    )
}

pub(super) fn control_time_data(data: &[u8], out: &mut LineBuf, cfg: &LoggerConfig) -> fmt::Result {
    for i in 0..3 {
        write!(
            out,
            "{:.3} ",
            units::cycles_to_ms(read_i32(data, i), cfg.cpu_clock_hz)
        )?;
    }
    Ok(())
}

pub(super) fn extra_header(col: u16, out: &mut LineBuf, _: &LoggerConfig) -> fmt::Result {
    legend(
        out,
        col,
        super::EXTRA_VALUES as u8,
        format_args!("extra values"),
    )
}

pub(super) fn extra_data(data: &[u8], out: &mut LineBuf, _: &LoggerConfig) -> fmt::Result {
    for i in 0..super::EXTRA_VALUES {
        write!(out, "{} ", read_f32(data, i))?;
    }
    Ok(())
}

pub(super) fn chirp_header(col: u16, out: &mut LineBuf, _: &LoggerConfig) -> fmt::Result {
    legend(
        out,
        col,
        4,
        format_args!("Chirp amplitude, frequency [rad/s], phase [rad], value"),
    )
}

pub(super) fn chirp_data(data: &[u8], out: &mut LineBuf, _: &LoggerConfig) -> fmt::Result {
    write!(
        out,
        "{} {} {} {} ",
        read_f32(data, 0),
        read_f32(data, 1),
        read_f32(data, 2),
        read_f32(data, 3)
    )
}
