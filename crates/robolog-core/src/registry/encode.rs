//! Sample encoders, one per field.
//!
//! Each encoder pulls the current value from the telemetry source and packs
//! it little-endian into a slice of exactly the field's registered size.

use crate::sampling::TelemetrySource;

fn put_f32s(out: &mut [u8], values: &[f32]) {
    for (chunk, value) in out.chunks_exact_mut(4).zip(values) {
        chunk.copy_from_slice(&value.to_le_bytes());
    }
}

fn put_u32s(out: &mut [u8], values: &[u32]) {
    for (chunk, value) in out.chunks_exact_mut(4).zip(values) {
        chunk.copy_from_slice(&value.to_le_bytes());
    }
}

fn put_i32s(out: &mut [u8], values: &[i32]) {
    for (chunk, value) in out.chunks_exact_mut(4).zip(values) {
        chunk.copy_from_slice(&value.to_le_bytes());
    }
}

pub(super) fn time(src: &dyn TelemetrySource, out: &mut [u8]) {
    put_f32s(out, &[src.mission_time()]);
}

pub(super) fn mission(src: &dyn TelemetrySource, out: &mut [u8]) {
    out.copy_from_slice(&src.mission().to_bytes());
}

pub(super) fn acc(src: &dyn TelemetrySource, out: &mut [u8]) {
    put_f32s(out, &src.acc());
}

pub(super) fn gyro(src: &dyn TelemetrySource, out: &mut [u8]) {
    put_f32s(out, &src.gyro());
}

pub(super) fn mag(src: &dyn TelemetrySource, out: &mut [u8]) {
    put_f32s(out, &src.mag());
}

pub(super) fn motor_vel_ref(src: &dyn TelemetrySource, out: &mut [u8]) {
    put_f32s(out, &src.motor_vel_ref());
}

/// Stored in millivolts; a disabled motor logs zero regardless of the control value.
pub(super) fn motor_voltage(src: &dyn TelemetrySource, out: &mut [u8]) {
    let mv = match src.motor_voltage() {
        Some(volts) => volts.map(|v| (v * 1000.0) as i16),
        None => [0; 2],
    };
    out[0..2].copy_from_slice(&mv[0].to_le_bytes());
    out[2..4].copy_from_slice(&mv[1].to_le_bytes());
}

pub(super) fn motor_current(src: &dyn TelemetrySource, out: &mut [u8]) {
    put_f32s(out, &src.motor_current());
}

pub(super) fn encoder(src: &dyn TelemetrySource, out: &mut [u8]) {
    put_i32s(out, &src.encoder());
}

pub(super) fn wheel_vel(src: &dyn TelemetrySource, out: &mut [u8]) {
    put_f32s(out, &src.wheel_velocity());
}

pub(super) fn turn_rate(src: &dyn TelemetrySource, out: &mut [u8]) {
    put_f32s(out, &[src.turn_rate()]);
}

pub(super) fn pose(src: &dyn TelemetrySource, out: &mut [u8]) {
    put_f32s(out, &src.pose());
}

pub(super) fn line_sensor(src: &dyn TelemetrySource, out: &mut [u8]) {
    out.copy_from_slice(&src.line_sensor().to_bytes());
}

pub(super) fn ir_distance(src: &dyn TelemetrySource, out: &mut [u8]) {
    put_u32s(out, &src.ir_raw());
}

pub(super) fn battery(src: &dyn TelemetrySource, out: &mut [u8]) {
    out.copy_from_slice(&src.battery_raw().to_le_bytes());
}

pub(super) fn timing(src: &dyn TelemetrySource, out: &mut [u8]) {
    put_u32s(out, &src.timing());
}

pub(super) fn control_time(src: &dyn TelemetrySource, out: &mut [u8]) {
    put_i32s(out, &src.control_time());
}

pub(super) fn extra(src: &dyn TelemetrySource, out: &mut [u8]) {
    put_f32s(out, &src.extra());
}

pub(super) fn chirp(src: &dyn TelemetrySource, out: &mut [u8]) {
    put_f32s(out, &src.chirp());
}
