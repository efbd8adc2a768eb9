//! Unit conversions applied when rendering raw logged values
//!
//! Only a few fields are stored raw and converted on output: the battery and
//! IR distance AD values, millivolt motor voltages, and CPU cycle counts.

/// Distance reported when the IR reading is outside the sensor's usable range [m]
pub const IR_OUT_OF_RANGE_M: f32 = 1.5;

/// Closest distance the IR sensor can resolve [m]
pub const IR_MIN_RANGE_M: f32 = 0.05;

/// Stage times above this are treated as invalid (timer wrapped or not measured)
pub const STAGE_TIME_LIMIT: u32 = 3000;

pub fn millivolts_to_volts(mv: i16) -> f32 {
    mv as f32 / 1000.0
}

pub fn battery_volts(raw: u16, volts_per_count: f32) -> f32 {
    raw as f32 * volts_per_count
}

/// Converts a raw IR AD value to metres using the sensor's `[A, B]`
/// calibration: `d = 1 / (raw * A - B)`.
///
/// Readings outside the usable range are reported as [`IR_OUT_OF_RANGE_M`].
pub fn ir_distance(raw: u32, calibration: [f32; 2]) -> f32 {
    let [a, b] = calibration;
    let d = 1.0 / (raw as f32 * a - b);
    if d.is_nan() || !(IR_MIN_RANGE_M..=IR_OUT_OF_RANGE_M).contains(&d) {
        IR_OUT_OF_RANGE_M
    } else {
        d
    }
}

/// A stage time, or -1 if it exceeds [`STAGE_TIME_LIMIT`]
pub fn stage_time(value: u32) -> i64 {
    if value > STAGE_TIME_LIMIT {
        -1
    } else {
        value as i64
    }
}

pub fn cycles_to_ms(cycles: i32, cpu_clock_hz: u32) -> f32 {
    if cpu_clock_hz == 0 {
        return 0.0;
    }
    cycles as f32 * 1000.0 / cpu_clock_hz as f32
}

/// Converts milliseconds to control ticks, given the control period in units
/// of 10 µs. A zero period is treated as one unit.
pub fn ms_to_ticks(ms: u32, control_period_10us: u32) -> u32 {
    ms.saturating_mul(100) / control_period_10us.max(1)
}
