//! Periodic sampling of telemetry into the row store
//!
//! The [`Sampler`] is called once per control tick. When the configured
//! interval has elapsed it begins a new row and asks every enabled field's
//! encoder to pull the current value from the [`TelemetrySource`].
//! It never blocks and performs no I/O, so it is safe to call from the
//! control loop.

use log::{debug, info};

use crate::layout::RowLayout;
use crate::registry::{EXTRA_VALUES, MAX_FIELD_BYTES};
use crate::storage::RowStore;

/// Mission progress as packed into the `Mission` field (8 bytes)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MissionState {
    pub state: i16,
    pub thread: i8,
    pub line: i8,
    /// Event bit-flags seen since the previous sample
    pub event_flags: u32,
}

impl MissionState {
    pub fn to_bytes(&self) -> [u8; 8] {
        let mut bytes = [0u8; 8];
        bytes[0..2].copy_from_slice(&self.state.to_le_bytes());
        bytes[2] = self.thread as u8;
        bytes[3] = self.line as u8;
        bytes[4..8].copy_from_slice(&self.event_flags.to_le_bytes());
        bytes
    }
}

/// Edge/line sensor snapshot.
///
/// Binary format (44 bytes, little-endian, 16-bit words):
/// - words 0..8: AD difference (high minus low illumination) per sensor
/// - words 8..18: left edge, right edge, crossing value, white value, edge angle (f32)
/// - byte 36: flag bits, see the `FLAG_*` constants
/// - byte 38: crossing line count, byte 39: edge valid count (i8)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LineSensorReading {
    pub ad_difference: [i16; 8],
    pub left_edge: f32,
    pub right_edge: f32,
    pub crossing_value: f32,
    pub white_value: f32,
    pub edge_angle: f32,
    pub flags: u8,
    pub crossing_count: i8,
    pub edge_valid_count: i8,
}

impl LineSensorReading {
    pub const FLAG_SENSOR_ON: u8 = 0x01;
    pub const FLAG_WHITE: u8 = 0x02;
    pub const FLAG_LEFT_VALID: u8 = 0x04;
    pub const FLAG_RIGHT_VALID: u8 = 0x08;
    pub const FLAG_LED_HIGH: u8 = 0x10;
    pub const FLAG_TILT_COMPENSATED: u8 = 0x20;

    pub const SIZE: usize = 44;

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        let mut offset = 0;

        for &value in &self.ad_difference {
            bytes[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
            offset += 2;
        }

        for value in [
            self.left_edge,
            self.right_edge,
            self.crossing_value,
            self.white_value,
            self.edge_angle,
        ] {
            bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
            offset += 4;
        }

        bytes[36] = self.flags;
        bytes[38] = self.crossing_count as u8;
        bytes[39] = self.edge_valid_count as u8;
        bytes
    }
}

/// Source of the current robot state, one accessor per loggable field.
///
/// Implemented by the firmware on top of its sensor drivers. Every accessor
/// except the mission time defaults to zero, so partial sources (tests, the
/// simulator) only provide what they have.
pub trait TelemetrySource {
    /// Seconds since the mission (or boot) started
    fn mission_time(&self) -> f32;

    fn mission(&self) -> MissionState {
        MissionState::default()
    }

    /// Accelerometer x, y, z [m/s²]
    fn acc(&self) -> [f32; 3] {
        [0.0; 3]
    }

    /// Gyro x, y, z [deg/s]
    fn gyro(&self) -> [f32; 3] {
        [0.0; 3]
    }

    fn mag(&self) -> [f32; 3] {
        [0.0; 3]
    }

    /// Motor velocity reference left, right
    fn motor_vel_ref(&self) -> [f32; 2] {
        [0.0; 2]
    }

    /// Motor voltage left, right [V], or `None` while the motors are disabled
    fn motor_voltage(&self) -> Option<[f32; 2]> {
        None
    }

    /// Filtered motor current left, right and supply current [A]
    fn motor_current(&self) -> [f32; 3] {
        [0.0; 3]
    }

    /// Raw encoder counters left, right
    fn encoder(&self) -> [i32; 2] {
        [0; 2]
    }

    /// Wheel velocity left, right [m/s]
    fn wheel_velocity(&self) -> [f32; 2] {
        [0.0; 2]
    }

    /// Robot turn rate [rad/s]
    fn turn_rate(&self) -> f32 {
        0.0
    }

    /// Pose x, y [m], heading, tilt [rad]
    fn pose(&self) -> [f32; 4] {
        [0.0; 4]
    }

    fn line_sensor(&self) -> LineSensorReading {
        LineSensorReading::default()
    }

    /// Raw IR distance sensor AD values
    fn ir_raw(&self) -> [u32; 2] {
        [0; 2]
    }

    /// Raw battery voltage AD value
    fn battery_raw(&self) -> u16 {
        0
    }

    /// CPU clock at sample, AD, sensor, control and end stage times, sample time, load
    fn timing(&self) -> [u32; 7] {
        [0; 7]
    }

    /// Sensor read, control and cycle end times in CPU cycles
    fn control_time(&self) -> [i32; 3] {
        [0; 3]
    }

    fn extra(&self) -> [f32; EXTRA_VALUES] {
        [0.0; EXTRA_VALUES]
    }

    /// Chirp amplitude, frequency [rad/s], phase [rad] and current value
    fn chirp(&self) -> [f32; 4] {
        [0.0; 4]
    }
}

/// Result of [`Sampler::tick`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sample {
    /// No sample due, sampler stopped, or the store was already full
    Skipped,
    Recorded,
    /// The store ran out of rows on this tick and the sampler stopped; the
    /// caller should send [`ROWS_FULL_NOTICE`](crate::storage::ROWS_FULL_NOTICE) once
    BecameFull,
}

/// Decides when a row is due and fills it
#[derive(Debug, Clone)]
pub struct Sampler {
    /// Sample interval in control ticks
    interval_ticks: u32,
    /// Tick count at the most recent due sample
    last_tick: u32,
    /// Whether rows are currently being recorded
    active: bool,
}

impl Sampler {
    pub const fn new(interval_ticks: u32) -> Self {
        Self {
            interval_ticks,
            last_tick: 0,
            active: false,
        }
    }

    pub fn interval(&self) -> u32 {
        self.interval_ticks
    }

    pub fn set_interval(&mut self, interval_ticks: u32) {
        self.interval_ticks = interval_ticks;
    }

    pub fn start(&mut self) {
        self.active = true;
    }

    pub fn stop(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Advances the sample marker and returns true when a sample is due.
    /// Tick counters are allowed to wrap.
    pub fn is_due(&mut self, now_tick: u32) -> bool {
        if now_tick.wrapping_sub(self.last_tick) >= self.interval_ticks {
            self.last_tick = now_tick;
            true
        } else {
            false
        }
    }

    /// Runs one control tick and records a row if one is due
    pub fn tick(
        &mut self,
        now_tick: u32,
        source: &dyn TelemetrySource,
        layout: &RowLayout,
        store: &mut RowStore,
        arena: &mut [u8],
    ) -> Sample {
        if !self.is_due(now_tick) || !self.active {
            return Sample::Skipped;
        }
        if store.is_full() {
            self.stop();
            return Sample::Skipped;
        }
        if !store.begin_row() {
            info!(
                "Log full after {} rows of {} bytes",
                store.row_count(),
                store.row_size()
            );
            self.stop();
            return Sample::BecameFull;
        }

        let row = store.row_count();
        let mut scratch = [0u8; MAX_FIELD_BYTES];
        for (field, offset) in layout.iter() {
            let desc = field.descriptor();
            let size = desc.byte_size();
            (desc.encode)(source, &mut scratch[..size]);
            store.write_field(arena, row, offset, &scratch[..size]);
        }
        debug!("Logged row {}/{}", row, store.max_rows());
        Sample::Recorded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::EnabledSet;
    use crate::registry::{FieldId, read_f32, read_u16};

    struct FixedSource;

    impl TelemetrySource for FixedSource {
        fn mission_time(&self) -> f32 {
            1.25
        }

        fn battery_raw(&self) -> u16 {
            812
        }
    }

    fn battery_layout() -> RowLayout {
        let mut enabled = EnabledSet::only_time();
        enabled.set(FieldId::Battery, true);
        RowLayout::compile(enabled)
    }

    #[test]
    fn test_is_due_respects_interval() {
        let mut sampler = Sampler::new(10);
        assert!(!sampler.is_due(5));
        assert!(sampler.is_due(10));
        assert!(!sampler.is_due(19));
        assert!(sampler.is_due(20));
    }

    #[test]
    fn test_is_due_handles_wrapping_ticks() {
        let mut sampler = Sampler::new(4);
        assert!(sampler.is_due(u32::MAX - 1));
        assert!(!sampler.is_due(u32::MAX));
        assert!(sampler.is_due(2));
    }

    #[test]
    fn test_tick_writes_enabled_fields() {
        let layout = battery_layout();
        let mut arena = [0u8; 60];
        let mut store = RowStore::new(0, None);
        store.reset(layout.row_size(), arena.len());

        let mut sampler = Sampler::new(1);
        sampler.start();
        assert_eq!(
            sampler.tick(1, &FixedSource, &layout, &mut store, &mut arena),
            Sample::Recorded
        );

        let row = store.row(&arena, 0).unwrap();
        assert_eq!(read_f32(row, 0), 1.25);
        let batt = layout.offset(FieldId::Battery).unwrap();
        assert_eq!(read_u16(&row[batt..], 0), 812);
    }

    #[test]
    fn test_inactive_sampler_records_nothing() {
        let layout = battery_layout();
        let mut arena = [0u8; 60];
        let mut store = RowStore::new(0, None);
        store.reset(layout.row_size(), arena.len());

        let mut sampler = Sampler::new(1);
        assert_eq!(
            sampler.tick(1, &FixedSource, &layout, &mut store, &mut arena),
            Sample::Skipped
        );
        assert_eq!(store.row_count(), 0);
    }

    #[test]
    fn test_sampler_stops_when_store_fills() {
        let layout = battery_layout();
        let mut arena = [0u8; 12];
        let mut store = RowStore::new(0, None);
        store.reset(layout.row_size(), arena.len());

        let mut sampler = Sampler::new(1);
        sampler.start();
        let mut tick = |t| sampler.tick(t, &FixedSource, &layout, &mut store, &mut arena);
        assert_eq!(tick(1), Sample::Recorded);
        assert_eq!(tick(2), Sample::Recorded);
        assert_eq!(tick(3), Sample::BecameFull);
        assert!(store.is_full());
        assert!(!sampler.is_active());
    }

    #[test]
    fn test_line_sensor_packing() {
        let reading = LineSensorReading {
            ad_difference: [1, 2, 3, 4, 5, 6, 7, -8],
            left_edge: 0.5,
            edge_angle: -0.25,
            flags: LineSensorReading::FLAG_SENSOR_ON | LineSensorReading::FLAG_RIGHT_VALID,
            crossing_count: 3,
            edge_valid_count: -1,
            ..Default::default()
        };
        let bytes = reading.to_bytes();
        assert_eq!(i16::from_le_bytes([bytes[14], bytes[15]]), -8);
        assert_eq!(read_f32(&bytes, 4), 0.5);
        assert_eq!(read_f32(&bytes, 8), -0.25);
        assert_eq!(bytes[36], 0x09);
        assert_eq!(bytes[38], 3);
        assert_eq!(bytes[39] as i8, -1);
    }
}
