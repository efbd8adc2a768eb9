//! Synthetic robot driving a slow figure of eight

use robolog_core::{LineSensorReading, MissionState, TelemetrySource};

/// Nominal battery level in AD counts (about 12 V with the default factor)
const BATTERY_RAW: f32 = 1350.0;

/// Generates telemetry that varies smoothly with time.
pub struct MockRobot {
    /// Seconds since start
    t: f32,
    /// Integrated pose x, y, heading
    pose: [f32; 3],
    /// Encoder ticks left, right
    encoder: [f32; 2],
    tick_count: u32,
}

impl MockRobot {
    pub fn new() -> Self {
        Self {
            t: 0.0,
            pose: [0.0; 3],
            encoder: [0.0; 2],
            tick_count: 0,
        }
    }

    /// Advances the simulated robot by one control period
    pub fn advance(&mut self, dt: f32) {
        self.t += dt;
        self.tick_count = self.tick_count.wrapping_add(1);
        let [vl, vr] = self.wheel_velocity();
        let v = (vl + vr) / 2.0;
        self.pose[2] += self.turn_rate() * dt;
        self.pose[0] += v * self.pose[2].cos() * dt;
        self.pose[1] += v * self.pose[2].sin() * dt;
        // 0.1 mm per encoder tick
        self.encoder[0] += vl * dt * 10_000.0;
        self.encoder[1] += vr * dt * 10_000.0;
    }
}

impl Default for MockRobot {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetrySource for MockRobot {
    fn mission_time(&self) -> f32 {
        self.t
    }

    fn mission(&self) -> MissionState {
        MissionState {
            state: 2,
            thread: 1,
            line: (self.t as i32 % 10) as i8,
            event_flags: if self.t as u32 % 5 == 0 { 0x1 } else { 0 },
        }
    }

    fn acc(&self) -> [f32; 3] {
        [0.2 * (self.t * 2.0).sin(), 0.1 * self.t.cos(), 9.81]
    }

    fn gyro(&self) -> [f32; 3] {
        [0.5 * self.t.sin(), 0.0, self.turn_rate().to_degrees()]
    }

    fn mag(&self) -> [f32; 3] {
        [self.pose[2].cos(), self.pose[2].sin(), 0.4]
    }

    fn motor_vel_ref(&self) -> [f32; 2] {
        self.wheel_velocity()
    }

    fn motor_voltage(&self) -> Option<[f32; 2]> {
        let [vl, vr] = self.wheel_velocity();
        Some([vl * 12.0, vr * 12.0])
    }

    fn motor_current(&self) -> [f32; 3] {
        let [vl, vr] = self.wheel_velocity();
        [vl.abs() * 0.8, vr.abs() * 0.8, (vl.abs() + vr.abs()) * 0.8 + 0.15]
    }

    fn encoder(&self) -> [i32; 2] {
        [self.encoder[0] as i32, self.encoder[1] as i32]
    }

    fn wheel_velocity(&self) -> [f32; 2] {
        let turn = 0.1 * (self.t * 0.3).sin();
        [0.3 - turn, 0.3 + turn]
    }

    fn turn_rate(&self) -> f32 {
        let [vl, vr] = self.wheel_velocity();
        // 0.24 m between wheels
        (vr - vl) / 0.24
    }

    fn pose(&self) -> [f32; 4] {
        [self.pose[0], self.pose[1], self.pose[2], 0.01 * self.t.sin()]
    }

    fn line_sensor(&self) -> LineSensorReading {
        let mut ad = [0i16; 8];
        let centre = 3.5 + 2.0 * (self.t * 0.7).sin();
        for (i, v) in ad.iter_mut().enumerate() {
            let d = i as f32 - centre;
            *v = (800.0 * (-d * d).exp()) as i16;
        }
        LineSensorReading {
            ad_difference: ad,
            left_edge: (centre - 4.0) * 0.01 - 0.01,
            right_edge: (centre - 4.0) * 0.01 + 0.01,
            crossing_value: 0.0,
            white_value: 800.0,
            edge_angle: 0.0,
            flags: LineSensorReading::FLAG_SENSOR_ON
                | LineSensorReading::FLAG_WHITE
                | LineSensorReading::FLAG_LEFT_VALID
                | LineSensorReading::FLAG_RIGHT_VALID,
            crossing_count: 0,
            edge_valid_count: 10,
        }
    }

    fn ir_raw(&self) -> [u32; 2] {
        [
            (2000.0 + 800.0 * self.t.sin()) as u32,
            (1500.0 + 400.0 * self.t.cos()) as u32,
        ]
    }

    fn battery_raw(&self) -> u16 {
        (BATTERY_RAW - self.t * 0.05).max(0.0) as u16
    }

    fn timing(&self) -> [u32; 7] {
        [600, 40, 120, 180, 210, 1000, 210]
    }

    fn control_time(&self) -> [i32; 3] {
        [24_000, 108_000, 126_000]
    }

    fn extra(&self) -> [f32; 4] {
        [self.t.sin(), self.t.cos(), 0.0, self.tick_count as f32]
    }

    fn chirp(&self) -> [f32; 4] {
        let freq = 1.0 + 0.1 * self.t;
        let phase = freq * self.t;
        [0.5, freq, phase, 0.5 * phase.sin()]
    }
}
