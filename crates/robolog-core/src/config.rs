//! Logger configuration and the persisted log settings

use heapless::String;
use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

use crate::storage::HazardRegion;

/// Board and calibration parameters the logger needs but does not own
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LoggerConfig {
    /// Control tick period in units of 10 µs
    pub control_period_10us: u32,
    /// Address of the arena's first byte in the target memory map
    pub arena_base_address: usize,
    /// Address range no stored row may overlap
    pub hazard: Option<HazardRegion>,
    pub robot_name: String<32>,
    pub device_id: u32,
    /// Battery AD count to volts
    pub battery_volts_per_count: f32,
    /// `[A, B]` per IR sensor, distance = 1 / (raw * A - B)
    pub ir_calibration: [[f32; 2]; 2],
    /// Clock of the cycle counter behind the control-time field
    pub cpu_clock_hz: u32,
    /// Refused sends of one row before it is dropped
    pub max_send_retries: u8,
    /// Sample interval in ticks until settings are loaded or changed
    pub default_interval: u32,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        let mut robot_name = String::new();
        let _ = robot_name.push_str("robot");
        Self {
            control_period_10us: 100,
            arena_base_address: 0,
            hazard: None,
            robot_name,
            device_id: 0,
            battery_volts_per_count: 0.008_86,
            ir_calibration: [[0.000_4, 0.2]; 2],
            cpu_clock_hz: 600_000_000,
            max_send_retries: 10,
            default_interval: 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration store error: {0}")]
    Store(&'static str),
    #[error("Settings encoding failed: {0}")]
    Encoding(postcard::Error),
    #[error("Settings decoding failed: {0}")]
    Decoding(postcard::Error),
}

/// Enabled-field bitmap and sample interval, as kept in the configuration
/// store. The stored image is exactly [`LogSettings::SIZE`] bytes: the
/// bitmap then the interval, both little-endian `u32`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogSettings {
    #[serde(with = "postcard::fixint::le")]
    pub flags: u32,
    /// Sample interval in control ticks
    #[serde(with = "postcard::fixint::le")]
    pub interval: u32,
}

impl LogSettings {
    pub const SIZE: usize = 8;

    pub fn to_bytes(&self) -> Result<[u8; Self::SIZE], ConfigError> {
        let mut buf = [0u8; Self::SIZE];
        postcard::to_slice(self, &mut buf).map_err(ConfigError::Encoding)?;
        Ok(buf)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        postcard::from_bytes(bytes).map_err(ConfigError::Decoding)
    }
}

/// Sequential EEPROM-like configuration store shared with other modules.
///
/// Each module reads and writes its own slot in a fixed order, so the
/// logger must consume exactly [`LogSettings::SIZE`] bytes either way.
pub trait ConfigStore {
    /// False when the store holds no binary configuration (e.g. after a
    /// hard reset), in which case defaults are kept
    fn has_log_settings(&self) -> bool;
    fn write(&mut self, bytes: &[u8]) -> Result<(), ConfigError>;
    fn read(&mut self, buf: &mut [u8]) -> Result<(), ConfigError>;
    /// Advances past a slot without reading it
    fn skip(&mut self, len: usize);
}
