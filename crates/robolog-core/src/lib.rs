//! Hardware-independent telemetry logging engine for the robot firmware
//!
//! This crate records a runtime-selectable set of sensor and control values
//! into a fixed-size byte arena at a fixed sample rate, and renders the
//! stored rows (or a stream of timestamped text messages) back out as
//! MATLAB-loadable text lines.
//!
//! It is `#![no_std]` and never allocates, so it runs on the robot's
//! microcontroller and on desktop hosts (the simulator and tests) alike.
//! The byte arena is provided by the caller, normally as a `static` buffer.

#![cfg_attr(not(test), no_std)]

pub mod command;
pub mod config;
pub mod layout;
pub mod logger;
pub mod registry;
pub mod render;
pub mod sampling;
pub mod storage;
pub mod units;

pub use command::{Command, Decoded, StatusItem};
pub use config::{ConfigError, ConfigStore, LogSettings, LoggerConfig};
pub use layout::{EnabledSet, RowLayout};
pub use logger::Logger;
pub use registry::{ElementType, FieldDescriptor, FieldId};
pub use render::{LineSink, RowRef};
pub use sampling::{LineSensorReading, MissionState, Sample, TelemetrySource};
pub use storage::{HazardRegion, RowState, RowStore, StreamLog, StreamState, Timestamp};
