//! Simulator settings from the environment and the file-backed config store

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;
use log::warn;
use robolog_core::{ConfigError, ConfigStore, HazardRegion, LoggerConfig};

/// Arena size when `ROBOLOG_ARENA_BYTES` is unset
const DEFAULT_ARENA_BYTES: usize = 100_000;

const DEFAULT_STORE_FILE: &str = "robolog-config.bin";

pub struct SimSettings {
    pub logger: LoggerConfig,
    pub arena_bytes: usize,
    pub store_file: PathBuf,
}

impl SimSettings {
    /// Reads `ROBOLOG_*` variables, falling back to defaults
    pub fn from_env() -> anyhow::Result<Self> {
        let mut logger = LoggerConfig::default();
        if let Some(period) = parse_var("ROBOLOG_CONTROL_PERIOD_10US")? {
            logger.control_period_10us = period;
        }
        if let Some(id) = parse_var("ROBOLOG_DEVICE_ID")? {
            logger.device_id = id;
        }
        if let Some(retries) = parse_var("ROBOLOG_MAX_SEND_RETRIES")? {
            logger.max_send_retries = retries;
        }
        if let Ok(name) = env::var("ROBOLOG_ROBOT_NAME") {
            logger.robot_name.clear();
            logger
                .robot_name
                .push_str(&name)
                .map_err(|_| anyhow::anyhow!("ROBOLOG_ROBOT_NAME longer than 32 bytes"))?;
        }
        if let (Some(start), Some(end)) = (
            parse_var::<usize>("ROBOLOG_HAZARD_START")?,
            parse_var::<usize>("ROBOLOG_HAZARD_END")?,
        ) {
            logger.hazard = Some(HazardRegion::new(start, end));
        }
        if let Some(base) = parse_var("ROBOLOG_ARENA_BASE")? {
            logger.arena_base_address = base;
        }

        Ok(Self {
            logger,
            arena_bytes: parse_var("ROBOLOG_ARENA_BYTES")?.unwrap_or(DEFAULT_ARENA_BYTES),
            store_file: env::var("ROBOLOG_STORE_FILE")
                .unwrap_or_else(|_| DEFAULT_STORE_FILE.into())
                .into(),
        })
    }
}

fn parse_var<T>(name: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("invalid {name}: {value:?}")),
        Err(_) => Ok(None),
    }
}

/// Configuration store image kept in a file, read and written sequentially
/// like the robot's EEPROM.
pub struct FileStore {
    path: PathBuf,
    image: Vec<u8>,
    pos: usize,
}

impl FileStore {
    /// Opens the store. A missing file is an empty store.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let image = match fs::read(path) {
            Ok(image) => image,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("reading {}", path.display()));
            }
        };
        Ok(Self {
            path: path.to_owned(),
            image,
            pos: 0,
        })
    }

    /// Moves back to the first slot
    pub fn rewind(&mut self) {
        self.pos = 0;
    }
}

impl ConfigStore for FileStore {
    fn has_log_settings(&self) -> bool {
        !self.image.is_empty()
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), ConfigError> {
        let end = self.pos + bytes.len();
        if self.image.len() < end {
            self.image.resize(end, 0);
        }
        self.image[self.pos..end].copy_from_slice(bytes);
        self.pos = end;
        fs::write(&self.path, &self.image).map_err(|e| {
            warn!("Writing {} failed: {}", self.path.display(), e);
            ConfigError::Store("file write failed")
        })
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<(), ConfigError> {
        let src = self
            .image
            .get(self.pos..self.pos + buf.len())
            .ok_or(ConfigError::Store("read past end of image"))?;
        buf.copy_from_slice(src);
        self.pos += buf.len();
        Ok(())
    }

    fn skip(&mut self, len: usize) {
        self.pos += len;
    }
}
