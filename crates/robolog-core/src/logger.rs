//! The owning logger object
//!
//! [`Logger`] ties the registry, layout, stores, sampler and transmission
//! together around one caller-provided arena. It is driven from a single
//! context: [`Logger::tick`] once per control tick, [`Logger::decode`] for
//! each received command line, and [`Logger::log_message`] for outbound text
//! that should be captured while message logging is on.

use log::{debug, info};

use crate::command::{self, Command, Decoded, StatusItem};
use crate::config::{ConfigError, ConfigStore, LogSettings, LoggerConfig};
use crate::layout::{EnabledSet, RowLayout};
use crate::render::{LineBuf, LineSink, Transmission};
use crate::sampling::{Sample, Sampler, TelemetrySource};
use crate::storage::{Append, FULL_NOTICE, ROWS_FULL_NOTICE, RowStore, StreamLog, Timestamp};
use crate::units;

pub struct Logger<'a> {
    arena: &'a mut [u8],
    config: LoggerConfig,
    layout: RowLayout,
    rows: RowStore,
    stream: StreamLog,
    sampler: Sampler,
    transmission: Transmission,
}

impl<'a> Logger<'a> {
    /// Creates a logger with the default enabled set, not yet sampling
    pub fn new(arena: &'a mut [u8], config: LoggerConfig) -> Self {
        let rows = RowStore::new(config.arena_base_address, config.hazard);
        let sampler = Sampler::new(config.default_interval);
        let mut logger = Self {
            arena,
            config,
            layout: RowLayout::default(),
            rows,
            stream: StreamLog::new(),
            sampler,
            transmission: Transmission::new(),
        };
        logger.init_layout();
        logger
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    pub fn enabled(&self) -> EnabledSet {
        self.layout.enabled()
    }

    pub fn layout(&self) -> &RowLayout {
        &self.layout
    }

    pub fn rows(&self) -> &RowStore {
        &self.rows
    }

    pub fn stream(&self) -> &StreamLog {
        &self.stream
    }

    /// Arena size in bytes
    pub fn capacity(&self) -> usize {
        self.arena.len()
    }

    /// Sample interval in control ticks
    pub fn interval(&self) -> u32 {
        self.sampler.interval()
    }

    pub fn is_logging(&self) -> bool {
        self.sampler.is_active()
    }

    pub fn is_transmitting(&self) -> bool {
        self.transmission.is_active()
    }

    /// Stored row `index` (0-based), `None` if not stored or skipped
    pub fn row(&self, index: usize) -> Option<&[u8]> {
        self.rows.row(&*self.arena, index)
    }

    /// Recompiles the layout for the current enabled set and resets the row
    /// store. Message logging is switched off since rows now own the arena.
    fn init_layout(&mut self) {
        self.stream.deactivate();
        self.rows.reset(self.layout.row_size(), self.arena.len());
        debug!(
            "Row layout {} bytes, {} rows max",
            self.layout.row_size(),
            self.rows.max_rows()
        );
    }

    /// Replaces the enabled set. Always starts a new row generation.
    pub fn set_enabled(&mut self, enabled: EnabledSet) {
        self.layout = RowLayout::compile(enabled);
        self.init_layout();
    }

    /// Sets a new interval in ticks, 0 keeps the current one
    fn set_interval(&mut self, interval_ticks: u32) -> bool {
        if interval_ticks == 0 || interval_ticks == self.sampler.interval() {
            return false;
        }
        self.sampler.set_interval(interval_ticks);
        true
    }

    /// Starts sampling. `interval_ticks` 0 keeps the current interval, and
    /// `restart` discards the stored rows first. Returns true if the
    /// interval changed.
    pub fn start_logging(&mut self, interval_ticks: u32, restart: bool) -> bool {
        let changed = self.set_interval(interval_ticks);
        if restart {
            self.init_layout();
        }
        self.sampler.start();
        info!("Logging every {} ticks", self.sampler.interval());
        changed
    }

    pub fn stop_logging(&mut self) {
        self.sampler.stop();
    }

    /// Starts capturing messages. The stored rows are discarded.
    pub fn start_messages(&mut self) {
        self.sampler.stop();
        self.rows.clear();
        self.stream.start();
        info!("Message logging started");
    }

    /// Stops capturing messages, keeping those stored
    pub fn stop_messages(&mut self) {
        self.stream.stop();
    }

    /// Captures an outbound message while message logging is on. The first
    /// message that does not fit sends the buffer-full notice through `sink`.
    pub fn log_message(&mut self, text: &str, ts: Timestamp, sink: &mut dyn LineSink) {
        if self.stream.append(self.arena, text, ts) == Append::BecameFull {
            sink.send(FULL_NOTICE);
        }
    }

    /// Runs one control tick: records a row if one is due, then sends the
    /// next line of an ongoing transmission. The tick on which the rows run
    /// out sends the buffer-full notice. Returns true if a row was recorded.
    pub fn tick(
        &mut self,
        now_tick: u32,
        source: &dyn TelemetrySource,
        sink: &mut dyn LineSink,
    ) -> bool {
        let sample = self
            .sampler
            .tick(now_tick, source, &self.layout, &mut self.rows, self.arena);
        if sample == Sample::BecameFull {
            sink.send(ROWS_FULL_NOTICE);
        }
        if self.transmission.is_active() {
            self.transmission.step(
                &*self.arena,
                &self.layout,
                &self.rows,
                &mut self.stream,
                &self.config,
                sink,
            );
        }
        sample == Sample::Recorded
    }

    /// Executes a received command line. Replies go to `sink`.
    pub fn decode(&mut self, line: &str, sink: &mut dyn LineSink) -> Decoded {
        let Some(cmd) = Command::parse(line) else {
            return Decoded::NotUsed;
        };
        match cmd {
            Command::SetFlags(enabled) => self.set_enabled(enabled),
            Command::LogNow { interval_ms } => {
                let ticks = units::ms_to_ticks(interval_ms, self.config.control_period_10us);
                if self.start_logging(ticks, true) {
                    return Decoded::IntervalChanged { ticks };
                }
            }
            Command::SetInterval { interval_ms } => {
                let ticks = units::ms_to_ticks(interval_ms, self.config.control_period_10us);
                self.sampler.set_interval(ticks);
                return Decoded::IntervalChanged { ticks };
            }
            Command::MessageLog { enable: true } => self.start_messages(),
            Command::MessageLog { enable: false } => self.stop_messages(),
            Command::Transmit => self.request_transmission(sink),
            Command::Status(item) => self.send_status(item, sink),
        }
        Decoded::Used
    }

    /// Starts sending the log, or replies that there is nothing to send
    pub fn request_transmission(&mut self, sink: &mut dyn LineSink) {
        if self.rows.row_count() == 0 && !self.stream.is_active() {
            sink.send("% log is empty\r\n");
            sink.send("# log is empty\r\n");
            return;
        }
        self.transmission.start(&self.rows, &mut self.stream);
    }

    pub fn send_help(&self, sink: &mut dyn LineSink) {
        for line in command::HELP {
            sink.send(line);
        }
    }

    /// Sends one status reply
    pub fn send_status(&self, item: StatusItem, sink: &mut dyn LineSink) {
        let mut line = LineBuf::new();
        let written = match item {
            StatusItem::Flags => command::write_flags(self.enabled(), &mut line),
            StatusItem::Status => command::write_status(
                self.sampler.interval(),
                self.rows.row_count(),
                self.rows.max_rows(),
                self.arena.len(),
                &mut line,
            ),
        };
        if written.is_ok() {
            sink.send(&line);
        }
    }

    /// Lists the status items a subscriber can ask for
    pub fn publish_list(&self, sink: &mut dyn LineSink) {
        for item in StatusItem::ALL {
            let mut line = LineBuf::new();
            let _ = core::fmt::write(
                &mut line,
                format_args!("# {}\t{}\r\n", item.key(), item.description()),
            );
            sink.send(&line);
        }
    }

    /// Current settings as persisted
    pub fn settings(&self) -> LogSettings {
        LogSettings {
            flags: self.enabled().bits(),
            interval: self.sampler.interval(),
        }
    }

    pub fn save_settings(&self, store: &mut dyn ConfigStore) -> Result<(), ConfigError> {
        let settings = self.settings();
        store.write(&settings.to_bytes()?)?;
        info!("Saved log settings {:?}", settings);
        Ok(())
    }

    /// Restores the enabled set and interval. A store without binary
    /// configuration keeps the current settings and only skips the slot.
    /// Returns true if settings were loaded.
    pub fn load_settings(&mut self, store: &mut dyn ConfigStore) -> Result<bool, ConfigError> {
        if !store.has_log_settings() {
            store.skip(LogSettings::SIZE);
            return Ok(false);
        }
        let mut buf = [0u8; LogSettings::SIZE];
        store.read(&mut buf)?;
        let settings = LogSettings::from_bytes(&buf)?;
        self.sampler.set_interval(settings.interval);
        self.set_enabled(EnabledSet::from_bits(settings.flags));
        info!("Loaded log settings {:?}", settings);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{FieldId, read_f32, read_u16};
    use crate::storage::{HazardRegion, StreamState};

    #[derive(Default)]
    struct Recorder {
        lines: Vec<String>,
    }

    impl LineSink for Recorder {
        fn send(&mut self, text: &str) -> bool {
            self.lines.push(text.into());
            true
        }
    }

    struct Robot {
        time: f32,
    }

    impl TelemetrySource for Robot {
        fn mission_time(&self) -> f32 {
            self.time
        }

        fn battery_raw(&self) -> u16 {
            1000
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        image: Vec<u8>,
        pos: usize,
        binary: bool,
    }

    impl ConfigStore for MemoryStore {
        fn has_log_settings(&self) -> bool {
            self.binary
        }

        fn write(&mut self, bytes: &[u8]) -> Result<(), ConfigError> {
            self.image.extend_from_slice(bytes);
            self.pos += bytes.len();
            Ok(())
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<(), ConfigError> {
            let src = self
                .image
                .get(self.pos..self.pos + buf.len())
                .ok_or(ConfigError::Store("read past end"))?;
            buf.copy_from_slice(src);
            self.pos += buf.len();
            Ok(())
        }

        fn skip(&mut self, len: usize) {
            self.pos += len;
        }
    }

    fn time_and_battery() -> EnabledSet {
        let mut set = EnabledSet::only_time();
        set.set(FieldId::Battery, true);
        set
    }

    #[test]
    fn test_all_flags_off_leaves_time_only() {
        let mut arena = [0u8; 64];
        let mut logger = Logger::new(&mut arena, LoggerConfig::default());
        let mut sink = Recorder::default();

        let line = "lfls 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0";
        assert_eq!(logger.decode(line, &mut sink), Decoded::Used);
        assert_eq!(logger.enabled(), EnabledSet::only_time());
        assert_eq!(logger.layout().row_size(), 4);
        assert_eq!(logger.rows().max_rows(), 16);
    }

    #[test]
    fn test_changing_flags_resets_rows() {
        let mut arena = [0u8; 60];
        let mut logger = Logger::new(&mut arena, LoggerConfig::default());
        logger.set_enabled(time_and_battery());
        let mut sink = Recorder::default();

        logger.start_logging(1, true);
        for t in 1..=3 {
            logger.tick(t, &Robot { time: 0.0 }, &mut sink);
        }
        assert_eq!(logger.rows().row_count(), 3);

        logger.decode("lfls 1", &mut sink);
        assert_eq!(logger.rows().row_count(), 0);
    }

    #[test]
    fn test_sampling_until_full() {
        let mut arena = [0u8; 60];
        let mut logger = Logger::new(&mut arena, LoggerConfig::default());
        logger.set_enabled(time_and_battery());
        let mut sink = Recorder::default();
        logger.start_logging(1, true);

        let mut recorded = 0;
        for t in 1..=20u32 {
            if logger.tick(t, &Robot { time: t as f32 }, &mut sink) {
                recorded += 1;
            }
        }
        assert_eq!(recorded, 10);
        assert!(logger.rows().is_full());
        assert!(!logger.is_logging());

        let row = logger.row(9).unwrap();
        assert_eq!(read_f32(row, 0), 10.0);
        assert_eq!(read_u16(&row[4..], 0), 1000);
    }

    #[test]
    fn test_rows_full_notice_sent_once() {
        // 6-byte rows, room for two
        let mut arena = [0u8; 12];
        let mut logger = Logger::new(&mut arena, LoggerConfig::default());
        logger.set_enabled(time_and_battery());
        let mut sink = Recorder::default();
        logger.start_logging(1, true);

        for t in 1..=5 {
            logger.tick(t, &Robot { time: 0.0 }, &mut sink);
        }
        assert!(logger.rows().is_full());
        assert_eq!(sink.lines, vec![ROWS_FULL_NOTICE]);

        // Restarting without a reset does not repeat it
        logger.start_logging(0, false);
        logger.tick(6, &Robot { time: 0.0 }, &mut sink);
        assert_eq!(sink.lines.len(), 1);

        // A new generation can report again
        logger.start_logging(0, true);
        for t in 7..=10 {
            logger.tick(t, &Robot { time: 0.0 }, &mut sink);
        }
        assert_eq!(sink.lines, vec![ROWS_FULL_NOTICE, ROWS_FULL_NOTICE]);
    }

    #[test]
    fn test_lsts_keeps_stored_rows() {
        let mut arena = [0u8; 60];
        let mut logger = Logger::new(&mut arena, LoggerConfig::default());
        logger.set_enabled(time_and_battery());
        let mut sink = Recorder::default();
        logger.start_logging(1, true);
        for t in 1..=3 {
            logger.tick(t, &Robot { time: t as f32 }, &mut sink);
        }

        assert_eq!(
            logger.decode("lsts 5", &mut sink),
            Decoded::IntervalChanged { ticks: 5 }
        );
        assert_eq!(logger.rows().row_count(), 3);
        assert!(logger.is_logging());
        assert_eq!(read_f32(logger.row(2).unwrap(), 0), 3.0);

        // Next sample waits the new interval
        assert!(!logger.tick(4, &Robot { time: 4.0 }, &mut sink));
        assert!(logger.tick(8, &Robot { time: 8.0 }, &mut sink));
        assert_eq!(logger.rows().row_count(), 4);
    }

    #[test]
    fn test_logmsg_discards_stored_rows() {
        let mut arena = [0u8; 128];
        let mut logger = Logger::new(&mut arena, LoggerConfig::default());
        logger.set_enabled(time_and_battery());
        let mut sink = Recorder::default();
        logger.start_logging(1, true);
        for t in 1..=2 {
            logger.tick(t, &Robot { time: 0.0 }, &mut sink);
        }
        assert_eq!(logger.rows().row_count(), 2);

        logger.decode("logmsg", &mut sink);
        assert_eq!(logger.rows().row_count(), 0);
        assert!(!logger.is_logging());
        assert_eq!(logger.stream().state(), StreamState::Streaming);
        assert!(logger.row(0).is_none());
    }

    #[test]
    fn test_lognow_converts_ms_to_ticks() {
        let mut arena = [0u8; 60];
        let cfg = LoggerConfig {
            control_period_10us: 50,
            ..Default::default()
        };
        let mut logger = Logger::new(&mut arena, cfg);
        let mut sink = Recorder::default();

        assert_eq!(
            logger.decode("lognow 10", &mut sink),
            Decoded::IntervalChanged { ticks: 20 }
        );
        assert!(logger.is_logging());
        // Zero keeps the interval
        assert_eq!(logger.decode("lognow 0", &mut sink), Decoded::Used);
        assert_eq!(logger.interval(), 20);

        assert_eq!(
            logger.decode("lsts 2", &mut sink),
            Decoded::IntervalChanged { ticks: 4 }
        );
        assert_eq!(logger.interval(), 4);
    }

    #[test]
    fn test_log_command_on_empty_log() {
        let mut arena = [0u8; 60];
        let mut logger = Logger::new(&mut arena, LoggerConfig::default());
        let mut sink = Recorder::default();

        assert_eq!(logger.decode("log", &mut sink), Decoded::Used);
        assert_eq!(sink.lines, vec!["% log is empty\r\n", "# log is empty\r\n"]);
        assert!(!logger.is_transmitting());
    }

    #[test]
    fn test_log_transmits_rows_over_ticks() {
        let mut arena = [0u8; 60];
        let cfg = LoggerConfig {
            battery_volts_per_count: 0.01,
            ..Default::default()
        };
        let mut logger = Logger::new(&mut arena, cfg);
        logger.set_enabled(time_and_battery());
        let mut sink = Recorder::default();
        logger.start_logging(1, true);
        logger.tick(1, &Robot { time: 0.5 }, &mut sink);
        logger.stop_logging();

        logger.decode("log", &mut sink);
        assert!(logger.is_transmitting());
        let mut t = 2;
        while logger.is_transmitting() {
            logger.tick(t, &Robot { time: 0.0 }, &mut sink);
            t += 1;
        }
        assert_eq!(
            sink.lines,
            vec![
                "%  1    time [sec], from robot (0)\r\n",
                "%  2    Battery voltage [V]\r\n",
                "0.5000 10.00 \r\n",
                "logend\r\n",
            ]
        );
    }

    #[test]
    fn test_message_logging() {
        let mut arena = [0u8; 128];
        let mut logger = Logger::new(&mut arena, LoggerConfig::default());
        let mut sink = Recorder::default();

        logger.decode("logmsg 1", &mut sink);
        assert_eq!(logger.stream().state(), StreamState::Streaming);
        logger.log_message("hello", Timestamp::new(12, 500_000), &mut sink);

        logger.decode("log", &mut sink);
        let mut t = 1;
        while logger.is_transmitting() {
            logger.tick(t, &Robot { time: 0.0 }, &mut sink);
            t += 1;
        }
        assert_eq!(sink.lines[3], "12.500 hello\r\n");
        assert_eq!(sink.lines.last().unwrap(), "logend\r\n");

        logger.decode("logmsg 0", &mut sink);
        assert_eq!(logger.stream().state(), StreamState::Full);
    }

    #[test]
    fn test_message_buffer_full_notice_once() {
        let mut arena = [0u8; 48];
        let mut logger = Logger::new(&mut arena, LoggerConfig::default());
        let mut sink = Recorder::default();
        logger.start_messages();

        for _ in 0..3 {
            logger.log_message("0123456789", Timestamp::default(), &mut sink);
        }
        assert_eq!(sink.lines, vec![FULL_NOTICE]);
    }

    #[test]
    fn test_lognow_stops_message_logging() {
        let mut arena = [0u8; 128];
        let mut logger = Logger::new(&mut arena, LoggerConfig::default());
        let mut sink = Recorder::default();
        logger.start_messages();
        logger.decode("lognow", &mut sink);
        assert!(!logger.stream().is_active());
        assert!(logger.is_logging());
    }

    #[test]
    fn test_status_replies() {
        let mut arena = [0u8; 60];
        let mut logger = Logger::new(&mut arena, LoggerConfig::default());
        logger.set_enabled(time_and_battery());
        let mut sink = Recorder::default();

        logger.decode("lst", &mut sink);
        logger.decode("lfl", &mut sink);
        assert_eq!(sink.lines[0], "lst 1 0 10 60\r\n");
        assert_eq!(sink.lines[1], "lfl 0 0 0 0 0 0 0 0 0 0 0 0 0 1 0 0 0 0\r\n");

        sink.lines.clear();
        logger.publish_list(&mut sink);
        assert_eq!(sink.lines.len(), 2);
        assert!(sink.lines[0].starts_with("# lfl\t"));
    }

    #[test]
    fn test_unknown_line_not_used() {
        let mut arena = [0u8; 60];
        let mut logger = Logger::new(&mut arena, LoggerConfig::default());
        let mut sink = Recorder::default();
        assert_eq!(logger.decode("motor 1 2", &mut sink), Decoded::NotUsed);
        assert!(sink.lines.is_empty());
    }

    #[test]
    fn test_settings_round_trip_through_store() {
        let mut arena = [0u8; 60];
        let mut logger = Logger::new(&mut arena, LoggerConfig::default());
        logger.set_enabled(time_and_battery());
        logger.start_logging(7, true);

        let mut store = MemoryStore {
            binary: true,
            ..Default::default()
        };
        logger.save_settings(&mut store).unwrap();
        assert_eq!(store.image.len(), LogSettings::SIZE);

        let mut arena2 = [0u8; 60];
        let mut restored = Logger::new(&mut arena2, LoggerConfig::default());
        store.pos = 0;
        assert!(restored.load_settings(&mut store).unwrap());
        assert_eq!(restored.enabled(), time_and_battery());
        assert_eq!(restored.interval(), 7);
        assert_eq!(restored.rows().max_rows(), 10);
    }

    #[test]
    fn test_load_without_binary_config_skips_slot() {
        let mut arena = [0u8; 60];
        let mut logger = Logger::new(&mut arena, LoggerConfig::default());
        let mut store = MemoryStore::default();

        assert!(!logger.load_settings(&mut store).unwrap());
        assert_eq!(store.pos, LogSettings::SIZE);
        assert_eq!(logger.enabled(), EnabledSet::default());
    }

    #[test]
    fn test_hazard_rows_skipped_end_to_end() {
        let mut arena = [0u8; 60];
        let cfg = LoggerConfig {
            arena_base_address: 0x1FFF_FFF0,
            hazard: Some(HazardRegion::new(0x2000_0000, 0x2000_0001)),
            ..Default::default()
        };
        let mut logger = Logger::new(&mut arena, cfg);
        logger.set_enabled(time_and_battery());
        let mut sink = Recorder::default();
        logger.start_logging(1, true);

        let mut recorded = 0;
        for t in 1..=20u32 {
            if logger.tick(t, &Robot { time: t as f32 }, &mut sink) {
                recorded += 1;
            }
        }
        assert_eq!(recorded, 9);
        assert!(logger.row(2).is_none());
        assert_eq!(read_f32(logger.row(3).unwrap(), 0), 3.0);
    }
}
