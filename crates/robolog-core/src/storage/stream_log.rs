//! Timestamped free-text message log sharing the row arena

use core::fmt::Write as _;

use heapless::String;
use log::info;

use crate::render::{LineBuf, LineSink, push_truncated};

/// Bytes kept free at the end of the arena for the timestamp prefix
pub const TIMESTAMP_RESERVE: usize = 32;

/// Notice sent once when a message no longer fits
pub const FULL_NOTICE: &str = "# log message buffer full\r\n";

const PREAMBLE: [&str; 3] = [
    "% Logged communication messages\r\n",
    "% 1   time stamp in seconds since boot\r\n",
    "% 2   message text line\r\n",
];

/// Time since boot attached to a streamed message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timestamp {
    pub secs: u32,
    pub micros: u32,
}

impl Timestamp {
    /// Whole seconds in `micros` carry into `secs`
    pub const fn new(secs: u32, micros: u32) -> Self {
        Self {
            secs: secs.saturating_add(micros / 1_000_000),
            micros: micros % 1_000_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Message logging is off
    Idle,
    /// Messages are being appended
    Streaming,
    /// Append refused or stopped by command; sticky until the next start
    Full,
}

/// Result of [`StreamLog::append`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Append {
    Stored,
    /// Not streaming, nothing happened
    Ignored,
    /// This message did not fit; the log just turned full and the caller
    /// should send [`FULL_NOTICE`] once
    BecameFull,
}

/// Write and read cursors of the message log.
///
/// Entries are `"<secs>.<ms> <text>\0"` stored back to back from arena byte 0.
#[derive(Debug, Clone)]
pub struct StreamLog {
    write_pos: usize,
    read_pos: usize,
    state: StreamState,
    preamble_pending: bool,
}

impl Default for StreamLog {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamLog {
    pub const fn new() -> Self {
        Self {
            write_pos: 0,
            read_pos: 0,
            state: StreamState::Idle,
            preamble_pending: false,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// True once logging was started, also after it turned full
    pub fn is_active(&self) -> bool {
        self.state != StreamState::Idle
    }

    pub fn bytes_used(&self) -> usize {
        self.write_pos
    }

    /// Empties the log and starts accepting messages
    pub fn start(&mut self) {
        self.write_pos = 0;
        self.read_pos = 0;
        self.state = StreamState::Streaming;
        self.preamble_pending = true;
    }

    /// Stops accepting messages, keeping what is stored
    pub fn stop(&mut self) {
        if self.state == StreamState::Streaming {
            self.state = StreamState::Full;
        }
    }

    /// Turns message logging off; the arena now belongs to the row store
    pub fn deactivate(&mut self) {
        self.state = StreamState::Idle;
        self.write_pos = 0;
        self.read_pos = 0;
        self.preamble_pending = false;
    }

    /// Restarts output from the first stored message, preamble included
    pub fn rewind(&mut self) {
        self.read_pos = 0;
        self.preamble_pending = true;
    }

    /// True while the preamble or a message is waiting to be sent
    pub fn has_pending(&self) -> bool {
        self.preamble_pending || self.read_pos < self.write_pos
    }

    /// Stores `text` with its timestamp. Text after an embedded NUL is dropped.
    pub fn append(&mut self, arena: &mut [u8], text: &str, ts: Timestamp) -> Append {
        if self.state != StreamState::Streaming {
            return Append::Ignored;
        }
        let text = text.split('\0').next().unwrap_or("");
        if text.len() + TIMESTAMP_RESERVE + self.write_pos >= arena.len() {
            self.state = StreamState::Full;
            info!("Message log full at {} bytes", self.write_pos);
            return Append::BecameFull;
        }

        let ts = Timestamp::new(ts.secs, ts.micros);
        let mut prefix: String<TIMESTAMP_RESERVE> = String::new();
        // u32 seconds and three digits always fit the reserve
        let _ = write!(prefix, "{}.{:03} ", ts.secs, ts.micros / 1000);

        let mut pos = self.write_pos;
        for part in [prefix.as_bytes(), text.as_bytes(), &[0u8][..]] {
            arena[pos..pos + part.len()].copy_from_slice(part);
            pos += part.len();
        }
        self.write_pos = pos;
        Append::Stored
    }

    /// Sends the next pending line: the preamble on the first call after a
    /// start or rewind, then one stored message per call. A refused send is
    /// not repeated. Returns true while more is pending.
    pub fn drain_to_text(&mut self, arena: &[u8], sink: &mut dyn LineSink) -> bool {
        if self.preamble_pending {
            for line in PREAMBLE {
                sink.send(line);
            }
            self.preamble_pending = false;
            return self.has_pending();
        }
        if self.read_pos < self.write_pos {
            let entry = &arena[self.read_pos..self.write_pos];
            let len = entry.iter().position(|b| *b == 0).unwrap_or(entry.len());
            let text = core::str::from_utf8(&entry[..len]).unwrap_or("");

            let mut line = LineBuf::new();
            push_truncated(&mut line, text);
            if !text.ends_with('\n') {
                push_truncated(&mut line, "\r\n");
            }
            sink.send(&line);
            self.read_pos = (self.read_pos + len + 1).min(self.write_pos);
        }
        self.has_pending()
    }
}
