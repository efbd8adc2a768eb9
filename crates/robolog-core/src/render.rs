//! Text rendering of stored rows and the step-wise transmission of the log
//!
//! A transmission is spread over many calls to [`Transmission::step`], one
//! output line (or one header block) per call, so a full dump never stalls
//! the control loop on a slow transport.

use core::fmt::{self, Write as _};

use heapless::String;
use log::{debug, warn};

use crate::config::LoggerConfig;
use crate::layout::RowLayout;
use crate::storage::{RowStore, StreamLog};

/// Longest line a field or a whole data row may render to
pub const LINE_CAPACITY: usize = 2048;

pub type LineBuf = String<LINE_CAPACITY>;

/// Sent after the last line of every transmission
pub const END_SENTINEL: &str = "logend\r\n";

/// Sent when a transmission finds neither rows nor messages
pub const EMPTY_NOTICE: &str = "% Log buffer is empty\r\n";

/// Outbound text transport. `text` carries its own line terminator.
pub trait LineSink {
    /// Returns false if the line could not be delivered
    fn send(&mut self, text: &str) -> bool;
}

/// Appends as much of `text` as fits, cut at a character boundary
pub fn push_truncated(buf: &mut LineBuf, text: &str) {
    let room = buf.capacity() - buf.len();
    let mut end = text.len().min(room);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let _ = buf.push_str(&text[..end]);
}

/// What to render: the legend block or a stored row (0-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowRef {
    Header,
    Data(usize),
}

/// Per-field dispatch through the registry
#[derive(Debug)]
pub struct Renderer {
    /// Next 1-based column number in header mode
    column: u16,
}

impl Renderer {
    pub const fn new() -> Self {
        Self { column: 1 }
    }

    /// Sends one legend line per enabled field. Returns false if any line
    /// was refused or did not fit.
    pub fn render_header(
        &mut self,
        layout: &RowLayout,
        cfg: &LoggerConfig,
        sink: &mut dyn LineSink,
    ) -> bool {
        let mut delivered = true;
        self.column = 1;
        for (field, _) in layout.iter() {
            let desc = field.descriptor();
            let mut line = LineBuf::new();
            if (desc.header)(self.column, &mut line, cfg).is_err() {
                warn!("Legend of {} does not fit a line", desc.name);
                delivered = false;
            }
            delivered &= sink.send(&line);
            self.column += u16::from(desc.columns);
        }
        delivered
    }

    /// Formats one stored row as a CRLF terminated line
    pub fn render_row(
        &self,
        row: &[u8],
        layout: &RowLayout,
        cfg: &LoggerConfig,
        out: &mut LineBuf,
    ) -> fmt::Result {
        for (field, offset) in layout.iter() {
            let desc = field.descriptor();
            let data = row.get(offset..offset + desc.byte_size()).ok_or(fmt::Error)?;
            (desc.data)(data, out, cfg)?;
        }
        out.write_str("\r\n")
    }

    /// Column the next header field would start at
    pub fn column(&self) -> u16 {
        self.column
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Rows(RowRef),
    Messages,
    Empty,
}

/// Cursor of an ongoing `log` transmission
#[derive(Debug)]
pub struct Transmission {
    phase: Phase,
    renderer: Renderer,
    /// Refused sends of the current row so far
    retries: u8,
}

impl Default for Transmission {
    fn default() -> Self {
        Self::new()
    }
}

impl Transmission {
    pub const fn new() -> Self {
        Self {
            phase: Phase::Idle,
            renderer: Renderer::new(),
            retries: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// Begins sending rows if any are stored, else stream messages if
    /// message logging was started, else the empty notice.
    pub fn start(&mut self, rows: &RowStore, stream: &mut StreamLog) {
        self.retries = 0;
        self.phase = if rows.row_count() > 0 {
            Phase::Rows(RowRef::Header)
        } else if stream.is_active() {
            stream.rewind();
            Phase::Messages
        } else {
            Phase::Empty
        };
    }

    pub fn cancel(&mut self) {
        self.phase = Phase::Idle;
    }

    /// Sends the next line(s). Returns true while the transmission continues.
    pub fn step(
        &mut self,
        arena: &[u8],
        layout: &RowLayout,
        rows: &RowStore,
        stream: &mut StreamLog,
        cfg: &LoggerConfig,
        sink: &mut dyn LineSink,
    ) -> bool {
        match self.phase {
            Phase::Idle => return false,
            Phase::Empty => {
                sink.send(EMPTY_NOTICE);
                self.finish(sink);
            }
            Phase::Messages => {
                if !stream.drain_to_text(arena, sink) {
                    self.finish(sink);
                }
            }
            Phase::Rows(RowRef::Header) => {
                self.renderer.render_header(layout, cfg, sink);
                self.phase = Phase::Rows(RowRef::Data(0));
            }
            Phase::Rows(RowRef::Data(index)) => {
                self.send_row(index, arena, layout, rows, cfg, sink)
            }
        }
        self.is_active()
    }

    fn send_row(
        &mut self,
        mut index: usize,
        arena: &[u8],
        layout: &RowLayout,
        rows: &RowStore,
        cfg: &LoggerConfig,
        sink: &mut dyn LineSink,
    ) {
        while index < rows.row_count() && rows.is_skipped(index) {
            index += 1;
        }
        let Some(row) = rows.row(arena, index) else {
            self.finish(sink);
            return;
        };

        let mut line = LineBuf::new();
        if self.renderer.render_row(row, layout, cfg, &mut line).is_err() {
            warn!("Row {} does not fit a line, dropped", index);
            self.advance(index);
            return;
        }
        if sink.send(&line) {
            self.advance(index);
        } else if self.retries < cfg.max_send_retries {
            self.retries += 1;
            debug!("Row {} refused, retry {}", index, self.retries);
            self.phase = Phase::Rows(RowRef::Data(index));
        } else {
            warn!("Row {} dropped after {} retries", index, self.retries);
            self.advance(index);
        }
    }

    fn advance(&mut self, index: usize) {
        self.retries = 0;
        self.phase = Phase::Rows(RowRef::Data(index + 1));
    }

    fn finish(&mut self, sink: &mut dyn LineSink) {
        sink.send(END_SENTINEL);
        self.phase = Phase::Idle;
    }
}
