//! Text command parsing and reply formatting
//!
//! Commands are matched by case-sensitive keyword prefix. Arguments are
//! parsed leniently: a number stops at the first non-numeric character and
//! a missing number reads as zero, so no command is ever rejected for its
//! arguments.

use core::fmt::{self, Write as _};

use crate::layout::EnabledSet;
use crate::registry::FieldId;
use crate::render::LineBuf;

/// Outcome of offering a line to the logger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    /// Not a logger command
    NotUsed,
    Used,
    /// Used, and the sample interval changed. Collaborators filtering at
    /// the sample rate should retune.
    IntervalChanged { ticks: u32 },
}

impl Decoded {
    pub fn is_used(self) -> bool {
        self != Decoded::NotUsed
    }
}

/// Status replies that can also be published on subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusItem {
    /// `lfl` enabled-field flags
    Flags,
    /// `lst` interval and buffer use
    Status,
}

impl StatusItem {
    pub const ALL: [StatusItem; 2] = [StatusItem::Flags, StatusItem::Status];

    pub fn key(self) -> &'static str {
        match self {
            StatusItem::Flags => "lfl",
            StatusItem::Status => "lst",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            StatusItem::Flags => {
                "Get log flags 'lfl mis acc gyro mag motref motv mota enc vel turnr \
                 pose line dist batt time2 ctime ex chirp'"
            }
            StatusItem::Status => "Get log status 'lst interval rows rowsMax logSize'",
        }
    }
}

/// A parsed logger command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `lfls`: replace the enabled set
    SetFlags(EnabledSet),
    /// `lognow`: restart with a fresh buffer, interval 0 keeps the current one
    LogNow { interval_ms: u32 },
    /// `lsts`: change the interval without touching the buffer
    SetInterval { interval_ms: u32 },
    /// `logmsg`: start message logging, or stop it
    MessageLog { enable: bool },
    /// `log`: transmit stored rows or messages
    Transmit,
    Status(StatusItem),
}

impl Command {
    /// Parses a received line, `None` if it is not a logger command
    pub fn parse(line: &str) -> Option<Self> {
        if let Some(args) = keyword_args(line, "lfls") {
            Some(Command::SetFlags(parse_flags(args)))
        } else if let Some(args) = line.strip_prefix("lognow") {
            Some(Command::LogNow {
                interval_ms: Args::new(args).next_u32(),
            })
        } else if let Some(args) = keyword_args(line, "lsts") {
            Some(Command::SetInterval {
                interval_ms: Args::new(args).next_u32(),
            })
        } else if let Some(args) = line.strip_prefix("logmsg") {
            // Only a first digit of 0 switches message logging off
            let first_digit = args.chars().find(|c| c.is_ascii_digit());
            Some(Command::MessageLog {
                enable: first_digit != Some('0'),
            })
        } else if line.starts_with("log") {
            Some(Command::Transmit)
        } else if line.starts_with("lfl") {
            Some(Command::Status(StatusItem::Flags))
        } else if line.starts_with("lst") {
            Some(Command::Status(StatusItem::Status))
        } else {
            None
        }
    }
}

/// Arguments after `keyword` when the line is the keyword alone or the
/// keyword followed by whitespace
fn keyword_args<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(keyword)?;
    if rest.is_empty() || rest.starts_with(|c: char| c.is_ascii_whitespace()) {
        Some(rest)
    } else {
        None
    }
}

/// Flags for every field but `Time`, in enumeration order
fn parse_flags(args: &str) -> EnabledSet {
    let mut args = Args::new(args);
    let mut enabled = EnabledSet::only_time();
    for field in FieldId::ALL.into_iter().skip(1) {
        enabled.set(field, args.next_int() != 0);
    }
    enabled
}

/// Sequential integer reader with `strtol` rules: leading whitespace and a
/// sign are accepted, parsing stops at the first non-digit, and when no
/// digit is found the value is 0 and nothing is consumed.
struct Args<'a> {
    rest: &'a str,
}

impl<'a> Args<'a> {
    fn new(rest: &'a str) -> Self {
        Self { rest }
    }

    fn next_int(&mut self) -> i64 {
        let s = self.rest.trim_start();
        let (negative, digits) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };
        let len = digits.bytes().take_while(u8::is_ascii_digit).count();
        if len == 0 {
            return 0;
        }
        let value = digits[..len].bytes().fold(0i64, |acc, d| {
            acc.saturating_mul(10).saturating_add(i64::from(d - b'0'))
        });
        self.rest = &digits[len..];
        if negative { -value } else { value }
    }

    /// Negative values read as 0
    fn next_u32(&mut self) -> u32 {
        self.next_int().clamp(0, i64::from(u32::MAX)) as u32
    }
}

/// `lfl` reply: one 0/1 flag per field except `Time`
pub fn write_flags(enabled: EnabledSet, out: &mut LineBuf) -> fmt::Result {
    out.write_str("lfl")?;
    for field in FieldId::ALL.into_iter().skip(1) {
        write!(out, " {}", u8::from(enabled.contains(field)))?;
    }
    out.write_str("\r\n")
}

/// `lst` reply
pub fn write_status(
    interval: u32,
    rows: usize,
    max_rows: usize,
    capacity: usize,
    out: &mut LineBuf,
) -> fmt::Result {
    write!(out, "lst {} {} {} {}\r\n", interval, rows, max_rows, capacity)
}

pub const HELP: [&str; 6] = [
    "# logger ------\r\n",
    "# -- \tlognow \tstart logging now\r\n",
    "# -- \tlog \tGet current log, if any\r\n",
    "# -- \tlfls \tSet log flags - same order as lfl\r\n",
    "# -- \tlsts \tSet log interval (for timing info only)\r\n",
    "# -- \tlogmsg \tStart log of (all) streamed messages (e.g. subscriptions)\r\n",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_zero_flags_leave_only_time() {
        let line = "lfls 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0";
        assert_eq!(
            Command::parse(line),
            Some(Command::SetFlags(EnabledSet::only_time()))
        );
    }

    #[test]
    fn test_flags_in_enumeration_order() {
        let Some(Command::SetFlags(set)) = Command::parse("lfls 1 0 1") else {
            panic!("not parsed as lfls");
        };
        assert!(set.contains(FieldId::Mission));
        assert!(!set.contains(FieldId::Acc));
        assert!(set.contains(FieldId::Gyro));
        // Missing arguments read as 0
        assert!(!set.contains(FieldId::Chirp));
    }

    #[test]
    fn test_flags_stop_at_garbage() {
        let Some(Command::SetFlags(set)) = Command::parse("lfls 1 x 1 1") else {
            panic!("not parsed as lfls");
        };
        assert!(set.contains(FieldId::Mission));
        assert_eq!(set.bits(), 0b11);
    }

    #[test]
    fn test_interval_commands() {
        assert_eq!(
            Command::parse("lognow 10"),
            Some(Command::LogNow { interval_ms: 10 })
        );
        assert_eq!(
            Command::parse("lognow"),
            Some(Command::LogNow { interval_ms: 0 })
        );
        assert_eq!(
            Command::parse("lognow -5"),
            Some(Command::LogNow { interval_ms: 0 })
        );
        assert_eq!(
            Command::parse("lsts 25ms"),
            Some(Command::SetInterval { interval_ms: 25 })
        );
    }

    #[test]
    fn test_logmsg_argument_scan() {
        assert_eq!(
            Command::parse("logmsg"),
            Some(Command::MessageLog { enable: true })
        );
        assert_eq!(
            Command::parse("logmsg 0"),
            Some(Command::MessageLog { enable: false })
        );
        assert_eq!(
            Command::parse("logmsg on=1"),
            Some(Command::MessageLog { enable: true })
        );
        assert_eq!(
            Command::parse("logmsg x 05"),
            Some(Command::MessageLog { enable: false })
        );
    }

    #[test]
    fn test_prefix_precedence() {
        assert_eq!(Command::parse("log"), Some(Command::Transmit));
        assert_eq!(Command::parse("log get"), Some(Command::Transmit));
        assert_eq!(
            Command::parse("lfl"),
            Some(Command::Status(StatusItem::Flags))
        );
        assert_eq!(
            Command::parse("lst"),
            Some(Command::Status(StatusItem::Status))
        );
        assert_eq!(Command::parse("Log"), None);
        assert_eq!(Command::parse("help"), None);
    }

    #[test]
    fn test_bare_setters_default_their_arguments() {
        assert_eq!(
            Command::parse("lfls"),
            Some(Command::SetFlags(EnabledSet::only_time()))
        );
        assert_eq!(
            Command::parse("lsts"),
            Some(Command::SetInterval { interval_ms: 0 })
        );
        assert_eq!(
            Command::parse("lsts\t5"),
            Some(Command::SetInterval { interval_ms: 5 })
        );
        // Anything glued to the keyword is still a status query
        assert_eq!(
            Command::parse("lflsx"),
            Some(Command::Status(StatusItem::Flags))
        );
    }

    #[test]
    fn test_flags_reply() {
        let mut out = LineBuf::new();
        write_flags(EnabledSet::default(), &mut out).unwrap();
        assert_eq!(
            out.as_str(),
            "lfl 1 0 0 0 1 1 0 0 1 0 1 0 0 1 0 0 0 0\r\n"
        );
    }

    #[test]
    fn test_status_reply() {
        let mut out = LineBuf::new();
        write_status(5, 12, 1000, 60000, &mut out).unwrap();
        assert_eq!(out.as_str(), "lst 5 12 1000 60000\r\n");
    }
}
