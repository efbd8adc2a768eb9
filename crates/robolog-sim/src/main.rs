//! Desktop driver for the robolog telemetry engine.
//!
//! Runs the control tick against a synthetic robot and reads command lines
//! from stdin. Rendered log lines and command replies go to stdout, so a
//! transmission can be redirected straight into a MATLAB-readable file.
//!
//! # Commands
//!
//! | Line     | Action                                  |
//! |----------|-----------------------------------------|
//! | `help`   | List commands                           |
//! | `eew`    | Save log settings to the store file     |
//! | `eer`    | Load log settings from the store file   |
//! | `quit`   | Exit                                    |
//!
//! Every other line goes to the logger (`lfls`, `lognow`, `log`, ...).
//!
//! Settings come from `ROBOLOG_*` environment variables, optionally read
//! from a `.env` file.

use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use log::{info, warn};

use robolog_core::{Decoded, LineSink, Logger, Timestamp};

mod mock;
mod settings;

use mock::MockRobot;
use settings::{FileStore, SimSettings};

const DRIVER_HELP: [&str; 4] = [
    "# simulator ------\r\n",
    "# -- \teew \tsave log settings\r\n",
    "# -- \teer \tload log settings\r\n",
    "# -- \tquit \texit\r\n",
];

/// Writes lines to stdout. A failed write is reported as a refused send.
struct Stdout;

impl LineSink for Stdout {
    fn send(&mut self, text: &str) -> bool {
        let mut out = io::stdout().lock();
        out.write_all(text.as_bytes()).is_ok() && out.flush().is_ok()
    }
}

/// Writes to stdout and keeps a copy of every line for the message log
#[derive(Default)]
struct Capture {
    lines: Vec<String>,
}

impl LineSink for Capture {
    fn send(&mut self, text: &str) -> bool {
        self.lines.push(text.to_owned());
        Stdout.send(text)
    }
}

/// Reads stdin lines on a helper thread. The channel closes at end of input.
fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn timestamp(start: Instant) -> Timestamp {
    let elapsed = start.elapsed();
    Timestamp::new(elapsed.as_secs() as u32, elapsed.subsec_micros())
}

/// Handles one command line. Returns false on `quit`.
fn handle_line(
    line: &str,
    logger: &mut Logger<'_>,
    store: &mut FileStore,
    out: &mut Capture,
) -> bool {
    let line = line.trim();
    match line {
        "" => {}
        "quit" => return false,
        "help" => {
            logger.send_help(out);
            for text in DRIVER_HELP {
                out.send(text);
            }
        }
        "eew" => {
            store.rewind();
            match logger.save_settings(store) {
                Ok(()) => {
                    out.send("# log settings saved\r\n");
                }
                Err(e) => warn!("Saving settings failed: {}", e),
            }
        }
        "eer" => {
            store.rewind();
            match logger.load_settings(store) {
                Ok(true) => {
                    out.send("# log settings loaded\r\n");
                }
                Ok(false) => {
                    out.send("# no stored log settings\r\n");
                }
                Err(e) => warn!("Loading settings failed: {}", e),
            }
        }
        _ => match logger.decode(line, out) {
            Decoded::NotUsed => {
                out.send(&format!("# not used: {line}\r\n"));
            }
            Decoded::IntervalChanged { ticks } => info!("Sample interval now {} ticks", ticks),
            Decoded::Used => {}
        },
    }
    true
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let sim = SimSettings::from_env()?;
    let period = Duration::from_micros(u64::from(sim.logger.control_period_10us.max(1)) * 10);
    info!(
        "Starting robolog simulator: {} byte arena, {:?} control period",
        sim.arena_bytes, period
    );

    let mut arena = vec![0u8; sim.arena_bytes];
    let mut logger = Logger::new(&mut arena, sim.logger);
    let mut store = FileStore::open(&sim.store_file)?;
    match logger.load_settings(&mut store) {
        Ok(true) => info!("Log settings restored from {}", sim.store_file.display()),
        Ok(false) => info!("No stored log settings, using defaults"),
        Err(e) => warn!("Ignoring stored log settings: {}", e),
    }

    let commands = spawn_stdin_reader();
    let start = Instant::now();
    let mut robot = MockRobot::new();
    let mut tick: u32 = 0;
    let mut input_closed = false;

    'running: loop {
        let tick_start = Instant::now();

        // --- Commands -----------------------------------------------------
        while !input_closed {
            match commands.try_recv() {
                Ok(line) => {
                    let mut replies = Capture::default();
                    if !handle_line(&line, &mut logger, &mut store, &mut replies) {
                        break 'running;
                    }
                    // Outbound text is captured while message logging is on
                    for text in &replies.lines {
                        logger.log_message(text, timestamp(start), &mut Stdout);
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    info!("End of input");
                    input_closed = true;
                }
            }
        }
        if input_closed && !logger.is_transmitting() {
            break;
        }

        // --- Control tick -------------------------------------------------
        tick = tick.wrapping_add(1);
        robot.advance(period.as_secs_f32());
        // Not captured: a message log transmission would feed itself
        logger.tick(tick, &robot, &mut Stdout);

        // --- Pacing -------------------------------------------------------
        let elapsed = tick_start.elapsed();
        if elapsed < period {
            thread::sleep(period - elapsed);
        }
    }

    info!("Simulator exiting after {} ticks", tick);
    Ok(())
}
