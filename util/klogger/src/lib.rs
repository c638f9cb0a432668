// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Log backend writing colored, timestamped records to stderr.

use core::{
    fmt::{self, Write},
    str::FromStr,
};
use std::io::Write as _;

use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
pub use log::{debug, error, info, trace, warn};

macro_rules! color_fmt {
    ($color_code:expr, $($arg:tt)*) => {
        format_args!("\u{1B}[{}m{}\u{1B}[m", $color_code as u8, format_args!($($arg)*))
    };
}

#[repr(u8)]
#[allow(dead_code)]
enum AnsiColor {
    Red         = 31,
    Green       = 32,
    Yellow      = 33,
    Cyan        = 36,
    White       = 37,
    BrightBlack = 90,
}

impl From<Level> for AnsiColor {
    fn from(level: Level) -> Self {
        match level {
            Level::Error => AnsiColor::Red,
            Level::Warn => AnsiColor::Yellow,
            Level::Info => AnsiColor::Green,
            Level::Debug => AnsiColor::Cyan,
            Level::Trace => AnsiColor::BrightBlack,
        }
    }
}

struct Stderr;

impl Write for Stderr {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        std::io::stderr()
            .lock()
            .write_all(s.as_bytes())
            .map_err(|_| fmt::Error)
    }
}

struct StormLogger;

impl Log for StormLogger {
    #[inline]
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let color = AnsiColor::from(record.level());
        let _ = print_fmt(color_fmt!(
            AnsiColor::White,
            "[{time} {path}:{line}] {args}\n",
            time = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.6f"),
            path = record.target(),
            line = record.line().unwrap_or(0),
            args = color_fmt!(color, "{}", record.args()),
        ));
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Writes preformatted output, serialized against concurrent records.
pub fn print_fmt(args: fmt::Arguments) -> fmt::Result {
    static LOCK: spin::Mutex<()> = spin::Mutex::new(());

    let _guard = LOCK.lock();
    Stderr.write_fmt(args)
}

/// Installs the logger with the `Warn` level. Fails if a logger is already
/// installed.
pub fn init_klogger() -> Result<(), SetLoggerError> {
    log::set_logger(&StormLogger)?;
    log::set_max_level(LevelFilter::Warn);
    Ok(())
}

/// Sets the max level by name (`"info"`, `"debug"`, ...). Unknown names turn
/// logging off.
pub fn set_log_level(level: &str) {
    let lf = LevelFilter::from_str(level)
        .ok()
        .unwrap_or(LevelFilter::Off);
    log::set_max_level(lf);
}
