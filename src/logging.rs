// @module: Coloured stderr logger shared by both binaries

use std::io::Write;
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

// @struct: Custom logger implementation
pub struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    /// Install the logger globally.
    ///
    /// The logger itself accepts everything up to `Trace`; verbosity is controlled with
    /// [`set_level`] so it can be changed after the configuration has been read.
    pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(LevelFilter::Trace));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI colour code for level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }

    // @returns: Fixed-width tag for level
    fn tag_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "ERROR",
            Level::Warn => "WARN ",
            Level::Info => "INFO ",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        }
    }
}

/// Change the global log level
pub fn set_level(level: LevelFilter) {
    log::set_max_level(level);
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let now = chrono::Local::now().format("%H:%M:%S.%3f");
        let level = record.level();
        let mut stderr = std::io::stderr();
        let _ = writeln!(
            stderr,
            "\x1B[{}m{} {} {}\x1B[0m",
            Self::color_for_level(level),
            now,
            Self::tag_for_level(level),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}
