//! Diagnostic output for the `inkpost` binary.
//!
//! Library code logs through the `log` macros. The binary installs this
//! logger, which writes to stderr so stdout stays clean for command output.
//!
//! The level comes from `-v` flags, or from the INKPOST_LOG environment
//! variable:
//! - 0 or unset: warnings and errors
//! - 1: info
//! - 2: debug
//! - 3: trace
//!
//! Level names (`warn`, `debug`, ...) are accepted as well.
use std::io::Write;

use log::{LevelFilter, Log, Metadata, Record};

pub const LOG_ENV_VAR: &str = "INKPOST_LOG";

struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(
            stderr,
            "[{:<5}] {}: {}",
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

pub fn level_from_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Parse an INKPOST_LOG value; unknown values are ignored
pub fn parse_level(value: &str) -> Option<LevelFilter> {
    let value = value.trim();
    if let Ok(verbosity) = value.parse::<u8>() {
        return Some(level_from_verbosity(verbosity));
    }
    value.parse::<LevelFilter>().ok()
}

/// The louder of the `-v` count and the environment setting
pub fn resolve_level(verbosity: u8, env_value: Option<&str>) -> LevelFilter {
    let from_flags = level_from_verbosity(verbosity);
    match env_value.and_then(parse_level) {
        Some(from_env) => from_env.max(from_flags),
        None => from_flags,
    }
}

/// Install the stderr logger. Calling this twice keeps the first logger
/// but still applies the new level.
pub fn init(level: LevelFilter) {
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level);
}
