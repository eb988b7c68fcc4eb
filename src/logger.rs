use log::{Level, LevelFilter, Log, Metadata, Record};
use std::io::{stderr, stdout, Write};
use std::sync::{Mutex, Once};

/// Log implementation for standard output streams
///
/// Errors go to stderr, everything else to stdout so it interleaves with the per-packet lines.
pub struct StdLogger(Mutex<()>);

impl StdLogger {
    /// Initialize logger
    ///
    /// Without `-v` only warnings and errors are shown, each additional `-v` lowers the bar by one
    /// level down to `Trace`. Release builds are capped at `Info` at compile time.
    ///
    /// Even if this function is called multiple times, initialization will only be done once and
    /// the first verbosity wins.
    pub fn init(verbosity: u64) {
        static INIT: Once = Once::new();

        // Initialization may run from more than one thread
        INIT.call_once(|| {
            // Another logger may have been installed by the embedding program
            if log::set_boxed_logger(Box::new(StdLogger(Mutex::new(())))).is_ok() {
                log::set_max_level(Self::level_for(verbosity));
            }
        });
    }

    /// Maximum log level for a number of `-v` flags
    pub fn level_for(verbosity: u64) -> LevelFilter {
        match verbosity {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    fn prefix(level: Level) -> &'static str {
        match level {
            Level::Error | Level::Warn => "[-]",
            Level::Info => "[i]",
            Level::Debug | Level::Trace => "[+]",
        }
    }
}

impl Log for StdLogger {
    /// Filtering is left to the global max level
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    /// Internal call to `write`
    fn log(&self, record: &Record) {
        // The printing thread and the session may log at the same time
        let _guard = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let prefix = Self::prefix(record.level());
        if record.level() == Level::Error {
            let stderr = stderr();
            let mut handle = stderr.lock();
            let _ = writeln!(handle, "{} {}", prefix, record.args());
        } else {
            let stdout = stdout();
            let mut handle = stdout.lock();
            let _ = writeln!(handle, "{} {}", prefix, record.args());
        }
    }

    /// Flush buffered output stream
    fn flush(&self) {
        let _ = stdout().flush();
        let _ = stderr().flush();
    }
}
