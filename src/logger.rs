// This file implements the application's logging system.
// It provides macros for the console (INFO, WARN, ERROR, DEBUG) with colored level tags,
// and the per-run log file (`RunLog`) that records every orchestration event as one
// timestamped, leveled line.

use chrono::{Local, SecondsFormat};
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock};

/// Provides convenient console logging macros.
/// `#[macro_export]` makes these macros globally available within the crate.

// `log_info!` for general application progress and informational messages.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => (eprintln!("{} {}", colored::Colorize::bright_green("[INFO]"), format!($($arg)*)));
}

// `log_warn!` for non-critical issues or noteworthy conditions.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => (eprintln!("{} {}", colored::Colorize::bright_yellow("[WARN]"), format!($($arg)*)));
}

// `log_error!` for critical errors requiring immediate attention.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => (eprintln!("{} {}", colored::Colorize::bright_red("[ERROR]"), format!($($arg)*)));
}

// `log_debug!` for detailed internal application tracing.
// Messages are only printed if debug mode is enabled via `is_debug_enabled()`.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if $crate::logger::is_debug_enabled() {
           eprintln!("{} {}", colored::Colorize::dimmed("[DEBUG]"), format!($($arg)*));
        }
    };
}

// The `run_*!` family writes to a `RunLog`: one line in the run's log file,
// echoed to the console through the macros above.
#[macro_export]
macro_rules! run_info {
    ($log:expr, $($arg:tt)*) => ($log.write($crate::logger::Level::Info, &format!($($arg)*)));
}

#[macro_export]
macro_rules! run_warn {
    ($log:expr, $($arg:tt)*) => ($log.write($crate::logger::Level::Warning, &format!($($arg)*)));
}

#[macro_export]
macro_rules! run_error {
    ($log:expr, $($arg:tt)*) => ($log.write($crate::logger::Level::Error, &format!($($arg)*)));
}

#[macro_export]
macro_rules! run_debug {
    ($log:expr, $($arg:tt)*) => ($log.write($crate::logger::Level::Debug, &format!($($arg)*)));
}

// Console debug flag, initialized once from the `--debug` CLI switch.
static DEBUG_ENABLED: OnceLock<AtomicBool> = OnceLock::new();

/// Initializes the console logger, setting the debug mode.
/// This function should be called once at application startup.
pub fn init(debug: bool) {
    DEBUG_ENABLED
        .get_or_init(|| AtomicBool::new(debug))
        .store(debug, Ordering::Relaxed);

    log_debug!("Logger initialized in DEBUG mode");
}

/// Checks if console debug logging is currently enabled.
/// Used primarily by the `log_debug!` macro.
pub fn is_debug_enabled() -> bool {
    DEBUG_ENABLED
        .get()
        .map(|f| f.load(Ordering::Relaxed))
        .unwrap_or(false)
}

/// Severity of a run log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Level::Debug => write!(f, "DEBUG"),
            Level::Info => write!(f, "INFO"),
            Level::Warning => write!(f, "WARNING"),
            Level::Error => write!(f, "ERROR"),
        }
    }
}

/// Append-only, line-oriented log of a single run.
///
/// Every line has the shape `<RFC 3339 timestamp> [LEVEL] message`. The file is
/// output-only: nothing in the program ever reads it back. A `RunLog` without a
/// file (see [`RunLog::console_only`]) still echoes to the console.
#[derive(Debug)]
pub struct RunLog {
    path: Option<PathBuf>,
    file: Mutex<Option<File>>,
    debug: bool,
}

impl RunLog {
    /// Creates `<dir>/hamshack-<YYYYMMDD-HHMMSS>.log`, creating `dir` when needed.
    /// Opening in append mode means a second run within the same second adds to the
    /// same file instead of truncating it.
    pub fn create(dir: &Path, debug: bool) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!(
            "hamshack-{}.log",
            Local::now().format("%Y%m%d-%H%M%S")
        ));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(RunLog {
            path: Some(path),
            file: Mutex::new(Some(file)),
            debug,
        })
    }

    pub fn console_only(debug: bool) -> Self {
        RunLog {
            path: None,
            file: Mutex::new(None),
            debug,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Records one event. DEBUG lines are dropped unless the log was created with
    /// debug enabled.
    pub fn write(&self, level: Level, message: &str) {
        if level == Level::Debug && !self.debug {
            return;
        }

        match level {
            Level::Debug => eprintln!("{} {}", colored::Colorize::dimmed("[DEBUG]"), message),
            Level::Info => log_info!("{}", message),
            Level::Warning => log_warn!("{}", message),
            Level::Error => log_error!("{}", message),
        }

        let Ok(mut guard) = self.file.lock() else {
            return;
        };
        if let Some(file) = guard.as_mut() {
            let stamp = Local::now().to_rfc3339_opts(SecondsFormat::Secs, false);
            if let Err(e) = writeln!(file, "{stamp} [{level}] {message}") {
                log_warn!("Failed to append to run log: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_timestamped_leveled_lines() {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::create(dir.path(), false).unwrap();
        crate::run_info!(log, "starting {}", "fldigi");
        crate::run_warn!(log, "PostConfigWarning: ini missing");
        crate::run_error!(log, "install failed");
        crate::run_debug!(log, "not recorded");

        let contents = fs::read_to_string(log.path().unwrap()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("[INFO] starting fldigi"));
        assert!(lines[1].contains("[WARNING] PostConfigWarning"));
        assert!(lines[2].contains("[ERROR] install failed"));
        assert!(chrono::DateTime::parse_from_rfc3339(lines[0].split(' ').next().unwrap()).is_ok());
    }

    #[test]
    fn debug_lines_recorded_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::create(&dir.path().join("nested/logs"), true).unwrap();
        crate::run_debug!(log, "resolved 3 candidates");
        let contents = fs::read_to_string(log.path().unwrap()).unwrap();
        assert!(contents.contains("[DEBUG] resolved 3 candidates"));
    }
}
