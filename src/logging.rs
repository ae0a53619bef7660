//! Structured logging for the solar comparison service
//!
//! Provides context-rich logging with component and source-label
//! identifiers, timestamps, and severity levels. Supports both console
//! output and an append-only log file for batch runs.

use chrono::Utc;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Mutex;

use crate::model::CompareError;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

impl LogLevel {
    /// Parses a level name as written in config files or the environment.
    pub fn parse(name: &str) -> Option<LogLevel> {
        match name.trim().to_ascii_lowercase().as_str() {
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warning),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline Components
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Component {
    Loader,
    Aggregator,
    Tester,
    Report,
    Dashboard,
    Cleaning,
    System,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Loader => write!(f, "LOAD"),
            Component::Aggregator => write!(f, "AGG"),
            Component::Tester => write!(f, "TEST"),
            Component::Report => write!(f, "REPORT"),
            Component::Dashboard => write!(f, "DASH"),
            Component::Cleaning => write!(f, "CLEAN"),
            Component::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - the source simply has not been produced yet
    Expected,
    /// Unexpected failure - the file exists but is unreadable or malformed
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

/// Global logger instance
static LOGGER: Mutex<Option<Logger>> = Mutex::new(None);

pub struct Logger {
    /// Minimum log level to display
    min_level: LogLevel,
    /// Optional file path for logging
    log_file: Option<String>,
    /// Whether to include timestamps in console output
    console_timestamps: bool,
}

impl Logger {
    /// Initialize the global logger
    pub fn init(min_level: LogLevel, log_file: Option<String>, console_timestamps: bool) {
        let logger = Logger {
            min_level,
            log_file,
            console_timestamps,
        };

        if let Ok(mut guard) = LOGGER.lock() {
            *guard = Some(logger);
        }
    }

    fn log(&self, level: LogLevel, component: &Component, label: Option<&str>, message: &str) {
        if level < self.min_level {
            return;
        }

        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");

        let label_part = label.map(|s| format!(" [{}]", s)).unwrap_or_default();
        let log_entry = format!(
            "{} {} {}{}: {}",
            timestamp, level, component, label_part, message
        );

        // Console output goes to stderr so report text on stdout stays clean
        if self.console_timestamps {
            eprintln!("{}", log_entry);
        } else {
            match level {
                LogLevel::Error => eprintln!("   ✗ {}{}: {}", component, label_part, message),
                LogLevel::Warning => eprintln!("   ⚠ {}{}: {}", component, label_part, message),
                LogLevel::Info => eprintln!("   {}", message),
                LogLevel::Debug => eprintln!("   [DEBUG] {}{}: {}", component, label_part, message),
            }
        }

        if let Some(ref path) = self.log_file {
            if let Err(e) = Self::append_to_file(path, &log_entry) {
                eprintln!("Failed to write to log file {}: {}", path, e);
            }
        }
    }

    fn append_to_file(path: &str, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Initialize the global logger
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>, console_timestamps: bool) {
    Logger::init(min_level, log_file.map(String::from), console_timestamps);
    debug(
        Component::System,
        None,
        &format!("logger initialized at {} (file: {})", min_level, log_file.unwrap_or("none")),
    );
}

fn dispatch(level: LogLevel, component: Component, label: Option<&str>, message: &str) {
    if let Ok(guard) = LOGGER.lock() {
        if let Some(logger) = guard.as_ref() {
            logger.log(level, &component, label, message);
        }
    }
}

/// Log a general informational message
pub fn info(component: Component, label: Option<&str>, message: &str) {
    dispatch(LogLevel::Info, component, label, message);
}

/// Log a warning message
pub fn warn(component: Component, label: Option<&str>, message: &str) {
    dispatch(LogLevel::Warning, component, label, message);
}

/// Log an error message
pub fn error(component: Component, label: Option<&str>, message: &str) {
    dispatch(LogLevel::Error, component, label, message);
}

/// Log a debug message
pub fn debug(component: Component, label: Option<&str>, message: &str) {
    dispatch(LogLevel::Debug, component, label, message);
}

// ---------------------------------------------------------------------------
// Failure Classification Helpers
// ---------------------------------------------------------------------------

/// Classify a source load failure.
///
/// A missing file is the normal state before the cleaning pass has run for
/// that source; anything that got as far as parsing points at a bad file.
pub fn classify_load_failure(err: &CompareError) -> FailureType {
    match err {
        CompareError::SourceNotFound { .. } => FailureType::Expected,
        CompareError::Csv { .. } => FailureType::Unexpected,
        CompareError::Io { .. } => FailureType::Unknown,
        CompareError::Config(_) | CompareError::InvalidArgument(_) => FailureType::Unexpected,
    }
}

/// Log a source load failure with automatic classification
pub fn log_load_failure(label: &str, operation: &str, err: &CompareError) {
    let failure_type = classify_load_failure(err);
    let message = format!("{} failed [{}]: {}", operation, failure_type, err);

    match failure_type {
        FailureType::Expected => debug(Component::Loader, Some(label), &message),
        FailureType::Unexpected => error(Component::Loader, Some(label), &message),
        FailureType::Unknown => warn(Component::Loader, Some(label), &message),
    }
}

// ---------------------------------------------------------------------------
// Load Summary Logging
// ---------------------------------------------------------------------------

/// Log a summary of one load pass
pub fn log_load_summary(total: usize, loaded: usize, skipped: usize, rows: usize) {
    let message = format!(
        "Load complete: {}/{} sources loaded, {} skipped, {} rows",
        loaded, total, skipped, rows
    );

    if skipped == 0 {
        info(Component::Loader, None, &message);
    } else if loaded == 0 {
        error(Component::Loader, None, &message);
    } else {
        warn(Component::Loader, None, &message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Error);
    }

    #[test]
    fn test_log_level_parse() {
        assert_eq!(LogLevel::parse("DEBUG"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse(" warn "), Some(LogLevel::Warning));
        assert_eq!(LogLevel::parse("warning"), Some(LogLevel::Warning));
        assert_eq!(LogLevel::parse("verbose"), None);
    }

    #[test]
    fn test_failure_classification() {
        let missing = CompareError::SourceNotFound {
            label: "Togo".to_string(),
            path: "data/togo_clean.csv".to_string(),
        };
        assert_eq!(classify_load_failure(&missing), FailureType::Expected);

        let malformed = CompareError::Csv {
            path: "data/togo_clean.csv".to_string(),
            message: "unequal lengths".to_string(),
        };
        assert_eq!(classify_load_failure(&malformed), FailureType::Unexpected);

        let io = CompareError::Io {
            path: "data".to_string(),
            message: "permission denied".to_string(),
        };
        assert_eq!(classify_load_failure(&io), FailureType::Unknown);
    }

    #[test]
    fn test_log_file_receives_entries() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("compare.log");
        let logger = Logger {
            min_level: LogLevel::Info,
            log_file: Some(path.to_string_lossy().into_owned()),
            console_timestamps: true,
        };
        logger.log(LogLevel::Debug, &Component::Loader, None, "hidden");
        logger.log(LogLevel::Warning, &Component::Loader, Some("Togo"), "skipped");

        let contents = std::fs::read_to_string(&path).expect("log file should exist");
        assert!(!contents.contains("hidden"), "debug below min level must be filtered");
        assert!(contents.contains("WARN LOAD [Togo]: skipped"), "got: {}", contents);
    }
}
