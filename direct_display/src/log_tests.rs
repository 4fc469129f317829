//! Unit tests for log.rs

use crate::log::{self, DefaultLogger, LogEntry, LogSeverity, Logger};
use crate::Error;
use serial_test::serial;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

/// Logger that keeps entries from test sources in memory
///
/// Other tests of the crate log concurrently through the global logger, so
/// only sources starting with "test" are kept.
struct CaptureLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl Logger for CaptureLogger {
    fn log(&self, entry: &LogEntry) {
        if entry.source.starts_with("test") {
            self.entries.lock().unwrap().push(entry.clone());
        }
    }
}

fn capture() -> Arc<Mutex<Vec<LogEntry>>> {
    let entries = Arc::new(Mutex::new(Vec::new()));
    log::set_logger(CaptureLogger { entries: Arc::clone(&entries) });
    entries
}

// ============================================================================
// LOG SEVERITY TESTS
// ============================================================================

#[test]
fn test_log_severity_ordering() {
    assert!(LogSeverity::Trace < LogSeverity::Debug);
    assert!(LogSeverity::Debug < LogSeverity::Info);
    assert!(LogSeverity::Info < LogSeverity::Warn);
    assert!(LogSeverity::Warn < LogSeverity::Error);
}

#[test]
fn test_log_severity_debug() {
    assert_eq!(format!("{:?}", LogSeverity::Trace), "Trace");
    assert_eq!(format!("{:?}", LogSeverity::Error), "Error");
}

// ============================================================================
// DEFAULT LOGGER FORMAT
// ============================================================================

#[test]
fn test_format_plain_without_location() {
    let entry = LogEntry {
        severity: LogSeverity::Info,
        timestamp: SystemTime::now(),
        source: "direct_display::core".to_string(),
        message: "Display mode: 1920 x 1080 @ 60Hz".to_string(),
        file: None,
        line: None,
    };

    let line = DefaultLogger::format_plain(&entry);
    assert!(line.contains("[INFO ]"));
    assert!(line.contains("[direct_display::core]"));
    assert!(line.ends_with("Display mode: 1920 x 1080 @ 60Hz"));
}

#[test]
fn test_format_plain_with_location() {
    let entry = LogEntry {
        severity: LogSeverity::Error,
        timestamp: SystemTime::now(),
        source: "direct_display::vulkan".to_string(),
        message: "init failed".to_string(),
        file: Some("src/direct_display.rs"),
        line: Some(42),
    };

    let line = DefaultLogger::format_plain(&entry);
    assert!(line.contains("[ERROR]"));
    assert!(line.ends_with("init failed (src/direct_display.rs:42)"));
}

// ============================================================================
// GLOBAL LOGGER + MACROS
// ============================================================================

#[test]
#[serial]
fn test_macros_route_to_custom_logger() {
    let entries = capture();

    crate::dd_trace!("test", "trace {}", 1);
    crate::dd_debug!("test", "debug {}", 2);
    crate::dd_info!("test", "info {}", 3);
    crate::dd_warn!("test", "warn {}", 4);
    crate::dd_error!("test", "error {}", 5);

    log::reset_logger();

    let entries = entries.lock().unwrap();
    let severities: Vec<LogSeverity> = entries.iter().map(|e| e.severity).collect();
    assert_eq!(
        severities,
        vec![
            LogSeverity::Trace,
            LogSeverity::Debug,
            LogSeverity::Info,
            LogSeverity::Warn,
            LogSeverity::Error,
        ]
    );
    assert_eq!(entries[2].message, "info 3");
    assert!(entries[3].file.is_none());
    assert!(entries[4].file.is_some());
    assert!(entries[4].line.is_some());
}

#[test]
#[serial]
fn test_dd_err_logs_and_builds_backend_error() {
    let entries = capture();

    let err = crate::dd_err!("test::vulkan", "Failed to present: {}", "OUT_OF_DATE");

    log::reset_logger();

    assert_eq!(err, Error::BackendError("Failed to present: OUT_OF_DATE".to_string()));
    let entries = entries.lock().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].severity, LogSeverity::Error);
    assert_eq!(entries[0].source, "test::vulkan");
}

#[test]
#[serial]
fn test_dd_bail_returns_early() {
    let entries = capture();

    fn failing(flag: bool) -> crate::Result<u32> {
        if flag {
            crate::dd_bail!("test", "bailing out");
        }
        Ok(7)
    }

    assert_eq!(failing(false), Ok(7));
    assert!(matches!(failing(true), Err(Error::BackendError(_))));

    log::reset_logger();
    assert_eq!(entries.lock().unwrap().len(), 1);
}

#[test]
#[serial]
fn test_reset_logger_detaches_custom_logger() {
    let entries = capture();
    log::reset_logger();

    crate::dd_info!("test", "goes to the default logger");

    assert!(entries.lock().unwrap().is_empty());
}
