//! Logging setup
//!
//! The terminal storefront owns stdout, so it logs to a daily rolling file in the
//! data directory. One-shot commands log to stderr.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a filter directive such as `debug` or `shopfront=trace`
pub const LOG_ENV: &str = "SHOPFRONT_LOG";

/// Log file prefix; the appender adds the date
const LOG_FILE_PREFIX: &str = "shopfront.log";

/// Builds the filter from `level`, falling back to `default` on a bad directive
fn filter(level: Option<&str>, default: &str) -> EnvFilter {
    let directive = level.unwrap_or(default);
    EnvFilter::try_new(directive).unwrap_or_else(|e| {
        eprintln!("Ignoring invalid log filter '{}': {}", directive, e);
        EnvFilter::new(default)
    })
}

/// Logs to a daily rolling file under `dir`
///
/// The returned guard flushes buffered lines on drop and must be held for the
/// life of the program. Returns `None` if the directory cannot be created or a
/// subscriber is already installed.
pub fn init_file(dir: &Path, level: Option<&str>) -> Option<WorkerGuard> {
    if let Err(e) = std::fs::create_dir_all(dir) {
        eprintln!("Cannot create log directory {}: {}", dir.display(), e);
        return None;
    }
    let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(filter(level, "info"))
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .ok()?;
    Some(guard)
}

/// Logs to stderr
pub fn init_stderr(level: Option<&str>) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(level, "warn"))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
