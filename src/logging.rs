//! Logging configuration for the connector binary.
//!
//! Logs go to stderr by default so stdout stays reserved for result JSON.
//! When the connector is embedded in a host that owns the terminal, file
//! logging keeps diagnostics out of the host's output.

use std::fs::{self, File};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initializes logging to a file.
///
/// Location: `path` if given, otherwise `~/.local/state/presto-connector/presto-connector.log`
/// on Linux (XDG state directory) or the platform-appropriate fallback.
pub fn init_file_logging(path: Option<PathBuf>) {
    let log_path = path.unwrap_or_else(get_log_path);

    if let Some(parent) = log_path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            eprintln!("Warning: Could not create log directory: {e}");
            return;
        }
    }

    // Truncate on each run to avoid unbounded growth
    let log_file = match File::create(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not create log file: {e}");
            return;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(log_file)
        .with_ansi(false)
        .init();
}

/// Initializes logging to stderr.
pub fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}

/// Returns the default path for the log file.
pub fn get_log_path() -> PathBuf {
    if let Some(state_dir) = dirs::state_dir() {
        return state_dir
            .join("presto-connector")
            .join("presto-connector.log");
    }

    if let Some(config_dir) = dirs::config_dir() {
        return config_dir
            .join("presto-connector")
            .join("presto-connector.log");
    }

    std::env::temp_dir().join("presto-connector.log")
}
