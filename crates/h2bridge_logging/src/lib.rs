//! Shared logging utilities for h2bridge binaries.
//!
//! Logs go to a daily-rolling file under `~/.h2bridge/logs` and to stderr.
//! The file layer honours `RUST_LOG`; stderr stays at `warn` unless the
//! caller asks for verbose output.

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "h2bridge=info,h2bridge_server=info";

/// Environment variable that relocates the h2bridge home directory.
pub const HOME_ENV: &str = "H2BRIDGE_HOME";

/// Logging configuration shared by h2bridge binaries.
pub struct LogConfig<'a> {
    pub app_name: &'a str,
    pub verbose: bool,
}

/// Keeps the non-blocking file writer flushing until dropped.
///
/// Hold it for the lifetime of `main`.
#[must_use = "dropping the guard stops file logging"]
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// Initialize tracing with a rolling file writer and stderr output.
///
/// A log directory that cannot be created is reported on stderr and file
/// logging is skipped; console logging still works.
pub fn init_logging(config: LogConfig<'_>) -> Result<LogGuard> {
    let file_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let console_filter = if config.verbose {
        file_filter.clone()
    } else {
        EnvFilter::new("warn")
    };

    let mut file_guard = None;
    let file_layer = match ensure_logs_dir() {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(
                dir,
                format!("{}.log", sanitize_name(config.app_name)),
            );
            let (writer, guard) = tracing_appender::non_blocking(appender);
            file_guard = Some(guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_filter(file_filter),
            )
        }
        Err(err) => {
            eprintln!("Warning: file logging disabled: {:#}", err);
            None
        }
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(LogGuard { _file: file_guard })
}

/// Get the h2bridge home directory: ~/.h2bridge
pub fn h2bridge_home() -> PathBuf {
    resolve_home(std::env::var_os(HOME_ENV), dirs::home_dir())
}

fn resolve_home(override_path: Option<OsString>, user_home: Option<PathBuf>) -> PathBuf {
    if let Some(path) = override_path.filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    // No home directory (some CI sandboxes): fall back to the working directory.
    user_home
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".h2bridge")
}

/// Get the logs directory: ~/.h2bridge/logs
pub fn logs_dir() -> PathBuf {
    h2bridge_home().join("logs")
}

/// Get the default jar directory: ~/.h2bridge/jar
pub fn jar_dir() -> PathBuf {
    h2bridge_home().join("jar")
}

/// Ensure the logs directory exists.
pub fn ensure_logs_dir() -> Result<PathBuf> {
    let logs = logs_dir();
    fs::create_dir_all(&logs)
        .with_context(|| format!("Failed to create logs directory: {}", logs.display()))?;
    Ok(logs)
}

fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "h2bridge".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_home_override_wins() {
        let home = resolve_home(
            Some(OsString::from("/srv/h2")),
            Some(PathBuf::from("/home/alice")),
        );
        assert_eq!(home, PathBuf::from("/srv/h2"));
    }

    #[test]
    fn test_empty_override_is_ignored() {
        let home = resolve_home(Some(OsString::new()), Some(PathBuf::from("/home/alice")));
        assert_eq!(home, PathBuf::from("/home/alice/.h2bridge"));
    }

    #[test]
    fn test_missing_user_home_falls_back_to_cwd() {
        let home = resolve_home(None, None);
        assert_eq!(home, PathBuf::from("./.h2bridge"));
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("h2bridge"), "h2bridge");
        assert_eq!(sanitize_name("h2 bridge/serve"), "h2_bridge_serve");
        assert_eq!(sanitize_name(""), "h2bridge");
    }
}
