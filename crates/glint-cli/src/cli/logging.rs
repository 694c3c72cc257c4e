//! Log subscriber setup.
//!
//! `GLINT_LOG` wins over the configured level. Logs go to stderr unless a log
//! directory is given, in which case they go to a daily rolling file.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use glint_core::config::LogConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "GLINT_LOG";

/// Installs the global subscriber.
///
/// The returned guard flushes the file writer on drop and must be held for
/// the life of the process.
///
/// # Errors
/// Returns an error if the filter is invalid, the log directory cannot be
/// created, or a subscriber is already installed.
pub fn init(config: &LogConfig, dir_override: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = match std::env::var(LOG_ENV) {
        Ok(directives) => EnvFilter::try_new(&directives)
            .with_context(|| format!("invalid {LOG_ENV} filter: {directives}"))?,
        Err(_) => EnvFilter::try_new(&config.level)
            .with_context(|| format!("invalid log level in config: {}", config.level))?,
    };

    let Some(dir) = dir_override.or(config.file.as_deref()) else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| anyhow!("install log subscriber: {e}"))?;
        return Ok(None);
    };

    fs::create_dir_all(dir)
        .with_context(|| format!("create log directory {}", dir.display()))?;
    let appender = tracing_appender::rolling::daily(dir, "glint.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow!("install log subscriber: {e}"))?;

    Ok(Some(guard))
}
