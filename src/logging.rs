//! File logging. The terminal belongs to the UI, so every log line goes to
//! a daily rolling file instead.

use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogLevel;

/// Filter directive read before the configured level
pub const LOG_ENV: &str = "EXDASH_LOG";

const LOG_FILE_PREFIX: &str = "exdash.log";

/// Default log directory: `$XDG_DATA_HOME/exdash/logs`
pub fn default_log_dir() -> Result<PathBuf> {
  dirs::data_dir()
    .map(|dir| dir.join("exdash").join("logs"))
    .ok_or_else(|| eyre!("Could not determine data directory"))
}

/// Build the filter: `EXDASH_LOG` wins, otherwise the configured level for
/// this crate and warnings for everything else.
pub fn filter(level: LogLevel) -> EnvFilter {
  EnvFilter::try_from_env(LOG_ENV)
    .unwrap_or_else(|_| EnvFilter::new(format!("exdash={},warn", level.as_str())))
}

/// Install the global subscriber. Keep the returned guard alive until
/// exit or buffered lines are lost.
pub fn init(dir: &Path, level: LogLevel) -> Result<WorkerGuard> {
  std::fs::create_dir_all(dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

  let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
  let (writer, guard) = tracing_appender::non_blocking(appender);

  tracing_subscriber::registry()
    .with(filter(level))
    .with(
      tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true),
    )
    .try_init()
    .map_err(|e| eyre!("Failed to init logging: {}", e))?;

  Ok(guard)
}
