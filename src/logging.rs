use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Environment variable holding the log filter, e.g. `OATRACK_LOG=oatrack=debug`
pub const LOG_ENV: &str = "OATRACK_LOG";

const LOG_FILE: &str = "oatrack.log";

/// Default log directory: `$XDG_DATA_HOME/oatrack/logs`
pub fn default_log_dir() -> Option<PathBuf> {
  dirs::data_dir().map(|d| d.join("oatrack").join("logs"))
}

/// Build the filter from `OATRACK_LOG`, defaulting to `info`.
fn env_filter() -> EnvFilter {
  EnvFilter::builder()
    .with_env_var(LOG_ENV)
    .with_default_directive(LevelFilter::INFO.into())
    .from_env_lossy()
}

/// Send logs to a daily-rolled file under `log_dir`.
///
/// The terminal belongs to the UI, so nothing is written to stdout. Keep the
/// returned guard alive until exit or buffered lines are lost.
pub fn init(log_dir: &Path) -> Result<WorkerGuard> {
  std::fs::create_dir_all(log_dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", log_dir.display(), e))?;

  let file_appender = rolling::daily(log_dir, LOG_FILE);
  let (writer, guard) = tracing_appender::non_blocking(file_appender);

  let file_layer = tracing_subscriber::fmt::layer()
    .with_writer(writer)
    .with_ansi(false)
    .with_target(true)
    .with_filter(env_filter());

  tracing_subscriber::registry()
    .with(file_layer)
    .try_init()
    .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

  Ok(guard)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_default_log_dir_is_under_app_dir() {
    if let Some(dir) = default_log_dir() {
      assert!(dir.ends_with("oatrack/logs"));
    }
  }

  #[test]
  fn test_init_creates_log_dir() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("nested").join("logs");

    // A global subscriber may already be set by another test; the directory
    // is created either way.
    let _ = init(&dir);
    assert!(dir.is_dir());
  }
}
