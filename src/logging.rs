use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding the log filter, e.g. `HRDESK_LOG=hrdesk=debug`.
const LOG_ENV: &str = "HRDESK_LOG";

/// Initialize file logging.
///
/// The terminal belongs to the UI, so logs go to a daily rolling file in the
/// data directory. Keep the returned guard alive until exit, dropping it
/// flushes buffered lines.
pub fn init_tracing() -> Result<WorkerGuard> {
  let dir = log_dir()?;
  std::fs::create_dir_all(&dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

  let appender = tracing_appender::rolling::daily(&dir, "hrdesk.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let env_filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

  fmt()
    .with_env_filter(env_filter)
    .with_writer(writer)
    .with_ansi(false)
    .with_target(false)
    .try_init()
    .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

  Ok(guard)
}

fn log_dir() -> Result<PathBuf> {
  let data_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| eyre!("Could not determine data directory"))?;

  Ok(data_dir.join("hrdesk").join("logs"))
}
