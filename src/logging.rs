use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOG_FILE: &str = "maverick.log";

/// Default filter for a `-v` count; `RUST_LOG` overrides it.
pub fn filter_for(verbosity: u8) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbosity {
            0 => "warn,maverick=info",
            1 => "info",
            2 => "debug",
            _ => "trace",
        })
    })
}

/// Initialize tracing into `<log_dir>/maverick.log`.
///
/// The terminal belongs to the TUI, so nothing is written to stdout/stderr.
/// Keep the returned guard alive until exit so buffered lines are flushed.
pub fn init(log_dir: &Path, verbosity: u8) -> Result<WorkerGuard> {
    fs::create_dir_all(log_dir).context("Failed to create log directory")?;

    let appender = tracing_appender::rolling::never(log_dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(filter_for(verbosity))
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;

    tracing::debug!(dir = %log_dir.display(), "Tracing initialized");
    Ok(guard)
}
