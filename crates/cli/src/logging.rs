//! Console plus daily-rolling file logging.

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `level` when set. Log lines go to stdout and to
/// `<dir>/<prefix>.log.<date>`. Keep the returned guard alive until exit so
/// buffered file output is flushed.
pub fn init(dir: &Path, prefix: &str, level: &str) -> Result<WorkerGuard> {
    std::fs::create_dir_all(dir).with_context(|| format!("cannot create log directory {}", dir.display()))?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid log level '{level}'"))?;

    let file_appender = tracing_appender::rolling::daily(dir, format!("{prefix}.log"));
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .try_init()
        .context("a global subscriber is already installed")?;

    Ok(guard)
}
