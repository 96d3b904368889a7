//! Tracing setup for the binaries.
//!
//! Compact lines go to stderr. Plain lines go to the run log, which the
//! dashboard activity feed parses back, so its timestamp format must stay in
//! step with [`w2g_results::TIMESTAMP_FORMAT`].
use std::fs;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use w2g_core::config::LoggingConfig;
use w2g_results::TIMESTAMP_FORMAT;

/// Installs the global subscriber. `RUST_LOG` overrides the configured filter.
///
/// Keep the returned guard alive for the life of the process or buffered file
/// lines are lost.
pub fn init(cfg: &LoggingConfig) -> anyhow::Result<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.filter));

    fs::create_dir_all(&cfg.dir)?;
    let appender = tracing_appender::rolling::never(&cfg.dir, &cfg.file);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);
    let timer = ChronoLocal::new(TIMESTAMP_FORMAT.to_string());

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_timer(timer.clone())
                .compact(),
        )
        .with(
            fmt::layer()
                .with_writer(file_writer)
                .with_timer(timer)
                .with_ansi(false)
                .with_target(false),
        )
        .try_init()?;

    Ok(guard)
}
