//! File-based logging for the core.
//!
//! Opt-in: the host application calls [`init_logging`] once at startup and
//! keeps the returned guards alive so buffered log lines are flushed on exit.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::shared::paths::get_log_dir;

/// Guards that must be kept alive to ensure logs are flushed.
pub struct LoggingGuards {
    _guards: Vec<WorkerGuard>,
}

/// Initialize the logging system with a daily-rolling file in the app log
/// directory. `RUST_LOG` controls the filter, defaulting to `info`.
pub fn init_logging() -> std::io::Result<LoggingGuards> {
    let log_dir = get_log_dir();
    if !log_dir.exists() {
        std::fs::create_dir_all(&log_dir)?;
    }

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "atelier.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::registry().with(env_filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true),
    );

    // A host may initialize its own subscriber first; that is not an error
    // worth aborting startup for.
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::warn!(target: "system", "Global tracing subscriber already set");
    } else {
        tracing::info!(target: "system", "Logging initialized at {:?}", log_dir);
    }

    Ok(LoggingGuards {
        _guards: vec![guard],
    })
}
