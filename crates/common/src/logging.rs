//! Logging initialisation for Polity binaries

use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::config::ensure_directory;
use crate::error::Error;
use crate::result::Result;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `log_level`. When `log_dir` is given a
/// daily-rolling `<name>.log` file is written next to the console output.
pub fn init_logging(log_level: &str, log_dir: Option<&Path>, name: &str) -> Result<()> {
    let env_filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level))
    };

    let console_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_filter(env_filter());

    let file_layer = match log_dir {
        Some(dir) => {
            ensure_directory(dir)?;
            let appender =
                RollingFileAppender::new(Rotation::DAILY, dir, format!("{}.log", name));
            Some(
                fmt::layer()
                    .with_target(true)
                    .with_ansi(false)
                    .with_writer(appender)
                    .with_filter(env_filter()),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::other(format!("Failed to initialize logging: {}", e)))?;

    Ok(())
}
