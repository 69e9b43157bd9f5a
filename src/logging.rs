//! Tracing setup for hosts embedding the library.
//!
//! Console plus a timestamped log file. `RUST_LOG` overrides the default
//! filter.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, EnvFilter};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "luckypillar_state=info";

/// Install the global subscriber. Keep the guard alive for as long as
/// file logging should continue.
pub fn init(log_dir: impl AsRef<Path>) -> Result<WorkerGuard, TryInitError> {
    let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S").to_string();
    let log_filename = format!("luckypillar.{}.log", timestamp);

    let file_appender = tracing_appender::rolling::never(log_dir, log_filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let file_layer = fmt::Layer::default()
        .with_target(true)
        .with_ansi(false)
        .with_writer(non_blocking);

    let console_layer = fmt::Layer::default().with_target(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()?;

    Ok(guard)
}
