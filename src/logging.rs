//! Observability (C12): one `tracing-subscriber` initializer shared by
//! the binary and its integration tests.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, for a terminal.
    Pretty,
    /// One JSON object per line, for log aggregation.
    Json,
}

/// Install a global `tracing` subscriber honoring `RUST_LOG` (defaulting
/// to `info` when unset), in either pretty or JSON form. Safe to call
/// once per process; a second call is a silent no-op rather than a
/// panic, so tests can call it freely.
pub fn init(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = Registry::default().with(filter);

    let installed = match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer().with_target(false)).try_init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json().with_target(false)).try_init(),
    };
    let _ = installed;
}
