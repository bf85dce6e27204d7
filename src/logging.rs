//! Logging infrastructure for Mesa
//!
//! Structured logging via tracing, filterable through `RUST_LOG`.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. Safe to call only
/// once per process; embedders that install their own subscriber should skip
/// this.
pub fn init(log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("mesa={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
