//! Tracing subscriber setup.
//!
//! Called once by the embedding process. Library code in this
//! workspace only ever emits `tracing` events; nothing here installs
//! itself implicitly.

use tracing_subscriber::{fmt, EnvFilter};

/// Initializes the global tracing subscriber.
///
/// The filter comes from `RUST_LOG` when set, otherwise from the
/// supplied directive (typically `BackofficeConfig::log_filter`).
/// Returns quietly if a subscriber is already installed, so tests can
/// call it freely.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
