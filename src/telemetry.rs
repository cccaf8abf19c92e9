//! Tracing bootstrap for binaries and tests.
//!
//! The library itself only emits `tracing` events; installing a subscriber
//! is the embedder's call. `init()` wires the usual stack: env-filtered fmt
//! output plus an [`ErrorLayer`] so span traces attach to diagnostics.

use tracing_error::ErrorLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Install the default subscriber: `RUST_LOG`-driven filtering (falling
/// back to `info`), compact fmt output, and span-trace capture.
///
/// Safe to call more than once; only the first call installs anything.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .with(ErrorLayer::default())
        .try_init();
}
