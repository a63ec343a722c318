//! Logging for the few one-off events ember has.
//!
//! Capability detection logs the resolved flags and any probe failure at
//! `debug`, a malformed boolean in the environment at `warn`, and the queue
//! factory logs its discipline choice at `trace` (widening to `debug`).
//! Push, pop and the byte operations never log.
//!
//! Without `--features tracing` the macros expand to nothing.

/// Installs a subscriber that prints ember's events with uptime and thread.
///
/// Filter defaults to `ember=trace`; `RUST_LOG` overrides it. Safe to call
/// from several tests, only the first call installs anything.
#[cfg(feature = "tracing")]
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ember=trace"));

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_names(true)
                .with_timer(fmt::time::uptime()),
        )
        .with(filter)
        .try_init();
}

/// No-op without the `tracing` feature.
#[cfg(not(feature = "tracing"))]
pub const fn init_tracing() {}

#[cfg(feature = "tracing")]
pub(crate) use tracing::{debug, trace, warn};

#[cfg(not(feature = "tracing"))]
macro_rules! discard {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
pub(crate) use discard as debug;
#[cfg(not(feature = "tracing"))]
pub(crate) use discard as trace;
#[cfg(not(feature = "tracing"))]
pub(crate) use discard as warn;
