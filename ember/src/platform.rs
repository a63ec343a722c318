//! Process-wide facts about host memory-access support.
//!
//! The facts are computed exactly once, either through an explicit
//! [`PlatformCapabilities::init`] at startup or lazily from the environment
//! on the first [`PlatformCapabilities::get`]. After that they are plain
//! immutable data readable from any thread.
//!
//! # Environment
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `EMBER_NO_PREFER_DIRECT` | Allocators should not prefer off-heap buffers |
//! | `EMBER_NO_FAST_PATH` | Force the portable byte-wise path in [`crate::bytes`] |
//!
//! Boolean values accept `true`/`yes`/`1`/empty and `false`/`no`/`0`,
//! case-insensitive. Anything else falls back to the default.

use std::sync::OnceLock;

use crossbeam_utils::CachePadded;

use crate::trace::{debug, warn};

/// Environment variable disabling the off-heap buffer preference.
pub const NO_PREFER_DIRECT_ENV: &str = "EMBER_NO_PREFER_DIRECT";

/// Environment variable forcing the portable byte path.
pub const NO_FAST_PATH_ENV: &str = "EMBER_NO_FAST_PATH";

static CAPABILITIES: OnceLock<PlatformCapabilities> = OnceLock::new();

/// Inputs to capability detection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlatformConfig {
    /// Disables the off-heap buffer preference reported to allocators.
    pub no_prefer_direct: bool,
    /// Skips the probe and reports no fast memory-view support.
    pub disable_fast_path: bool,
}

impl PlatformConfig {
    /// Reads the configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            no_prefer_direct: env_flag(NO_PREFER_DIRECT_ENV, false),
            disable_fast_path: env_flag(NO_FAST_PATH_ENV, false),
        }
    }
}

/// Error from [`PlatformCapabilities::init`].
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    /// Capabilities were already computed, by an earlier `init` or `get`.
    #[error("platform capabilities already initialized")]
    AlreadyInitialized(&'static PlatformCapabilities),
}

/// Immutable host capability flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformCapabilities {
    direct_buffer_preferred: bool,
    fast_memory_view_supported: bool,
}

impl PlatformCapabilities {
    /// Computes and stores the capabilities from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`InitError::AlreadyInitialized`] carrying the stored value if
    /// the capabilities were computed before. The stored value never changes.
    pub fn init(config: PlatformConfig) -> Result<&'static Self, InitError> {
        let mut fresh = false;
        let caps = CAPABILITIES.get_or_init(|| {
            fresh = true;
            Self::detect(config)
        });
        if fresh {
            Ok(caps)
        } else {
            Err(InitError::AlreadyInitialized(caps))
        }
    }

    /// Returns the process-wide capabilities, computing them from the
    /// environment if nothing has initialized them yet.
    #[inline]
    pub fn get() -> &'static Self {
        CAPABILITIES.get_or_init(|| Self::detect(PlatformConfig::from_env()))
    }

    /// Runs detection without storing the result.
    #[must_use]
    pub fn detect(config: PlatformConfig) -> Self {
        Self::detect_with(config, probe_fast_memory_view)
    }

    /// Detection with a caller-supplied memory-view probe.
    #[must_use]
    pub(crate) fn detect_with(config: PlatformConfig, probe: fn() -> bool) -> Self {
        let direct_buffer_preferred = !config.no_prefer_direct;
        debug!(no_prefer_direct = config.no_prefer_direct, "direct buffer preference");

        let fast_memory_view_supported = if config.disable_fast_path {
            debug!("fast memory path disabled by configuration");
            false
        } else {
            // A probe that panics must not take the process down with it.
            match std::panic::catch_unwind(probe) {
                Ok(supported) => supported,
                Err(_) => {
                    debug!("fast memory probe failed; using portable path");
                    false
                }
            }
        };
        debug!(fast_memory_view_supported, "memory view probe complete");

        Self {
            direct_buffer_preferred,
            fast_memory_view_supported,
        }
    }

    /// Whether allocators should prefer off-heap (direct) buffers. Advisory.
    #[inline]
    #[must_use]
    pub const fn direct_buffer_preferred(&self) -> bool {
        self.direct_buffer_preferred
    }

    /// Whether the host supports the unchecked bulk memory path.
    #[inline]
    #[must_use]
    pub const fn fast_memory_view_supported(&self) -> bool {
        self.fast_memory_view_supported
    }

    /// Cache line size assumed for padding hot atomics on this target.
    #[inline]
    #[must_use]
    pub const fn cache_line_size(&self) -> usize {
        std::mem::align_of::<CachePadded<u8>>()
    }
}

/// Checks that a sub-slice is a view into its parent rather than a copy.
fn probe_fast_memory_view() -> bool {
    let buf: [u8; 64] = std::array::from_fn(|i| i as u8);
    let view = &buf[8..40];
    std::ptr::eq(view.as_ptr(), buf.as_ptr().wrapping_add(8))
        && view.len() == 32
        && view.iter().zip(8u8..).all(|(&b, i)| b == i)
}

/// Reads a boolean environment variable, returning `default` when unset or
/// unparseable.
fn env_flag(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(value) => parse_flag(&value).unwrap_or_else(|| {
            warn!(name, value = %value, default, "unrecognized boolean value");
            default
        }),
        Err(_) => default,
    }
}

/// Parses a boolean flag. An empty value means "set".
fn parse_flag(value: &str) -> Option<bool> {
    let value = value.trim();
    if value.is_empty()
        || value.eq_ignore_ascii_case("true")
        || value.eq_ignore_ascii_case("yes")
        || value == "1"
    {
        Some(true)
    } else if value.eq_ignore_ascii_case("false")
        || value.eq_ignore_ascii_case("no")
        || value == "0"
    {
        Some(false)
    } else {
        None
    }
}
