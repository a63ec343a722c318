//! Platform primitives for the ember networking engine.
//!
//! - [`bytes`]: byte-range equality, ordering, copy and fill, with a fast
//!   bulk path and a portable fallback chosen once per process
//! - [`platform`]: once-computed host capability flags
//! - [`queue`]: non-blocking MPSC/SPSC queues that feed the event loop
//! - [`entropy`]: per-thread random numbers for jitter and backoff

pub mod bytes;
pub mod entropy;
pub mod platform;
pub mod queue;

mod trace;

pub use platform::{PlatformCapabilities, PlatformConfig};
pub use trace::init_tracing;
