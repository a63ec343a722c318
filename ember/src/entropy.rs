//! Per-thread pseudo-random numbers for jitter and backoff.
//!
//! Each thread lazily gets its own [`SmallRng`]. Seeds come from a
//! process-wide counter started from the clock, so no two threads share a
//! stream and nothing is synchronized after the first call on a thread.
//! Not suitable for anything security-related.

use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};

/// Spacing between consecutive thread seeds (golden-ratio increment).
const SEED_STEP: u64 = 0x9E37_79B9_7F4A_7C15;

static NEXT_SEED: AtomicU64 = AtomicU64::new(0);

thread_local! {
    static RNG: RefCell<SmallRng> = RefCell::new(SmallRng::seed_from_u64(next_seed()));
}

fn next_seed() -> u64 {
    let step = NEXT_SEED.fetch_add(SEED_STEP, Ordering::Relaxed);
    let clock = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_nanos() as u64);
    clock ^ step
}

/// Runs `f` with the calling thread's generator.
///
/// # Panics
///
/// Panics if called re-entrantly from inside `f`.
pub fn with_rng<R>(f: impl FnOnce(&mut SmallRng) -> R) -> R {
    RNG.with(|rng| f(&mut rng.borrow_mut()))
}

#[must_use]
pub fn next_u32() -> u32 {
    with_rng(|rng| rng.next_u32())
}

#[must_use]
pub fn next_u64() -> u64 {
    with_rng(|rng| rng.next_u64())
}

/// Uniform value in `0..bound`. Returns 0 when `bound` is 0.
#[must_use]
pub fn below(bound: u64) -> u64 {
    if bound == 0 {
        return 0;
    }
    with_rng(|rng| rng.gen_range(0..bound))
}

/// Randomizes `base` by up to `spread` (a fraction, clamped to `0.0..=1.0`)
/// in either direction.
///
/// ```
/// use std::time::Duration;
///
/// let base = Duration::from_millis(100);
/// let d = ember::entropy::jitter(base, 0.2);
/// assert!(d >= Duration::from_millis(80) && d <= Duration::from_millis(120));
/// ```
#[must_use]
pub fn jitter(base: Duration, spread: f64) -> Duration {
    let spread = if spread.is_nan() { 0.0 } else { spread.clamp(0.0, 1.0) };
    if spread == 0.0 || base.is_zero() {
        return base;
    }
    let factor = with_rng(|rng| rng.gen_range(1.0 - spread..=1.0 + spread));
    base.mul_f64(factor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_below_stays_in_range() {
        for bound in [1u64, 2, 7, 1000] {
            for _ in 0..1000 {
                assert!(below(bound) < bound);
            }
        }
        assert_eq!(below(0), 0);
    }

    #[test]
    fn test_jitter_bounds() {
        let base = Duration::from_micros(1000);
        for _ in 0..1000 {
            let d = jitter(base, 0.5);
            assert!(d >= Duration::from_micros(500) && d <= Duration::from_micros(1500));
        }
        assert_eq!(jitter(base, 0.0), base);
        assert_eq!(jitter(base, f64::NAN), base);
        assert_eq!(jitter(Duration::ZERO, 0.5), Duration::ZERO);
    }

    #[test]
    fn test_threads_get_distinct_streams() {
        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(|| (0..4).map(|_| next_u64()).collect::<Vec<_>>()))
            .collect();
        let streams: HashSet<Vec<u64>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(streams.len(), 8);
    }

    #[test]
    fn test_same_thread_reuses_generator() {
        let a = next_u32();
        let b = next_u32();
        let c = next_u32();
        // Astronomically unlikely for a live generator.
        assert!(!(a == b && b == c));
    }
}
