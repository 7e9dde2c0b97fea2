//! Process-unique nonce generation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of unique, unpredictable nonce strings.
///
/// A 64-bit counter is seeded lazily on first use from the system CSPRNG
/// mixed with the wall clock, then advanced by an atomic increment on every
/// call. Uniqueness within the lifetime of the source rests entirely on the
/// atomicity of that increment; no locks are taken, and the counter is never
/// reset or persisted. Construct one instance and inject it wherever nonces
/// are needed; independent instances (e.g. in tests) do not share state.
#[derive(Debug, Default)]
pub struct NonceSource {
    counter: AtomicU64,
}

impl NonceSource {
    /// Create a source whose counter is seeded on first use.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
        }
    }

    /// Return a nonce this source has never produced before, rendered as
    /// lowercase base-16.
    pub fn next(&self) -> String {
        let mut n = self.counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        if n == 1 {
            // First caller mixes fresh randomness with the clock so restarts
            // never repeat even if the random source degrades, then publishes
            // the seed for later increments to continue from. A lost race
            // here still hands every caller a distinct value.
            let seed = rand::random::<u64>() ^ clock_nanos();
            let _ = self
                .counter
                .compare_exchange(1, seed, Ordering::Relaxed, Ordering::Relaxed);
            n = seed;
        }
        format!("{n:x}")
    }
}

/// Nanoseconds since the Unix epoch, truncated to 64 bits.
fn clock_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
}
