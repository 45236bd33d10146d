//! Environment abstraction for time and randomness.
//!
//! The hub never calls `Instant::now()`, `Utc::now()`, or an OS RNG
//! directly. Everything ambient comes through [`Environment`], so tests can
//! substitute a virtual clock and a seeded RNG and replay heartbeat timeouts
//! deterministically.

use std::{ops::Sub, time::Duration};

use chrono::{DateTime, Utc};

/// Ambient resources the hub depends on.
///
/// Production uses the system clock and OS randomness; tests use a virtual
/// clock that only moves when advanced and a seeded deterministic RNG.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Monotonic instant type. Subtracting two instants yields the elapsed
    /// duration between them.
    type Instant: Copy + Ord + Send + Sync + Sub<Output = Duration>;

    /// Current monotonic time, used for liveness bookkeeping.
    fn now(&self) -> Self::Instant;

    /// Current wall-clock time, used for envelope timestamps. Not suitable
    /// for measuring elapsed time; use [`Environment::now`] for that.
    fn wall_clock(&self) -> DateTime<Utc>;

    /// Sleep for the given duration. Virtual environments resolve this
    /// against their own clock rather than real time.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;

    /// Fill `buffer` with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);
}
