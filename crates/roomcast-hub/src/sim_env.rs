//! Deterministic environment for tests and simulations.
//!
//! Time only moves when the test advances it, and randomness comes from a
//! seeded RNG, so heartbeat-timeout scenarios replay identically from a
//! seed. Lives in the library (not behind `cfg(test)`) so integration tests
//! and downstream harnesses can use it.

use std::{
    ops::Sub,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use chrono::{DateTime, TimeDelta, Utc};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use roomcast_core::Environment;

/// Instant on the simulated clock: an offset from simulation start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SimInstant(Duration);

impl SimInstant {
    /// Instant at the given offset from simulation start.
    pub fn from_offset(offset: Duration) -> Self {
        Self(offset)
    }
}

impl Sub for SimInstant {
    type Output = Duration;

    // Saturating: a monotone clock never yields a negative elapsed time.
    fn sub(self, rhs: Self) -> Duration {
        self.0.saturating_sub(rhs.0)
    }
}

#[derive(Debug)]
struct SimState {
    elapsed: Duration,
    rng: ChaCha8Rng,
}

/// [`Environment`] with a virtual clock and seeded randomness.
///
/// Clones share one clock and one RNG, mirroring how every component of a
/// real process shares the system clock.
#[derive(Debug, Clone)]
pub struct SimEnv {
    state: Arc<Mutex<SimState>>,
}

impl SimEnv {
    /// Create a simulated environment from an RNG seed.
    pub fn new(seed: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                elapsed: Duration::ZERO,
                rng: ChaCha8Rng::seed_from_u64(seed),
            })),
        }
    }

    /// Move the virtual clock forward.
    pub fn advance(&self, duration: Duration) {
        self.lock().elapsed += duration;
    }

    /// Virtual time since simulation start.
    pub fn elapsed(&self) -> Duration {
        self.lock().elapsed
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimState> {
        // A panic mid-advance cannot leave the clock in a torn state, so a
        // poisoned lock is still usable.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Environment for SimEnv {
    type Instant = SimInstant;

    fn now(&self) -> SimInstant {
        SimInstant(self.lock().elapsed)
    }

    fn wall_clock(&self) -> DateTime<Utc> {
        let elapsed = self.lock().elapsed;
        let millis = i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX);
        DateTime::UNIX_EPOCH + TimeDelta::milliseconds(millis)
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        // Virtual sleep completes immediately and advances the clock, which
        // is what a deterministic driver wants from a timer.
        self.advance(duration);
        std::future::ready(())
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        self.lock().rng.fill_bytes(buffer);
    }
}
