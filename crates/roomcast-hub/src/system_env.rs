//! Production environment backed by system resources.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use roomcast_core::Environment;

/// [`Environment`] using the OS monotonic clock, wall clock, tokio timers,
/// and OS randomness.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a system environment.
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn wall_clock(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    // OS RNG failure means the platform is broken beyond anything we can
    // recover from here.
    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer).expect("OS random source unavailable");
    }
}
