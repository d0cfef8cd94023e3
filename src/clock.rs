//! Clock abstraction for the step scheduler
//!
//! The scheduler never reads wall time directly; it asks a [`Clock`].
//! Production uses the monotonic clock, tests use [`ManualClock`] and feed
//! synthetic deltas.

use std::time::Instant;

/// Monotonic time source, milliseconds since an arbitrary origin
pub trait Clock {
    fn now_ms(&mut self) -> f64;
}

/// Wall-clock implementation backed by `Instant`
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&mut self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Test clock advanced by hand
#[derive(Debug, Default)]
pub struct ManualClock {
    now: f64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self { now: 0.0 }
    }

    pub fn advance(&mut self, delta_ms: f64) {
        self.now += delta_ms;
    }

    pub fn set(&mut self, now_ms: f64) {
        self.now = now_ms;
    }
}

impl Clock for ManualClock {
    fn now_ms(&mut self) -> f64 {
        self.now
    }
}
