//! Clock abstraction for deterministic testing.
//!
//! Production code uses `SystemClock` (monotonic, milliseconds since the
//! clock was created). Tests use `TestClock` with manual advancement.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Monotonic millisecond time source.
pub trait Clock: Send + Sync {
    /// Milliseconds since this clock's origin.
    fn now_ms(&self) -> u64;
}

/// Real monotonic time.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Manually advanced clock.
#[derive(Debug, Default)]
pub struct TestClock {
    ms: AtomicU64,
}

impl TestClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start at a given time.
    pub fn starting_at(ms: u64) -> Self {
        Self {
            ms: AtomicU64::new(ms),
        }
    }

    pub fn advance(&self, duration: Duration) {
        self.ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn set_ms(&self, ms: u64) {
        self.ms.store(ms, Ordering::Relaxed);
    }
}

impl Clock for TestClock {
    fn now_ms(&self) -> u64 {
        self.ms.load(Ordering::Relaxed)
    }
}
