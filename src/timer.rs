//! Monotonic time sources for the trial harness.
//!
//! The harness only ever needs "how long did this trial take", so clocks
//! expose a monotonic reading relative to an arbitrary origin. Keeping the
//! clock behind a trait lets tests script exact sample values.

use std::time::{Duration, Instant};

use crate::rusage::{CpuSnapshot, SeriesUsage};

/// Monotonic time source.
pub trait Clock {
    /// Time elapsed since this clock's origin. Never decreases.
    fn now(&self) -> Duration;

    /// Runs `f` and returns how long it took along with its result.
    #[inline]
    fn time<T>(&self, f: impl FnOnce() -> T) -> (Duration, T) {
        let start = self.now();
        let out = f();
        (self.now().saturating_sub(start), out)
    }
}

/// `Instant`-backed clock (`clock_gettime(CLOCK_MONOTONIC)` on Linux,
/// `mach_absolute_time` on macOS, `QueryPerformanceCounter` on Windows).
#[derive(Clone, Copy, Debug)]
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
    #[inline]
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Wall time plus process CPU usage between two points.
#[derive(Debug)]
pub struct Stopwatch {
    start: Instant,
    cpu_start: CpuSnapshot,
}

impl Stopwatch {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
            cpu_start: CpuSnapshot::now(),
        }
    }

    /// Usage of the process since `start`, wall time included.
    pub fn stop(&self) -> SeriesUsage {
        let wall = self.start.elapsed();
        SeriesUsage::between(&self.cpu_start, &CpuSnapshot::now(), wall)
    }
}
