//! Repeated timed trials and their reduction to bandwidth figures.
//!
//! Trial 0 warms caches, TLBs and page tables and is never reported. The
//! remaining samples are reduced to best (minimum time) and average
//! bandwidth:
//!
//! ```text
//! best_mbps = bytes_per_trial / min_time / 1e6
//! avg_mbps  = bytes_per_trial / avg_time / 1e6
//! ```
//!
//! Durations are floored at one nanosecond so a trial that the clock could
//! not resolve yields a large finite figure instead of infinity.

use std::hint::black_box;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::kernel;
use crate::pattern::{KernelSpec, Workload};
use crate::pool::WorkerPool;
use crate::rusage::SeriesUsage;
use crate::timer::{Clock, MonotonicClock, Stopwatch};
use crate::working_set::WorkingSet;

/// Trials per kernel when the operator does not ask for a count.
pub const DEFAULT_TRIALS: usize = 20;
/// Warm-up plus at least one measured sample.
pub const MIN_TRIALS: usize = 2;

const MIN_SECONDS: f64 = 1e-9;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum HarnessError {
    #[error("at least 2 trials are required (got {0})")]
    TooFewTrials(usize),
}

/// Ordered trial durations. Index 0 is the warm-up.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrialSeries {
    samples: Vec<Duration>,
}

impl TrialSeries {
    pub fn with_capacity(trials: usize) -> Self {
        Self {
            samples: Vec::with_capacity(trials),
        }
    }

    pub fn push(&mut self, sample: Duration) {
        self.samples.push(sample);
    }

    pub fn samples(&self) -> &[Duration] {
        &self.samples
    }

    /// Samples that count toward statistics (all but the warm-up).
    pub fn measured(&self) -> &[Duration] {
        self.samples.get(1..).unwrap_or(&[])
    }

    /// Reduces the measured samples. Fails unless there is a warm-up and at
    /// least one measured sample.
    pub fn summarize(&self, bytes_per_trial: u64) -> Result<TrialSummary, HarnessError> {
        let measured = self.measured();
        if measured.is_empty() {
            return Err(HarnessError::TooFewTrials(self.samples.len()));
        }

        let secs = |d: &Duration| d.as_secs_f64().max(MIN_SECONDS);
        let min_time = measured.iter().map(secs).fold(f64::INFINITY, f64::min);
        let max_time = measured.iter().map(secs).fold(0.0, f64::max);
        let avg_time = measured.iter().map(secs).sum::<f64>() / measured.len() as f64;
        let bytes = bytes_per_trial as f64;

        Ok(TrialSummary {
            best_mbps: bytes / min_time / 1e6,
            avg_mbps: bytes / avg_time / 1e6,
            min_time,
            max_time,
            avg_time,
            bytes_per_trial,
            measured: measured.len(),
        })
    }
}

/// Statistics over the measured trials. Times are in seconds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TrialSummary {
    pub best_mbps: f64,
    pub avg_mbps: f64,
    pub min_time: f64,
    pub max_time: f64,
    pub avg_time: f64,
    pub bytes_per_trial: u64,
    pub measured: usize,
}

/// One repeatable unit of timed work.
pub trait Trial {
    /// Bytes moved by a single `run`.
    fn bytes_per_trial(&self) -> u64;

    /// Executes once and returns a witness value derived from the data.
    fn run(&mut self) -> f64;
}

/// A kernel bound to its pool and working set.
pub struct KernelTrial<'a> {
    pool: &'a WorkerPool,
    ws: &'a mut WorkingSet,
    workload: Workload,
}

impl<'a> KernelTrial<'a> {
    pub fn new(pool: &'a WorkerPool, ws: &'a mut WorkingSet, workload: Workload) -> Self {
        Self { pool, ws, workload }
    }
}

impl Trial for KernelTrial<'_> {
    fn bytes_per_trial(&self) -> u64 {
        self.workload.bytes_per_element() * self.ws.len() as u64
    }

    fn run(&mut self) -> f64 {
        kernel::run(self.pool, self.ws, &self.workload)
    }
}

/// Result of measuring one kernel.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Measurement {
    pub summary: TrialSummary,
    /// Sum of all trial witnesses.
    pub witness: f64,
    /// CPU time, utilisation and peak RSS over the whole series.
    pub usage: SeriesUsage,
    #[serde(skip)]
    pub series: TrialSeries,
}

/// Runs `trial` `trials` times, timing each run with `clock`.
pub fn measure_with<C: Clock, T: Trial + ?Sized>(
    clock: &C,
    trial: &mut T,
    trials: usize,
) -> Result<Measurement, HarnessError> {
    if trials < MIN_TRIALS {
        return Err(HarnessError::TooFewTrials(trials));
    }

    let bytes = trial.bytes_per_trial();
    let mut series = TrialSeries::with_capacity(trials);
    let mut witness = 0.0;
    let stopwatch = Stopwatch::start();

    for _ in 0..trials {
        let (elapsed, w) = clock.time(|| trial.run());
        series.push(elapsed);
        witness += w;
    }

    let usage = stopwatch.stop();
    let witness = black_box(witness);
    if witness < 0.0 {
        log::warn!("witness sentinel tripped: {witness}");
    }

    let summary = series.summarize(bytes)?;
    let warmup = series.samples().first().copied().unwrap_or_default();
    log::debug!(
        "{} trials: best {:.1} MB/s, avg {:.1} MB/s, min {:.6}s, warm-up {:.6}s",
        trials,
        summary.best_mbps,
        summary.avg_mbps,
        summary.min_time,
        warmup.as_secs_f64()
    );

    Ok(Measurement {
        summary,
        witness,
        usage,
        series,
    })
}

/// Measures `spec` on the monotonic clock.
pub fn measure(
    pool: &WorkerPool,
    ws: &mut WorkingSet,
    spec: &KernelSpec,
    trials: usize,
) -> Result<Measurement, HarnessError> {
    let clock = MonotonicClock::new();
    let mut trial = KernelTrial::new(pool, ws, spec.workload);
    measure_with(&clock, &mut trial, trials)
}
