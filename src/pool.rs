//! Persistent worker pool with static, repeatable partitioning.
//!
//! # Purpose
//!
//! Bandwidth numbers are only meaningful if worker `i` touches the same
//! element range in every trial (and the same range it first-touched during
//! initialization, so its pages live on its NUMA node). The pool therefore
//! runs each parallel region as a broadcast: every worker executes the body
//! exactly once with its fixed index, and the call returns only after all of
//! them finished.
//!
//! # Partitioning
//!
//! `static_partition(len, parts, i)` splits `0..len` into `parts` contiguous
//! chunks. The first `len % parts` chunks get one extra element. Chunks are
//! disjoint, cover the range, and may be empty when `parts > len`.
//!
//! # Lifecycle
//!
//! Threads are spawned once in [`WorkerPool::new`] and reused for every
//! region until the pool is dropped.

use std::ops::Range;

use thiserror::Error;

/// Hard ceiling on requested worker count.
pub const MAX_THREADS: usize = 1024;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PoolError {
    #[error("num_threads must be between 1 and 1024 (got {0})")]
    InvalidThreadCount(usize),
    #[error("failed to spawn worker threads: {0}")]
    Spawn(#[from] rayon::ThreadPoolBuildError),
}

/// Fixed-size set of worker threads.
#[derive(Debug)]
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    threads: usize,
}

impl WorkerPool {
    /// Spawns `threads` workers named `ultramem-worker-{i}`.
    pub fn new(threads: usize) -> Result<Self, PoolError> {
        if !(1..=MAX_THREADS).contains(&threads) {
            return Err(PoolError::InvalidThreadCount(threads));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("ultramem-worker-{i}"))
            .build()?;
        log::debug!("worker pool started with {threads} threads");
        Ok(Self { pool, threads })
    }

    #[inline]
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Runs `f(worker, range)` once on every worker over its static chunk of
    /// `0..len` and returns the per-worker results in worker order.
    ///
    /// Returns after every worker has finished (implicit barrier).
    pub fn run_partitioned<R, F>(&self, len: usize, f: F) -> Vec<R>
    where
        R: Send,
        F: Fn(usize, Range<usize>) -> R + Sync,
    {
        let parts = self.threads;
        self.pool.broadcast(|ctx| {
            let worker = ctx.index();
            f(worker, static_partition(len, parts, worker))
        })
    }
}

/// Chunk of `0..len` owned by `index` when split into `parts` pieces.
///
/// Returns an empty range for `parts == 0` or `index >= parts`.
pub fn static_partition(len: usize, parts: usize, index: usize) -> Range<usize> {
    if parts == 0 || index >= parts {
        return len..len;
    }
    let base = len / parts;
    let extra = len % parts;
    let start = index * base + index.min(extra);
    let size = base + usize::from(index < extra);
    start..start + size
}
