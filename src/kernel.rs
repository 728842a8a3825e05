//! The bandwidth kernels.
//!
//! For a pattern `(reads, writes)` and every index `i` in the working set:
//!
//! ```text
//! acc = buf[0 % 3][i] + buf[1 % 3][i] + ... + buf[(reads - 1) % 3][i]
//! buf[w % 3][i] = acc / (w + 1)        for w in 0..writes
//! ```
//!
//! where `buf = [A, B, C]` and `acc` starts at 0.0. All reads of an index
//! happen before any write to it, and indices never depend on each other, so
//! the final buffer contents do not depend on the thread count.
//!
//! Read-only patterns (`writes == 0`) would otherwise be dead code, so every
//! `acc` is folded into a per-worker sum; the partial sums are added in
//! worker order and returned as the witness. Patterns with writes return 0.0.

use std::hint::black_box;

use crate::pattern::{AccessPattern, Workload};
use crate::pool::WorkerPool;
use crate::working_set::WorkingSet;

/// Runs `workload` once over the whole working set and returns its witness.
pub fn run(pool: &WorkerPool, ws: &mut WorkingSet, workload: &Workload) -> f64 {
    let len = ws.len();
    let shared = ws.shared();
    let partials = match *workload {
        Workload::Pattern(pattern) => pool.run_partitioned(len, |_, range| {
            // SAFETY: partitions are disjoint and in bounds, and `ws` is
            // mutably borrowed for the whole region.
            let mut bufs = unsafe { shared.chunk(range) };
            pattern_chunk(&mut bufs, pattern)
        }),
        Workload::BlockCopy => pool.run_partitioned(len, |_, range| {
            // SAFETY: as above.
            let [a, _, c] = unsafe { shared.chunk(range) };
            c.copy_from_slice(a);
            black_box(&*c);
            0.0
        }),
    };
    black_box(partials.into_iter().sum::<f64>())
}

/// Elements per block. The block's accumulators stay in L1 while every read
/// and write pass walks the block.
const BLOCK: usize = 512;

/// Applies `pattern` to one partition. Returns the partition's read sum for
/// read-only patterns, else 0.0.
///
/// The partition is walked in blocks of [`BLOCK`] elements. Within a block
/// each read is one pass adding a whole source slice into the accumulators
/// and each write is one pass storing `acc / (w + 1)`, so the slot choice
/// (`r % 3`, `w % 3`) is made once per pass and the inner loops are plain
/// zipped slices. Per-element arithmetic and its order match the scalar
/// law exactly.
pub fn pattern_chunk(bufs: &mut [&mut [f64]; 3], pattern: AccessPattern) -> f64 {
    let reads = pattern.reads() as usize;
    let writes = pattern.writes() as usize;
    let n = bufs[0].len();
    let mut acc_storage = [0.0f64; BLOCK];
    let mut sum = 0.0;

    let mut start = 0;
    while start < n {
        let end = (start + BLOCK).min(n);
        let acc = &mut acc_storage[..end - start];
        acc.fill(0.0);

        for r in 0..reads {
            for (a, &x) in acc.iter_mut().zip(&bufs[r % 3][start..end]) {
                *a += x;
            }
        }

        if writes == 0 {
            for &a in acc.iter() {
                sum += a;
            }
        } else {
            for w in 0..writes {
                let div = (w + 1) as f64;
                for (dst, &a) in bufs[w % 3][start..end].iter_mut().zip(acc.iter()) {
                    *dst = a / div;
                }
            }
        }
        start = end;
    }

    if writes == 0 {
        return black_box(sum);
    }
    black_box(&*bufs);
    0.0
}
