//! The three benchmark arrays and their NUMA-aware initialization.
//!
//! # Invariants
//! - A, B and C have the same length and the same alignment.
//! - After construction or [`WorkingSet::reset`], A = 1.0, B = 2.0, C = 0.0.
//! - Initialization writes each element from the worker that owns it under
//!   [`static_partition`](crate::pool::static_partition), the same ownership
//!   the kernels use.

use std::ops::Range;

use crate::aligned::{AlignedBuffer, AllocError};
use crate::pool::WorkerPool;

/// Initial values of A, B and C.
pub const INITIAL_VALUES: [f64; 3] = [1.0, 2.0, 0.0];

/// Working set of three equally sized, equally aligned `f64` arrays.
#[derive(Debug)]
#[allow(clippy::len_without_is_empty)] // construction rejects zero length
pub struct WorkingSet {
    arrays: [AlignedBuffer; 3],
    len: usize,
}

impl WorkingSet {
    /// Allocates three arrays of `len` elements and first-touch initializes
    /// them on `pool`.
    ///
    /// If any allocation fails, buffers already obtained are released before
    /// the error is returned.
    pub fn allocate(len: usize, align: usize, pool: &WorkerPool) -> Result<Self, AllocError> {
        // SAFETY: every element is written by `reset` below before any
        // accessor can read it.
        let arrays = unsafe {
            [
                AlignedBuffer::uninit(len, align)?,
                AlignedBuffer::uninit(len, align)?,
                AlignedBuffer::uninit(len, align)?,
            ]
        };
        let mut ws = Self { arrays, len };
        ws.reset(pool);
        log::info!(
            "allocated 3 x {} elements ({} bytes each, aligned to {})",
            len,
            ws.arrays[0].size_bytes(),
            ws.arrays[0].align()
        );
        Ok(ws)
    }

    /// Builds a working set from explicit contents.
    ///
    /// # Panics
    /// Panics if the three slices differ in length.
    pub fn from_arrays(a: &[f64], b: &[f64], c: &[f64], align: usize) -> Result<Self, AllocError> {
        assert!(
            a.len() == b.len() && b.len() == c.len(),
            "working-set arrays must have equal length"
        );
        let arrays = [
            AlignedBuffer::from_slice(a, align)?,
            AlignedBuffer::from_slice(b, align)?,
            AlignedBuffer::from_slice(c, align)?,
        ];
        Ok(Self { arrays, len: a.len() })
    }

    /// Restores the initial values, partitioned across `pool`.
    pub fn reset(&mut self, pool: &WorkerPool) {
        let shared = self.shared();
        pool.run_partitioned(self.len, |_, range| {
            // SAFETY: ranges handed out by `run_partitioned` are disjoint and
            // in bounds, and `&mut self` is held for the whole region.
            unsafe { shared.fill_range(range, INITIAL_VALUES) };
        });
    }

    /// Elements per array.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn align(&self) -> usize {
        self.arrays[0].align()
    }

    #[inline]
    pub fn a(&self) -> &[f64] {
        self.arrays[0].as_slice()
    }

    #[inline]
    pub fn b(&self) -> &[f64] {
        self.arrays[1].as_slice()
    }

    #[inline]
    pub fn c(&self) -> &[f64] {
        self.arrays[2].as_slice()
    }

    /// Array `index` (0 = A, 1 = B, 2 = C).
    #[inline]
    pub fn array(&self, index: usize) -> &[f64] {
        self.arrays[index].as_slice()
    }

    /// Raw view for handing disjoint chunks to workers.
    pub(crate) fn shared(&mut self) -> SharedArrays {
        SharedArrays {
            ptrs: [
                self.arrays[0].as_mut_ptr(),
                self.arrays[1].as_mut_ptr(),
                self.arrays[2].as_mut_ptr(),
            ],
            len: self.len,
        }
    }
}

/// Copyable raw handle to the three arrays, shared with worker threads.
///
/// Only valid while the `&mut WorkingSet` it came from is held. Each worker
/// must confine itself to its own partition.
#[derive(Clone, Copy)]
pub(crate) struct SharedArrays {
    ptrs: [*mut f64; 3],
    len: usize,
}

// SAFETY: the handle is only dereferenced over disjoint ranges, one per
// worker, while the owning `&mut WorkingSet` borrow is live.
unsafe impl Send for SharedArrays {}
unsafe impl Sync for SharedArrays {}

impl SharedArrays {
    /// Mutable views of `range` in A, B and C.
    ///
    /// # Safety
    /// `range` must be in bounds and no other live reference may overlap it.
    #[inline]
    pub(crate) unsafe fn chunk(&self, range: Range<usize>) -> [&mut [f64]; 3] {
        debug_assert!(range.start <= range.end && range.end <= self.len);
        let n = range.end - range.start;
        // SAFETY: forwarded to the caller.
        self.ptrs
            .map(|p| unsafe { std::slice::from_raw_parts_mut(p.add(range.start), n) })
    }

    /// Writes `values[k]` into every element of `range` in array `k` without
    /// reading the old contents.
    ///
    /// # Safety
    /// Same contract as [`SharedArrays::chunk`]; the memory may be
    /// uninitialized.
    unsafe fn fill_range(&self, range: Range<usize>, values: [f64; 3]) {
        debug_assert!(range.end <= self.len);
        for (ptr, value) in self.ptrs.iter().zip(values) {
            for i in range.clone() {
                // SAFETY: in bounds per the caller; `write` never reads.
                unsafe { ptr.add(i).write(value) };
            }
        }
    }
}
