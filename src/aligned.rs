//! Cache-line aligned `f64` storage for the working set.
//!
//! `Vec<f64>` only guarantees 8-byte alignment. Kernels want every array to
//! start on a cache-line boundary so that partitions never split a line
//! between the tail of one array and the head of the next, and so that SIMD
//! loads stay aligned.
//!
//! # Invariants
//! - `ptr` is non-null, aligned to `align`, and valid for `len` elements.
//! - The block is released through the same `Layout` it was obtained with.
//! - Allocation does not write to the block. Pages are touched for the
//!   first time by the working-set initializer, from the worker threads that
//!   will later run the kernels.

use std::alloc::{alloc, dealloc, Layout};
use std::mem::size_of;
use std::ptr::NonNull;

use thiserror::Error;

/// Alignment used when the detected line size is unusable.
pub const DEFAULT_ALIGN: usize = 64;

/// Errors from aligned allocation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum AllocError {
    /// Zero elements were requested.
    #[error("refusing to allocate an empty buffer")]
    ZeroLength,
    /// Size overflowed or the alignment is not a power of two.
    #[error("invalid layout: {len} f64 elements aligned to {align} bytes")]
    InvalidLayout { len: usize, align: usize },
    /// The allocator returned null.
    #[error("memory allocation failed: {bytes} bytes")]
    OutOfMemory { bytes: usize },
}

/// Heap block of `len` `f64` values aligned to `align` bytes.
pub struct AlignedBuffer {
    ptr: NonNull<f64>,
    len: usize,
    layout: Layout,
}

// SAFETY: the buffer exclusively owns its allocation; sharing follows the
// usual `&`/`&mut` rules through the accessors below.
unsafe impl Send for AlignedBuffer {}
unsafe impl Sync for AlignedBuffer {}

impl AlignedBuffer {
    /// Allocates `len` elements without initializing them.
    ///
    /// # Safety
    /// The contents are uninitialized. The caller must write every element
    /// (through [`AlignedBuffer::as_mut_ptr`]) before calling any accessor
    /// that reads.
    pub unsafe fn uninit(len: usize, align: usize) -> Result<Self, AllocError> {
        if len == 0 {
            return Err(AllocError::ZeroLength);
        }
        let align = align.max(std::mem::align_of::<f64>());
        let invalid = AllocError::InvalidLayout { len, align };
        let bytes = len.checked_mul(size_of::<f64>()).ok_or(invalid.clone())?;
        let layout = Layout::from_size_align(bytes, align).map_err(|_| invalid)?;

        // SAFETY: layout has non-zero size.
        let raw = unsafe { alloc(layout) };
        let ptr = NonNull::new(raw.cast::<f64>()).ok_or(AllocError::OutOfMemory { bytes })?;
        Ok(Self { ptr, len, layout })
    }

    /// Allocates and copies `values` into a fresh aligned block.
    pub fn from_slice(values: &[f64], align: usize) -> Result<Self, AllocError> {
        // SAFETY: every element is written below before the buffer is exposed.
        let buf = unsafe { Self::uninit(values.len(), align)? };
        // SAFETY: both regions are valid for `values.len()` elements and the
        // fresh allocation cannot overlap `values`.
        unsafe {
            std::ptr::copy_nonoverlapping(values.as_ptr(), buf.ptr.as_ptr(), values.len());
        }
        Ok(buf)
    }

    #[inline]
    pub fn align(&self) -> usize {
        self.layout.align()
    }

    #[inline]
    pub fn size_bytes(&self) -> usize {
        self.layout.size()
    }

    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut f64 {
        self.ptr.as_ptr()
    }

    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        // SAFETY: ptr is valid for len initialized elements (type invariant).
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for AlignedBuffer {
    fn drop(&mut self) {
        // SAFETY: ptr was returned by `alloc(self.layout)`.
        unsafe { dealloc(self.ptr.as_ptr().cast(), self.layout) };
    }
}

impl std::fmt::Debug for AlignedBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignedBuffer")
            .field("len", &self.len)
            .field("align", &self.layout.align())
            .finish()
    }
}

/// Alignment for working-set arrays given a detected cache line size.
///
/// Uses the line size when it is a power of two of at least
/// [`DEFAULT_ALIGN`] bytes (e.g. 128 on Apple Silicon), else the default.
pub fn alignment_for_line(line_bytes: u64) -> usize {
    match usize::try_from(line_bytes) {
        Ok(line) if line.is_power_of_two() && line >= DEFAULT_ALIGN && line <= 4096 => line,
        _ => DEFAULT_ALIGN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_slice_is_aligned_and_copied() {
        let values: Vec<f64> = (0..37).map(f64::from).collect();
        for align in [8, 64, 128, 4096] {
            let buf = AlignedBuffer::from_slice(&values, align).unwrap();
            assert_eq!(buf.as_slice().as_ptr() as usize % align, 0);
            assert_eq!(buf.as_slice(), values.as_slice());
            assert_eq!(buf.align(), align);
            assert_eq!(buf.size_bytes(), 37 * 8);
        }
    }

    #[test]
    fn rejects_empty_and_bad_alignment() {
        assert_eq!(
            AlignedBuffer::from_slice(&[], 64).unwrap_err(),
            AllocError::ZeroLength
        );
        assert!(matches!(
            AlignedBuffer::from_slice(&[1.0], 96),
            Err(AllocError::InvalidLayout { .. })
        ));
    }

    #[test]
    fn rejects_overflowing_length() {
        let err = unsafe { AlignedBuffer::uninit(usize::MAX / 2, 64) }.unwrap_err();
        assert!(matches!(err, AllocError::InvalidLayout { .. }));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn allocator_refusal_is_out_of_memory() {
        // 2^60 bytes: a valid layout no allocator can satisfy.
        let err = unsafe { AlignedBuffer::uninit(1 << 57, 64) }.unwrap_err();
        assert_eq!(err, AllocError::OutOfMemory { bytes: 1 << 60 });
    }

    #[test]
    fn writes_through_raw_pointer_are_visible() {
        let mut buf = AlignedBuffer::from_slice(&[0.0; 8], 64).unwrap();
        // SAFETY: index 3 is in bounds.
        unsafe { buf.as_mut_ptr().add(3).write(2.5) };
        assert_eq!(buf.as_slice()[3], 2.5);
    }

    #[test]
    fn alignment_follows_sane_line_sizes() {
        assert_eq!(alignment_for_line(64), 64);
        assert_eq!(alignment_for_line(128), 128);
        assert_eq!(alignment_for_line(32), DEFAULT_ALIGN);
        assert_eq!(alignment_for_line(96), DEFAULT_ALIGN);
        assert_eq!(alignment_for_line(1 << 20), DEFAULT_ALIGN);
    }
}
