//! Access patterns and the named kernels built from them.
//!
//! An [`AccessPattern`] `(reads, writes)` fully determines what the kernel
//! does per element: `reads` loads and `writes` stores, cycling through the
//! three arrays. The classic STREAM set is a handful of specific patterns plus
//! one raw block copy:
//!
//! | Name   | Workload     | Bytes/element |
//! |--------|--------------|---------------|
//! | copy   | 1:1          | 16 |
//! | scale  | 1:1          | 16 |
//! | add    | 2:1          | 24 |
//! | triad  | 2:1          | 24 |
//! | read   | 1:0          | 8  |
//! | write  | 0:1          | 8  |
//! | memcpy | block copy   | 16 |
//!
//! `stream` selects all seven.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

/// Upper bound on either side of a pattern.
pub const MAX_OPS_PER_ELEMENT: u32 = 100;

const ELEMENT_BYTES: u64 = std::mem::size_of::<f64>() as u64;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum PatternError {
    #[error("pattern must be 'reads:writes' (got '{0}')")]
    Malformed(String),
    #[error("reads and writes must each be between 0 and 100 (got {reads}:{writes})")]
    OutOfRange { reads: u64, writes: u64 },
    #[error("reads and writes cannot both be 0")]
    Empty,
    #[error("unknown kernel '{0}' (expected reads:writes, stream, or one of copy, scale, add, triad, read, write, memcpy)")]
    UnknownKernel(String),
}

/// Per-element read and write counts.
///
/// # Invariants
/// - `reads <= 100` and `writes <= 100`.
/// - `reads + writes > 0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct AccessPattern {
    reads: u32,
    writes: u32,
}

impl AccessPattern {
    pub fn new(reads: u32, writes: u32) -> Result<Self, PatternError> {
        Self::checked(u64::from(reads), u64::from(writes))
    }

    fn checked(reads: u64, writes: u64) -> Result<Self, PatternError> {
        let max = u64::from(MAX_OPS_PER_ELEMENT);
        if reads > max || writes > max {
            return Err(PatternError::OutOfRange { reads, writes });
        }
        if reads == 0 && writes == 0 {
            return Err(PatternError::Empty);
        }
        Ok(Self {
            reads: reads as u32,
            writes: writes as u32,
        })
    }

    #[inline]
    pub fn reads(&self) -> u32 {
        self.reads
    }

    #[inline]
    pub fn writes(&self) -> u32 {
        self.writes
    }

    /// Bytes moved per element: `(reads + writes) * 8`.
    #[inline]
    pub fn bytes_per_element(&self) -> u64 {
        u64::from(self.reads + self.writes) * ELEMENT_BYTES
    }

    #[inline]
    pub fn is_read_only(&self) -> bool {
        self.writes == 0
    }
}

impl FromStr for AccessPattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || PatternError::Malformed(s.to_string());
        let (r, w) = s.trim().split_once(':').ok_or_else(malformed)?;
        let reads: u64 = r.trim().parse().map_err(|_| malformed())?;
        let writes: u64 = w.trim().parse().map_err(|_| malformed())?;
        Self::checked(reads, writes)
    }
}

impl fmt::Display for AccessPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.reads, self.writes)
    }
}

/// What one timed trial executes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Workload {
    /// Generic `(reads, writes)` kernel.
    Pattern(AccessPattern),
    /// C ← A, copied in bulk per partition.
    BlockCopy,
}

impl Workload {
    /// Bytes moved per element index.
    pub fn bytes_per_element(&self) -> u64 {
        match self {
            Workload::Pattern(p) => p.bytes_per_element(),
            Workload::BlockCopy => 2 * ELEMENT_BYTES,
        }
    }
}

impl fmt::Display for Workload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Workload::Pattern(p) => p.fmt(f),
            Workload::BlockCopy => f.write_str("block-copy"),
        }
    }
}

/// A labelled workload, one row of the result table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct KernelSpec {
    pub label: String,
    pub workload: Workload,
}

impl KernelSpec {
    pub fn pattern(pattern: AccessPattern) -> Self {
        Self {
            label: pattern.to_string(),
            workload: Workload::Pattern(pattern),
        }
    }

    fn named(label: &str, workload: Workload) -> Self {
        Self {
            label: label.to_string(),
            workload,
        }
    }
}

/// Names accepted in place of `reads:writes`, in suite order.
pub const KERNEL_NAMES: [&str; 7] = ["copy", "scale", "add", "triad", "read", "write", "memcpy"];

fn named_kernel(name: &str) -> Option<KernelSpec> {
    let p = |r, w| Workload::Pattern(AccessPattern { reads: r, writes: w });
    let (label, workload) = match name {
        "copy" => ("Copy", p(1, 1)),
        "scale" => ("Scale", p(1, 1)),
        "add" => ("Add", p(2, 1)),
        "triad" => ("Triad", p(2, 1)),
        "read" => ("Read", p(1, 0)),
        "write" => ("Write", p(0, 1)),
        "memcpy" => ("Memcpy", Workload::BlockCopy),
        _ => return None,
    };
    Some(KernelSpec::named(label, workload))
}

/// The full STREAM-style suite.
pub fn stream_suite() -> Vec<KernelSpec> {
    KERNEL_NAMES.iter().filter_map(|n| named_kernel(n)).collect()
}

/// Parses the pattern argument: `reads:writes`, a kernel name, or `stream`.
pub fn parse_selection(s: &str) -> Result<Vec<KernelSpec>, PatternError> {
    let trimmed = s.trim();
    if trimmed.contains(':') {
        return Ok(vec![KernelSpec::pattern(trimmed.parse()?)]);
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower == "stream" {
        return Ok(stream_suite());
    }
    if let Some(spec) = named_kernel(&lower) {
        return Ok(vec![spec]);
    }
    if trimmed.chars().all(|c| c.is_ascii_digit()) && !trimmed.is_empty() {
        return Err(PatternError::Malformed(s.to_string()));
    }
    Err(PatternError::UnknownKernel(s.to_string()))
}
