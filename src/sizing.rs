//! Working-set sizing.
//!
//! # The DRAM-escape rule
//!
//! With three equal arrays, a total working set of `safety_factor × L3`
//! needs `safety_factor × L3 / 3` per array. A floor protects against hosts
//! that report an implausibly small (or default) L3:
//!
//! ```text
//! per_array_mib = max(l3_mib * 4 / 3, 128)
//! ```
//!
//! All arithmetic is integer MiB, so an 8 MiB L3 gives `8 * 4 / 3 = 10`,
//! well under the floor, and the floor wins.
//!
//! An operator-supplied size bypasses the rule entirely but must lie in
//! `ARRAY_MIB_MIN..=ARRAY_MIB_MAX` (1 to 65536 MiB).

use serde::Serialize;
use thiserror::Error;

use crate::topology::{CacheTopology, MIB};

/// Smallest accepted per-array size, in MiB.
pub const ARRAY_MIB_MIN: u64 = 1;
/// Largest accepted per-array size, in MiB.
pub const ARRAY_MIB_MAX: u64 = 65536;

/// Number of arrays in the working set.
pub const ARRAY_COUNT: u64 = 3;

const ELEMENT_BYTES: u64 = std::mem::size_of::<f64>() as u64;

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum SizingError {
    #[error("array_size_mb must be between 1 and 65536 (got {0})")]
    ArraySizeOutOfRange(u64),
    #[error("{mib} MiB per array does not fit in this address space")]
    TooLarge { mib: u64 },
}

/// Tunables of the automatic sizing rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SizingPolicy {
    /// Total working set as a multiple of L3.
    pub safety_factor: u64,
    /// Per-array floor in MiB.
    pub floor_mib: u64,
}

impl Default for SizingPolicy {
    fn default() -> Self {
        Self {
            safety_factor: 4,
            floor_mib: 128,
        }
    }
}

impl SizingPolicy {
    /// Per-array MiB the policy asks for on `topology`.
    pub fn per_array_mib(&self, topology: &CacheTopology) -> u64 {
        let scaled = topology.l3_mib().saturating_mul(self.safety_factor) / ARRAY_COUNT;
        scaled.max(self.floor_mib)
    }
}

/// Where the per-array size came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeSource {
    Operator,
    Auto,
}

/// Outcome of the sizing decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SizeDecision {
    pub per_array_mib: u64,
    pub element_count: usize,
    pub source: SizeSource,
}

impl SizeDecision {
    /// Bytes in one array.
    #[inline]
    pub fn bytes_per_array(&self) -> u64 {
        self.element_count as u64 * ELEMENT_BYTES
    }

    /// Bytes in all three arrays.
    #[inline]
    pub fn total_bytes(&self) -> u64 {
        self.bytes_per_array() * ARRAY_COUNT
    }
}

/// Checks an operator-supplied per-array size.
pub fn validate_array_mib(mib: u64) -> Result<u64, SizingError> {
    if (ARRAY_MIB_MIN..=ARRAY_MIB_MAX).contains(&mib) {
        Ok(mib)
    } else {
        Err(SizingError::ArraySizeOutOfRange(mib))
    }
}

/// Decides the per-array element count with the default policy.
pub fn decide_size(
    topology: &CacheTopology,
    override_mib: Option<u64>,
) -> Result<SizeDecision, SizingError> {
    decide_size_with(&SizingPolicy::default(), topology, override_mib)
}

/// Decides the per-array element count.
pub fn decide_size_with(
    policy: &SizingPolicy,
    topology: &CacheTopology,
    override_mib: Option<u64>,
) -> Result<SizeDecision, SizingError> {
    let (per_array_mib, source) = match override_mib {
        Some(mib) => (validate_array_mib(mib)?, SizeSource::Operator),
        None => (policy.per_array_mib(topology), SizeSource::Auto),
    };

    let elements = per_array_mib
        .checked_mul(MIB)
        .map(|bytes| bytes / ELEMENT_BYTES)
        .and_then(|n| usize::try_from(n).ok())
        .ok_or(SizingError::TooLarge { mib: per_array_mib })?;

    if source == SizeSource::Auto {
        log::info!(
            "auto array size: {} MiB ({}x L3 over {} arrays, floor {} MiB)",
            per_array_mib,
            policy.safety_factor,
            ARRAY_COUNT,
            policy.floor_mib
        );
    }

    Ok(SizeDecision {
        per_array_mib,
        element_count: elements,
        source,
    })
}

/// Where the working set lands relative to L3.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Residency {
    /// Total working set exceeds 4x L3.
    Dram,
    /// Larger than L3 but within 4x.
    MostlyDram,
    /// Fits in L3; results measure cache bandwidth.
    FitsInCache,
}

impl Residency {
    pub fn classify(total_bytes: u64, l3_bytes: u64) -> Self {
        if total_bytes > l3_bytes.saturating_mul(4) {
            Residency::Dram
        } else if total_bytes > l3_bytes {
            Residency::MostlyDram
        } else {
            Residency::FitsInCache
        }
    }
}
