//! x86 cache discovery through CPUID leaf 4 (deterministic cache parameters).
//!
//! Each sub-leaf describes one cache until a sub-leaf reports type 0:
//!
//! ```text
//! EAX[4:0]   type (1 = data, 2 = instruction, 3 = unified)
//! EAX[7:5]   level
//! EBX[11:0]  line size - 1
//! EBX[21:12] physical line partitions - 1
//! EBX[31:22] ways - 1
//! ECX        sets - 1
//! ```
//!
//! The leaf does not describe core counts, so `physical_cores` is left to
//! other probes.

#[cfg(target_arch = "x86")]
use std::arch::x86::{CpuidResult, __cpuid_count};
#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::{CpuidResult, __cpuid_count};

use super::{CacheFindings, ProbeTier, TopologyProbe};

/// Sub-leaf scan limit; real parts report fewer than 8 caches.
const MAX_SUBLEAVES: u32 = 32;

/// Instruction-level cache descriptor probe.
#[derive(Clone, Copy, Debug, Default)]
pub struct CpuidProbe;

impl TopologyProbe for CpuidProbe {
    fn name(&self) -> &'static str {
        "cpuid"
    }

    fn tier(&self) -> ProbeTier {
        ProbeTier::Instruction
    }

    fn probe(&self) -> Option<CacheFindings> {
        let max_leaf = cpuid(0, 0).eax;
        if max_leaf < 4 {
            return None;
        }
        let findings = findings_from_leaves((0..MAX_SUBLEAVES).map(|i| cpuid(4, i)));
        (!findings.is_empty()).then_some(findings)
    }
}

#[allow(unused_unsafe)]
fn cpuid(leaf: u32, subleaf: u32) -> CpuidResult {
    // SAFETY: CPUID is available on every x86_64 part and every x86 part
    // Rust targets.
    unsafe { __cpuid_count(leaf, subleaf) }
}

/// One decoded leaf-4 sub-leaf.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LeafCache {
    pub kind: u32,
    pub level: u32,
    pub line_bytes: u64,
    pub size_bytes: u64,
}

/// Decodes a leaf-4 sub-leaf. `None` marks the end of the cache list.
pub fn decode_leaf4(eax: u32, ebx: u32, ecx: u32) -> Option<LeafCache> {
    let kind = eax & 0x1f;
    if kind == 0 {
        return None;
    }
    let level = (eax >> 5) & 0x7;
    let line = u64::from(ebx & 0xfff) + 1;
    let partitions = u64::from((ebx >> 12) & 0x3ff) + 1;
    let ways = u64::from((ebx >> 22) & 0x3ff) + 1;
    let sets = u64::from(ecx) + 1;
    Some(LeafCache {
        kind,
        level,
        line_bytes: line,
        size_bytes: line * partitions * ways * sets,
    })
}

/// Folds sub-leaves into findings, stopping at the first null descriptor.
pub fn findings_from_leaves(leaves: impl IntoIterator<Item = CpuidResult>) -> CacheFindings {
    let mut findings = CacheFindings::default();
    for leaf in leaves {
        let Some(cache) = decode_leaf4(leaf.eax, leaf.ebx, leaf.ecx) else {
            break;
        };
        findings.line_bytes = Some(cache.line_bytes);
        match (cache.level, cache.kind) {
            (1, 1) => findings.l1d_bytes = Some(cache.size_bytes),
            (1, 2) => findings.l1i_bytes = Some(cache.size_bytes),
            (2, _) => findings.l2_bytes = Some(cache.size_bytes),
            (3, _) => findings.l3_bytes = Some(cache.size_bytes),
            _ => {}
        }
    }
    findings
}
