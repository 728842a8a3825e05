//! Cache hierarchy discovery.
//!
//! # Purpose
//!
//! The working set has to be several times larger than the last-level cache,
//! otherwise the kernels measure cache bandwidth instead of DRAM bandwidth.
//! This module produces a [`CacheTopology`] that is always fully populated,
//! no matter how little the host is willing to tell us.
//!
//! # Layering
//!
//! ```text
//! defaults ──► native probe ──► instruction probe (CPUID)
//!              sysfs (Linux)     only if L3 is still default
//!              sysctl (macOS)
//!              logical-processor records (Windows)
//! ```
//!
//! Every probe returns [`CacheFindings`], a partial result. A finding only
//! overwrites a topology field when it is present and non-zero, so a probe
//! that sees half the hierarchy cannot erase what the defaults or an earlier
//! probe established. Probe failure is `None` and is never surfaced as an
//! error: topology only affects sizing quality, not correctness.
//!
//! # Shared caches
//!
//! L3 is usually shared by many cores and some platforms report it once per
//! socket. The reported value is used as one total capacity. Dividing it by
//! the sharing count would shrink the working set below the DRAM-escape
//! threshold.

use serde::Serialize;

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub mod cpuid;
pub mod logical;
#[cfg(target_os = "macos")]
pub mod sysctl;
pub mod sysfs;

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub use cpuid::CpuidProbe;
pub use logical::LogicalProcessorProbe;
#[cfg(target_os = "macos")]
pub use sysctl::SysctlProbe;
pub use sysfs::SysfsProbe;

pub const KIB: u64 = 1024;
pub const MIB: u64 = 1024 * KIB;

pub const DEFAULT_L1D_BYTES: u64 = 32 * KIB;
pub const DEFAULT_L1I_BYTES: u64 = 32 * KIB;
pub const DEFAULT_L2_BYTES: u64 = 256 * KIB;
pub const DEFAULT_L3_BYTES: u64 = 8 * MIB;
pub const DEFAULT_LINE_BYTES: u64 = 64;
pub const DEFAULT_PHYSICAL_CORES: u32 = 1;

/// Normalized cache hierarchy of the host, captured once per run.
///
/// # Invariants
/// - Every field is non-zero.
/// - Sizes are totals as reported by the platform; shared caches are not
///   divided per core.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CacheTopology {
    pub l1d_bytes: u64,
    pub l1i_bytes: u64,
    pub l2_bytes: u64,
    pub l3_bytes: u64,
    pub line_bytes: u64,
    pub physical_cores: u32,
}

impl Default for CacheTopology {
    fn default() -> Self {
        Self {
            l1d_bytes: DEFAULT_L1D_BYTES,
            l1i_bytes: DEFAULT_L1I_BYTES,
            l2_bytes: DEFAULT_L2_BYTES,
            l3_bytes: DEFAULT_L3_BYTES,
            line_bytes: DEFAULT_LINE_BYTES,
            physical_cores: DEFAULT_PHYSICAL_CORES,
        }
    }
}

impl CacheTopology {
    /// Overwrites each field for which `findings` holds a non-zero value.
    pub fn apply(&mut self, findings: &CacheFindings) {
        fn take(slot: &mut u64, found: Option<u64>) {
            if let Some(v) = found.filter(|&v| v > 0) {
                *slot = v;
            }
        }

        take(&mut self.l1d_bytes, findings.l1d_bytes);
        take(&mut self.l1i_bytes, findings.l1i_bytes);
        take(&mut self.l2_bytes, findings.l2_bytes);
        take(&mut self.l3_bytes, findings.l3_bytes);
        take(&mut self.line_bytes, findings.line_bytes);
        if let Some(cores) = findings.physical_cores.filter(|&c| c > 0) {
            self.physical_cores = cores;
        }
    }

    /// L3 size in whole MiB (truncating).
    #[inline]
    pub fn l3_mib(&self) -> u64 {
        self.l3_bytes / MIB
    }

    /// True when no probe has replaced the default L3 size.
    #[inline]
    pub fn l3_is_default(&self) -> bool {
        self.l3_bytes == DEFAULT_L3_BYTES
    }
}

/// Partial result of one probe. `None` means "this probe does not know".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheFindings {
    pub l1d_bytes: Option<u64>,
    pub l1i_bytes: Option<u64>,
    pub l2_bytes: Option<u64>,
    pub l3_bytes: Option<u64>,
    pub line_bytes: Option<u64>,
    pub physical_cores: Option<u32>,
}

impl CacheFindings {
    /// True when the probe found nothing usable.
    pub fn is_empty(&self) -> bool {
        let sizes = [
            self.l1d_bytes,
            self.l1i_bytes,
            self.l2_bytes,
            self.l3_bytes,
            self.line_bytes,
        ];
        sizes.iter().all(|v| v.unwrap_or(0) == 0) && self.physical_cores.unwrap_or(0) == 0
    }
}

/// Priority class of a probe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbeTier {
    /// OS-provided description of the hierarchy. Always consulted.
    Native,
    /// Instruction-level descriptor query. Consulted only when the native
    /// tier left L3 at its default.
    Instruction,
}

/// One way of asking the host about its caches.
pub trait TopologyProbe {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn tier(&self) -> ProbeTier;

    /// Queries the host. `None` when the mechanism is unavailable.
    fn probe(&self) -> Option<CacheFindings>;
}

/// Runs `probes` over the defaults in priority order. Never fails.
///
/// All `Native` probes run first (in slice order), then each `Instruction`
/// probe runs if `l3_bytes` still equals [`DEFAULT_L3_BYTES`].
pub fn discover_with(probes: &[&dyn TopologyProbe]) -> CacheTopology {
    let mut topology = CacheTopology::default();

    for tier in [ProbeTier::Native, ProbeTier::Instruction] {
        for probe in probes.iter().filter(|p| p.tier() == tier) {
            if tier == ProbeTier::Instruction && !topology.l3_is_default() {
                log::debug!(
                    "skipping {} probe: L3 already known ({} bytes)",
                    probe.name(),
                    topology.l3_bytes
                );
                continue;
            }
            match probe.probe() {
                Some(findings) if !findings.is_empty() => {
                    log::debug!("{} probe found {:?}", probe.name(), findings);
                    topology.apply(&findings);
                }
                _ => log::debug!("{} probe found nothing, keeping prior values", probe.name()),
            }
        }
    }

    topology
}

/// Discovers the host's cache hierarchy using the platform's probes.
pub fn discover() -> CacheTopology {
    #[cfg(target_os = "linux")]
    let sysfs = SysfsProbe::host();
    #[cfg(target_os = "macos")]
    let sysctl = SysctlProbe;
    #[cfg(windows)]
    let logical = LogicalProcessorProbe;
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    let cpuid = CpuidProbe;

    #[allow(unused_mut)]
    let mut probes: Vec<&dyn TopologyProbe> = Vec::new();
    #[cfg(target_os = "linux")]
    probes.push(&sysfs);
    #[cfg(target_os = "macos")]
    probes.push(&sysctl);
    #[cfg(windows)]
    probes.push(&logical);
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    probes.push(&cpuid);

    let topology = discover_with(&probes);
    log::info!(
        "cache topology: l1d={} l1i={} l2={} l3={} line={} cores={}",
        topology.l1d_bytes,
        topology.l1i_bytes,
        topology.l2_bytes,
        topology.l3_bytes,
        topology.line_bytes,
        topology.physical_cores
    );
    topology
}
