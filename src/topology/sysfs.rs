//! Linux cache discovery from `/sys/devices/system/cpu/cpu0/cache`.
//!
//! Each `indexN` directory describes one cache visible to cpu0:
//!
//! ```text
//! index0/level                 1
//! index0/type                  Data | Instruction | Unified
//! index0/size                  32K
//! index0/coherency_line_size   64
//! ```
//!
//! Physical cores come from distinct `(physical id, core id)` pairs in
//! `/proc/cpuinfo`, falling back to the online processor count when the
//! file is missing or carries no core identifiers (common on ARM and in
//! some containers).
//!
//! Both roots are injectable so tests can point the probe at a synthetic tree.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use super::{CacheFindings, ProbeTier, TopologyProbe};

/// Reads cache descriptors from a sysfs-style tree.
#[derive(Clone, Debug)]
pub struct SysfsProbe {
    cpu_root: PathBuf,
    cpuinfo: PathBuf,
}

impl SysfsProbe {
    /// Probe rooted at the live `/sys` and `/proc` trees.
    pub fn host() -> Self {
        Self::with_roots("/sys/devices/system/cpu", "/proc/cpuinfo")
    }

    /// Probe rooted at `cpu_root` (the directory holding `cpu0/`) and a
    /// cpuinfo-format file.
    pub fn with_roots(cpu_root: impl Into<PathBuf>, cpuinfo: impl Into<PathBuf>) -> Self {
        Self {
            cpu_root: cpu_root.into(),
            cpuinfo: cpuinfo.into(),
        }
    }

    fn cache_findings(&self) -> CacheFindings {
        let mut findings = CacheFindings::default();
        let cache_dir = self.cpu_root.join("cpu0").join("cache");

        for index in cache_indices(&cache_dir) {
            let Some(desc) = CacheDescriptor::read(&index) else {
                continue;
            };
            if findings.line_bytes.is_none() && desc.line_bytes > 0 {
                findings.line_bytes = Some(desc.line_bytes);
            }
            let slot = match (desc.level, desc.kind.as_str()) {
                (1, "Data") => &mut findings.l1d_bytes,
                (1, "Instruction") => &mut findings.l1i_bytes,
                (2, "Data" | "Unified") => &mut findings.l2_bytes,
                // Shared L3 is reported once as the total capacity.
                (3, "Data" | "Unified") => &mut findings.l3_bytes,
                _ => continue,
            };
            if desc.size_bytes > 0 {
                *slot = Some(desc.size_bytes);
            }
        }

        findings
    }
}

impl TopologyProbe for SysfsProbe {
    fn name(&self) -> &'static str {
        "sysfs"
    }

    fn tier(&self) -> ProbeTier {
        ProbeTier::Native
    }

    fn probe(&self) -> Option<CacheFindings> {
        let mut findings = self.cache_findings();
        let cores = fs::read_to_string(&self.cpuinfo)
            .ok()
            .and_then(|text| count_physical_cores(&text))
            .unwrap_or_else(|| {
                log::debug!("no core ids in {}, using online CPU count", self.cpuinfo.display());
                online_processors()
            });
        findings.physical_cores = Some(cores);
        Some(findings)
    }
}

/// One `indexN` directory, parsed.
#[derive(Debug, PartialEq, Eq)]
struct CacheDescriptor {
    level: u32,
    kind: String,
    size_bytes: u64,
    line_bytes: u64,
}

impl CacheDescriptor {
    /// `None` when `level` or `type` is unreadable; missing size or line size
    /// read as zero so the caller keeps its prior value.
    fn read(dir: &Path) -> Option<Self> {
        let level = read_trimmed(&dir.join("level"))?.parse().ok()?;
        let kind = read_trimmed(&dir.join("type"))?;
        let size_bytes = read_trimmed(&dir.join("size"))
            .and_then(|s| parse_cache_size(&s))
            .unwrap_or(0);
        let line_bytes = read_trimmed(&dir.join("coherency_line_size"))
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        Some(Self {
            level,
            kind,
            size_bytes,
            line_bytes,
        })
    }
}

/// `indexN` subdirectories of `cache_dir`, ordered by N.
fn cache_indices(cache_dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(cache_dir) else {
        return Vec::new();
    };
    let mut indexed: Vec<(u32, PathBuf)> = entries
        .filter_map(|e| e.ok())
        .filter_map(|e| {
            let name = e.file_name();
            let n = name.to_str()?.strip_prefix("index")?.parse().ok()?;
            Some((n, e.path()))
        })
        .collect();
    indexed.sort_by_key(|(n, _)| *n);
    indexed.into_iter().map(|(_, p)| p).collect()
}

fn read_trimmed(path: &Path) -> Option<String> {
    let s = fs::read_to_string(path).ok()?;
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// Parses a sysfs cache size: `"32K"`, `"8192K"`, `"1M"`, `"2G"` or plain
/// bytes. Returns `None` for anything else, including zero and overflow.
pub fn parse_cache_size(s: &str) -> Option<u64> {
    let s = s.trim();
    let (digits, mult) = match s.as_bytes().last()? {
        b'K' | b'k' => (&s[..s.len() - 1], 1024),
        b'M' | b'm' => (&s[..s.len() - 1], 1024 * 1024),
        b'G' | b'g' => (&s[..s.len() - 1], 1024 * 1024 * 1024),
        b'0'..=b'9' => (s, 1),
        _ => return None,
    };
    let value: u64 = digits.trim().parse().ok()?;
    value.checked_mul(mult).filter(|&v| v > 0)
}

/// Counts distinct `(physical id, core id)` pairs in cpuinfo text.
///
/// Processors without a `physical id` line are treated as socket 0.
/// Returns `None` when no `core id` lines are present.
pub fn count_physical_cores(cpuinfo: &str) -> Option<u32> {
    let mut cores = BTreeSet::new();
    let mut socket: u32 = 0;

    for line in cpuinfo.lines() {
        let Some((key, value)) = line.split_once(':') else {
            // Blank line ends a processor block.
            socket = 0;
            continue;
        };
        match key.trim() {
            "physical id" => socket = value.trim().parse().unwrap_or(0),
            "core id" => {
                if let Ok(core) = value.trim().parse::<u32>() {
                    cores.insert((socket, core));
                }
            }
            _ => {}
        }
    }

    let n = u32::try_from(cores.len()).ok()?;
    (n > 0).then_some(n)
}

fn online_processors() -> u32 {
    u32::try_from(num_cpus::get()).unwrap_or(u32::MAX).max(1)
}
