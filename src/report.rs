//! Human-readable and JSON reports.
//!
//! Text output goes to any `io::Write` so tests can render into a buffer.
//! Every banner is a separate function because the binary interleaves them
//! with work (system info before sizing, the run banner before the first
//! trial, the table at the end).

use std::io::{self, Write};

use serde::Serialize;

use crate::harness::{Measurement, TrialSummary};
use crate::pattern::KernelSpec;
use crate::rusage::SeriesUsage;
use crate::sizing::{Residency, SizeDecision, SizeSource};
use crate::sysinfo::SystemInfo;
use crate::topology::{CacheTopology, KIB, MIB};

const HEAVY_RULE: &str = "════════════════════════════════════════════════════════════";
const LIGHT_RULE: &str = "────────────────────────────────────────────────────────────";

/// One row of the results table.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct KernelResult {
    pub label: String,
    pub workload: String,
    pub bytes_per_element: u64,
    #[serde(flatten)]
    pub summary: TrialSummary,
    pub witness: f64,
    pub usage: SeriesUsage,
}

impl KernelResult {
    pub fn new(spec: &KernelSpec, m: &Measurement) -> Self {
        Self {
            label: spec.label.clone(),
            workload: spec.workload.to_string(),
            bytes_per_element: spec.workload.bytes_per_element(),
            summary: m.summary,
            witness: m.witness,
            usage: m.usage,
        }
    }
}

/// Everything the run produced, in serializable form.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunReport {
    pub system: SystemInfo,
    pub topology: CacheTopology,
    pub size: SizeDecision,
    pub residency: Residency,
    pub threads: usize,
    pub trials: usize,
    pub results: Vec<KernelResult>,
    pub peak_mbps: f64,
}

impl RunReport {
    pub fn write_json<W: Write>(&self, out: &mut W) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut *out, self)?;
        writeln!(out)
    }
}

/// Highest best-case bandwidth across `results`, 0.0 when empty.
pub fn peak_mbps(results: &[KernelResult]) -> f64 {
    results
        .iter()
        .map(|r| r.summary.best_mbps)
        .fold(0.0, f64::max)
}

pub fn write_system_info<W: Write>(out: &mut W, info: &SystemInfo) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "System info:")?;
    writeln!(out, "  Platform:       {}", info.platform)?;
    writeln!(out, "  Available CPUs: {}", info.available_cpus)?;
    writeln!(out, "  Page size:      {} bytes", info.page_size)?;
    writeln!(out)
}

pub fn write_cache_banner<W: Write>(out: &mut W, t: &CacheTopology) -> io::Result<()> {
    writeln!(out, "{HEAVY_RULE}")?;
    writeln!(out, "  Cache Hierarchy Detected")?;
    writeln!(out, "{HEAVY_RULE}")?;
    writeln!(out, "  L1 Data:      {:>7} KB (per core)", t.l1d_bytes / KIB)?;
    writeln!(out, "  L1 Instr:     {:>7} KB (per core)", t.l1i_bytes / KIB)?;
    writeln!(out, "  L2 Cache:     {:>7} KB", t.l2_bytes / KIB)?;
    if t.l3_bytes >= MIB {
        writeln!(out, "  L3 Cache:     {:>7} MB (shared)", t.l3_bytes / MIB)?;
    } else {
        writeln!(out, "  L3 Cache:     {:>7} KB (shared)", t.l3_bytes / KIB)?;
    }
    writeln!(out, "  Cache Line:   {:>7} bytes", t.line_bytes)?;
    writeln!(out, "  Physical Cores: {:>5}", t.physical_cores)?;
    writeln!(out, "{HEAVY_RULE}")?;
    writeln!(out)
}

/// Notes an automatically chosen size. Prints nothing for operator sizes.
pub fn write_size_note<W: Write>(out: &mut W, size: &SizeDecision) -> io::Result<()> {
    if size.source == SizeSource::Auto {
        writeln!(
            out,
            "  Auto array size: {} MB (4x L3 / 3 arrays)",
            size.per_array_mib
        )?;
        writeln!(out)?;
    }
    Ok(())
}

pub fn write_run_banner<W: Write>(
    out: &mut W,
    threads: usize,
    size: &SizeDecision,
    topology: &CacheTopology,
    trials: usize,
) -> io::Result<()> {
    let mib = MIB as f64;
    let per_array = size.bytes_per_array() as f64 / mib;
    let total = size.total_bytes() as f64 / mib;
    let l3 = topology.l3_bytes as f64 / mib;
    let verdict = match Residency::classify(size.total_bytes(), topology.l3_bytes) {
        Residency::Dram => "DRAM test ✓",
        Residency::MostlyDram => "mostly DRAM",
        Residency::FitsInCache => "⚠ fits in L3 cache!",
    };

    writeln!(out, "{HEAVY_RULE}")?;
    writeln!(out, "  UltraMem - Memory Bandwidth Benchmark")?;
    writeln!(out, "{HEAVY_RULE}")?;
    writeln!(out, "  Threads:           {threads}")?;
    writeln!(out, "  Array elements:    {}", size.element_count)?;
    writeln!(out, "  Memory per array:  {per_array:.1} MB")?;
    writeln!(out, "  Total memory:      {total:.1} MB")?;
    writeln!(out, "  L3 Cache:          {l3:.1} MB")?;
    writeln!(out, "  Arrays vs L3:      {:.1}x ({verdict})", total / l3)?;
    writeln!(out, "  Iterations:        {trials}")?;
    writeln!(out, "{HEAVY_RULE}")?;
    writeln!(out)
}

/// Announces the pool size actually running and the start of measurement.
pub fn write_start<W: Write>(out: &mut W, threads: usize) -> io::Result<()> {
    writeln!(out, "  Actual threads:    {threads}")?;
    writeln!(out)?;
    writeln!(out, "Running benchmarks...")?;
    writeln!(out)
}

pub fn write_results<W: Write>(out: &mut W, results: &[KernelResult]) -> io::Result<()> {
    writeln!(out, "{LIGHT_RULE}")?;
    writeln!(out, "Kernel      Best MB/s    Avg MB/s     Min Time     Max Time")?;
    writeln!(out, "{LIGHT_RULE}")?;
    for r in results {
        let s = &r.summary;
        writeln!(
            out,
            "{:<8}  {:>10.1}  {:>10.1}   {:>10.6}   {:>10.6}",
            r.label, s.best_mbps, s.avg_mbps, s.min_time, s.max_time
        )?;
    }
    writeln!(out, "{LIGHT_RULE}")?;
    writeln!(out)?;

    let peak = peak_mbps(results);
    writeln!(out, "{HEAVY_RULE}")?;
    writeln!(out, "  PEAK BANDWIDTH: {:.1} MB/s ({:.2} GB/s)", peak, peak / 1000.0)?;
    writeln!(out, "{HEAVY_RULE}")?;
    writeln!(out)
}

/// CPU usage and peak RSS over one kernel's trials, for debug logging.
pub fn usage_line(r: &KernelResult) -> String {
    format!("{}: {}", r.label, r.usage)
}
