//! End-to-end benchmark run: discover, size, allocate, measure, report.

use std::io::Write;

use crate::aligned::alignment_for_line;
use crate::config::{OutputFormat, RunConfig};
use crate::error::BenchError;
use crate::harness::measure;
use crate::pool::WorkerPool;
use crate::report::{self, KernelResult, RunReport};
use crate::sizing::{decide_size, Residency, SizeDecision};
use crate::sysinfo::SystemInfo;
use crate::topology::{self, CacheTopology};
use crate::working_set::WorkingSet;

/// Runs the benchmark on the host's discovered topology.
pub fn run<W: Write>(cfg: &RunConfig, out: &mut W) -> Result<RunReport, BenchError> {
    run_on(cfg, topology::discover(), out)
}

/// Runs the benchmark against a given topology, writing the report to `out`.
///
/// In text mode banners are written as each phase starts. In JSON mode the
/// whole report is written once at the end.
pub fn run_on<W: Write>(
    cfg: &RunConfig,
    topology: CacheTopology,
    out: &mut W,
) -> Result<RunReport, BenchError> {
    let text = cfg.format == OutputFormat::Text;
    let system = SystemInfo::collect();
    if text {
        report::write_system_info(out, &system)?;
        report::write_cache_banner(out, &topology)?;
    }

    let size = decide_size(&topology, cfg.array_mib)?;
    if text {
        report::write_size_note(out, &size)?;
    }
    run_sized(cfg, system, topology, size, out)
}

/// Everything after sizing: pool, allocation, measurement and the results.
///
/// Nothing is written past the run banner when the working set cannot be
/// allocated.
pub fn run_sized<W: Write>(
    cfg: &RunConfig,
    system: SystemInfo,
    topology: CacheTopology,
    size: SizeDecision,
    out: &mut W,
) -> Result<RunReport, BenchError> {
    let text = cfg.format == OutputFormat::Text;
    let residency = Residency::classify(size.total_bytes(), topology.l3_bytes);
    if residency == Residency::FitsInCache {
        log::warn!(
            "working set ({} bytes) fits in L3 ({} bytes); results measure cache bandwidth",
            size.total_bytes(),
            topology.l3_bytes
        );
    }

    let pool = WorkerPool::new(cfg.threads)?;
    if text {
        report::write_run_banner(out, cfg.threads, &size, &topology, cfg.trials)?;
    }

    let align = alignment_for_line(topology.line_bytes);
    let mut ws = WorkingSet::allocate(size.element_count, align, &pool)?;
    if text {
        report::write_start(out, pool.threads())?;
        out.flush()?;
    }

    let mut results = Vec::with_capacity(cfg.kernels.len());
    for (i, spec) in cfg.kernels.iter().enumerate() {
        if i > 0 {
            ws.reset(&pool);
        }
        let m = measure(&pool, &mut ws, spec, cfg.trials)?;
        let result = KernelResult::new(spec, &m);
        log::debug!("{}", report::usage_line(&result));
        if m.usage.peak_rss_bytes > 0 && !m.usage.rss_covers(size.total_bytes()) {
            log::debug!(
                "peak RSS {} bytes is below the {}-byte working set; pages may not be resident",
                m.usage.peak_rss_bytes,
                size.total_bytes()
            );
        }
        results.push(result);
    }

    let peak_mbps = report::peak_mbps(&results);
    let run_report = RunReport {
        system,
        topology,
        size,
        residency,
        threads: pool.threads(),
        trials: cfg.trials,
        results,
        peak_mbps,
    };

    match cfg.format {
        OutputFormat::Text => report::write_results(out, &run_report.results)?,
        OutputFormat::Json => run_report.write_json(out)?,
    }
    out.flush()?;
    Ok(run_report)
}
