//! Library-level run flow with injected topology probes.

use ultramem::config::{OutputFormat, RunConfig};
use ultramem::parse_selection;
use ultramem::run::run_on;
use ultramem::sizing::SizeSource;
use ultramem::topology::{discover_with, CacheFindings, ProbeTier, TopologyProbe, MIB};

struct StaticProbe(CacheFindings);

impl TopologyProbe for StaticProbe {
    fn name(&self) -> &'static str {
        "static"
    }

    fn tier(&self) -> ProbeTier {
        ProbeTier::Native
    }

    fn probe(&self) -> Option<CacheFindings> {
        Some(self.0)
    }
}

#[test]
fn probed_topology_flows_into_report() {
    let probe = StaticProbe(CacheFindings {
        l3_bytes: Some(2 * MIB),
        line_bytes: Some(128),
        physical_cores: Some(6),
        ..Default::default()
    });
    let topology = discover_with(&[&probe]);
    assert_eq!(topology.line_bytes, 128);

    let cfg = RunConfig {
        threads: 2,
        kernels: parse_selection("copy").unwrap(),
        array_mib: Some(1),
        trials: 2,
        format: OutputFormat::Text,
    };
    let mut out = Vec::new();
    let report = run_on(&cfg, topology, &mut out).unwrap();

    assert_eq!(report.topology.physical_cores, 6);
    assert_eq!(report.size.source, SizeSource::Operator);
    assert_eq!(report.results[0].summary.measured, 1);

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("  L3 Cache:           2 MB (shared)"));
    assert!(text.contains("  Cache Line:       128 bytes"));
    assert!(text.contains("  Physical Cores:     6"));
    assert!(text.contains("  Arrays vs L3:      1.5x (mostly DRAM)"));
}

#[test]
fn auto_size_is_announced() {
    let cfg = RunConfig {
        threads: 1,
        kernels: parse_selection("read").unwrap(),
        array_mib: None,
        trials: 2,
        format: OutputFormat::Text,
    };
    let mut out = Vec::new();
    let report = run_on(&cfg, discover_with(&[]), &mut out).unwrap();
    assert_eq!(report.size.per_array_mib, 128);
    assert_eq!(report.size.source, SizeSource::Auto);
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("  Auto array size: 128 MB (4x L3 / 3 arrays)"));
    // Read-only witness: two trials over 128 MiB of A = 1.0.
    assert_eq!(report.results[0].witness, 2.0 * (128 * MIB / 8) as f64);
}
