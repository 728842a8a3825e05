//! Windows cache discovery through `GetLogicalProcessorInformation`.
//!
//! The call returns one record per relationship: a cache instance, a
//! physical core, a NUMA node or a package. Only cache and core records are
//! used. Caches are reported once per instance, so the folded size of each
//! level is the size of one instance.
//!
//! Folding is kept separate from the FFI so it can be exercised with
//! synthetic records on every platform.

use super::{CacheFindings, ProbeTier, TopologyProbe};

/// Cache type carried by a cache record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheKind {
    Unified,
    Instruction,
    Data,
    Trace,
}

/// Platform-neutral view of one logical-processor information record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessorRecord {
    Cache {
        level: u8,
        kind: CacheKind,
        size: u32,
        line: u16,
    },
    Core,
    Other,
}

/// Folds processor records into findings.
///
/// Level 1 data and instruction caches fill L1d and L1i and set the line
/// size. Levels 2 and 3 fill L2 and L3 whatever their type. Each core record
/// counts one physical core. Zero sizes are left as unknown.
pub fn fold_records<I>(records: I) -> CacheFindings
where
    I: IntoIterator<Item = ProcessorRecord>,
{
    let mut findings = CacheFindings::default();
    let mut cores: u32 = 0;

    for record in records {
        match record {
            ProcessorRecord::Cache {
                level,
                kind,
                size,
                line,
            } => {
                let size = Some(u64::from(size)).filter(|&s| s > 0);
                match (level, kind) {
                    (1, CacheKind::Data) => findings.l1d_bytes = size,
                    (1, CacheKind::Instruction) => findings.l1i_bytes = size,
                    (2, _) => findings.l2_bytes = size,
                    (3, _) => findings.l3_bytes = size,
                    _ => {}
                }
                if level == 1 && line > 0 {
                    findings.line_bytes = Some(u64::from(line));
                }
            }
            ProcessorRecord::Core => cores = cores.saturating_add(1),
            ProcessorRecord::Other => {}
        }
    }

    findings.physical_cores = (cores > 0).then_some(cores);
    findings
}

/// Native probe over `GetLogicalProcessorInformation`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogicalProcessorProbe;

impl TopologyProbe for LogicalProcessorProbe {
    fn name(&self) -> &'static str {
        "logical-processor"
    }

    fn tier(&self) -> ProbeTier {
        ProbeTier::Native
    }

    fn probe(&self) -> Option<CacheFindings> {
        let records = host_records()?;
        Some(fold_records(records))
    }
}

#[cfg(windows)]
fn host_records() -> Option<Vec<ProcessorRecord>> {
    use std::mem::size_of;
    use windows_sys::Win32::System::SystemInformation::{
        CacheData, CacheInstruction, CacheTrace, GetLogicalProcessorInformation, RelationCache,
        RelationProcessorCore, SYSTEM_LOGICAL_PROCESSOR_INFORMATION,
    };

    let stride = size_of::<SYSTEM_LOGICAL_PROCESSOR_INFORMATION>();
    let mut len: u32 = 0;
    // SAFETY: a null buffer with zero length only reports the required size.
    unsafe { GetLogicalProcessorInformation(std::ptr::null_mut(), &mut len) };
    let count = len as usize / stride;
    if count == 0 {
        log::debug!("GetLogicalProcessorInformation reported no records");
        return None;
    }

    // SAFETY: the record is plain data; all-zero is a valid bit pattern.
    let zeroed: SYSTEM_LOGICAL_PROCESSOR_INFORMATION = unsafe { std::mem::zeroed() };
    let mut raw = vec![zeroed; count];
    // SAFETY: `raw` holds `count` records, and `len` is their size in bytes.
    let ok = unsafe { GetLogicalProcessorInformation(raw.as_mut_ptr(), &mut len) };
    if ok == 0 {
        log::debug!("GetLogicalProcessorInformation failed");
        return None;
    }
    raw.truncate(len as usize / stride);

    let records = raw
        .iter()
        .map(|info| {
            if info.Relationship == RelationProcessorCore {
                return ProcessorRecord::Core;
            }
            if info.Relationship != RelationCache {
                return ProcessorRecord::Other;
            }
            // SAFETY: `Cache` is the active union member for cache records.
            let cache = unsafe { info.Anonymous.Cache };
            let kind = match cache.Type {
                t if t == CacheData => CacheKind::Data,
                t if t == CacheInstruction => CacheKind::Instruction,
                t if t == CacheTrace => CacheKind::Trace,
                _ => CacheKind::Unified,
            };
            ProcessorRecord::Cache {
                level: cache.Level,
                kind,
                size: cache.Size,
                line: cache.LineSize,
            }
        })
        .collect();
    Some(records)
}

#[cfg(not(windows))]
fn host_records() -> Option<Vec<ProcessorRecord>> {
    None
}
