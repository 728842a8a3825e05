//! macOS cache discovery through `sysctlbyname("hw.*")`.
//!
//! Apple Silicon reports the performance-cluster caches here and has no
//! `hw.l3cachesize`, so on those hosts L3 stays at its default and the
//! sizing floor does the rest.

use std::ffi::CStr;

use super::{CacheFindings, ProbeTier, TopologyProbe};

/// Named hardware descriptor lookups.
#[derive(Clone, Copy, Debug, Default)]
pub struct SysctlProbe;

impl TopologyProbe for SysctlProbe {
    fn name(&self) -> &'static str {
        "sysctl"
    }

    fn tier(&self) -> ProbeTier {
        ProbeTier::Native
    }

    fn probe(&self) -> Option<CacheFindings> {
        let findings = CacheFindings {
            l1d_bytes: sysctl_u64(c"hw.l1dcachesize"),
            l1i_bytes: sysctl_u64(c"hw.l1icachesize"),
            l2_bytes: sysctl_u64(c"hw.l2cachesize"),
            l3_bytes: sysctl_u64(c"hw.l3cachesize"),
            line_bytes: sysctl_u64(c"hw.cachelinesize"),
            physical_cores: sysctl_u64(c"hw.physicalcpu").and_then(|n| u32::try_from(n).ok()),
        };
        (!findings.is_empty()).then_some(findings)
    }
}

/// Reads an integer sysctl. Handles both 32- and 64-bit values.
fn sysctl_u64(name: &CStr) -> Option<u64> {
    let mut buf = [0u8; 8];
    let mut len = buf.len();
    // SAFETY: `name` is NUL-terminated, `buf` is writable for `len` bytes and
    // the kernel updates `len` with the number of bytes it wrote.
    let rc = unsafe {
        libc::sysctlbyname(
            name.as_ptr(),
            buf.as_mut_ptr().cast(),
            &mut len,
            std::ptr::null_mut(),
            0,
        )
    };
    if rc != 0 {
        return None;
    }
    match len {
        4 => Some(u64::from(u32::from_ne_bytes([buf[0], buf[1], buf[2], buf[3]]))),
        8 => Some(u64::from_ne_bytes(buf)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_line_size_and_cores() {
        let findings = SysctlProbe.probe().expect("hw.* sysctls exist on macOS");
        assert!(findings.line_bytes.unwrap_or(0) >= 64);
        assert!(findings.physical_cores.unwrap_or(0) >= 1);
    }

    #[test]
    fn unknown_name_is_none() {
        assert_eq!(sysctl_u64(c"hw.no_such_cache"), None);
    }
}
