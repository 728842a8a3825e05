//! CPU and memory cost of a trial series.
//!
//! A bandwidth number alone cannot tell a memory-bound run from one whose
//! workers were descheduled. Each series therefore also records how much CPU
//! the process burned relative to its wall time (roughly the number of busy
//! workers) and the process peak RSS, which should sit above the working-set
//! size once all three arrays are committed.
//!
//! Usage is sampled with `getrusage(RUSAGE_SELF)` once before and once after
//! a series, never inside a timed trial. Targets without `getrusage` report
//! zeros.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::topology::MIB;

/// Cumulative process counters at one instant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CpuSnapshot {
    pub user: Duration,
    pub sys: Duration,
    /// Process high-water mark. Only ever grows.
    pub peak_rss_bytes: u64,
}

impl CpuSnapshot {
    /// Samples the current process.
    pub fn now() -> Self {
        sample()
    }
}

/// What one trial series cost the process.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct SeriesUsage {
    pub wall_secs: f64,
    /// User plus system CPU time over the series.
    pub cpu_secs: f64,
    pub sys_secs: f64,
    /// `cpu_secs / wall_secs`. Close to the thread count when every worker
    /// stayed busy; 0 when the wall time is zero.
    pub utilisation: f64,
    pub peak_rss_bytes: u64,
}

impl SeriesUsage {
    /// Usage between two snapshots taken `wall` apart.
    pub fn between(start: &CpuSnapshot, end: &CpuSnapshot, wall: Duration) -> Self {
        let user = end.user.saturating_sub(start.user);
        let sys = end.sys.saturating_sub(start.sys);
        let cpu_secs = (user + sys).as_secs_f64();
        let wall_secs = wall.as_secs_f64();
        let utilisation = if wall_secs > 0.0 {
            cpu_secs / wall_secs
        } else {
            0.0
        };
        Self {
            wall_secs,
            cpu_secs,
            sys_secs: sys.as_secs_f64(),
            utilisation,
            peak_rss_bytes: end.peak_rss_bytes.max(start.peak_rss_bytes),
        }
    }

    /// True when the process peak RSS covers `bytes`. False when RSS is
    /// unavailable.
    pub fn rss_covers(&self, bytes: u64) -> bool {
        self.peak_rss_bytes >= bytes
    }
}

impl fmt::Display for SeriesUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "wall {:.3}s, cpu {:.3}s (sys {:.3}s), {:.1}x busy, peak RSS {} MB",
            self.wall_secs,
            self.cpu_secs,
            self.sys_secs,
            self.utilisation,
            self.peak_rss_bytes / MIB
        )
    }
}

/// Units of `ru_maxrss`: bytes on macOS, KiB elsewhere.
#[cfg(target_os = "macos")]
const MAXRSS_UNIT: u64 = 1;
#[cfg(all(unix, not(target_os = "macos")))]
const MAXRSS_UNIT: u64 = 1024;

#[cfg(unix)]
fn duration_of(tv: libc::timeval) -> Duration {
    let secs = u64::try_from(tv.tv_sec).unwrap_or(0);
    let micros = u32::try_from(tv.tv_usec).unwrap_or(0).min(999_999);
    Duration::new(secs, micros * 1_000)
}

#[cfg(unix)]
fn sample() -> CpuSnapshot {
    // SAFETY: all-zero is a valid rusage, and it is only read on success.
    let mut ru: libc::rusage = unsafe { std::mem::zeroed() };
    // SAFETY: `ru` is a valid out-parameter for the duration of the call.
    if unsafe { libc::getrusage(libc::RUSAGE_SELF, &mut ru) } != 0 {
        log::debug!("getrusage failed, reporting zero usage");
        return CpuSnapshot::default();
    }
    CpuSnapshot {
        user: duration_of(ru.ru_utime),
        sys: duration_of(ru.ru_stime),
        peak_rss_bytes: u64::try_from(ru.ru_maxrss)
            .unwrap_or(0)
            .saturating_mul(MAXRSS_UNIT),
    }
}

#[cfg(not(unix))]
fn sample() -> CpuSnapshot {
    CpuSnapshot::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(user_ms: u64, sys_ms: u64, rss: u64) -> CpuSnapshot {
        CpuSnapshot {
            user: Duration::from_millis(user_ms),
            sys: Duration::from_millis(sys_ms),
            peak_rss_bytes: rss,
        }
    }

    #[test]
    fn utilisation_is_cpu_over_wall() {
        let u = SeriesUsage::between(
            &snap(100, 20, 64 * MIB),
            &snap(1_700, 220, 448 * MIB),
            Duration::from_millis(250),
        );
        assert!((u.cpu_secs - 1.8).abs() < 1e-12);
        assert!((u.sys_secs - 0.2).abs() < 1e-12);
        assert!((u.utilisation - 7.2).abs() < 1e-9);
        assert_eq!(u.peak_rss_bytes, 448 * MIB);
        assert!(u.rss_covers(384 * MIB));
        assert!(!u.rss_covers(512 * MIB));
    }

    #[test]
    fn zero_wall_time_reports_zero_utilisation() {
        let u = SeriesUsage::between(&snap(0, 0, 0), &snap(5, 0, 0), Duration::ZERO);
        assert_eq!(u.utilisation, 0.0);
    }

    #[test]
    fn counters_running_backwards_saturate() {
        let u = SeriesUsage::between(&snap(90, 9, 0), &snap(40, 3, 0), Duration::from_secs(1));
        assert_eq!(u.cpu_secs, 0.0);
    }

    #[test]
    fn display_is_one_line() {
        let u = SeriesUsage::between(
            &snap(0, 0, 0),
            &snap(3_000, 500, 400 * MIB),
            Duration::from_millis(500),
        );
        assert_eq!(
            u.to_string(),
            "wall 0.500s, cpu 3.500s (sys 0.500s), 7.0x busy, peak RSS 400 MB"
        );
    }

    #[test]
    #[cfg(unix)]
    fn negative_timeval_fields_clamp_to_zero() {
        let tv = libc::timeval {
            tv_sec: -5,
            tv_usec: -1,
        };
        assert_eq!(duration_of(tv), Duration::ZERO);
    }

    #[test]
    #[cfg(unix)]
    fn host_peak_rss_grows_with_touched_memory() {
        let before = CpuSnapshot::now();
        let v = vec![1u8; 32 * MIB as usize];
        std::hint::black_box(&v);
        let after = CpuSnapshot::now();
        assert!(after.peak_rss_bytes >= before.peak_rss_bytes);
        assert!(after.peak_rss_bytes >= 32 * MIB);
        assert!(after.user >= before.user);
    }
}
