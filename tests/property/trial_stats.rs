//! Property tests for trial statistics.

use std::time::Duration;

use proptest::prelude::*;

use ultramem::TrialSeries;

fn series(warmup: Duration, measured: &[Duration]) -> TrialSeries {
    let mut s = TrialSeries::default();
    s.push(warmup);
    for &d in measured {
        s.push(d);
    }
    s
}

proptest! {
    #[test]
    fn warmup_never_affects_summary(
        measured in prop::collection::vec(1u64..10_000_000, 1..50),
        warm_a in 0u64..u64::from(u32::MAX),
        warm_b in 0u64..u64::from(u32::MAX),
        bytes in 1u64..(1 << 40),
    ) {
        let measured: Vec<Duration> = measured.into_iter().map(Duration::from_nanos).collect();
        let a = series(Duration::from_nanos(warm_a), &measured).summarize(bytes).unwrap();
        let b = series(Duration::from_nanos(warm_b), &measured).summarize(bytes).unwrap();
        prop_assert_eq!(a, b);
        prop_assert_eq!(a.measured, measured.len());
    }

    #[test]
    fn best_is_at_least_average(
        measured in prop::collection::vec(1u64..10_000_000, 1..50),
        bytes in 1u64..(1 << 40),
    ) {
        let measured: Vec<Duration> = measured.into_iter().map(Duration::from_nanos).collect();
        let s = series(Duration::ZERO, &measured).summarize(bytes).unwrap();
        prop_assert!(s.min_time <= s.avg_time * (1.0 + 1e-12));
        prop_assert!(s.avg_time <= s.max_time * (1.0 + 1e-12));
        prop_assert!(s.best_mbps.is_finite() && s.best_mbps > 0.0);
        prop_assert!(s.best_mbps >= s.avg_mbps * (1.0 - 1e-12));
    }
}
