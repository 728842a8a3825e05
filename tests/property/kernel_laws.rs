//! Property tests for the bandwidth kernel.
//!
//! The kernel is checked against a scalar reference that applies the same
//! per-index arithmetic in the same order, so results must match bit for bit
//! whenever the per-index computation does not involve a cross-index
//! reduction.

use std::sync::OnceLock;

use proptest::prelude::*;

use ultramem::kernel;
use ultramem::{AccessPattern, WorkerPool, WorkingSet, Workload};

/// Pools of 1, 8 and 64 workers, shared by every case.
fn pools() -> &'static [WorkerPool; 3] {
    static POOLS: OnceLock<[WorkerPool; 3]> = OnceLock::new();
    POOLS.get_or_init(|| {
        [
            WorkerPool::new(1).unwrap(),
            WorkerPool::new(8).unwrap(),
            WorkerPool::new(64).unwrap(),
        ]
    })
}

fn pattern_strategy() -> impl Strategy<Value = AccessPattern> {
    (0u32..=100, 0u32..=100)
        .prop_filter("reads and writes cannot both be 0", |&(r, w)| r + w > 0)
        .prop_map(|(r, w)| AccessPattern::new(r, w).unwrap())
}

fn arrays_strategy() -> impl Strategy<Value = [Vec<f64>; 3]> {
    (1usize..200).prop_flat_map(|n| {
        let col = || prop::collection::vec(-1.0e3f64..1.0e3, n);
        (col(), col(), col()).prop_map(|(a, b, c)| [a, b, c])
    })
}

/// Scalar reference: returns final buffers and the read-only sum.
fn reference(mut bufs: [Vec<f64>; 3], p: AccessPattern) -> ([Vec<f64>; 3], f64) {
    let n = bufs[0].len();
    let mut sum = 0.0;
    for i in 0..n {
        let mut acc = 0.0;
        for r in 0..p.reads() as usize {
            acc += bufs[r % 3][i];
        }
        for w in 0..p.writes() as usize {
            bufs[w % 3][i] = acc / (w + 1) as f64;
        }
        sum += acc;
    }
    (bufs, if p.is_read_only() { sum } else { 0.0 })
}

fn working_set(bufs: &[Vec<f64>; 3]) -> WorkingSet {
    WorkingSet::from_arrays(&bufs[0], &bufs[1], &bufs[2], 64).unwrap()
}

fn contents(ws: &WorkingSet) -> [Vec<f64>; 3] {
    [ws.a().to_vec(), ws.b().to_vec(), ws.c().to_vec()]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn elementwise_law_holds(p in pattern_strategy(), bufs in arrays_strategy(), pool_idx in 0usize..3) {
        let pool = &pools()[pool_idx];
        let mut ws = working_set(&bufs);
        let witness = kernel::run(pool, &mut ws, &Workload::Pattern(p));
        // Partial sums may be grouped differently; bound the drift by the
        // largest possible magnitude of the summed terms.
        let tol = 1e-9 * bufs[0].len() as f64 * f64::from(p.reads()) * 1e3;
        let (expected, expected_sum) = reference(bufs, p);

        prop_assert_eq!(contents(&ws), expected);
        if p.is_read_only() {
            prop_assert!((witness - expected_sum).abs() <= tol,
                "witness {} vs reference {}", witness, expected_sum);
        } else {
            prop_assert_eq!(witness, 0.0);
        }
    }

    #[test]
    fn final_contents_do_not_depend_on_thread_count(p in pattern_strategy(), bufs in arrays_strategy()) {
        let outputs: Vec<_> = pools()
            .iter()
            .map(|pool| {
                let mut ws = working_set(&bufs);
                kernel::run(pool, &mut ws, &Workload::Pattern(p));
                contents(&ws)
            })
            .collect();
        prop_assert_eq!(&outputs[0], &outputs[1]);
        prop_assert_eq!(&outputs[0], &outputs[2]);
    }

    #[test]
    fn read_only_witness_is_reproducible(reads in 1u32..=100, bufs in arrays_strategy(), pool_idx in 0usize..3) {
        let pool = &pools()[pool_idx];
        let p = AccessPattern::new(reads, 0).unwrap();
        let mut ws = working_set(&bufs);
        let first = kernel::run(pool, &mut ws, &Workload::Pattern(p));
        let second = kernel::run(pool, &mut ws, &Workload::Pattern(p));
        prop_assert_eq!(first, second);
        prop_assert_eq!(contents(&ws), bufs);
    }

    #[test]
    fn block_copy_only_touches_c(bufs in arrays_strategy(), pool_idx in 0usize..3) {
        let pool = &pools()[pool_idx];
        let mut ws = working_set(&bufs);
        prop_assert_eq!(kernel::run(pool, &mut ws, &Workload::BlockCopy), 0.0);
        prop_assert_eq!(ws.a(), bufs[0].as_slice());
        prop_assert_eq!(ws.b(), bufs[1].as_slice());
        prop_assert_eq!(ws.c(), bufs[0].as_slice());
    }
}
