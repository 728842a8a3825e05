//! Property tests for static partitioning.

use proptest::prelude::*;

use ultramem::static_partition;

proptest! {
    #[test]
    fn chunks_are_contiguous_disjoint_and_covering(len in 0usize..1_000_000, parts in 1usize..=1024) {
        let mut next = 0;
        for i in 0..parts {
            let r = static_partition(len, parts, i);
            prop_assert_eq!(r.start, next);
            prop_assert!(r.start <= r.end);
            next = r.end;
        }
        prop_assert_eq!(next, len);
    }

    #[test]
    fn chunk_sizes_differ_by_at_most_one(len in 0usize..1_000_000, parts in 1usize..=1024) {
        let sizes: Vec<usize> = (0..parts).map(|i| static_partition(len, parts, i).len()).collect();
        let min = *sizes.iter().min().unwrap();
        let max = *sizes.iter().max().unwrap();
        prop_assert!(max - min <= 1);
        // Larger chunks come first.
        prop_assert!(sizes.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn assignment_is_deterministic(len in 0usize..1_000_000, parts in 1usize..=1024, index in 0usize..1024) {
        prop_assert_eq!(static_partition(len, parts, index), static_partition(len, parts, index));
    }
}
