//! Property tests for the working-set sizing rule.

use proptest::prelude::*;

use ultramem::sizing::{decide_size, SizeSource, ARRAY_MIB_MAX, ARRAY_MIB_MIN};
use ultramem::topology::{CacheTopology, MIB};

fn topology_with_l3(l3_bytes: u64) -> CacheTopology {
    CacheTopology {
        l3_bytes,
        ..CacheTopology::default()
    }
}

proptest! {
    #[test]
    fn auto_size_follows_rule(l3_mib in 1u64..4096) {
        let d = decide_size(&topology_with_l3(l3_mib * MIB), None).unwrap();
        prop_assert_eq!(d.per_array_mib, (l3_mib * 4 / 3).max(128));
        prop_assert_eq!(d.source, SizeSource::Auto);
        prop_assert_eq!(d.element_count as u64, d.per_array_mib * MIB / 8);
        prop_assert!(d.per_array_mib >= 128);
    }

    #[test]
    fn auto_size_escapes_l3(l3_bytes in 1u64..4096 * MIB) {
        let t = topology_with_l3(l3_bytes);
        let d = decide_size(&t, None).unwrap();
        // Integer MiB rounding can lose at most a few MiB of the 4x target.
        prop_assert!(d.total_bytes() + 4 * MIB >= 4 * (l3_bytes / MIB) * MIB);
        prop_assert!(d.total_bytes() > t.l3_bytes);
    }

    #[test]
    fn operator_size_is_used_verbatim(mib in ARRAY_MIB_MIN..=ARRAY_MIB_MAX, l3_mib in 1u64..4096) {
        let d = decide_size(&topology_with_l3(l3_mib * MIB), Some(mib)).unwrap();
        prop_assert_eq!(d.per_array_mib, mib);
        prop_assert_eq!(d.source, SizeSource::Operator);
        prop_assert_eq!(d.bytes_per_array(), mib * MIB);
    }

    #[test]
    fn operator_size_out_of_range_is_rejected(mib in (ARRAY_MIB_MAX + 1)..u64::MAX) {
        prop_assert!(decide_size(&CacheTopology::default(), Some(mib)).is_err());
    }
}

#[test]
fn default_l3_gives_128_mib_floor() {
    let d = decide_size(&CacheTopology::default(), None).unwrap();
    assert_eq!(d.per_array_mib, 128);
    assert!(decide_size(&CacheTopology::default(), Some(0)).is_err());
}
