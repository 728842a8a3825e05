//! Fuzz operator-supplied pattern and kernel selections.
//!
//! Any string must either be rejected with an error or yield kernels whose
//! patterns respect the per-side bound and move at least one element.
#![no_main]

use libfuzzer_sys::fuzz_target;
use ultramem::pattern::{parse_selection, AccessPattern, MAX_OPS_PER_ELEMENT};

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(p) = s.parse::<AccessPattern>() {
        assert!(p.reads() <= MAX_OPS_PER_ELEMENT);
        assert!(p.writes() <= MAX_OPS_PER_ELEMENT);
        assert!(p.reads() + p.writes() > 0);
        // Display round-trips to an equal pattern.
        assert_eq!(p.to_string().parse::<AccessPattern>(), Ok(p));
    }

    if let Ok(kernels) = parse_selection(s) {
        assert!(!kernels.is_empty());
        for k in kernels {
            let bytes = k.workload.bytes_per_element();
            assert!((8..=1600).contains(&bytes), "{} moves {bytes} bytes", k.label);
        }
    }
});
