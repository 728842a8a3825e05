//! Fuzz the sysfs cache-size and `/proc/cpuinfo` parsers.
//!
//! Both read text the kernel controls, so arbitrary input must never panic
//! and must never produce a zero value (zero means "unknown" and is
//! expressed as `None`).
#![no_main]

use libfuzzer_sys::fuzz_target;
use ultramem::topology::sysfs::{count_physical_cores, parse_cache_size};

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    if let Some(size) = parse_cache_size(&text) {
        assert!(size > 0);
    }
    if let Some(cores) = count_physical_cores(&text) {
        assert!(cores > 0);
    }
});
