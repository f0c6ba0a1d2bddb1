//! Fuzz target for the k-mer profiler.
//!
//! Arbitrary bytes must never panic, and the resulting profile must either
//! be all-zero (no valid window) or sum to 1 within tolerance.

#![no_main]

use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use seqvec::index::CanonicalIndex;
use seqvec::profile::KmerProfiler;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    // Derive k from the first byte, profile the rest.
    let k = (data[0] as usize % 8) + 1;
    let bases = &data[1..];

    let profiler = KmerProfiler::new(Arc::new(CanonicalIndex::build(k).unwrap()));
    let profile = profiler.profile(bases);

    assert_eq!(profile.len(), profiler.index().feature_count());

    let total: f64 = profile.iter().sum();
    assert!(
        total == 0.0 || (total - 1.0).abs() < 1e-9,
        "profile sum {} is neither 0 nor 1",
        total
    );
    assert!(profile.iter().all(|&v| (0.0..=1.0).contains(&v)));
});
