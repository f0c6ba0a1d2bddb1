//! Fuzz target for the bit-parallel reverse complement.
//!
//! Checks the involution property and that the result stays within the
//! `2k`-bit code space for every k.

#![no_main]

use libfuzzer_sys::fuzz_target;
use seqvec::index::reverse_complement;

fuzz_target!(|data: &[u8]| {
    if data.len() < 9 {
        return;
    }

    let k = (data[0] as usize % 15) + 1;
    let mask = (1u64 << (2 * k)) - 1;
    let code = u64::from_le_bytes([
        data[1], data[2], data[3], data[4], data[5], data[6], data[7], data[8],
    ]) & mask;

    let rc = reverse_complement(code, k);
    assert!(rc <= mask, "reverse complement escaped the code space");
    assert_eq!(
        reverse_complement(rc, k),
        code,
        "reverse complement is not an involution"
    );
});
