//! Fuzz target for the streaming FASTA/FASTQ parser.
//!
//! Arbitrary bytes must never panic: every input either parses into
//! records with contiguous ids or fails with a structured error.

#![no_main]

use std::io::Cursor;
use std::path::Path;

use libfuzzer_sys::fuzz_target;
use seqvec::source::StreamingReader;

fuzz_target!(|data: &[u8]| {
    let mut reader =
        StreamingReader::from_reader(Box::new(Cursor::new(data.to_vec())), Path::new("<fuzz>"));

    let mut expected_id = 0;
    loop {
        match reader.next() {
            Ok(Some(record)) => {
                assert_eq!(record.id, expected_id, "record ids must be contiguous");
                expected_id += 1;
            }
            Ok(None) => break,
            Err(_) => break,
        }
    }
});
