//! Tests for gzip compressed input support.

#![allow(clippy::unwrap_used)]

use std::io::Write;

use flate2::{write::GzEncoder, Compression};
use seqvec::run::{vectorize, VectorizeOptions};
use tempfile::NamedTempFile;

fn gzip_file(contents: &[u8]) -> NamedTempFile {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(contents).unwrap();
    let compressed = encoder.finish().unwrap();

    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&compressed).unwrap();
    file.flush().unwrap();
    file
}

fn plain_file(contents: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents).unwrap();
    file.flush().unwrap();
    file
}

fn options(k: usize) -> VectorizeOptions {
    VectorizeOptions {
        k,
        threads: 1,
        ..VectorizeOptions::default()
    }
}

#[test]
fn gzipped_fasta_matches_plain_fasta() {
    let fasta: &[u8] = b">a\nACGTACGT\n>b\nTTTTAAAA\n";
    let plain = plain_file(fasta);
    let gzipped = gzip_file(fasta);

    let plain_out = NamedTempFile::new().unwrap();
    let gzip_out = NamedTempFile::new().unwrap();

    let plain_summary = vectorize(plain.path(), plain_out.path(), &options(3)).unwrap();
    let gzip_summary = vectorize(gzipped.path(), gzip_out.path(), &options(3)).unwrap();

    assert_eq!(plain_summary.records, 2);
    assert_eq!(gzip_summary.records, 2);
    // Plain files get the counted, mmapped output; gzip streams.
    assert!(plain_summary.random_access);
    assert!(!gzip_summary.random_access);

    // With one worker the streaming sink writes in read order, so the
    // outputs are byte-identical.
    assert_eq!(
        std::fs::read(plain_out.path()).unwrap(),
        std::fs::read(gzip_out.path()).unwrap()
    );
}

#[test]
fn gzipped_fastq_roundtrip() {
    let fastq: &[u8] = b"@r0\nACGT\n+\nIIII\n@r1\nGGCC\n+\nIIII\n";
    let gzipped = gzip_file(fastq);
    let output = NamedTempFile::new().unwrap();

    let summary = vectorize(gzipped.path(), output.path(), &options(2)).unwrap();
    assert_eq!(summary.records, 2);

    let contents = std::fs::read_to_string(output.path()).unwrap();
    assert_eq!(contents.lines().count(), 2);
}

#[test]
fn truncated_gzip_stream_is_an_io_error() {
    let fasta: &[u8] = b">a\nACGTACGT\n";
    let gzipped = gzip_file(fasta);
    let bytes = std::fs::read(gzipped.path()).unwrap();
    // Cut the stream mid-way, keeping the magic intact.
    let truncated = plain_file(&bytes[..bytes.len() / 2]);
    let output = NamedTempFile::new().unwrap();

    let err = vectorize(truncated.path(), output.path(), &options(2)).unwrap_err();
    assert!(err.to_string().starts_with("io error"));
}
