//! # seqvec
//!
//! seqvec turns DNA reads into numeric feature vectors: for every sequence
//! in a FASTA or FASTQ file (optionally gzipped) it computes the normalized
//! frequency of each canonical k-mer and writes one fixed-width text line
//! per sequence, in input order.
//!
//! A k-mer and its reverse complement count as the same feature, so the
//! profile of a read is identical to the profile of its reverse complement.
//! `N` and any other non-`ACGT` byte breaks the sliding window rather than
//! producing an error.
//!
//! seqvec uses [`rayon`](https://docs.rs/rayon) for its worker pool,
//! [`memmap2`](https://docs.rs/memmap2) for zero-copy input and pre-sized
//! random-access output, and [`flate2`](https://docs.rs/flate2) for gzip.
//!
//! Vectorize a file from the command line:
//!
//! ```bash
//! seqvec -f reads.fa -o vectors.csv -k 4 -t 8
//! ```
//!
//! or from code:
//!
//! ```rust,no_run
//! use seqvec::run::{vectorize, VectorizeOptions};
//! use std::path::Path;
//!
//! let options = VectorizeOptions { k: 4, ..VectorizeOptions::default() };
//! let summary = vectorize(Path::new("reads.fa"), Path::new("vectors.csv"), &options)?;
//! println!("{} records x {} features", summary.records, summary.feature_count);
//! # Ok::<(), seqvec::error::SeqVecError>(())
//! ```

pub mod cli;
pub mod error;
pub mod format;
pub mod index;
pub mod pipeline;
pub mod profile;
pub mod progress;
pub mod run;
pub mod source;
pub mod writer;

pub use error::SeqVecError;
pub use index::CanonicalIndex;
pub use profile::KmerProfiler;
pub use run::{vectorize, VectorizeOptions, VectorizeSummary};
pub use source::{Record, SequenceSource};
