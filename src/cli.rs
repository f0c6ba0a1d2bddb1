//! Command-line interface definition.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::index::MAX_K;

/// Fast sequence vectorization: one normalized canonical k-mer frequency
/// profile per input sequence, written as fixed-width text.
///
/// # Examples
///
/// ```bash
/// # Vectorize a FASTA file with the default k=3
/// seqvec -f reads.fa -o vectors.csv
///
/// # Larger k, tab-separated output, 16 workers
/// seqvec -f reads.fq.gz -o vectors.tsv -k 7 -x tsv -t 16
/// ```
#[derive(Parser, Debug)]
#[command(name = "seqvec")]
#[command(version, about = "Fast sequence vectorization via canonical k-mer profiles", long_about = None)]
pub struct Args {
    /// Input FASTA/FASTQ file, optionally gzipped
    #[arg(short = 'f', long = "file")]
    pub file: PathBuf,

    /// Output vectors path
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,

    /// K-mer size (1-15)
    #[arg(short = 'k', long = "k-size", default_value = "3", value_parser = parse_k)]
    pub k_size: usize,

    /// Worker thread count
    #[arg(short = 't', long = "threads", default_value = "8", value_parser = parse_threads)]
    pub threads: usize,

    /// Output preset
    #[arg(short = 'x', long = "preset", value_enum, default_value = "csv")]
    pub preset: OutputPreset,
}

/// Output column separator preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputPreset {
    /// Comma-separated values
    #[default]
    Csv,
    /// Tab-separated values
    Tsv,
}

impl OutputPreset {
    /// The separator byte this preset puts between values.
    #[must_use]
    pub const fn separator(self) -> u8 {
        match self {
            Self::Csv => b',',
            Self::Tsv => b'\t',
        }
    }
}

impl std::fmt::Display for OutputPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Csv => write!(f, "csv"),
            Self::Tsv => write!(f, "tsv"),
        }
    }
}

fn parse_k(s: &str) -> Result<usize, String> {
    let k: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if k == 0 {
        return Err("k-mer size must be at least 1".to_string());
    }
    if k > MAX_K {
        return Err(format!("k-mer size must be at most {MAX_K}"));
    }
    Ok(k)
}

fn parse_threads(s: &str) -> Result<usize, String> {
    let threads: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if threads == 0 {
        return Err("thread count must be at least 1".to_string());
    }
    Ok(threads)
}
