//! Error types for seqvec.
//!
//! Every failure surfaces as one of four kinds (config, io, format,
//! resource) and renders as a single line whose first word is the kind,
//! which is what the binary prints to stderr.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur in seqvec operations.
#[derive(Debug, Error)]
pub enum SeqVecError {
    /// K-mer size is outside the valid range.
    #[error("config error: invalid k-mer size {k}: must be between 1 and {max}")]
    InvalidKmerSize { k: usize, max: usize },

    /// Failed to open, read, write, or map a file.
    #[error("io error: {path}: {source}")]
    Io {
        #[source]
        source: io::Error,
        path: PathBuf,
    },

    /// A sequence record could not be parsed, or the output bookkeeping for
    /// a record was violated.
    #[error("format error: record {record}: {details}")]
    MalformedRecord { record: u64, details: String },

    /// Failed to set up the worker pool.
    #[error("resource error: {details}")]
    Resource { details: String },
}

impl SeqVecError {
    /// Wraps an I/O error together with the path it occurred on.
    pub fn io(source: io::Error, path: &Path) -> Self {
        Self::Io {
            source,
            path: path.to_path_buf(),
        }
    }

    /// Exit code for the binary: usage problems exit 1, runtime failures 2.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidKmerSize { .. } => 1,
            _ => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_kmer_size_display() {
        let err = SeqVecError::InvalidKmerSize { k: 16, max: 15 };
        assert_eq!(
            err.to_string(),
            "config error: invalid k-mer size 16: must be between 1 and 15"
        );
    }

    #[test]
    fn malformed_record_display() {
        let err = SeqVecError::MalformedRecord {
            record: 17,
            details: "missing quality line".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "format error: record 17: missing quality line"
        );
    }

    #[test]
    fn io_display_includes_path() {
        let err = SeqVecError::io(
            io::Error::new(io::ErrorKind::NotFound, "no such file"),
            Path::new("reads.fq"),
        );
        let rendered = err.to_string();
        assert!(rendered.starts_with("io error: reads.fq"));
        assert!(rendered.contains("no such file"));
    }

    #[test]
    fn error_messages_are_single_line() {
        let errors = [
            SeqVecError::InvalidKmerSize { k: 0, max: 15 },
            SeqVecError::io(io::Error::other("boom"), Path::new("x.fa")),
            SeqVecError::MalformedRecord {
                record: 0,
                details: "truncated".to_string(),
            },
            SeqVecError::Resource {
                details: "thread pool".to_string(),
            },
        ];
        for err in errors {
            assert!(!err.to_string().contains('\n'));
        }
    }

    #[test]
    fn exit_codes() {
        assert_eq!(
            SeqVecError::InvalidKmerSize { k: 99, max: 15 }.exit_code(),
            1
        );
        assert_eq!(
            SeqVecError::Resource {
                details: String::new()
            }
            .exit_code(),
            2
        );
    }
}
