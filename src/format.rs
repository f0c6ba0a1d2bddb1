//! Input format detection.
//!
//! Both readers detect the sequence format from content rather than file
//! extension: the first byte of the first record is `>` for FASTA and `@`
//! for FASTQ. Gzip compression is likewise sniffed from the two magic bytes
//! at the start of the file.

/// Sequence file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceFormat {
    /// FASTA: `>header` lines followed by one or more base lines.
    Fasta,
    /// FASTQ: four-line records (`@header`, bases, `+`, quality).
    Fastq,
}

impl SequenceFormat {
    /// Detects the format from the first byte of the first record.
    ///
    /// # Examples
    ///
    /// ```
    /// use seqvec::format::SequenceFormat;
    ///
    /// assert_eq!(SequenceFormat::from_leading_byte(b'>'), Some(SequenceFormat::Fasta));
    /// assert_eq!(SequenceFormat::from_leading_byte(b'@'), Some(SequenceFormat::Fastq));
    /// assert_eq!(SequenceFormat::from_leading_byte(b'A'), None);
    /// ```
    #[must_use]
    pub const fn from_leading_byte(byte: u8) -> Option<Self> {
        match byte {
            b'>' => Some(Self::Fasta),
            b'@' => Some(Self::Fastq),
            _ => None,
        }
    }

    /// Returns `true` if this format is FASTQ.
    #[must_use]
    pub const fn is_fastq(self) -> bool {
        matches!(self, Self::Fastq)
    }

    /// Returns `true` if this format is FASTA.
    #[must_use]
    pub const fn is_fasta(self) -> bool {
        matches!(self, Self::Fasta)
    }
}

impl std::fmt::Display for SequenceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fasta => write!(f, "fasta"),
            Self::Fastq => write!(f, "fastq"),
        }
    }
}

/// Magic bytes at the start of a gzip stream.
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Returns `true` if `prefix` starts with the gzip magic bytes.
#[must_use]
pub fn is_gzip(prefix: &[u8]) -> bool {
    prefix.len() >= 2 && prefix[..2] == GZIP_MAGIC
}
