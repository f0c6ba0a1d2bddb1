//! Sequence input: streaming and memory-mapped readers.
//!
//! A [`SequenceSource`] yields one [`Record`] at a time from FASTA or FASTQ
//! input and optionally knows the total record count up front. Plain files
//! go through the memory-mapped reader, which can count records cheaply by
//! scanning for delimiters; gzipped files go through the streaming reader,
//! whose count is unknown without decompressing the whole stream.
//!
//! Record ids are assigned monotonically from 0 at yield time and are
//! contiguous; the id doubles as the output row index in random-access mode.

use std::{
    fs::File,
    io::{BufRead, BufReader, Read},
    path::{Path, PathBuf},
};

use bytes::Bytes;
use flate2::read::GzDecoder;
use memmap2::Mmap;
use tracing::debug;

use crate::{
    error::SeqVecError,
    format::{is_gzip, SequenceFormat},
};

/// One input sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Zero-based, contiguous record index.
    pub id: u64,
    /// Header text without the leading `>` or `@`.
    pub header: String,
    /// Raw base bytes with line breaks removed. May contain any byte the
    /// input contained; validation happens in the profiler.
    pub bases: Bytes,
}

/// Polymorphic sequence reader.
#[derive(Debug)]
pub enum SequenceSource {
    /// Line-oriented reader over a buffered (possibly gzip) stream.
    Streaming(StreamingReader),
    /// Byte-scanning reader over a read-only memory map.
    Mapped(MappedReader),
}

impl SequenceSource {
    /// Opens `path`, choosing the reader from the file's leading bytes:
    /// gzipped input streams through a decoder, everything else is
    /// memory-mapped.
    pub fn open(path: &Path) -> Result<Self, SeqVecError> {
        let mut file = File::open(path).map_err(|e| SeqVecError::io(e, path))?;
        let mut magic = [0u8; 2];
        let got = read_prefix(&mut file, &mut magic).map_err(|e| SeqVecError::io(e, path))?;
        drop(file);

        if got == 2 && is_gzip(&magic) {
            debug!(path = %path.display(), "gzip magic found, using streaming reader");
            Ok(Self::Streaming(StreamingReader::open(path)?))
        } else {
            debug!(path = %path.display(), "using memory-mapped reader");
            Ok(Self::Mapped(MappedReader::open(path)?))
        }
    }

    /// Forces the streaming reader regardless of compression.
    pub fn streaming(path: &Path) -> Result<Self, SeqVecError> {
        Ok(Self::Streaming(StreamingReader::open(path)?))
    }

    /// Forces the memory-mapped reader. The file must not be gzipped.
    pub fn mapped(path: &Path) -> Result<Self, SeqVecError> {
        Ok(Self::Mapped(MappedReader::open(path)?))
    }

    /// Replaces every header with `seq_<id>` when enabled.
    #[must_use]
    pub fn with_synthetic_headers(mut self, enabled: bool) -> Self {
        match &mut self {
            Self::Streaming(reader) => reader.synthetic = enabled,
            Self::Mapped(reader) => reader.synthetic = enabled,
        }
        self
    }

    /// Yields the next record, or `None` at end of input.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<Option<Record>, SeqVecError> {
        match self {
            Self::Streaming(reader) => reader.next(),
            Self::Mapped(reader) => reader.next(),
        }
    }

    /// Total record count, when it can be computed without consuming the
    /// read cursor. `None` for streaming input.
    #[must_use]
    pub fn count(&self) -> Option<u64> {
        match self {
            Self::Streaming(_) => None,
            Self::Mapped(reader) => Some(reader.count()),
        }
    }
}

/// A line with its terminator stripped. `terminated` distinguishes a final
/// line cut off at end of file from a properly newline-ended one.
#[derive(Debug)]
struct Line {
    text: String,
    terminated: bool,
}

/// Line-oriented FASTA/FASTQ reader over any byte stream.
pub struct StreamingReader {
    reader: BufReader<Box<dyn Read + Send>>,
    format: Option<SequenceFormat>,
    lookahead: Option<Line>,
    next_id: u64,
    synthetic: bool,
    done: bool,
    path: PathBuf,
}

impl std::fmt::Debug for StreamingReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingReader")
            .field("path", &self.path)
            .field("format", &self.format)
            .field("next_id", &self.next_id)
            .finish_non_exhaustive()
    }
}

impl StreamingReader {
    /// Opens `path`, sniffing the gzip magic to decide whether to wrap the
    /// file in a decoder.
    pub fn open(path: &Path) -> Result<Self, SeqVecError> {
        let mut file = File::open(path).map_err(|e| SeqVecError::io(e, path))?;
        let mut magic = [0u8; 2];
        let got = read_prefix(&mut file, &mut magic).map_err(|e| SeqVecError::io(e, path))?;
        drop(file);

        // Reopen so the decoder sees the stream from the start.
        let file = File::open(path).map_err(|e| SeqVecError::io(e, path))?;
        let inner: Box<dyn Read + Send> = if got == 2 && is_gzip(&magic) {
            Box::new(GzDecoder::new(file))
        } else {
            Box::new(file)
        };
        Ok(Self::from_reader(inner, path))
    }

    /// Wraps an arbitrary byte stream. `label` is used in error messages.
    #[must_use]
    pub fn from_reader(reader: Box<dyn Read + Send>, label: &Path) -> Self {
        Self {
            reader: BufReader::new(reader),
            format: None,
            lookahead: None,
            next_id: 0,
            synthetic: false,
            done: false,
            path: label.to_path_buf(),
        }
    }

    /// Yields the next record, or `None` at end of stream.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<Option<Record>, SeqVecError> {
        if self.done {
            return Ok(None);
        }
        let Some(first) = self.next_content_line()? else {
            self.done = true;
            return Ok(None);
        };

        let format = match self.format {
            Some(format) => format,
            None => {
                let leading = first.text.as_bytes()[0];
                let format = SequenceFormat::from_leading_byte(leading).ok_or_else(|| {
                    SeqVecError::MalformedRecord {
                        record: 0,
                        details: format!(
                            "unrecognized leading byte '{}': expected '>' or '@'",
                            leading as char
                        ),
                    }
                })?;
                debug!(path = %self.path.display(), %format, "detected input format");
                self.format = Some(format);
                format
            }
        };

        match format {
            SequenceFormat::Fasta => self.next_fasta(&first),
            SequenceFormat::Fastq => self.next_fastq(&first),
        }
    }

    fn next_fasta(&mut self, header: &Line) -> Result<Option<Record>, SeqVecError> {
        if !header.text.starts_with('>') {
            return Err(self.malformed("expected '>' header line"));
        }
        if !header.terminated {
            return Err(self.malformed("header line truncated at end of file"));
        }

        let mut bases = String::new();
        loop {
            match self.read_line()? {
                None => break,
                Some(line) if line.text.starts_with('>') => {
                    self.lookahead = Some(line);
                    break;
                }
                Some(line) => bases.push_str(&line.text),
            }
        }

        Ok(Some(self.emit(header.text[1..].to_string(), bases)))
    }

    fn next_fastq(&mut self, header: &Line) -> Result<Option<Record>, SeqVecError> {
        if !header.text.starts_with('@') {
            return Err(self.malformed("expected '@' header line"));
        }
        let bases = self
            .read_line()?
            .ok_or_else(|| self.malformed("truncated record: missing bases line"))?;
        let separator = self
            .read_line()?
            .ok_or_else(|| self.malformed("truncated record: missing '+' line"))?;
        if !separator.text.starts_with('+') {
            return Err(self.malformed("expected '+' separator line"));
        }
        // Quality is read to keep the stream aligned, then discarded.
        self.read_line()?
            .ok_or_else(|| self.malformed("truncated record: missing quality line"))?;

        Ok(Some(self.emit(header.text[1..].to_string(), bases.text)))
    }

    /// Next non-blank line, if any.
    fn next_content_line(&mut self) -> Result<Option<Line>, SeqVecError> {
        loop {
            match self.read_line()? {
                None => return Ok(None),
                Some(line) if line.text.is_empty() => {}
                Some(line) => return Ok(Some(line)),
            }
        }
    }

    fn read_line(&mut self) -> Result<Option<Line>, SeqVecError> {
        if let Some(line) = self.lookahead.take() {
            return Ok(Some(line));
        }
        let mut text = String::new();
        let read = self
            .reader
            .read_line(&mut text)
            .map_err(|e| SeqVecError::io(e, &self.path))?;
        if read == 0 {
            return Ok(None);
        }
        let terminated = text.ends_with('\n');
        while text.ends_with('\n') || text.ends_with('\r') {
            text.pop();
        }
        Ok(Some(Line { text, terminated }))
    }

    fn emit(&mut self, header: String, bases: String) -> Record {
        let id = self.next_id;
        self.next_id += 1;
        let header = if self.synthetic {
            format!("seq_{id}")
        } else {
            header
        };
        Record {
            id,
            header,
            bases: Bytes::from(bases.into_bytes()),
        }
    }

    fn malformed(&self, details: &str) -> SeqVecError {
        SeqVecError::MalformedRecord {
            record: self.next_id,
            details: details.to_string(),
        }
    }
}

/// Byte-scanning FASTA/FASTQ reader over a read-only memory map.
#[derive(Debug)]
pub struct MappedReader {
    mmap: Option<Mmap>,
    format: Option<SequenceFormat>,
    cursor: usize,
    next_id: u64,
    synthetic: bool,
    path: PathBuf,
}

impl MappedReader {
    /// Opens and maps `path` read-only.
    #[allow(unsafe_code)]
    pub fn open(path: &Path) -> Result<Self, SeqVecError> {
        let file = File::open(path).map_err(|e| SeqVecError::io(e, path))?;
        let len = file
            .metadata()
            .map_err(|e| SeqVecError::io(e, path))?
            .len();

        // Zero-length files cannot be mapped; represent them as empty input.
        let mmap = if len == 0 {
            None
        } else {
            // SAFETY: the mapping is read-only and we rely on the input file
            // not being modified while it is mapped.
            Some(unsafe { Mmap::map(&file) }.map_err(|e| SeqVecError::io(e, path))?)
        };

        let mut reader = Self {
            mmap,
            format: None,
            cursor: 0,
            next_id: 0,
            synthetic: false,
            path: path.to_path_buf(),
        };

        let data = reader.data();
        let start = skip_line_breaks(data, 0);
        if start < data.len() {
            let leading = data[start];
            let format = SequenceFormat::from_leading_byte(leading).ok_or_else(|| {
                SeqVecError::MalformedRecord {
                    record: 0,
                    details: format!(
                        "unrecognized leading byte '{}': expected '>' or '@'",
                        leading as char
                    ),
                }
            })?;
            reader.format = Some(format);
        }
        reader.cursor = start;
        Ok(reader)
    }

    fn data(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or(&[])
    }

    /// Total record count from a delimiter scan over the whole map. The scan
    /// is independent of the read cursor.
    #[must_use]
    pub fn count(&self) -> u64 {
        let data = self.data();
        match self.format {
            None => 0,
            Some(SequenceFormat::Fasta) => bytecount::count(data, b'>') as u64,
            Some(SequenceFormat::Fastq) => (bytecount::count(data, b'\n') as u64 + 1) / 4,
        }
    }

    /// Yields the next record, or `None` at end of input.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<Option<Record>, SeqVecError> {
        match self.format {
            None => Ok(None),
            Some(SequenceFormat::Fasta) => self.next_fasta(),
            Some(SequenceFormat::Fastq) => self.next_fastq(),
        }
    }

    fn next_fasta(&mut self) -> Result<Option<Record>, SeqVecError> {
        let data = match &self.mmap {
            Some(mmap) => &mmap[..],
            None => return Ok(None),
        };
        if self.cursor >= data.len() {
            return Ok(None);
        }

        let header_start = self.cursor;
        let Some(header_end) = memchr::memchr(b'\n', &data[header_start..]) else {
            return Err(SeqVecError::MalformedRecord {
                record: self.next_id,
                details: "header line truncated at end of file".to_string(),
            });
        };
        let header_end = header_start + header_end;
        let header =
            String::from_utf8_lossy(trim_cr(&data[header_start + 1..header_end])).into_owned();

        let body_start = header_end + 1;
        let body_end = memchr::memchr(b'>', &data[body_start..])
            .map_or(data.len(), |offset| body_start + offset);
        let bases: Vec<u8> = data[body_start..body_end]
            .iter()
            .copied()
            .filter(|&b| b != b'\n' && b != b'\r')
            .collect();

        self.cursor = body_end;
        let record = self.emit(header, Bytes::from(bases));
        Ok(Some(record))
    }

    fn next_fastq(&mut self) -> Result<Option<Record>, SeqVecError> {
        let data = match &self.mmap {
            Some(mmap) => &mmap[..],
            None => return Ok(None),
        };
        self.cursor = skip_line_breaks(data, self.cursor);
        if self.cursor >= data.len() {
            return Ok(None);
        }

        let mut cursor = self.cursor;
        let mut lines = [(0usize, 0usize); 4];
        for (i, line) in lines.iter_mut().enumerate() {
            if cursor >= data.len() {
                return Err(SeqVecError::MalformedRecord {
                    record: self.next_id,
                    details: format!("truncated record: {} of 4 lines present", i),
                });
            }
            let end = memchr::memchr(b'\n', &data[cursor..])
                .map_or(data.len(), |offset| cursor + offset);
            *line = (cursor, end);
            cursor = if end < data.len() { end + 1 } else { end };
        }

        if data[lines[0].0] != b'@' {
            return Err(SeqVecError::MalformedRecord {
                record: self.next_id,
                details: "expected '@' header line".to_string(),
            });
        }
        if data[lines[2].0] != b'+' {
            return Err(SeqVecError::MalformedRecord {
                record: self.next_id,
                details: "expected '+' separator line".to_string(),
            });
        }

        let header =
            String::from_utf8_lossy(trim_cr(&data[lines[0].0 + 1..lines[0].1])).into_owned();
        let bases = trim_cr(&data[lines[1].0..lines[1].1]).to_vec();

        self.cursor = cursor;
        let record = self.emit(header, Bytes::from(bases));
        Ok(Some(record))
    }

    fn emit(&mut self, header: String, bases: Bytes) -> Record {
        let id = self.next_id;
        self.next_id += 1;
        let header = if self.synthetic {
            format!("seq_{id}")
        } else {
            header
        };
        Record { id, header, bases }
    }
}

/// Reads up to `buf.len()` bytes, returning how many were read before EOF.
fn read_prefix(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let read = reader.read(&mut buf[filled..])?;
        if read == 0 {
            break;
        }
        filled += read;
    }
    Ok(filled)
}

fn skip_line_breaks(data: &[u8], mut pos: usize) -> usize {
    while pos < data.len() && (data[pos] == b'\n' || data[pos] == b'\r') {
        pos += 1;
    }
    pos
}

fn trim_cr(line: &[u8]) -> &[u8] {
    match line.last() {
        Some(b'\r') => &line[..line.len() - 1],
        _ => line,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::{Cursor, Write};

    use tempfile::NamedTempFile;

    use super::*;

    fn streaming_from(data: &'static [u8]) -> StreamingReader {
        StreamingReader::from_reader(Box::new(Cursor::new(data)), Path::new("<test>"))
    }

    fn mapped_file(data: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(data).unwrap();
        file.flush().unwrap();
        file
    }

    fn mapped_from(data: &[u8]) -> (MappedReader, NamedTempFile) {
        let file = mapped_file(data);
        let reader = MappedReader::open(file.path()).unwrap();
        (reader, file)
    }

    fn drain(source: &mut SequenceSource) -> Vec<Record> {
        let mut records = Vec::new();
        while let Some(record) = source.next().unwrap() {
            records.push(record);
        }
        records
    }

    #[test]
    fn streaming_fasta_multi_line_sequences() {
        let mut reader = streaming_from(b">first record\nACGT\nTTAA\n>second\nGG\n");
        let a = reader.next().unwrap().unwrap();
        assert_eq!(a.id, 0);
        assert_eq!(a.header, "first record");
        assert_eq!(a.bases.as_ref(), b"ACGTTTAA");

        let b = reader.next().unwrap().unwrap();
        assert_eq!(b.id, 1);
        assert_eq!(b.header, "second");
        assert_eq!(b.bases.as_ref(), b"GG");

        assert!(reader.next().unwrap().is_none());
    }

    #[test]
    fn streaming_fasta_blank_lines_ignored() {
        let mut reader = streaming_from(b"\n>a\n\nACGT\n\n>b\nTT\n");
        assert_eq!(reader.next().unwrap().unwrap().bases.as_ref(), b"ACGT");
        assert_eq!(reader.next().unwrap().unwrap().bases.as_ref(), b"TT");
        assert!(reader.next().unwrap().is_none());
    }

    #[test]
    fn streaming_fasta_empty_sequence_allowed() {
        let mut reader = streaming_from(b">a\n\n");
        let record = reader.next().unwrap().unwrap();
        assert_eq!(record.header, "a");
        assert!(record.bases.is_empty());
        assert!(reader.next().unwrap().is_none());
    }

    #[test]
    fn streaming_fasta_unterminated_header_is_an_error() {
        let mut reader = streaming_from(b">a");
        let err = reader.next().unwrap_err();
        assert!(matches!(
            err,
            SeqVecError::MalformedRecord { record: 0, .. }
        ));
    }

    #[test]
    fn streaming_fastq_basic() {
        let mut reader = streaming_from(b"@r0\nACGT\n+\nIIII\n@r1\nTTTT\n+\nIIII\n");
        let a = reader.next().unwrap().unwrap();
        assert_eq!(a.header, "r0");
        assert_eq!(a.bases.as_ref(), b"ACGT");
        let b = reader.next().unwrap().unwrap();
        assert_eq!(b.id, 1);
        assert_eq!(b.bases.as_ref(), b"TTTT");
        assert!(reader.next().unwrap().is_none());
    }

    #[test]
    fn streaming_fastq_truncated_record_is_an_error() {
        let mut reader = streaming_from(b"@r0\nACGT\n+\nIIII\n@r1\nTTTT\n");
        reader.next().unwrap().unwrap();
        let err = reader.next().unwrap_err();
        assert!(matches!(
            err,
            SeqVecError::MalformedRecord { record: 1, .. }
        ));
    }

    #[test]
    fn streaming_fastq_bad_separator_is_an_error() {
        let mut reader = streaming_from(b"@r0\nACGT\nIIII\nIIII\n");
        assert!(reader.next().is_err());
    }

    #[test]
    fn streaming_unrecognized_leading_byte() {
        let mut reader = streaming_from(b"ACGT\n");
        assert!(matches!(
            reader.next(),
            Err(SeqVecError::MalformedRecord { record: 0, .. })
        ));
    }

    #[test]
    fn streaming_crlf_line_endings() {
        let mut reader = streaming_from(b">a\r\nACGT\r\n");
        let record = reader.next().unwrap().unwrap();
        assert_eq!(record.header, "a");
        assert_eq!(record.bases.as_ref(), b"ACGT");
    }

    #[test]
    fn streaming_gzip_input_is_decoded() {
        use flate2::{write::GzEncoder, Compression};

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b">a\nACGT\n").unwrap();
        let compressed = encoder.finish().unwrap();

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&compressed).unwrap();
        file.flush().unwrap();

        let mut source = SequenceSource::open(file.path()).unwrap();
        assert!(matches!(source, SequenceSource::Streaming(_)));
        assert!(source.count().is_none());
        let records = drain(&mut source);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].bases.as_ref(), b"ACGT");
    }

    #[test]
    fn mapped_fasta_records_and_count() {
        let (mut reader, _file) = mapped_from(b">a desc\nACGT\nTT\n>b\nGGGG\n");
        assert_eq!(reader.count(), 2);

        let a = reader.next().unwrap().unwrap();
        assert_eq!(a.id, 0);
        assert_eq!(a.header, "a desc");
        assert_eq!(a.bases.as_ref(), b"ACGTTT");

        // Counting again after reading must not disturb the cursor.
        assert_eq!(reader.count(), 2);

        let b = reader.next().unwrap().unwrap();
        assert_eq!(b.id, 1);
        assert_eq!(b.bases.as_ref(), b"GGGG");
        assert!(reader.next().unwrap().is_none());
    }

    #[test]
    fn mapped_fastq_records_and_count() {
        let (mut reader, _file) = mapped_from(b"@r0\nACGT\n+\nIIII\n@r1\nTT\n+x\nII\n");
        assert_eq!(reader.count(), 2);

        let a = reader.next().unwrap().unwrap();
        assert_eq!(a.header, "r0");
        assert_eq!(a.bases.as_ref(), b"ACGT");
        let b = reader.next().unwrap().unwrap();
        assert_eq!(b.bases.as_ref(), b"TT");
        assert!(reader.next().unwrap().is_none());
    }

    #[test]
    fn mapped_fastq_count_without_trailing_newline() {
        let (reader, _file) = mapped_from(b"@r0\nACGT\n+\nIIII\n@r1\nTT\n+\nII");
        assert_eq!(reader.count(), 2);
    }

    #[test]
    fn mapped_fastq_truncated_record() {
        let (mut reader, _file) = mapped_from(b"@r0\nACGT\n+\nIIII\n@r1\nTT\n");
        reader.next().unwrap().unwrap();
        assert!(matches!(
            reader.next(),
            Err(SeqVecError::MalformedRecord { record: 1, .. })
        ));
    }

    #[test]
    fn mapped_empty_file() {
        let (mut reader, _file) = mapped_from(b"");
        assert_eq!(reader.count(), 0);
        assert!(reader.next().unwrap().is_none());
    }

    #[test]
    fn mapped_fasta_unterminated_header() {
        let (mut reader, _file) = mapped_from(b">a");
        assert!(matches!(
            reader.next(),
            Err(SeqVecError::MalformedRecord { record: 0, .. })
        ));
    }

    #[test]
    fn synthetic_headers_replace_originals() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b">original name\nACGT\n>another\nTT\n")
            .unwrap();
        file.flush().unwrap();

        let mut source = SequenceSource::open(file.path())
            .unwrap()
            .with_synthetic_headers(true);
        let records = drain(&mut source);
        assert_eq!(records[0].header, "seq_0");
        assert_eq!(records[1].header, "seq_1");
    }

    #[test]
    fn ids_are_contiguous_from_zero() {
        let (mut reader, _file) = mapped_from(b">a\nA\n>b\nC\n>c\nG\n");
        let mut ids = Vec::new();
        while let Some(record) = reader.next().unwrap() {
            ids.push(record.id);
        }
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn plain_file_uses_mapped_reader_with_count() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b">a\nACGT\n").unwrap();
        file.flush().unwrap();

        let source = SequenceSource::open(file.path()).unwrap();
        assert!(matches!(source, SequenceSource::Mapped(_)));
        assert_eq!(source.count(), Some(1));
    }
}
