//! Fixed-width profile serialization and the output sinks.
//!
//! Every profile value is printed as `0.xxxxxx` (eight bytes, six digits
//! after the decimal point) followed by a separator or the terminating
//! newline, so every record occupies exactly
//! `feature_count * 9` bytes. Random-access output depends on that width
//! being constant: worker `i` copies its line into the byte range
//! `[i * width, (i + 1) * width)` of a pre-sized memory-mapped file.

use std::{
    fmt::Write as _,
    fs::{File, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};

use memmap2::MmapMut;

use crate::error::SeqVecError;

/// Bytes per printed value (`0.123456`).
const VALUE_WIDTH: usize = 8;

/// Serializes profiles into fixed-width text lines.
///
/// Each worker owns one formatter as its scratch buffer; the buffer is
/// reused across records.
#[derive(Debug)]
pub struct ProfileFormatter {
    separator: char,
    record_width: usize,
    buf: String,
}

impl ProfileFormatter {
    /// Creates a formatter for profiles of length `feature_count` joined by
    /// `separator` (`,` or `\t`).
    #[must_use]
    pub fn new(feature_count: usize, separator: u8) -> Self {
        let record_width = Self::record_width(feature_count);
        Self {
            separator: separator as char,
            record_width,
            buf: String::with_capacity(record_width),
        }
    }

    /// Byte length of every line produced for `feature_count` features:
    /// eight bytes per value plus one separator or newline each.
    #[must_use]
    pub const fn record_width(feature_count: usize) -> usize {
        feature_count * (VALUE_WIDTH + 1)
    }

    /// Formats `profile` into a line ending in `\n`.
    ///
    /// The returned slice is valid until the next call. All values must lie
    /// in `[0, 1]`; the fixed-width guarantee holds for exactly that range.
    pub fn format_line(&mut self, profile: &[f64]) -> &[u8] {
        self.buf.clear();
        for (i, value) in profile.iter().enumerate() {
            if i > 0 {
                self.buf.push(self.separator);
            }
            let _ = write!(self.buf, "{value:.6}");
        }
        self.buf.push('\n');
        assert_eq!(
            self.buf.len(),
            self.record_width,
            "formatted line width drifted from the precomputed record width"
        );
        self.buf.as_bytes()
    }
}

/// Where formatted records go.
#[derive(Debug)]
pub enum OutputSink {
    /// Pre-sized memory-mapped file; each record is written at
    /// `seq_id * record_width`.
    RandomAccess(RandomAccessSink),
    /// Buffered appender; records land in completion order.
    Streaming(StreamingSink),
}

impl OutputSink {
    /// Creates a random-access sink for exactly `total_records` records of
    /// `record_width` bytes each.
    pub fn random_access(
        path: &Path,
        total_records: u64,
        record_width: usize,
    ) -> Result<Self, SeqVecError> {
        Ok(Self::RandomAccess(RandomAccessSink::create(
            path,
            total_records,
            record_width,
        )?))
    }

    /// Creates a streaming sink appending to `path`.
    pub fn streaming(path: &Path) -> Result<Self, SeqVecError> {
        Ok(Self::Streaming(StreamingSink::create(path)?))
    }

    /// Returns `true` for the random-access (deterministically ordered) mode.
    #[must_use]
    pub const fn is_random_access(&self) -> bool {
        matches!(self, Self::RandomAccess(_))
    }

    /// Writes one formatted record. `seq_id` selects the output row in
    /// random-access mode and is ignored by the streaming sink.
    pub fn write_record(&self, seq_id: u64, line: &[u8]) -> Result<(), SeqVecError> {
        match self {
            Self::RandomAccess(sink) => sink.write_record(seq_id, line),
            Self::Streaming(sink) => sink.write_record(line),
        }
    }

    /// Flushes and releases the sink.
    pub fn finish(self) -> Result<(), SeqVecError> {
        match self {
            Self::RandomAccess(sink) => sink.finish(),
            Self::Streaming(sink) => sink.finish(),
        }
    }
}

/// Pre-sized memory-mapped output file written at computed offsets.
#[derive(Debug)]
pub struct RandomAccessSink {
    map: Option<MmapMut>,
    base: *mut u8,
    record_width: usize,
    total_records: u64,
    path: PathBuf,
}

// SAFETY: workers write through `base` into disjoint ranges: the bounds
// check in `write_record` confines record `i` to
// `[i * record_width, (i + 1) * record_width)`, and the pipeline hands out
// each record id exactly once.
#[allow(unsafe_code)]
unsafe impl Send for RandomAccessSink {}
#[allow(unsafe_code)]
unsafe impl Sync for RandomAccessSink {}

impl RandomAccessSink {
    /// Creates `path` with the exact final size and maps it read-write.
    #[allow(unsafe_code)]
    pub fn create(
        path: &Path,
        total_records: u64,
        record_width: usize,
    ) -> Result<Self, SeqVecError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| SeqVecError::io(e, path))?;
        let size = total_records * record_width as u64;
        file.set_len(size).map_err(|e| SeqVecError::io(e, path))?;

        // Zero-length files cannot be mapped; an empty input needs no map.
        let mut map = if size == 0 {
            None
        } else {
            // SAFETY: we just created the file with the exact size and hold
            // it exclusively for the duration of the run.
            Some(unsafe { MmapMut::map_mut(&file) }.map_err(|e| SeqVecError::io(e, path))?)
        };
        let base = map
            .as_mut()
            .map_or(std::ptr::null_mut(), |m| m.as_mut_ptr());

        Ok(Self {
            map,
            base,
            record_width,
            total_records,
            path: path.to_path_buf(),
        })
    }

    /// Copies `line` into the row owned by `seq_id`.
    #[allow(unsafe_code)]
    pub fn write_record(&self, seq_id: u64, line: &[u8]) -> Result<(), SeqVecError> {
        if seq_id >= self.total_records {
            return Err(SeqVecError::MalformedRecord {
                record: seq_id,
                details: format!(
                    "input yielded more records than the {} counted up front",
                    self.total_records
                ),
            });
        }
        if line.len() != self.record_width {
            return Err(SeqVecError::MalformedRecord {
                record: seq_id,
                details: format!(
                    "formatted line is {} bytes, expected {}",
                    line.len(),
                    self.record_width
                ),
            });
        }

        #[allow(clippy::cast_possible_truncation)]
        let offset = seq_id as usize * self.record_width;
        // SAFETY: both bounds were checked above; distinct seq_ids address
        // non-overlapping ranges of the mapping.
        unsafe {
            std::ptr::copy_nonoverlapping(line.as_ptr(), self.base.add(offset), self.record_width);
        }
        Ok(())
    }

    /// Flushes the mapping to disk.
    pub fn finish(self) -> Result<(), SeqVecError> {
        if let Some(map) = self.map {
            map.flush().map_err(|e| SeqVecError::io(e, &self.path))?;
        }
        Ok(())
    }
}

/// Mutex-guarded buffered writer; records appear in completion order.
#[derive(Debug)]
pub struct StreamingSink {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl StreamingSink {
    /// Creates (truncating) the output file.
    pub fn create(path: &Path) -> Result<Self, SeqVecError> {
        let file = File::create(path).map_err(|e| SeqVecError::io(e, path))?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    /// Appends one formatted record.
    pub fn write_record(&self, line: &[u8]) -> Result<(), SeqVecError> {
        let mut writer = self.writer.lock().map_err(|_| SeqVecError::Resource {
            details: "output writer lock poisoned".to_string(),
        })?;
        writer
            .write_all(line)
            .map_err(|e| SeqVecError::io(e, &self.path))
    }

    /// Flushes the buffered writer.
    pub fn finish(self) -> Result<(), SeqVecError> {
        let writer = self
            .writer
            .into_inner()
            .map_err(|_| SeqVecError::Resource {
                details: "output writer lock poisoned".to_string(),
            })?;
        writer
            .into_inner()
            .map_err(|e| SeqVecError::io(e.into_error(), &self.path))?;
        Ok(())
    }
}
