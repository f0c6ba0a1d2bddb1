//! Top-level vectorization runs.
//!
//! [`vectorize`] wires the whole pipeline together: build the canonical
//! index, open the input, pick the output mode, and drive the worker pool
//! until every record has been profiled and written.

use std::{path::Path, sync::Arc};

use tracing::{info, info_span};

use crate::{
    error::SeqVecError,
    index::CanonicalIndex,
    pipeline::ParallelPipeline,
    profile::KmerProfiler,
    progress::ProgressMeter,
    source::SequenceSource,
    writer::{OutputSink, ProfileFormatter},
};

/// Options for a vectorization run.
#[derive(Debug, Clone)]
pub struct VectorizeOptions {
    /// K-mer size (1..=15).
    pub k: usize,
    /// Worker thread count.
    pub threads: usize,
    /// Value separator in the output (`,` or `\t`).
    pub separator: u8,
    /// Replace input headers with `seq_<id>`.
    pub synthetic_headers: bool,
    /// Render the stderr progress display.
    pub show_progress: bool,
}

impl Default for VectorizeOptions {
    fn default() -> Self {
        Self {
            k: 3,
            threads: 8,
            separator: b',',
            synthetic_headers: false,
            show_progress: false,
        }
    }
}

/// What a completed run produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorizeSummary {
    /// Records read and written.
    pub records: u64,
    /// Profile vector length (output columns).
    pub feature_count: usize,
    /// Bytes per output line.
    pub record_width: usize,
    /// Whether rows were written at `seq_id`-derived offsets (deterministic
    /// order) rather than completion order.
    pub random_access: bool,
}

/// Vectorizes every sequence in `input`, writing one fixed-width profile
/// line per record to `output`.
///
/// Plain input files are memory-mapped and counted up front so rows land at
/// `seq_id * record_width`; gzipped input streams, and rows land in
/// completion order.
pub fn vectorize(
    input: &Path,
    output: &Path,
    options: &VectorizeOptions,
) -> Result<VectorizeSummary, SeqVecError> {
    let build_span = info_span!("build_index", k = options.k).entered();
    let index = Arc::new(CanonicalIndex::build(options.k)?);
    drop(build_span);
    info!(
        k = options.k,
        feature_count = index.feature_count(),
        "built canonical k-mer index"
    );

    let source =
        SequenceSource::open(input)?.with_synthetic_headers(options.synthetic_headers);
    let record_width = ProfileFormatter::record_width(index.feature_count());
    let total = source.count();

    let sink = match total {
        Some(total) => {
            info!(
                records = total,
                output_bytes = total * record_width as u64,
                "random-access output"
            );
            OutputSink::random_access(output, total, record_width)?
        }
        None => {
            info!("record count unknown, streaming output");
            OutputSink::streaming(output)?
        }
    };
    let random_access = sink.is_random_access();

    let progress = if options.show_progress {
        ProgressMeter::new(total)
    } else {
        ProgressMeter::disabled()
    };

    let pipeline = ParallelPipeline::new(
        source,
        KmerProfiler::new(Arc::clone(&index)),
        sink,
        progress,
        options.separator,
    );
    let records = pipeline.run(options.threads)?;

    Ok(VectorizeSummary {
        records,
        feature_count: index.feature_count(),
        record_width,
        random_access,
    })
}
