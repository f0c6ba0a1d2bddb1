//! The parallel record pipeline.
//!
//! Workers share three things: the sequence source behind one mutex, the
//! immutable profiler, and the output sink. Each worker loops: take the
//! reader lock, pull a record, release the lock, then profile, format, and
//! write without further coordination. There is no queue: the reader lock
//! naturally bounds in-flight records to one per worker.
//!
//! The first error any worker hits aborts the run: the failing worker
//! stores the error and raises a flag the others poll between records.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex, PoisonError,
};

use tracing::{debug, info};

use crate::{
    error::SeqVecError,
    profile::KmerProfiler,
    progress::ProgressMeter,
    source::SequenceSource,
    writer::{OutputSink, ProfileFormatter},
};

/// Owns all shared state for one run; no process-wide globals.
pub struct ParallelPipeline {
    source: Mutex<SequenceSource>,
    profiler: KmerProfiler,
    sink: OutputSink,
    progress: ProgressMeter,
    separator: u8,
    failure: Mutex<Option<SeqVecError>>,
    aborted: AtomicBool,
}

impl ParallelPipeline {
    /// Wires a source, profiler, and sink together.
    #[must_use]
    pub fn new(
        source: SequenceSource,
        profiler: KmerProfiler,
        sink: OutputSink,
        progress: ProgressMeter,
        separator: u8,
    ) -> Self {
        Self {
            source: Mutex::new(source),
            profiler,
            sink,
            progress,
            separator,
            failure: Mutex::new(None),
            aborted: AtomicBool::new(false),
        }
    }

    /// Runs the pipeline on a pool of `threads` workers, returning the
    /// number of records processed once every record has been profiled and
    /// written, or the first error any worker encountered.
    pub fn run(self, threads: usize) -> Result<u64, SeqVecError> {
        let threads = threads.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| SeqVecError::Resource {
                details: format!("failed to create thread pool: {e}"),
            })?;

        info!(threads, "starting worker pool");
        pool.scope(|scope| {
            for _ in 0..threads {
                scope.spawn(|_| self.worker());
            }
        });

        let Self {
            sink,
            progress,
            failure,
            ..
        } = self;
        progress.finish();
        let records = progress.records_seen();

        let failure = failure.into_inner().unwrap_or_else(PoisonError::into_inner);
        if let Some(err) = failure {
            return Err(err);
        }

        sink.finish()?;
        info!(records, "run complete");
        Ok(records)
    }

    fn worker(&self) {
        let mut formatter =
            ProfileFormatter::new(self.profiler.index().feature_count(), self.separator);

        loop {
            if self.aborted.load(Ordering::Relaxed) {
                return;
            }

            // The source pull is the only contended region.
            let record = {
                let mut source = match self.source.lock() {
                    Ok(guard) => guard,
                    Err(_) => return,
                };
                match source.next() {
                    Ok(Some(record)) => {
                        self.progress.tick();
                        record
                    }
                    Ok(None) => return,
                    Err(err) => {
                        self.fail(err);
                        return;
                    }
                }
            };

            let profile = self.profiler.profile(&record.bases);
            let line = formatter.format_line(&profile);
            if let Err(err) = self.sink.write_record(record.id, line) {
                self.fail(err);
                return;
            }
        }
    }

    /// Records the first failure and tells the other workers to stop.
    fn fail(&self, err: SeqVecError) {
        debug!(error = %err, "worker aborting the run");
        self.aborted.store(true, Ordering::Relaxed);
        let mut slot = self
            .failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        slot.get_or_insert(err);
    }
}
