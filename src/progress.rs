//! Progress reporting for vectorization runs.
//!
//! A [`ProgressMeter`] counts processed records with an atomic and renders a
//! carriage-return display (`Completed 42.17%`) on stderr at a throttled
//! cadence. When the total is unknown (streaming input), the raw record
//! count is shown instead of a percentage.

use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe record counter with an optional stderr display.
#[derive(Debug)]
pub struct ProgressMeter {
    total: Option<u64>,
    done: AtomicU64,
    interval: u64,
    enabled: bool,
}

impl ProgressMeter {
    /// Creates a meter rendering to stderr. `total` is the expected record
    /// count when known; the display updates roughly a thousand times per
    /// run (every record for small inputs).
    #[must_use]
    pub fn new(total: Option<u64>) -> Self {
        let interval = total.map_or(1000, |t| (t / 1000).max(1));
        Self {
            total,
            done: AtomicU64::new(0),
            interval,
            enabled: true,
        }
    }

    /// Creates a silent meter that only counts.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            total: None,
            done: AtomicU64::new(0),
            interval: u64::MAX,
            enabled: false,
        }
    }

    /// Records one processed record, rendering at the throttle cadence.
    ///
    /// Thread-safe; the pipeline calls this under the reader lock, so the
    /// rendered count never runs ahead of records actually handed out.
    pub fn tick(&self) {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        if !self.enabled || done % self.interval != 0 {
            return;
        }
        self.render(done);
    }

    /// Number of records seen so far.
    #[must_use]
    pub fn records_seen(&self) -> u64 {
        self.done.load(Ordering::Relaxed)
    }

    /// Prints the final line and moves stderr past the carriage returns.
    pub fn finish(&self) {
        if !self.enabled {
            return;
        }
        match self.total {
            Some(total) if total > 0 => eprintln!("Completed 100.00%       "),
            _ => eprintln!("Completed {}       ", self.records_seen()),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn render(&self, done: u64) {
        match self.total {
            Some(total) if total > 0 => {
                let percentage = 100.0 * done as f64 / total as f64;
                eprint!("Completed {percentage:.2}%             \r");
            }
            _ => eprint!("Completed {done}            \r"),
        }
    }
}
