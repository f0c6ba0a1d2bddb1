//! Per-sequence k-mer frequency profiles.
//!
//! [`KmerProfiler`] turns a base string into a probability vector over the
//! canonical feature slots of a shared [`CanonicalIndex`]. Profiling is
//! stateless per call, so one profiler handle can be used from any number of
//! worker threads.

use std::sync::Arc;

use crate::index::{encode_base, CanonicalIndex};

/// Stateless profiler over a shared canonical index.
#[derive(Debug, Clone)]
pub struct KmerProfiler {
    index: Arc<CanonicalIndex>,
}

impl KmerProfiler {
    /// Creates a profiler over `index`.
    #[must_use]
    pub fn new(index: Arc<CanonicalIndex>) -> Self {
        Self { index }
    }

    /// The index this profiler counts against.
    #[must_use]
    pub fn index(&self) -> &CanonicalIndex {
        &self.index
    }

    /// Computes the normalized canonical k-mer frequency profile of `bases`.
    ///
    /// A rolling 2-bit register slides over the sequence; any byte outside
    /// case-insensitive `A/C/G/T` resets the window, so k-mers never span an
    /// `N` or other ambiguity code. Only the forward orientation is looked
    /// up; reverse-complement folding is already baked into the slot table.
    ///
    /// Entries sum to 1.0 when at least one full window was seen; a sequence
    /// with no valid window yields the all-zero vector.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn profile(&self, bases: &[u8]) -> Vec<f64> {
        let k = self.index.k();
        let mask = self.index.mask();
        let mut counts = vec![0u64; self.index.feature_count()];
        let mut total = 0u64;

        let mut val = 0u64;
        let mut len = 0usize;
        for &raw in bases {
            match raw.to_ascii_uppercase() {
                base @ (b'A' | b'C' | b'G' | b'T') => {
                    val = ((val << 2) | encode_base(base)) & mask;
                    len += 1;
                    if len == k {
                        counts[self.index.slot_of(val)] += 1;
                        total += 1;
                        // keep the window full so the next base yields the
                        // next overlapping k-mer
                        len = k - 1;
                    }
                }
                _ => {
                    val = 0;
                    len = 0;
                }
            }
        }

        let denominator = total.max(1) as f64;
        counts
            .into_iter()
            .map(|count| count as f64 / denominator)
            .collect()
    }
}
