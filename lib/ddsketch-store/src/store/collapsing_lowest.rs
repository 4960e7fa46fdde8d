use std::fmt;

use super::{check_chunk_size, fmt_store, Store, DEFAULT_CHUNK_SIZE, DEFAULT_INITIAL_BIN_COUNT, DEFAULT_MAX_BINS};
use crate::bins::{add_key, max_key_span, merge_bins, BinArray, CollapsingLowest};
use crate::{Bins, StoreError};

/// A dense store that collapses lowest-keyed bins when capacity is exceeded.
///
/// This store never allocates more than `max_bins` bins. When a new key would require more, the lowest-keyed bins are
/// collapsed: their counts are summed into the lowest bin that remains, sacrificing accuracy for lower quantiles to
/// preserve accuracy for higher quantiles. No count is ever dropped; only the distinct keys below the cutoff are lost,
/// and rank queries landing in the collapsed bin report its key.
///
/// Use this store when:
/// - You need bounded memory usage
/// - Higher quantiles (e.g., p95, p99) are more important than lower quantiles
/// - You're tracking latencies or other metrics where the tail matters most
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CollapsingLowestDenseStore {
    /// The bin counts, stored contiguously.
    bins: BinArray,

    /// Growth granularity and bin limit.
    growth: CollapsingLowest,

    /// Requested number of bins to allocate up front. Never more than `max_bins` are actually allocated.
    initial_bin_count: usize,

    /// Whether collapsing has occurred (accuracy may be compromised for low quantiles).
    is_collapsed: bool,
}

impl CollapsingLowestDenseStore {
    /// Creates an empty `CollapsingLowestDenseStore` with the given maximum number of bins and the default layout.
    ///
    /// # Errors
    ///
    /// If `max_bins` is zero, an error is returned.
    pub fn new(max_bins: usize) -> Result<Self, StoreError> {
        Self::with_layout(max_bins, DEFAULT_INITIAL_BIN_COUNT, DEFAULT_CHUNK_SIZE)
    }

    /// Creates an empty `CollapsingLowestDenseStore` with the given maximum number of bins, pre-allocating
    /// `initial_bin_count` bins (capped at `max_bins`) and growing by `chunk_size` bins at a time.
    ///
    /// A `max_bins` above 2^32 is lowered to 2^32, which is enough for every `i32` key to keep its own bin: such a store
    /// never collapses.
    ///
    /// # Errors
    ///
    /// If `max_bins` or `chunk_size` is zero, or `chunk_size` is larger than 2^32, an error is returned.
    pub fn with_layout(max_bins: usize, initial_bin_count: usize, chunk_size: usize) -> Result<Self, StoreError> {
        if max_bins == 0 {
            return Err(StoreError::ZeroMaxBins);
        }

        check_chunk_size(chunk_size)?;
        Ok(Self::from_layout(max_bins, initial_bin_count, chunk_size))
    }

    fn from_layout(max_bins: usize, initial_bin_count: usize, chunk_size: usize) -> Self {
        let max_bins = max_bins.min(max_key_span());
        Self {
            bins: BinArray::with_len(initial_bin_count.min(max_bins)),
            growth: CollapsingLowest { chunk_size, max_bins },
            initial_bin_count,
            is_collapsed: false,
        }
    }

    /// Returns the maximum number of bins this store will allocate.
    pub fn max_bins(&self) -> usize {
        self.growth.max_bins
    }

    /// Returns the number of bins this store grows by.
    pub fn chunk_size(&self) -> usize {
        self.growth.chunk_size
    }

    /// Returns `true` if this store has collapsed bins.
    ///
    /// If true, accuracy guarantees may not hold for lower quantiles.
    pub fn is_collapsed(&self) -> bool {
        self.is_collapsed
    }
}

impl Store for CollapsingLowestDenseStore {
    fn length(&self) -> usize {
        self.bins.len()
    }

    fn count(&self) -> u64 {
        self.bins.count
    }

    fn add_n(&mut self, key: i32, n: u64) {
        if n == 0 {
            return;
        }

        if add_key(&mut self.bins, &self.growth, i64::from(key), n) {
            self.is_collapsed = true;
        }
    }

    fn key_at_rank(&self, rank: u64) -> i64 {
        self.bins.key_at_rank(rank)
    }

    fn reversed_key_at_rank(&self, rank: u64) -> i64 {
        self.bins.reversed_key_at_rank(rank)
    }

    fn merge(&mut self, other: &Self) {
        if other.bins.count == 0 {
            return;
        }

        if self.bins.count == 0 {
            self.copy_from(other);
            return;
        }

        if merge_bins(&mut self.bins, &self.growth, &other.bins) || other.is_collapsed {
            self.is_collapsed = true;
        }
    }

    fn copy_from(&mut self, other: &Self) {
        self.bins.clone_from(&other.bins);
        self.growth.max_bins = other.growth.max_bins;
        self.is_collapsed = other.is_collapsed;
    }

    fn clear(&mut self) {
        self.bins = BinArray::with_len(self.initial_bin_count.min(self.growth.max_bins));
        self.is_collapsed = false;
    }

    fn min_key(&self) -> Option<i64> {
        self.bins.key_bounds().map(|(min_key, _)| min_key)
    }

    fn max_key(&self) -> Option<i64> {
        self.bins.key_bounds().map(|(_, max_key)| max_key)
    }

    fn bins(&self) -> Bins<'_> {
        self.bins.non_empty_bins()
    }
}

impl Default for CollapsingLowestDenseStore {
    /// Creates a collapsing lowest dense store with a default of 2048 bins.
    fn default() -> Self {
        Self::from_layout(DEFAULT_MAX_BINS, DEFAULT_INITIAL_BIN_COUNT, DEFAULT_CHUNK_SIZE)
    }
}

impl fmt::Display for CollapsingLowestDenseStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_store(self, f)
    }
}
