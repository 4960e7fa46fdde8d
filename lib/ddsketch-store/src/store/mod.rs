//! Store implementations for DDSketch bins.
//!
//! A store maps integer bin keys, as produced by an index mapping, to occurrence counts. Different implementations
//! provide different memory/accuracy trade-offs.

mod collapsing_lowest;
mod dense;

pub use collapsing_lowest::CollapsingLowestDenseStore;
pub use dense::DenseStore;

use crate::bins::max_key_span;
use crate::{Bins, StoreError};

/// Number of bins a store pre-allocates unless told otherwise.
pub const DEFAULT_INITIAL_BIN_COUNT: usize = 128;

/// Number of bins a store grows by unless told otherwise.
pub const DEFAULT_CHUNK_SIZE: usize = 128;

/// Maximum number of bins used by [`CollapsingLowestDenseStore::default`].
pub const DEFAULT_MAX_BINS: usize = 2048;

/// A store for DDSketch bins.
///
/// - [`DenseStore`]: Contiguous array storage, grows unbounded. Best for data with a bounded range of keys.
/// - [`CollapsingLowestDenseStore`]: Contiguous array storage with a maximum bin limit. When the limit is exceeded,
///   lowest-keyed bins are collapsed. Best when higher quantiles (e.g., p99) are more important.
///
/// Keys are accepted as `i32` and reported back as `i64`: the physical bounds of a store can extend past the `i32`
/// range by up to one chunk, and every `i32` key is representable in the same store without overflow.
///
/// Stores are not synchronized. Accumulate into one store per thread and [`merge`][Store::merge] them.
pub trait Store: Clone + Send + Sync {
    /// Returns the number of bins currently allocated.
    fn length(&self) -> usize;

    /// Returns the total count across all bins.
    fn count(&self) -> u64;

    /// Returns `true` if nothing has been recorded.
    fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Records a single observation of `key`.
    fn add(&mut self, key: i32) {
        self.add_n(key, 1);
    }

    /// Records `n` observations of `key`.
    fn add_n(&mut self, key: i32, n: u64);

    /// Returns the smallest key whose cumulative count, accumulated in ascending key order, is at least `rank`.
    ///
    /// If `rank` exceeds the total count, the highest key of the store is returned. The result is unspecified for an
    /// empty store: callers must record at least one observation first.
    fn key_at_rank(&self, rank: u64) -> i64;

    /// Returns the largest key whose cumulative count, accumulated in descending key order, is at least `rank`.
    ///
    /// If `rank` exceeds the total count, the lowest key of the store is returned. The result is unspecified for an
    /// empty store.
    fn reversed_key_at_rank(&self, rank: u64) -> i64;

    /// Merges another store into this one.
    ///
    /// This is equivalent to replaying every observation recorded by `other` onto `self`.
    fn merge(&mut self, other: &Self);

    /// Replaces the state of this store with a copy of `other`.
    fn copy_from(&mut self, other: &Self);

    /// Clears all bins from the store, returning it to its freshly-constructed state.
    fn clear(&mut self);

    /// Returns the lowest key covered by the allocated bins, or `None` if empty.
    fn min_key(&self) -> Option<i64>;

    /// Returns the highest key covered by the allocated bins, or `None` if empty.
    fn max_key(&self) -> Option<i64>;

    /// Returns an iterator over the non-empty bins as `(key, count)` pairs, in ascending key order.
    fn bins(&self) -> Bins<'_>;
}

/// Checks that `chunk_size` is usable as a growth step.
pub(crate) fn check_chunk_size(chunk_size: usize) -> Result<(), StoreError> {
    if chunk_size == 0 {
        return Err(StoreError::ZeroChunkSize);
    }

    let max_chunk_size = max_key_span();
    if chunk_size > max_chunk_size {
        return Err(StoreError::ChunkSizeTooLarge {
            chunk_size,
            max_chunk_size,
        });
    }

    Ok(())
}

/// Writes the non-empty bins of a store followed by its key bounds.
fn fmt_store<S: Store>(store: &S, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{{")?;
    for (i, (key, count)) in store.bins().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}: {}", key, count)?;
    }
    write!(f, "}}")?;

    match (store.min_key(), store.max_key()) {
        (Some(min_key), Some(max_key)) => write!(f, ", min_key: {}, max_key: {}", min_key, max_key),
        _ => Ok(()),
    }
}
