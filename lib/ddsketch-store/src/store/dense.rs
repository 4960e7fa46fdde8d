use std::fmt;

use super::{check_chunk_size, fmt_store, Store, DEFAULT_CHUNK_SIZE, DEFAULT_INITIAL_BIN_COUNT};
use crate::bins::{add_key, merge_bins, BinArray, Chunked};
use crate::{Bins, StoreError};

/// A dense store using contiguous array storage.
///
/// This store grows unbounded, in whole chunks, to accommodate any range of keys. It's memory-efficient when the keys
/// are clustered together, but can use significant memory if keys are widely scattered: a store holding both
/// `i32::MIN` and `i32::MAX` allocates a bin for every key in between.
///
/// Use this store when:
/// - You have a bounded range of input values
/// - Memory usage is not a concern
/// - You need exact counts for every key
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DenseStore {
    /// The bin counts, stored contiguously.
    bins: BinArray,

    /// Growth granularity.
    growth: Chunked,

    /// Number of bins allocated at construction, and again on `clear`.
    initial_bin_count: usize,
}

impl DenseStore {
    /// Creates an empty `DenseStore` with the default layout.
    ///
    /// [`DEFAULT_INITIAL_BIN_COUNT`] bins are pre-allocated and the store grows by [`DEFAULT_CHUNK_SIZE`] bins at a
    /// time.
    pub fn new() -> Self {
        Self::from_layout(DEFAULT_INITIAL_BIN_COUNT, DEFAULT_CHUNK_SIZE)
    }

    /// Creates an empty `DenseStore` that pre-allocates `initial_bin_count` bins and grows by `chunk_size` bins at a
    /// time.
    ///
    /// An `initial_bin_count` of zero is allowed: the first observation then allocates a single chunk.
    ///
    /// # Errors
    ///
    /// If `chunk_size` is zero, or larger than the 2^32 bins needed to cover every `i32` key, an error is returned.
    pub fn with_layout(initial_bin_count: usize, chunk_size: usize) -> Result<Self, StoreError> {
        check_chunk_size(chunk_size)?;
        Ok(Self::from_layout(initial_bin_count, chunk_size))
    }

    fn from_layout(initial_bin_count: usize, chunk_size: usize) -> Self {
        Self {
            bins: BinArray::with_len(initial_bin_count),
            growth: Chunked { chunk_size },
            initial_bin_count,
        }
    }

    /// Returns the number of bins this store grows by.
    pub fn chunk_size(&self) -> usize {
        self.growth.chunk_size
    }
}

impl Store for DenseStore {
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

        add_key(&mut self.bins, &self.growth, i64::from(key), n);
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

        merge_bins(&mut self.bins, &self.growth, &other.bins);
    }

    fn copy_from(&mut self, other: &Self) {
        self.bins.clone_from(&other.bins);
    }

    fn clear(&mut self) {
        self.bins = BinArray::with_len(self.initial_bin_count);
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

impl Default for DenseStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DenseStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_store(self, f)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use proptest::prelude::*;

    use super::*;

    fn store_from(keys: &[i32]) -> DenseStore {
        let mut store = DenseStore::new();
        for &key in keys {
            store.add(key);
        }
        store
    }

    fn expected_bins(keys: &[i32]) -> Vec<(i64, u64)> {
        let mut counts = BTreeMap::new();
        for &key in keys {
            *counts.entry(i64::from(key)).or_insert(0u64) += 1;
        }
        counts.into_iter().collect()
    }

    #[test]
    fn test_add_single() {
        let store = store_from(&[5]);

        assert_eq!(store.count(), 1);
        assert_eq!(store.bins().collect::<Vec<_>>(), vec![(5, 1)]);
        assert_eq!(store.max_key(), Some(5));
        assert_eq!(store.min_key(), Some(5 - 127));
    }

    #[test]
    fn test_first_add_uses_initial_bins() {
        let mut store = DenseStore::new();
        assert_eq!(store.length(), DEFAULT_INITIAL_BIN_COUNT);

        store.add(1_000);
        assert_eq!(store.length(), DEFAULT_INITIAL_BIN_COUNT);
    }

    #[test]
    fn test_add_within_range_keeps_length() {
        let mut store = store_from(&[10, 20, 30]);
        let length = store.length();

        store.add(10);
        store.add(-100);
        store.add(27);

        assert_eq!(store.length(), length);
    }

    #[test]
    fn test_growth_is_chunked() {
        let mut store = DenseStore::with_layout(4, 4).unwrap();
        store.add(0);

        store.add(1);
        assert_eq!(store.length(), 8);

        store.add(9);
        assert_eq!(store.length(), 16);

        store.add(-10);
        assert_eq!(store.length(), 24);
        assert_eq!(store.count(), 4);
    }

    #[test]
    fn test_zero_initial_bins() {
        let mut store = DenseStore::with_layout(0, 16).unwrap();
        assert_eq!(store.length(), 0);

        store.add(3);
        assert_eq!(store.length(), 16);
        assert_eq!(store.bins().collect::<Vec<_>>(), vec![(3, 1)]);
    }

    #[test]
    fn test_invalid_chunk_size() {
        assert_eq!(DenseStore::with_layout(128, 0), Err(StoreError::ZeroChunkSize));
        assert_eq!(
            DenseStore::with_layout(4, usize::MAX),
            Err(StoreError::ChunkSizeTooLarge {
                chunk_size: usize::MAX,
                max_chunk_size: 1 << 32,
            })
        );
    }

    #[test]
    fn test_add_n() {
        let mut store = DenseStore::new();
        store.add_n(7, 3);
        store.add_n(7, 0);
        store.add_n(-7, 2);

        assert_eq!(store.count(), 5);
        assert_eq!(store.bins().collect::<Vec<_>>(), vec![(-7, 2), (7, 3)]);
    }

    #[test]
    fn test_key_at_rank() {
        let store = store_from(&[5, 5, 5, 10, 10]);

        assert_eq!(store.key_at_rank(1), 5);
        assert_eq!(store.key_at_rank(3), 5);
        assert_eq!(store.key_at_rank(4), 10);
        assert_eq!(store.key_at_rank(5), 10);
        assert_eq!(store.key_at_rank(6), store.max_key().unwrap());

        assert_eq!(store.reversed_key_at_rank(1), 10);
        assert_eq!(store.reversed_key_at_rank(2), 10);
        assert_eq!(store.reversed_key_at_rank(3), 5);
        assert_eq!(store.reversed_key_at_rank(6), store.min_key().unwrap());
    }

    #[test]
    fn test_merge_overlapping() {
        let mut store = store_from(&[1, 2, 3]);
        store.merge(&store_from(&[2, 2, 5]));

        assert_eq!(store.count(), 6);
        assert_eq!(store.bins().collect::<Vec<_>>(), vec![(1, 1), (2, 3), (3, 1), (5, 1)]);
    }

    #[test]
    fn test_merge_other_below() {
        let mut store = store_from(&[1_000]);
        store.merge(&store_from(&[-1_000, 0]));

        assert_eq!(store.bins().collect::<Vec<_>>(), vec![(-1_000, 1), (0, 1), (1_000, 1)]);
    }

    #[test]
    fn test_merge_other_covering() {
        let mut store = DenseStore::with_layout(1, 1).unwrap();
        store.add(5);
        store.add(6);

        let mut other = DenseStore::with_layout(1, 1).unwrap();
        other.add(0);
        other.add(10);

        store.merge(&other);

        assert_eq!(store.min_key(), Some(0));
        assert_eq!(store.max_key(), Some(10));
        assert_eq!(store.bins().collect::<Vec<_>>(), vec![(0, 1), (5, 1), (6, 1), (10, 1)]);
    }

    #[test]
    fn test_merge_other_above() {
        let mut store = store_from(&[-10_000]);
        store.merge(&store_from(&[10_000]));

        assert_eq!(store.bins().collect::<Vec<_>>(), vec![(-10_000, 1), (10_000, 1)]);
    }

    #[test]
    fn test_merge_empty_is_noop() {
        let mut store = store_from(&[4, 8]);
        let before = store.clone();

        store.merge(&DenseStore::new());

        assert_eq!(store, before);
    }

    #[test]
    fn test_merge_into_empty_copies() {
        let other = store_from(&[4, 8]);
        let mut store = DenseStore::new();

        store.merge(&other);

        assert_eq!(store, other);
    }

    #[test]
    fn test_copy_is_independent() {
        let mut other = store_from(&[1, 2]);
        let mut store = DenseStore::new();

        store.copy_from(&other);
        other.add(1);
        other.add(500);

        assert_eq!(store.count(), 2);
        assert_eq!(store.bins().collect::<Vec<_>>(), vec![(1, 1), (2, 1)]);
    }

    #[test]
    fn test_copy_empty() {
        let mut store = store_from(&[3]);
        store.copy_from(&DenseStore::new());

        assert!(store.is_empty());
        assert_eq!(store.min_key(), None);
    }

    #[test]
    fn test_clear() {
        let mut store = store_from(&[5, 500]);
        store.clear();

        assert!(store.is_empty());
        assert_eq!(store.length(), DEFAULT_INITIAL_BIN_COUNT);
        assert_eq!(store.bins().next(), None);

        store.add(-3);
        assert_eq!(store.bins().collect::<Vec<_>>(), vec![(-3, 1)]);
    }

    #[test]
    fn test_display() {
        let mut store = DenseStore::with_layout(2, 2).unwrap();
        assert_eq!(store.to_string(), "{}");

        store.add(1);
        store.add(1);
        store.add(2);
        assert_eq!(store.to_string(), "{1: 2, 2: 1}, min_key: 0, max_key: 3");
    }

    proptest! {
        #[test]
        fn property_test_mass_conservation(keys in prop::collection::vec(-5_000i32..5_000, 0..300), chunk_size in 1usize..200) {
            let mut store = DenseStore::with_layout(chunk_size, chunk_size).unwrap();
            for &key in &keys {
                store.add(key);
            }

            let total: u64 = store.bins().map(|(_, count)| count).sum();
            prop_assert_eq!(store.count(), keys.len() as u64);
            prop_assert_eq!(total, keys.len() as u64);
            prop_assert_eq!(store.bins().collect::<Vec<_>>(), expected_bins(&keys));
        }

        #[test]
        fn property_test_merge_equivalence(
            left in prop::collection::vec(-3_000i32..3_000, 0..100),
            right in prop::collection::vec(-3_000i32..3_000, 0..100),
            chunk_size in 1usize..64,
        ) {
            let mut merged = DenseStore::with_layout(chunk_size, chunk_size).unwrap();
            let mut other = merged.clone();
            for &key in &left {
                merged.add(key);
            }
            for &key in &right {
                other.add(key);
            }
            merged.merge(&other);

            let all = left.iter().chain(right.iter()).copied().collect::<Vec<_>>();
            prop_assert_eq!(merged.count(), all.len() as u64);
            prop_assert_eq!(merged.bins().collect::<Vec<_>>(), expected_bins(&all));
        }

        #[test]
        fn property_test_rank_inverse(keys in prop::collection::vec(-1_000i32..1_000, 1..200)) {
            let store = store_from(&keys);

            let mut ascending = keys.iter().map(|&key| i64::from(key)).collect::<Vec<_>>();
            ascending.sort_unstable();
            for (i, &key) in ascending.iter().enumerate() {
                prop_assert_eq!(store.key_at_rank(i as u64 + 1), key);
            }
            for (i, &key) in ascending.iter().rev().enumerate() {
                prop_assert_eq!(store.reversed_key_at_rank(i as u64 + 1), key);
            }
        }
    }
}
