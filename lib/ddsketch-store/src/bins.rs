//! Contiguous bin storage and the growth policies shared by the dense stores.
//!
//! Both dense stores are a [`BinArray`] paired with a [`Growth`] policy. The insertion and merge algorithms are written
//! once, as free functions generic over the policy, so the unbounded and collapsing stores differ only in how they
//! make room for keys that fall outside of the current window.

use std::{iter::Enumerate, slice};

use tracing::{debug, trace};

/// Number of bins needed to give every `i32` key its own bin.
///
/// Layouts never need more bins than this: a larger bin limit can never trigger a collapse, and a larger chunk would
/// grow past any key a store can receive.
pub(crate) const MAX_KEY_SPAN: u64 = 1 << 32;

/// Returns [`MAX_KEY_SPAN`] as a bin count, saturating on targets where it does not fit in a `usize`.
pub(crate) fn max_key_span() -> usize {
    usize::try_from(MAX_KEY_SPAN).unwrap_or(usize::MAX)
}

/// Converts a bin count bounded by [`MAX_KEY_SPAN`] into a key distance.
fn span(bins: usize) -> i64 {
    i64::try_from(bins).unwrap_or(i64::MAX)
}

/// Contiguous bin counters.
///
/// `bins[i]` holds the count for key `min_key + i`. Once at least one observation has been recorded, the array always
/// spans exactly `[min_key, max_key]`, so `bins.len() == max_key - min_key + 1`.
///
/// Keys are tracked as `i64` even though stores accept `i32` keys: growing by whole chunks can push the physical bounds
/// past the `i32` range, and spans between two `i32` keys do not fit in an `i32` either.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct BinArray {
    pub(crate) bins: Vec<u64>,
    pub(crate) min_key: i64,
    pub(crate) max_key: i64,
    pub(crate) count: u64,
}

impl BinArray {
    /// Creates an empty array with `len` pre-allocated bins.
    pub(crate) fn with_len(len: usize) -> Self {
        Self {
            bins: vec![0; len],
            min_key: 0,
            max_key: 0,
            count: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.bins.len()
    }

    /// Returns the bin index for `key`.
    ///
    /// Keys below the window map to bin 0, which is where collapsed mass lives.
    #[inline]
    fn bin_index(&self, key: i64) -> usize {
        (key - self.min_key).max(0) as usize
    }

    fn increment(&mut self, key: i64, n: u64) {
        let idx = self.bin_index(key);
        self.bins[idx] = self.bins[idx].saturating_add(n);
        self.count = self.count.saturating_add(n);
    }

    /// Prepends `n` empty bins, moving `min_key` down by `n`.
    fn prepend_empty(&mut self, n: usize) {
        if n == 0 {
            return;
        }

        let mut new_bins = vec![0u64; n + self.bins.len()];
        new_bins[n..].copy_from_slice(&self.bins);
        self.bins = new_bins;
        self.min_key -= n as i64;
    }

    /// Appends `n` empty bins, moving `max_key` up by `n`.
    fn append_empty(&mut self, n: usize) {
        self.bins.resize(self.bins.len() + n, 0);
        self.max_key += n as i64;
    }

    /// Folds every bin below `new_min_key` into the bin for `new_min_key`, dropping the folded bins.
    ///
    /// `new_min_key` must lie within `(min_key, max_key]`. Returns the folded count.
    fn collapse_below(&mut self, new_min_key: i64) -> u64 {
        let n = (new_min_key - self.min_key) as usize;
        let folded = sum_counts(&self.bins[..n]);

        self.bins.drain(..n);
        self.bins[0] = self.bins[0].saturating_add(folded);
        self.min_key = new_min_key;

        if folded > 0 {
            debug!(
                folded_bins = n,
                folded_count = folded,
                min_key = self.min_key,
                "Collapsed lowest bins."
            );
        }

        folded
    }

    /// Adds the counts of `other` into `self`, aligned by key.
    ///
    /// `other.max_key` must not exceed `self.max_key`. Bins of `other` below `self.min_key` are summed into bin 0.
    /// Returns the count that had to be folded that way.
    fn add_aligned(&mut self, other: &BinArray) -> u64 {
        debug_assert!(other.max_key <= self.max_key);

        let start = self.min_key.max(other.min_key);
        if other.max_key >= start {
            let dst = (start - self.min_key) as usize;
            let src = (start - other.min_key) as usize;
            let n = (other.max_key - start + 1) as usize;
            for (into, from) in self.bins[dst..dst + n].iter_mut().zip(&other.bins[src..src + n]) {
                *into = into.saturating_add(*from);
            }
        }

        let below = ((self.min_key - other.min_key).max(0) as usize).min(other.bins.len());
        let folded = sum_counts(&other.bins[..below]);
        if folded > 0 {
            self.bins[0] = self.bins[0].saturating_add(folded);
            debug!(
                folded_count = folded,
                min_key = self.min_key,
                "Folded merged bins below the window into the lowest bin."
            );
        }

        self.count = self.count.saturating_add(other.count);
        folded
    }

    /// Returns the smallest key whose ascending cumulative count reaches `rank`, or `max_key` if none does.
    pub(crate) fn key_at_rank(&self, rank: u64) -> i64 {
        let mut running = 0u64;
        for (i, &count) in self.bins.iter().enumerate() {
            running = running.saturating_add(count);
            if running >= rank {
                return self.min_key + i as i64;
            }
        }
        self.max_key
    }

    /// Returns the largest key whose descending cumulative count reaches `rank`, or `min_key` if none does.
    pub(crate) fn reversed_key_at_rank(&self, rank: u64) -> i64 {
        let mut running = 0u64;
        for (i, &count) in self.bins.iter().enumerate().rev() {
            running = running.saturating_add(count);
            if running >= rank {
                return self.min_key + i as i64;
            }
        }
        self.min_key
    }

    /// Returns the physical key bounds, or `None` if nothing has been recorded yet.
    pub(crate) fn key_bounds(&self) -> Option<(i64, i64)> {
        (self.count > 0).then_some((self.min_key, self.max_key))
    }

    pub(crate) fn non_empty_bins(&self) -> Bins<'_> {
        Bins {
            inner: self.bins.iter().enumerate(),
            min_key: self.min_key,
        }
    }
}

fn sum_counts(bins: &[u64]) -> u64 {
    bins.iter().fold(0u64, |acc, &count| acc.saturating_add(count))
}

/// Number of bins to grow by so that `required` more keys fit, rounded up to a whole number of chunks.
///
/// `required` must be positive and `chunk_size` must lie within `1..=MAX_KEY_SPAN`, which keeps the result well
/// within `i64`.
fn grow_by(required: i64, chunk_size: usize) -> i64 {
    let required = u64::try_from(required).unwrap_or(0);
    let chunk_size = u64::try_from(chunk_size).unwrap_or(u64::MAX);
    let grown = required.div_ceil(chunk_size).saturating_mul(chunk_size);
    i64::try_from(grown).unwrap_or(i64::MAX)
}

/// An iterator over the non-empty bins of a store, as `(key, count)` pairs in ascending key order.
#[derive(Clone, Debug)]
pub struct Bins<'a> {
    inner: Enumerate<slice::Iter<'a, u64>>,
    min_key: i64,
}

impl Iterator for Bins<'_> {
    type Item = (i64, u64);

    fn next(&mut self) -> Option<Self::Item> {
        let min_key = self.min_key;
        self.inner
            .by_ref()
            .find(|(_, &count)| count > 0)
            .map(|(i, &count)| (min_key + i as i64, count))
    }
}

impl DoubleEndedIterator for Bins<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let min_key = self.min_key;
        self.inner
            .by_ref()
            .rfind(|(_, &count)| count > 0)
            .map(|(i, &count)| (min_key + i as i64, count))
    }
}

/// How a store makes room for keys outside of its current window.
///
/// Both methods are only called on a non-empty array, with `key < min_key` and `key > max_key` respectively. They
/// return `true` when recorded counts had to be folded into a bin other than their own.
pub(crate) trait Growth {
    /// Number of bins to allocate when an array with no bins at all receives its first key.
    fn initial_chunk_size(&self) -> usize;

    fn grow_left(&self, bins: &mut BinArray, key: i64) -> bool;

    fn grow_right(&self, bins: &mut BinArray, key: i64) -> bool;

    /// Brings an array adopted from another store back within this policy's bounds.
    fn fit(&self, _bins: &mut BinArray) -> bool {
        false
    }
}

/// Unbounded growth, in whole chunks, in either direction.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Chunked {
    pub(crate) chunk_size: usize,
}

impl Growth for Chunked {
    fn initial_chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn grow_left(&self, bins: &mut BinArray, key: i64) -> bool {
        let new_min_key = bins.min_key - grow_by(bins.min_key - key, self.chunk_size);
        bins.prepend_empty((bins.min_key - new_min_key) as usize);

        trace!(min_key = bins.min_key, length = bins.len(), "Grew bins to the left.");
        false
    }

    fn grow_right(&self, bins: &mut BinArray, key: i64) -> bool {
        let new_max_key = bins.max_key + grow_by(key - bins.max_key, self.chunk_size);
        bins.append_empty((new_max_key - bins.max_key) as usize);

        trace!(max_key = bins.max_key, length = bins.len(), "Grew bins to the right.");
        false
    }
}

/// Chunked growth capped at `max_bins`, collapsing the lowest bins once the cap is reached.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct CollapsingLowest {
    pub(crate) chunk_size: usize,
    pub(crate) max_bins: usize,
}

impl Growth for CollapsingLowest {
    fn initial_chunk_size(&self) -> usize {
        self.chunk_size.min(self.max_bins)
    }

    fn grow_left(&self, bins: &mut BinArray, key: i64) -> bool {
        let max_bins = span(self.max_bins);

        // The window cannot move left once it is full; the key ends up in bin 0.
        if bins.len() >= self.max_bins {
            return false;
        }

        let min_possible = bins.max_key - max_bins + 1;
        let new_min_key = if bins.max_key - key >= max_bins {
            min_possible
        } else {
            (bins.min_key - grow_by(bins.min_key - key, self.chunk_size)).max(min_possible)
        };
        bins.prepend_empty((bins.min_key - new_min_key) as usize);

        trace!(min_key = bins.min_key, length = bins.len(), "Grew bins to the left.");
        false
    }

    fn grow_right(&self, bins: &mut BinArray, key: i64) -> bool {
        let max_bins = span(self.max_bins);

        if key - bins.max_key >= max_bins {
            // Nothing recorded so far fits in the new window: everything lands in its lowest bin.
            bins.bins.clear();
            bins.bins.resize(self.max_bins, 0);
            bins.bins[0] = bins.count;
            bins.min_key = key - max_bins + 1;
            bins.max_key = key;

            debug!(
                folded_count = bins.count,
                min_key = bins.min_key,
                "Collapsed all bins into the lowest bin."
            );
            true
        } else if key - bins.min_key >= max_bins {
            let new_min_key = key - max_bins + 1;
            let folded = bins.collapse_below(new_min_key);
            bins.append_empty((key - bins.max_key) as usize);
            folded > 0
        } else {
            // Capped at `max_bins - 1` past `min_key` so the array holds at most `max_bins` bins.
            let new_max_key =
                (bins.max_key + grow_by(key - bins.max_key, self.chunk_size)).min(bins.min_key + max_bins - 1);
            bins.append_empty((new_max_key - bins.max_key) as usize);

            trace!(max_key = bins.max_key, length = bins.len(), "Grew bins to the right.");
            false
        }
    }

    fn fit(&self, bins: &mut BinArray) -> bool {
        if bins.len() <= self.max_bins {
            return false;
        }

        let new_min_key = bins.max_key - span(self.max_bins) + 1;
        bins.collapse_below(new_min_key) > 0
    }
}

/// Records `n` observations of `key`, growing the array first as `growth` allows.
///
/// Returns `true` if recorded counts were collapsed, including when `key` itself fell below the window.
pub(crate) fn add_key<G: Growth>(bins: &mut BinArray, growth: &G, key: i64, n: u64) -> bool {
    if bins.bins.is_empty() {
        bins.bins.resize(growth.initial_chunk_size(), 0);
    }

    let mut collapsed = false;
    if bins.count == 0 {
        bins.max_key = key;
        bins.min_key = key - bins.len() as i64 + 1;
    } else if key < bins.min_key {
        collapsed = growth.grow_left(bins, key);
    } else if key > bins.max_key {
        collapsed = growth.grow_right(bins, key);
    }

    collapsed |= key < bins.min_key;
    bins.increment(key, n);
    collapsed
}

/// Merges `other` into `bins`, growing as `growth` allows.
///
/// Both arrays must be non-empty. Returns `true` if any counts were collapsed along the way.
pub(crate) fn merge_bins<G: Growth>(bins: &mut BinArray, growth: &G, other: &BinArray) -> bool {
    debug_assert!(bins.count > 0 && other.count > 0);

    if bins.max_key > other.max_key {
        let mut collapsed = false;
        if other.min_key < bins.min_key {
            collapsed = growth.grow_left(bins, other.min_key);
        }
        bins.add_aligned(other) > 0 || collapsed
    } else if other.min_key < bins.min_key {
        // `other` spans all of `bins`, so start from its array instead.
        let mut merged = other.clone();
        merged.add_aligned(bins);
        *bins = merged;
        growth.fit(bins)
    } else {
        let mut collapsed = false;
        if other.max_key > bins.max_key {
            collapsed = growth.grow_right(bins, other.max_key);
        }
        bins.add_aligned(other) > 0 || collapsed
    }
}
