use serde::Deserialize;

use crate::store::check_chunk_size;
use crate::{CollapsingLowestDenseStore, DenseStore, StoreError, DEFAULT_CHUNK_SIZE, DEFAULT_INITIAL_BIN_COUNT};

const fn default_initial_bin_count() -> usize {
    DEFAULT_INITIAL_BIN_COUNT
}

const fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

/// Store layout configuration.
///
/// Describes how a store allocates and grows its bins. Any field left out when deserializing takes its default value.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct StoreConfiguration {
    /// The number of bins to allocate up front.
    ///
    /// Defaults to 128.
    #[serde(default = "default_initial_bin_count")]
    pub initial_bin_count: usize,

    /// The number of bins to grow by when a key falls outside of the allocated range.
    ///
    /// Must be greater than zero. Defaults to 128.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// The maximum number of bins to allocate.
    ///
    /// Only used by collapsing stores, for which it is required. Must be greater than zero when set.
    #[serde(default)]
    pub max_bins: Option<usize>,
}

impl StoreConfiguration {
    /// Checks that the configured layout is usable.
    ///
    /// # Errors
    ///
    /// If `chunk_size` is zero or larger than 2^32, or `max_bins` is set to zero, an error is returned.
    pub fn validate(&self) -> Result<(), StoreError> {
        check_chunk_size(self.chunk_size)?;

        if self.max_bins == Some(0) {
            return Err(StoreError::ZeroMaxBins);
        }

        Ok(())
    }

    /// Builds an unbounded [`DenseStore`] with this layout. `max_bins` is ignored.
    ///
    /// # Errors
    ///
    /// If the layout is invalid, an error is returned.
    pub fn build_dense(&self) -> Result<DenseStore, StoreError> {
        self.validate()?;
        DenseStore::with_layout(self.initial_bin_count, self.chunk_size)
    }

    /// Builds a [`CollapsingLowestDenseStore`] with this layout.
    ///
    /// # Errors
    ///
    /// If the layout is invalid, or `max_bins` is not set, an error is returned.
    pub fn build_collapsing(&self) -> Result<CollapsingLowestDenseStore, StoreError> {
        self.validate()?;
        let max_bins = self.max_bins.ok_or(StoreError::MissingMaxBins)?;
        CollapsingLowestDenseStore::with_layout(max_bins, self.initial_bin_count, self.chunk_size)
    }
}

impl Default for StoreConfiguration {
    fn default() -> Self {
        Self {
            initial_bin_count: default_initial_bin_count(),
            chunk_size: default_chunk_size(),
            max_bins: None,
        }
    }
}
