//! Bin storage for DDSketch quantile sketches.
//!
//! A store maps integer bin keys, produced by a sketch's index mapping, to the number of observations in each bin.
//! Sketches record observations with [`Store::add`], combine independently accumulated stores with [`Store::merge`], and
//! answer quantile queries by turning ranks back into keys with [`Store::key_at_rank`].
//!
//! # Quick Start
//!
//! ```
//! use ddsketch_store::{CollapsingLowestDenseStore, DenseStore, Store as _};
//!
//! let mut store = DenseStore::new();
//! for key in [1, 2, 3] {
//!     store.add(key);
//! }
//!
//! let mut other = DenseStore::new();
//! for key in [2, 2, 5] {
//!     other.add(key);
//! }
//!
//! store.merge(&other);
//! assert_eq!(store.count(), 6);
//! assert_eq!(store.key_at_rank(4), 2);
//!
//! // A bounded store never holds more than `max_bins` bins.
//! let mut bounded = CollapsingLowestDenseStore::new(3).unwrap();
//! bounded.add(0);
//! bounded.add(10);
//! assert!(bounded.length() <= 3);
//! assert_eq!(bounded.key_at_rank(1), 8);
//! ```
#![deny(warnings)]
#![deny(missing_docs)]

mod bins;
pub use self::bins::Bins;

mod config;
pub use self::config::StoreConfiguration;

mod error;
pub use self::error::StoreError;

pub mod store;
pub use self::store::{
    CollapsingLowestDenseStore, DenseStore, Store, DEFAULT_CHUNK_SIZE, DEFAULT_INITIAL_BIN_COUNT, DEFAULT_MAX_BINS,
};
