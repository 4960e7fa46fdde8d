use snafu::Snafu;

/// Errors that can occur when constructing a store.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Snafu)]
pub enum StoreError {
    /// The chunk size was zero.
    #[snafu(display("Chunk size must be greater than zero."))]
    ZeroChunkSize,

    /// The chunk size exceeded the number of bins needed to cover every key.
    #[snafu(display("Chunk size must not exceed {} bins, got {}.", max_chunk_size, chunk_size))]
    ChunkSizeTooLarge {
        /// The requested chunk size.
        chunk_size: usize,

        /// The largest accepted chunk size.
        max_chunk_size: usize,
    },

    /// The maximum number of bins was zero.
    #[snafu(display("Maximum number of bins must be greater than zero."))]
    ZeroMaxBins,

    /// A collapsing store was requested without a maximum number of bins.
    #[snafu(display("Maximum number of bins must be set to build a collapsing store."))]
    MissingMaxBins,
}
