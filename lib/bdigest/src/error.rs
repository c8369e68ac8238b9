//! Error types.

use snafu::Snafu;

/// Errors returned by digest operations.
#[derive(Clone, Debug, PartialEq, Snafu)]
#[snafu(context(suffix(false)), visibility(pub(crate)))]
pub enum Error {
    /// The requested relative error bound is not within `(0, 1)`.
    #[snafu(display("error bound must be between 0 and 1 (exclusive), got {error_bound}"))]
    InvalidErrorBound {
        /// The rejected error bound.
        error_bound: f64,
    },

    /// The value is negative, NaN, or infinite.
    #[snafu(display("value must be finite and non-negative, got {value}"))]
    InvalidValue {
        /// The rejected value.
        value: f64,
    },

    /// The digests were built with different error bounds and cannot be merged.
    #[snafu(display("cannot merge digest with error bound {actual} into digest with error bound {expected}"))]
    IncompatibleDigest {
        /// Error bound of the receiving digest.
        expected: f64,

        /// Error bound of the digest being merged in.
        actual: f64,
    },

    /// The quantile is not within `[0, 1]`.
    #[snafu(display("quantile must be between 0 and 1 (inclusive), got {q}"))]
    InvalidQuantile {
        /// The rejected quantile.
        q: f64,
    },

    /// The digest holds no observations, so no quantile can be estimated.
    #[snafu(display("cannot estimate a quantile of an empty digest"))]
    EmptyDigest,

    /// Adding the observations would overflow the digest's `u64` total count.
    #[snafu(display("observation count overflows"))]
    CountOverflow,

    /// The encoded digest could not be decoded.
    #[snafu(display("corrupt digest data: {source}"))]
    CorruptData {
        /// Error source.
        source: DecodeError,
    },
}

/// Reasons an encoded digest can be rejected.
#[derive(Clone, Debug, PartialEq, Snafu)]
#[snafu(context(suffix(false)), visibility(pub(crate)))]
pub enum DecodeError {
    /// The format version byte is not one this crate understands.
    #[snafu(display("unsupported format version {version}"))]
    UnsupportedVersion {
        /// The version byte found.
        version: u8,
    },

    /// The buffer ended before the given field could be read.
    #[snafu(display("buffer truncated while reading {field}"))]
    Truncated {
        /// The field being read.
        field: &'static str,
    },

    /// A variable-length integer ran past ten bytes or overflowed 64 bits.
    #[snafu(display("malformed variable-length integer in {field}"))]
    VarintOverflow {
        /// The field being read.
        field: &'static str,
    },

    /// The encoded error bound is not within `(0, 1)`.
    #[snafu(display("encoded error bound {error_bound} is not between 0 and 1 (exclusive)"))]
    ErrorBoundOutOfRange {
        /// The encoded error bound.
        error_bound: f64,
    },

    /// The declared bucket count cannot fit in the remaining bytes.
    #[snafu(display("declared {declared} buckets but only {remaining} bytes remain"))]
    BucketCountMismatch {
        /// The declared bucket count.
        declared: u64,

        /// Bytes left in the buffer after the header.
        remaining: usize,
    },

    /// A bucket index did not strictly increase over the previous one.
    #[snafu(display("bucket index {index} does not follow previous index {previous}"))]
    NonIncreasingIndex {
        /// The previous bucket index.
        previous: i64,

        /// The offending bucket index.
        index: i64,
    },

    /// Applying an index delta overflowed the index range.
    #[snafu(display("bucket index delta {delta} overflows previous index {previous}"))]
    IndexOverflow {
        /// The previous bucket index.
        previous: i64,

        /// The decoded delta.
        delta: i64,
    },

    /// A bucket was encoded with a count of zero.
    #[snafu(display("bucket {index} has a count of zero"))]
    EmptyBucket {
        /// The offending bucket index.
        index: i64,
    },

    /// The total number of observations overflows `u64`.
    #[snafu(display("total observation count overflows"))]
    TotalCountOverflow,

    /// Bytes remain after the last declared bucket.
    #[snafu(display("{remaining} trailing bytes after the last bucket"))]
    TrailingBytes {
        /// Number of unread bytes.
        remaining: usize,
    },
}
