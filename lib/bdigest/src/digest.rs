use snafu::{ensure, OptionExt as _};
use tracing::debug;

use crate::error::{CountOverflow, EmptyDigest, Error, IncompatibleDigest, InvalidQuantile, InvalidValue};
use crate::mapping::BucketIndexer;
use crate::store::SparseStore;

/// How a quantile estimate is derived from the bucket holding the target rank.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Interpolation {
    /// Interpolate linearly between the bucket's lower and upper bounds by the rank's position within the bucket.
    ///
    /// The lowest rank of a bucket maps to its lower bound and the highest rank to its upper bound, so `q = 0` yields
    /// the lower bound of the lowest bucket and `q = 1` the upper bound of the highest.
    #[default]
    Linear,

    /// Return the bucket's representative value, which is within the relative error bound of every value the bucket
    /// can hold.
    Midpoint,
}

/// A mergeable quantile digest with a fixed relative-error bound.
///
/// Values are assigned to geometric buckets whose width is determined by the error bound, and only a count per bucket
/// is kept. Memory is proportional to the number of distinct buckets touched, not to the number of values added.
/// Values exactly equal to zero are counted separately, as zero has no logarithm.
///
/// Only non-negative, finite values are accepted.
///
/// A digest is not internally synchronized: share one across threads behind a lock, or keep a digest per thread and
/// merge them periodically.
///
/// # Example
///
/// ```
/// use bdigest::Digest;
///
/// let mut digest = Digest::new(0.01).unwrap();
/// for value in [0.5, 1.0, 2.0, 4.0] {
///     digest.add(value).unwrap();
/// }
///
/// let median = digest.quantile(0.5).unwrap();
/// assert!(median > 1.0 && median < 2.1);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Digest {
    /// Maps values to buckets.
    indexer: BucketIndexer,

    /// Counts for positive values.
    store: SparseStore,

    /// Count of values equal to zero.
    zero_count: u64,

    /// Total count of values, including zeros.
    count: u64,
}

impl Digest {
    /// Creates an empty digest with the given relative error bound.
    ///
    /// # Errors
    ///
    /// If the error bound is not between `0` and `1` (exclusive), an error is returned.
    pub fn new(error_bound: f64) -> Result<Self, Error> {
        Ok(Self::with_indexer(BucketIndexer::new(error_bound)?))
    }

    /// Creates an empty digest using the given indexer.
    pub fn with_indexer(indexer: BucketIndexer) -> Self {
        Self {
            indexer,
            store: SparseStore::new(),
            zero_count: 0,
            count: 0,
        }
    }

    pub(crate) fn from_parts(indexer: BucketIndexer, store: SparseStore, zero_count: u64) -> Self {
        let count = zero_count + store.total_count();
        Self {
            indexer,
            store,
            zero_count,
            count,
        }
    }

    /// Adds a single value to the digest.
    ///
    /// # Errors
    ///
    /// If the value is negative, NaN, or infinite, an error is returned and the digest is left unchanged.
    pub fn add(&mut self, value: f64) -> Result<(), Error> {
        self.add_n(value, 1)
    }

    /// Adds a value to the digest `n` times.
    ///
    /// This is useful for pre-aggregated data. Adding with `n == 0` does nothing.
    ///
    /// # Errors
    ///
    /// If the value is negative, NaN, or infinite, or if the total count would overflow, an error is returned and the
    /// digest is left unchanged.
    pub fn add_n(&mut self, value: f64, n: u64) -> Result<(), Error> {
        // `-0.0` passes, and is counted as zero.
        ensure!(value.is_finite() && value >= 0.0, InvalidValue { value });

        if n == 0 {
            return Ok(());
        }

        // The zero count and the store total never exceed `count`, so neither can overflow once this succeeds.
        let count = self.count.checked_add(n).context(CountOverflow)?;
        if value == 0.0 {
            self.zero_count += n;
        } else {
            self.store.add(self.indexer.index(value), n)?;
        }
        self.count = count;

        Ok(())
    }

    /// Returns the approximate value at the given quantile, interpolating linearly within the target bucket.
    ///
    /// See [`Interpolation::Linear`].
    ///
    /// # Errors
    ///
    /// If `q` is not within `[0, 1]`, or the digest is empty, an error is returned.
    pub fn quantile(&self, q: f64) -> Result<f64, Error> {
        self.quantile_with(q, Interpolation::Linear)
    }

    /// Returns the approximate value at the given quantile, using the given interpolation.
    ///
    /// The target rank is `q * (count - 1)`, counted from zero over all values in ascending order. Zeros occupy the
    /// lowest ranks, followed by each bucket in ascending index order.
    ///
    /// # Errors
    ///
    /// If `q` is not within `[0, 1]`, or the digest is empty, an error is returned.
    pub fn quantile_with(&self, q: f64, interpolation: Interpolation) -> Result<f64, Error> {
        ensure!((0.0..=1.0).contains(&q), InvalidQuantile { q });
        ensure!(!self.is_empty(), EmptyDigest);

        let last_rank = (self.count - 1) as f64;
        let rank = q * last_rank;
        if rank < self.zero_count as f64 {
            return Ok(0.0);
        }

        let mut lo = self.zero_count;
        let mut buckets = self.store.iter().peekable();
        while let Some((index, count)) = buckets.next() {
            let hi = lo + count;
            if rank >= hi as f64 && buckets.peek().is_some() {
                lo = hi;
                continue;
            }

            let estimate = match interpolation {
                Interpolation::Midpoint => self.indexer.value(index),
                // The top quantile always reports the upper bound, even when the highest bucket holds a single value.
                Interpolation::Linear if q == 1.0 => self.indexer.upper_bound(index),
                Interpolation::Linear => {
                    let lower = self.indexer.lower_bound(index);
                    let upper = self.indexer.upper_bound(index);
                    let f = ((rank - lo as f64) / count.saturating_sub(1).max(1) as f64).clamp(0.0, 1.0);
                    lower + f * (upper - lower)
                }
            };
            return Ok(estimate);
        }

        // Every rank past the zeros falls in some bucket, so a non-empty digest with ranks left over has buckets.
        Ok(0.0)
    }

    /// Merges another digest into this one.
    ///
    /// Bucket counts, the zero count, and the total count are summed. No re-bucketing is needed, as both digests share
    /// the same bucket boundaries.
    ///
    /// # Errors
    ///
    /// If the other digest was built with a different error bound, or if the combined count would overflow, an error is
    /// returned and this digest is left unchanged.
    pub fn merge(&mut self, other: &Digest) -> Result<(), Error> {
        let expected = self.error_bound();
        let actual = other.error_bound();
        if expected != actual {
            debug!(expected, actual, "Refusing to merge digest with mismatched error bound.");
            return IncompatibleDigest { expected, actual }.fail();
        }

        if other.is_empty() {
            return Ok(());
        }

        let count = self.count.checked_add(other.count).context(CountOverflow)?;
        self.store.merge(&other.store)?;
        self.zero_count += other.zero_count;
        self.count = count;

        Ok(())
    }

    /// Returns the number of populated buckets.
    ///
    /// Zeros are not held in a bucket and do not contribute.
    pub fn size(&self) -> usize {
        self.store.len()
    }

    /// Returns the total number of values added, including zeros.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Returns the number of values added that were exactly zero.
    pub fn zero_count(&self) -> u64 {
        self.zero_count
    }

    /// Returns `true` if no values have been added.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns the relative error bound.
    pub fn error_bound(&self) -> f64 {
        self.indexer.error_bound()
    }

    /// Returns the bucket ratio, `gamma`.
    pub fn bucket_ratio(&self) -> f64 {
        self.indexer.bucket_ratio()
    }

    /// Returns a reference to the bucket indexer.
    pub fn indexer(&self) -> &BucketIndexer {
        &self.indexer
    }

    /// Returns a reference to the bucket store.
    pub fn store(&self) -> &SparseStore {
        &self.store
    }

    /// Returns an iterator over `(index, count)` pairs of populated buckets, in ascending index order.
    pub fn buckets(&self) -> impl DoubleEndedIterator<Item = (i64, u64)> + ExactSizeIterator + '_ {
        self.store.iter()
    }

    /// Clears the digest, removing all values. The error bound is kept.
    pub fn clear(&mut self) {
        self.store.clear();
        self.zero_count = 0;
        self.count = 0;
    }
}

impl Default for Digest {
    /// Creates an empty digest with the default 1% error bound.
    fn default() -> Self {
        Self::with_indexer(BucketIndexer::default())
    }
}
