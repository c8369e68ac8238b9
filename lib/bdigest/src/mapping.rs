//! Value-to-bucket index mapping.

use snafu::ensure;

use crate::config::DEFAULT_ERROR_BOUND;
use crate::error::{Error, InvalidErrorBound};

/// Maps positive values to bucket indices and bucket indices back to values.
///
/// Buckets are geometric: bucket `i` covers `[gamma^i, gamma^(i+1))`, where `gamma = (1 + e) / (1 - e)` and `e` is the
/// relative error bound. Ascending indices cover ascending value ranges.
///
/// Zero is not indexable; callers track it separately.
#[derive(Clone, Debug, PartialEq)]
pub struct BucketIndexer {
    /// The relative error bound this indexer was built for.
    error_bound: f64,

    /// Ratio between a bucket's upper and lower bounds.
    gamma: f64,

    /// Precomputed `1 / ln(gamma)`.
    multiplier: f64,
}

impl BucketIndexer {
    /// Creates a new indexer for the given relative error bound.
    ///
    /// # Errors
    ///
    /// If the error bound is not between `0` and `1` (exclusive), an error is returned.
    ///
    /// # Example
    ///
    /// ```
    /// use bdigest::BucketIndexer;
    ///
    /// let indexer = BucketIndexer::new(0.01).unwrap();
    /// assert_eq!(indexer.index(1.0), 0);
    /// ```
    pub fn new(error_bound: f64) -> Result<Self, Error> {
        // Written so that NaN is rejected as well.
        ensure!(error_bound > 0.0 && error_bound < 1.0, InvalidErrorBound { error_bound });

        // Bounds small enough to round gamma to exactly 1 leave no room between bucket boundaries.
        let gamma = (1.0 + error_bound) / (1.0 - error_bound);
        ensure!(gamma > 1.0, InvalidErrorBound { error_bound });

        Ok(Self {
            error_bound,
            gamma,
            multiplier: 1.0 / gamma.ln(),
        })
    }

    /// Returns the relative error bound.
    pub fn error_bound(&self) -> f64 {
        self.error_bound
    }

    /// Returns the bucket ratio, `gamma`.
    pub fn bucket_ratio(&self) -> f64 {
        self.gamma
    }

    /// Returns the index of the bucket holding the given value.
    ///
    /// The value must be positive and finite.
    pub fn index(&self, value: f64) -> i64 {
        debug_assert!(value > 0.0 && value.is_finite(), "cannot index {}", value);

        let raw = value.ln() * self.multiplier;
        let index = raw.floor();

        // Near a boundary, rounding in `ln` can disagree with `powf` by one bucket. Settle against the bounds so that
        // `index(lower_bound(i)) == i` holds exactly.
        let fract = raw - index;
        let slack = raw.abs().max(1.0) * 1e-9;
        let index = if fract < slack && self.gamma.powf(index) > value {
            index - 1.0
        } else if fract > 1.0 - slack && self.gamma.powf(index + 1.0) <= value {
            index + 1.0
        } else {
            index
        };

        index as i64
    }

    /// Returns the inclusive lower bound of the bucket at the given index.
    pub fn lower_bound(&self, index: i64) -> f64 {
        self.gamma.powf(index as f64)
    }

    /// Returns the exclusive upper bound of the bucket at the given index.
    pub fn upper_bound(&self, index: i64) -> f64 {
        self.gamma.powf(index as f64 + 1.0)
    }

    /// Returns the representative value of the bucket at the given index.
    ///
    /// This is `(1 + e) * gamma^i`, which is within relative error `e` of both bucket bounds, and so of every value
    /// the bucket can hold.
    pub fn value(&self, index: i64) -> f64 {
        (1.0 + self.error_bound) * self.lower_bound(index)
    }
}

impl Default for BucketIndexer {
    /// Creates an indexer with a 1% error bound.
    fn default() -> Self {
        Self::new(DEFAULT_ERROR_BOUND).expect("0.01 is a valid error bound")
    }
}
