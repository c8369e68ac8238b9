use std::collections::BTreeMap;

use snafu::OptionExt as _;

use crate::error::{CountOverflow, Error};

/// A sparse store of bucket counts, keyed by bucket index.
///
/// Only buckets holding at least one observation are present, so memory grows with the number of distinct buckets
/// touched rather than with the number of observations or the span of indices. Buckets are kept in ascending index
/// order, which is the order quantile estimation, merging, and encoding all walk them in.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SparseStore {
    /// The bucket counts, keyed by index. Every count is non-zero.
    bins: BTreeMap<i64, u64>,

    /// Total count across all bins.
    count: u64,
}

impl SparseStore {
    /// Creates an empty `SparseStore`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `count` observations to the bucket at the given index.
    ///
    /// # Errors
    ///
    /// If the total count would overflow, an error is returned and the store is left unchanged.
    pub fn add(&mut self, index: i64, count: u64) -> Result<(), Error> {
        if count == 0 {
            return Ok(());
        }

        // Every bin is bounded by the total, so checking the total covers the bin too.
        let total = self.count.checked_add(count).context(CountOverflow)?;
        *self.bins.entry(index).or_insert(0) += count;
        self.count = total;

        Ok(())
    }

    /// Returns the total count across all buckets.
    pub fn total_count(&self) -> u64 {
        self.count
    }

    /// Returns the number of populated buckets.
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    /// Returns `true` if no bucket is populated.
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Returns the lowest populated index, or `None` if empty.
    pub fn min_index(&self) -> Option<i64> {
        self.bins.keys().next().copied()
    }

    /// Returns the highest populated index, or `None` if empty.
    pub fn max_index(&self) -> Option<i64> {
        self.bins.keys().next_back().copied()
    }

    /// Returns an iterator over `(index, count)` pairs in ascending index order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (i64, u64)> + ExactSizeIterator + '_ {
        self.bins.iter().map(|(&index, &count)| (index, count))
    }

    /// Merges another store into this one.
    ///
    /// # Errors
    ///
    /// If the combined total count would overflow, an error is returned and the store is left unchanged.
    pub fn merge(&mut self, other: &Self) -> Result<(), Error> {
        let total = self.count.checked_add(other.count).context(CountOverflow)?;
        for (&index, &count) in &other.bins {
            *self.bins.entry(index).or_insert(0) += count;
        }
        self.count = total;

        Ok(())
    }

    /// Clears all buckets from the store.
    pub fn clear(&mut self) {
        self.bins.clear();
        self.count = 0;
    }
}
