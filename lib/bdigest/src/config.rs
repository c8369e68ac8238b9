//! Digest configuration.

use serde::{Deserialize, Serialize};

use crate::digest::Digest;
use crate::error::Error;

pub(crate) const DEFAULT_ERROR_BOUND: f64 = 0.01;

const fn default_error_bound() -> f64 {
    DEFAULT_ERROR_BOUND
}

/// Digest configuration.
///
/// Deserializable from any `serde` source, so a digest's parameters can live alongside the rest of an application's
/// configuration. Missing fields take their defaults.
///
/// ```
/// use bdigest::DigestConfig;
///
/// let config = DigestConfig::default().with_error_bound(0.05);
/// let digest = config.build().unwrap();
/// assert_eq!(digest.error_bound(), 0.05);
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DigestConfig {
    /// Relative error bound of quantile estimates.
    ///
    /// Must be between `0` and `1` (exclusive). Defaults to `0.01`.
    #[serde(default = "default_error_bound")]
    pub error_bound: f64,
}

impl DigestConfig {
    /// Sets the relative error bound.
    pub fn with_error_bound(mut self, error_bound: f64) -> Self {
        self.error_bound = error_bound;
        self
    }

    /// Builds an empty digest from this configuration.
    ///
    /// # Errors
    ///
    /// If the configured error bound is not between `0` and `1` (exclusive), an error is returned.
    pub fn build(&self) -> Result<Digest, Error> {
        Digest::new(self.error_bound)
    }
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            error_bound: DEFAULT_ERROR_BOUND,
        }
    }
}
