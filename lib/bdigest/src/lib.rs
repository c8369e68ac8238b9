//! A mergeable quantile digest with a fixed relative-error bound.
//!
//! A [`Digest`] ingests a stream of non-negative values and answers quantile queries (p50, p99, p999, ...) using memory
//! proportional to the number of distinct geometric buckets touched, not to the number of values. The error bound is
//! fixed at construction and determines the bucket width: each bucket spans a ratio of `(1 + e) / (1 - e)`.
//!
//! Digests built with the same error bound can be merged without loss, and serialized to a compact binary form for
//! storage or transport.
//!
//! # Quick Start
//!
//! ```
//! use bdigest::{Digest, Interpolation};
//!
//! // Create a digest with a 1% relative error bound.
//! let mut digest = Digest::new(0.01).unwrap();
//!
//! for latency_ms in [12.5, 13.1, 11.9, 250.0, 0.0] {
//!     digest.add(latency_ms).unwrap();
//! }
//!
//! let p50 = digest.quantile(0.5).unwrap();
//! let p99 = digest.quantile_with(0.99, Interpolation::Midpoint).unwrap();
//! assert!(p50 <= p99);
//!
//! // Ship it somewhere else, and merge it with a digest built there.
//! let encoded = digest.marshal_binary();
//! let mut aggregate = Digest::new(0.01).unwrap();
//! aggregate.merge(&Digest::decode(&encoded).unwrap()).unwrap();
//! assert_eq!(aggregate.count(), 5);
//! ```
#![deny(missing_docs)]

mod codec;

#[cfg(test)]
mod common;

mod config;
pub use self::config::DigestConfig;

mod digest;
pub use self::digest::{Digest, Interpolation};

mod error;
pub use self::error::{DecodeError, Error};

mod mapping;
pub use self::mapping::BucketIndexer;

mod store;
pub use self::store::SparseStore;
