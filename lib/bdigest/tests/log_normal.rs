//! End-to-end checks against a seeded log-normal sample, the shape latency data usually takes.

use std::thread;

use bdigest::{Digest, Interpolation};

use crate::common::{log_normal_digest, log_normal_values};

mod common;

const ERROR_BOUND: f64 = 0.01;
const COUNT: usize = 100_000;
const QUANTILES: [f64; 13] = [0.0, 0.001, 0.01, 0.1, 0.25, 0.5, 0.75, 0.9, 0.95, 0.99, 0.999, 0.9999, 1.0];

fn sorted(mut values: Vec<f64>) -> Vec<f64> {
    values.sort_by(f64::total_cmp);
    values
}

#[test]
fn bucket_count_and_median() {
    let values = log_normal_values(0, COUNT);
    let mut digest = Digest::new(ERROR_BOUND).unwrap();
    for &value in &values {
        digest.add(value).unwrap();
    }

    assert_eq!(digest.count(), COUNT as u64);
    // About six standard deviations of the log are densely covered at two percent per bucket, plus a sparse tail.
    let size = digest.size();
    assert!((330..=430).contains(&size), "unexpected bucket count {}", size);

    let median = digest.quantile(0.5).unwrap();
    assert!((median - 1.0).abs() <= 0.05, "median {} too far from 1", median);

    let values = sorted(values);
    let lower_median = values[COUNT / 2 - 1];
    let gamma = digest.bucket_ratio();
    assert!((median - lower_median).abs() <= (gamma - 1.0) * lower_median);

    let midpoint = digest.quantile_with(0.5, Interpolation::Midpoint).unwrap();
    assert!((midpoint - lower_median).abs() <= ERROR_BOUND * (1.0 + 1e-9) * lower_median);
}

#[test]
fn extremes_are_bracketed() {
    let digest = log_normal_digest(ERROR_BOUND, 1, COUNT, 0);
    let values = sorted(log_normal_values(1, COUNT));

    let min = values[0];
    let max = values[COUNT - 1];
    let q0 = digest.quantile(0.0).unwrap();
    let q1 = digest.quantile(1.0).unwrap();

    assert!(q0 <= min && min < q0 * digest.bucket_ratio());
    assert!(q1 > max && max >= q1 / digest.bucket_ratio());
}

#[test]
fn quantiles_track_exact_ranks() {
    for error_bound in [0.001, 0.01, 0.05] {
        let digest = log_normal_digest(error_bound, 2, COUNT, 0);
        let values = sorted(log_normal_values(2, COUNT));
        let gamma = digest.bucket_ratio();
        let last_rank = (COUNT - 1) as f64;

        for rank in (0..COUNT - 1).step_by(997) {
            // Aim inside the rank so rounding in `q * (count - 1)` cannot slip into the neighboring bucket.
            let q = (rank as f64 + 0.25) / last_rank;
            let expected = values[rank];

            let linear = digest.quantile(q).unwrap();
            assert!(
                (linear - expected).abs() <= (gamma - 1.0) * (1.0 + 1e-9) * expected,
                "error bound {} rank {}: expected {}, got {}",
                error_bound,
                rank,
                expected,
                linear
            );

            let midpoint = digest.quantile_with(q, Interpolation::Midpoint).unwrap();
            assert!(
                (midpoint - expected).abs() <= error_bound * (1.0 + 1e-9) * expected,
                "error bound {} rank {}: expected {}, got {}",
                error_bound,
                rank,
                expected,
                midpoint
            );
        }
    }
}

#[test]
fn quantiles_are_monotonic() {
    let digest = log_normal_digest(ERROR_BOUND, 3, COUNT, 10);

    for interpolation in [Interpolation::Linear, Interpolation::Midpoint] {
        let estimates = QUANTILES
            .iter()
            .map(|&q| digest.quantile_with(q, interpolation).unwrap())
            .collect::<Vec<_>>();
        assert!(
            estimates.windows(2).all(|w| w[0] <= w[1]),
            "{:?} estimates not monotonic: {:?}",
            interpolation,
            estimates
        );
    }
}

#[test]
fn zeros_fill_lowest_ranks() {
    let digest = log_normal_digest(ERROR_BOUND, 4, COUNT, 4);
    let zero_fraction = digest.zero_count() as f64 / digest.count() as f64;
    assert!(zero_fraction > 0.2 && zero_fraction < 0.3);

    for q in [0.0, zero_fraction / 2.0, zero_fraction * 0.99] {
        assert_eq!(digest.quantile(q).unwrap(), 0.0);
    }
    assert!(digest.quantile(zero_fraction + 0.01).unwrap() > 0.0);
}

#[test]
fn roundtrip_is_compact_and_exact() {
    let digest = log_normal_digest(ERROR_BOUND, 5, COUNT, 100);
    let encoded = digest.marshal_binary();

    // Adjacent buckets cost a single byte of index delta, and counts rarely need more than two bytes.
    assert!(encoded.len() <= 16 + 4 * digest.size(), "{} bytes", encoded.len());

    let decoded = Digest::decode(&encoded).unwrap();
    assert_eq!(decoded, digest);
    for q in QUANTILES {
        assert_eq!(decoded.quantile(q), digest.quantile(q));
    }
}

#[test]
fn per_thread_digests_merge_into_aggregate() {
    let handles = (0..4)
        .map(|seed| thread::spawn(move || log_normal_digest(ERROR_BOUND, seed, COUNT / 4, 0)))
        .collect::<Vec<_>>();

    let mut aggregate = Digest::new(ERROR_BOUND).unwrap();
    for handle in handles {
        let local = handle.join().expect("worker should not panic");
        aggregate.merge(&local).unwrap();
    }

    assert_eq!(aggregate.count(), COUNT as u64);

    let mut sequential = Digest::new(ERROR_BOUND).unwrap();
    for seed in 0..4 {
        for value in log_normal_values(seed, COUNT / 4) {
            sequential.add(value).unwrap();
        }
    }
    assert_eq!(aggregate, sequential);
}

#[test]
fn merge_rejects_other_error_bound() {
    let mut digest1 = log_normal_digest(0.01, 6, 1_000, 0);
    let digest2 = log_normal_digest(0.05, 7, 1_000, 0);
    let (before1, before2) = (digest1.clone(), digest2.clone());

    assert!(matches!(
        digest1.merge(&digest2),
        Err(bdigest::Error::IncompatibleDigest { .. })
    ));
    assert_eq!(digest1, before1);
    assert_eq!(digest2, before2);
}
