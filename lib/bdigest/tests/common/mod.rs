use bdigest::Digest;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, LogNormal};

/// Generates `count` samples of `exp(N(0, 1))` from a fixed seed.
pub fn log_normal_values(seed: u64, count: usize) -> Vec<f64> {
    let distribution = LogNormal::new(0.0, 1.0).expect("log-normal distribution should be valid");
    let mut rng = rand::rngs::SmallRng::seed_from_u64(seed);

    distribution.sample_iter(&mut rng).take(count).collect()
}

/// Builds a digest from log-normal samples, replacing roughly one in `zero_chance` samples with zero.
///
/// A `zero_chance` of zero adds no zeros.
#[allow(dead_code)]
pub fn log_normal_digest(error_bound: f64, seed: u64, count: usize, zero_chance: u32) -> Digest {
    let mut digest = Digest::new(error_bound).expect("error bound should be valid");
    let mut rng = rand::rngs::SmallRng::seed_from_u64(seed ^ 0xC0FFEE);

    for value in log_normal_values(seed, count) {
        if zero_chance > 0 && rng.random_ratio(1, zero_chance) {
            digest.add(0.0).expect("zero is a valid value");
        } else {
            digest.add(value).expect("log-normal samples are valid values");
        }
    }

    digest
}
