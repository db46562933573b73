//! Benchmark workloads for the malm toolkit.
//!
//! Deterministic key and size streams (seeded ChaCha8) shared by the
//! criterion benches, so runs are comparable across machines and
//! commits.

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use rand::{RngExt, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Deterministic stream of `count` u64 keys.
pub fn keys(seed: u64, count: usize) -> Vec<u64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count).map(|_| rng.random()).collect()
}

/// Deterministic stream of `count` allocation sizes in `1..=max`.
pub fn sizes(seed: u64, count: usize, max: usize) -> Vec<usize> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count).map(|_| rng.random_range(1..=max)).collect()
}
