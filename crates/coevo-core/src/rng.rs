//! Deterministic RNG wrapper and seed-derivation helpers.

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, RngCore, SeedableRng};
use rand_distr::{Dirichlet, Distribution};
use siphasher::sip::SipHasher13;
use std::hash::Hasher;

use crate::errors::{EcoError, ErrorInfo};

/// Substream used for drawing the initial model state.
pub const INITIAL_STATE_SUBSTREAM: u64 = 0;
/// Substream used by the chain itself.
pub const CHAIN_SUBSTREAM: u64 = 1;

/// Deterministic RNG handle threaded through every operator.
///
/// A thin wrapper around `StdRng`. A chain is seeded from a master `u64`;
/// independent substreams (initial state, chain moves) are derived by hashing
/// `(master_seed, substream_id)` with SipHash-1-3 under fixed zero keys, so a
/// given seed reproduces the same run on every platform.
#[derive(Debug, Clone)]
pub struct RngHandle {
    rng: StdRng,
}

impl RngHandle {
    /// Creates a new RNG handle from a seed.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Creates the handle for `substream` of `master_seed`.
    pub fn substream(master_seed: u64, substream: u64) -> Self {
        Self::from_seed(derive_substream_seed(master_seed, substream))
    }

    /// Uniform draw on `[0, 1)`.
    pub fn uniform_real(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Uniform draw on `[low, high)`.
    pub fn uniform_range(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.uniform_real()
    }

    /// Uniform index in `0..len`. `len` must be positive.
    pub fn uniform_index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    /// `count` distinct indices from `0..len` in random order. `count` must not exceed `len`.
    pub fn random_subset_indices(&mut self, len: usize, count: usize) -> Vec<usize> {
        index::sample(&mut self.rng, len, count).into_vec()
    }

    /// Draws a point on the simplex from a Dirichlet distribution.
    pub fn dirichlet(&mut self, alphas: &[f64]) -> Result<Vec<f64>, EcoError> {
        let dist = Dirichlet::new(alphas).map_err(|err| {
            EcoError::Rng(
                ErrorInfo::new("dirichlet-parameters", err.to_string())
                    .with_context("categories", alphas.len()),
            )
        })?;
        Ok(dist.sample(&mut self.rng))
    }

    /// Draws an index from normalized probabilities by a cumulative scan.
    ///
    /// Rounding can leave the cumulative sum a hair below one; the last index
    /// absorbs that remainder.
    pub fn weighted_index(&mut self, probabilities: &[f64]) -> Result<usize, EcoError> {
        let Some(last) = probabilities.len().checked_sub(1) else {
            return Err(EcoError::Rng(ErrorInfo::new(
                "empty-categorical",
                "cannot draw from an empty set of probabilities",
            )));
        };
        let u = self.uniform_real();
        let mut cumulative = 0.0;
        for (index, &p) in probabilities.iter().enumerate() {
            if !(p.is_finite() && p >= 0.0) {
                return Err(EcoError::Rng(
                    ErrorInfo::new("invalid-probability", "categorical weight is not a probability")
                        .with_context("index", index)
                        .with_context("value", p),
                ));
            }
            cumulative += p;
            if u < cumulative {
                return Ok(index);
            }
        }
        Ok(last)
    }
}

impl RngCore for RngHandle {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.rng.try_fill_bytes(dest)
    }
}

/// Derives the deterministic seed for a specific substream.
pub fn derive_substream_seed(master_seed: u64, substream: u64) -> u64 {
    let mut hasher = SipHasher13::new_with_keys(0, 0);
    hasher.write_u64(master_seed);
    hasher.write_u64(substream);
    hasher.finish()
}
