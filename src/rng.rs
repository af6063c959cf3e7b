//! Seedable PRNG wrapper so beam-search stochasticity is reproducible
//! given the same seed (§4.J determinism requirement).

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

#[derive(Clone)]
pub struct SearchRng(ChaCha8Rng);

impl SearchRng {
    pub fn from_seed(seed: u64) -> Self {
        Self(ChaCha8Rng::seed_from_u64(seed))
    }

    pub fn gen_range_f64(&mut self, low: f64, high: f64) -> f64 {
        self.0.random_range(low..high)
    }

    pub fn gen_bool(&mut self, probability: f64) -> bool {
        self.0.random_bool(probability.clamp(0.0, 1.0))
    }

    /// Weighted pick by score among `(index, weight)` pairs. Weights
    /// must be non-negative; falls back to uniform if all weights are zero.
    pub fn weighted_pick(&mut self, weights: &[f64]) -> Option<usize> {
        let total: f64 = weights.iter().sum();
        if weights.is_empty() {
            return None;
        }
        if total <= 0.0 {
            return Some(self.0.random_range(0..weights.len()));
        }
        let mut target = self.gen_range_f64(0.0, total);
        for (i, w) in weights.iter().enumerate() {
            if target < *w {
                return Some(i);
            }
            target -= w;
        }
        Some(weights.len() - 1)
    }
}
