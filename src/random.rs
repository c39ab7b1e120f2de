//! Injectable randomness.
//!
//! Backoff waits and courtesy delays draw from a [`RandomSource`] so tests can
//! substitute a fixed sequence. Name sampling always uses a seeded `StdRng`
//! so that a given seed reproduces the same sample.

use crate::config::DelayRange;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;
use std::time::Duration;

/// Source of uniformly distributed values.
pub trait RandomSource: Send + Sync {
    /// A value drawn uniformly from `[low, high]`.
    fn uniform(&self, low: f64, high: f64) -> f64;
}

/// Draw a wait duration from `range` using `source`.
pub fn delay_in(source: &dyn RandomSource, range: DelayRange) -> Duration {
    let secs = source.uniform(range.min_secs, range.max_secs);
    Duration::from_secs_f64(secs.max(0.0))
}

/// Production source backed by `StdRng`.
pub struct StdRandom {
    rng: Mutex<StdRng>,
}

impl StdRandom {
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for StdRandom {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl RandomSource for StdRandom {
    fn uniform(&self, low: f64, high: f64) -> f64 {
        if high <= low {
            return low;
        }
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        rng.gen_range(low..=high)
    }
}

/// Uniform sample without replacement of `size` items, reproducible by `seed`.
///
/// Returns every item (in input order) when `size >= items.len()`.
pub fn sample_without_replacement<T: Clone>(items: &[T], size: usize, seed: u64) -> Vec<T> {
    if size >= items.len() {
        return items.to_vec();
    }
    let mut rng = StdRng::seed_from_u64(seed);
    rand::seq::index::sample(&mut rng, items.len(), size)
        .into_iter()
        .map(|i| items[i].clone())
        .collect()
}
