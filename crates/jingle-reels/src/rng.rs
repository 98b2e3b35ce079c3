//! Seedable random source
//!
//! Every roll in a session goes through one [`SpinRng`], so a fixed seed
//! replays a session exactly.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Session random stream
#[derive(Debug, Clone)]
pub struct SpinRng {
    inner: ChaCha8Rng,
    seed: Option<u64>,
}

impl SpinRng {
    /// Deterministic stream
    pub fn seeded(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
            seed: Some(seed),
        }
    }

    /// Stream seeded from the OS
    pub fn from_entropy() -> Self {
        Self {
            inner: ChaCha8Rng::from_os_rng(),
            seed: None,
        }
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Uniform in `[0, 1)`
    pub fn unit(&mut self) -> f64 {
        self.inner.random::<f64>()
    }

    /// Bernoulli roll; probabilities outside `[0, 1]` are clamped
    pub fn chance(&mut self, probability: f64) -> bool {
        self.inner.random_bool(probability.clamp(0.0, 1.0))
    }

    /// Uniform index below `len` (0 for an empty range)
    pub fn index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        self.inner.random_range(0..len)
    }

    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let i = self.index(items.len());
        items.get(i)
    }

    /// Weighted pick by cumulative subtraction. Zero weights are never chosen.
    pub fn pick_weighted<'a, T>(&mut self, items: &'a [(T, u32)]) -> Option<&'a T> {
        let total: u64 = items.iter().map(|(_, w)| u64::from(*w)).sum();
        if total == 0 {
            return None;
        }
        let mut target = self.inner.random_range(0..total);
        for (item, weight) in items {
            let weight = u64::from(*weight);
            if target < weight {
                return Some(item);
            }
            target -= weight;
        }
        None
    }

    /// In-place Fisher–Yates shuffle
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.inner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_streams_repeat() {
        let mut a = SpinRng::seeded(42);
        let mut b = SpinRng::seeded(42);
        for _ in 0..32 {
            assert_eq!(a.index(1000), b.index(1000));
        }
        assert_eq!(a.seed(), Some(42));
    }

    #[test]
    fn test_chance_edges() {
        let mut rng = SpinRng::seeded(1);
        for _ in 0..100 {
            assert!(!rng.chance(0.0));
            assert!(rng.chance(1.0));
            assert!(rng.chance(7.0));
            assert!(!rng.chance(-1.0));
        }
    }

    #[test]
    fn test_weighted_pick_skips_zero_weights() {
        let mut rng = SpinRng::seeded(9);
        let items = [("never", 0), ("always", 5), ("nope", 0)];
        for _ in 0..50 {
            assert_eq!(rng.pick_weighted(&items), Some(&"always"));
        }
        let empty: [(&str, u32); 1] = [("x", 0)];
        assert_eq!(rng.pick_weighted(&empty), None);
    }

    #[test]
    fn test_pick_and_index_are_total() {
        let mut rng = SpinRng::seeded(3);
        let empty: [u8; 0] = [];
        assert_eq!(rng.pick(&empty), None);
        assert_eq!(rng.index(0), 0);
    }
}
