//! Random variation for humanized timing and motion

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Injectable random source. When humanization is off every draw collapses
/// to its nominal value.
#[derive(Debug, Clone)]
pub struct Jitter {
    rng: StdRng,
    enabled: bool,
}

impl Jitter {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            enabled: true,
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            enabled: true,
        }
    }

    /// Seeded when a seed is given, entropy otherwise
    pub fn new(seed: Option<u64>) -> Self {
        seed.map(Self::seeded).unwrap_or_else(Self::from_entropy)
    }

    pub fn humanize(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Uniform draw from `[value*(1-factor), value*(1+factor)]`, floored at zero
    pub fn add_variation(&mut self, value: f64, factor: f64) -> f64 {
        if !self.enabled || factor <= 0.0 || !value.is_finite() {
            return value.max(0.0);
        }
        let lo = value * (1.0 - factor);
        let hi = value * (1.0 + factor);
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        self.rng.gen_range(lo..=hi).max(0.0)
    }

    /// Uniform draw in `[lo, hi]`, or `nominal` when humanization is off
    pub fn uniform(&mut self, lo: f64, hi: f64, nominal: f64) -> f64 {
        if !self.enabled || lo >= hi {
            return nominal;
        }
        self.rng.gen_range(lo..=hi)
    }

    /// True with probability `p`; never when humanization is off
    pub fn chance(&mut self, p: f64) -> bool {
        self.enabled && self.rng.gen_bool(p.clamp(0.0, 1.0))
    }

    /// Random sign, `+1.0` when humanization is off
    pub fn sign(&mut self) -> f64 {
        if self.enabled && self.rng.gen_bool(0.5) {
            -1.0
        } else {
            1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variation_stays_in_band() {
        let mut jitter = Jitter::seeded(7);
        for _ in 0..1000 {
            let v = jitter.add_variation(100.0, 0.3);
            assert!((70.0..=130.0).contains(&v), "{v}");
        }
    }

    #[test]
    fn variation_floors_at_zero() {
        let mut jitter = Jitter::seeded(7);
        for _ in 0..100 {
            assert!(jitter.add_variation(10.0, 1.5) >= 0.0);
        }
    }

    #[test]
    fn disabled_collapses_to_nominal() {
        let mut jitter = Jitter::seeded(1).humanize(false);
        assert_eq!(jitter.add_variation(80.0, 0.3), 80.0);
        assert_eq!(jitter.uniform(0.1, 0.4, 0.2), 0.2);
        assert_eq!(jitter.sign(), 1.0);
        assert!(!(0..100).any(|_| jitter.chance(0.9)));
    }

    #[test]
    fn same_seed_same_sequence() {
        let mut a = Jitter::seeded(42);
        let mut b = Jitter::seeded(42);
        for _ in 0..20 {
            assert_eq!(a.add_variation(500.0, 0.5), b.add_variation(500.0, 0.5));
        }
    }
}
