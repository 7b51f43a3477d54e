//! Deterministic utilities for reproducible training
//!
//! Row/column subsampling and hyperparameter draws all come from [`LcgRng`],
//! so a fixed seed always reproduces the same model.

use std::num::Wrapping;

/// Linear Congruential Generator (glibc constants)
#[derive(Clone, Debug)]
pub struct LcgRng {
    state: Wrapping<u64>,
}

impl LcgRng {
    const MULTIPLIER: u64 = 1103515245;
    const INCREMENT: u64 = 12345;
    const MODULUS: u64 = 1 << 31;

    pub fn new(seed: u64) -> Self {
        Self {
            state: Wrapping(seed % Self::MODULUS),
        }
    }

    /// Next value in `[0, 2^31)`
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state * Wrapping(Self::MULTIPLIER) + Wrapping(Self::INCREMENT);
        self.state.0 & (Self::MODULUS - 1)
    }

    /// Uniform integer in `[0, max)`; 0 when `max == 0`
    pub fn next_range(&mut self, max: usize) -> usize {
        if max == 0 {
            return 0;
        }
        (self.next_u64() % max as u64) as usize
    }

    /// Uniform float in `[0, 1)`
    pub fn next_unit(&mut self) -> f64 {
        self.next_u64() as f64 / Self::MODULUS as f64
    }

    /// Uniform float in `[lo, hi)`
    pub fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_unit()
    }

    /// Log-uniform float in `[lo, hi)`; both bounds must be positive
    pub fn log_uniform(&mut self, lo: f64, hi: f64) -> f64 {
        self.uniform(lo.ln(), hi.ln()).exp().clamp(lo, hi)
    }

    /// Uniform integer in `[lo, hi]`
    pub fn int_inclusive(&mut self, lo: usize, hi: usize) -> usize {
        lo + self.next_range(hi.saturating_sub(lo) + 1)
    }

    /// Sorted sample of `ceil(n * fraction)` distinct indices out of `0..n` (at least one when n > 0)
    pub fn sample_indices(&mut self, n: usize, fraction: f64) -> Vec<usize> {
        let mut all: Vec<usize> = (0..n).collect();
        if fraction >= 1.0 || n == 0 {
            return all;
        }
        let k = ((n as f64 * fraction).ceil() as usize).clamp(1, n);
        // Partial Fisher-Yates
        for i in 0..k {
            let j = i + self.next_range(n - i);
            all.swap(i, j);
        }
        all.truncate(k);
        all.sort_unstable();
        all
    }
}

/// Deterministic tie-breaker for split selection: lower feature, then lower bin
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SplitTieBreaker {
    pub feature_idx: usize,
    pub bin: usize,
}

impl SplitTieBreaker {
    pub fn new(feature_idx: usize, bin: usize) -> Self {
        Self { feature_idx, bin }
    }
}
