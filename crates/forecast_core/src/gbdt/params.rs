//! Boosting hyperparameters

use serde::{Deserialize, Serialize};

/// Upper bound on histogram bins per feature
pub const MAX_BINS: usize = 256;

/// Hyperparameters of one boosted-tree fit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoosterParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    /// Fraction of rows sampled for each tree
    pub subsample: f64,
    /// Fraction of features sampled for each tree
    pub colsample_bytree: f64,
    /// L1 penalty on leaf weights
    pub reg_alpha: f64,
    /// L2 penalty on leaf weights
    pub reg_lambda: f64,
    /// Minimum hessian sum in each child
    pub min_child_weight: f64,
    /// Minimum loss reduction required to split
    pub gamma: f64,
    pub max_bins: usize,
    pub seed: u64,
}

impl Default for BoosterParams {
    /// The conservative set used when there is too little data to search
    fn default() -> Self {
        Self {
            n_estimators: 300,
            max_depth: 6,
            learning_rate: 0.05,
            subsample: 1.0,
            colsample_bytree: 1.0,
            reg_alpha: 0.0,
            reg_lambda: 1.0,
            min_child_weight: 1.0,
            gamma: 0.0,
            max_bins: MAX_BINS,
            seed: 42,
        }
    }
}

impl BoosterParams {
    /// Returns a description of the first out-of-range value, if any
    pub fn check(&self) -> Result<(), String> {
        if self.n_estimators == 0 {
            return Err("n_estimators must be at least 1".to_string());
        }
        if self.max_depth == 0 {
            return Err("max_depth must be at least 1".to_string());
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(format!("learning_rate out of range: {}", self.learning_rate));
        }
        for (name, value) in [
            ("subsample", self.subsample),
            ("colsample_bytree", self.colsample_bytree),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(format!("{name} must be in (0, 1]: {value}"));
            }
        }
        for (name, value) in [
            ("reg_alpha", self.reg_alpha),
            ("reg_lambda", self.reg_lambda),
            ("min_child_weight", self.min_child_weight),
            ("gamma", self.gamma),
        ] {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(format!("{name} must be non-negative: {value}"));
            }
        }
        if !(2..=MAX_BINS).contains(&self.max_bins) {
            return Err(format!("max_bins must be in 2..={MAX_BINS}: {}", self.max_bins));
        }
        Ok(())
    }
}
