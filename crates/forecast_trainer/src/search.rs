//! Hyperparameter search strategies
//!
//! [`SearchPolicy`] picks a strategy per fit: [`RandomSearch`] when the
//! training partition is large enough and a validation partition exists,
//! [`FixedDefault`] otherwise. Fits made with the fixed set are reported as
//! degraded.

use landcast_forecast_core::config::{SearchConfig, TrainingConfig};
use landcast_forecast_core::gbdt::BoosterParams;
use landcast_forecast_core::Metrics;
use rayon::prelude::*;
use tracing::debug;

use crate::binning::BinnedMatrix;
use crate::dataset::Dataset;
use crate::deterministic::LcgRng;
use crate::errors::TrainingError;
use crate::trainer::GbdtTrainer;

/// Result of a search: the parameters to refit with
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub params: BoosterParams,
    /// Trials actually evaluated
    pub trials: usize,
    /// Validation RMSE of the winning trial
    pub best_val_rmse: Option<f64>,
}

/// A strategy producing boosting parameters for one training partition
pub trait HyperparamSearch: Send + Sync {
    fn name(&self) -> &'static str;

    fn search(&self, train: &Dataset, val: &Dataset) -> Result<SearchOutcome, TrainingError>;
}

/// Sampling ranges; `log` ranges are drawn log-uniformly
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSpace {
    pub n_estimators: (usize, usize),
    pub max_depth: (usize, usize),
    pub learning_rate: (f64, f64),
    pub subsample: (f64, f64),
    pub colsample_bytree: (f64, f64),
    pub reg_alpha: (f64, f64),
    pub reg_lambda: (f64, f64),
    pub min_child_weight: (usize, usize),
    pub gamma: (f64, f64),
}

impl Default for SearchSpace {
    fn default() -> Self {
        Self {
            n_estimators: (100, 1000),
            max_depth: (3, 10),
            learning_rate: (0.01, 0.3),
            subsample: (0.6, 1.0),
            colsample_bytree: (0.6, 1.0),
            reg_alpha: (1e-8, 10.0),
            reg_lambda: (1e-8, 10.0),
            min_child_weight: (1, 10),
            gamma: (1e-8, 1.0),
        }
    }
}

impl SearchSpace {
    /// Draw one parameter set; fields outside the space come from `base`
    pub fn sample(&self, rng: &mut LcgRng, base: &BoosterParams) -> BoosterParams {
        BoosterParams {
            n_estimators: rng.int_inclusive(self.n_estimators.0, self.n_estimators.1),
            max_depth: rng.int_inclusive(self.max_depth.0, self.max_depth.1),
            learning_rate: rng.log_uniform(self.learning_rate.0, self.learning_rate.1),
            subsample: rng.uniform(self.subsample.0, self.subsample.1),
            colsample_bytree: rng.uniform(self.colsample_bytree.0, self.colsample_bytree.1),
            reg_alpha: rng.log_uniform(self.reg_alpha.0, self.reg_alpha.1),
            reg_lambda: rng.log_uniform(self.reg_lambda.0, self.reg_lambda.1),
            min_child_weight: rng.int_inclusive(self.min_child_weight.0, self.min_child_weight.1)
                as f64,
            gamma: rng.log_uniform(self.gamma.0, self.gamma.1),
            max_bins: base.max_bins,
            seed: base.seed,
        }
    }
}

/// Bounded random search minimizing validation RMSE
///
/// Candidates are drawn up front from a seeded generator and evaluated in
/// parallel; ties go to the earlier trial, so the outcome does not depend on
/// thread scheduling.
#[derive(Debug, Clone)]
pub struct RandomSearch {
    pub n_trials: usize,
    pub seed: u64,
    pub space: SearchSpace,
    pub base: BoosterParams,
}

impl RandomSearch {
    pub fn new(n_trials: usize, seed: u64, base: BoosterParams) -> Self {
        Self {
            n_trials,
            seed,
            space: SearchSpace::default(),
            base,
        }
    }

    pub fn candidates(&self) -> Vec<BoosterParams> {
        let mut rng = LcgRng::new(self.seed);
        (0..self.n_trials)
            .map(|_| self.space.sample(&mut rng, &self.base))
            .collect()
    }
}

impl HyperparamSearch for RandomSearch {
    fn name(&self) -> &'static str {
        "random"
    }

    fn search(&self, train: &Dataset, val: &Dataset) -> Result<SearchOutcome, TrainingError> {
        if train.is_empty() || val.is_empty() {
            return Err(TrainingError::NoTrainingData(
                "random search needs non-empty training and validation partitions".to_string(),
            ));
        }
        let candidates = self.candidates();
        if candidates.is_empty() {
            return Err(TrainingError::Params("random search with zero trials".to_string()));
        }
        let binned = BinnedMatrix::from_rows(&train.features, self.base.max_bins);

        let scores: Vec<f64> = candidates
            .par_iter()
            .map(|params| -> Result<f64, TrainingError> {
                let model = GbdtTrainer::new(params.clone())?.fit_binned(train, &binned)?;
                let rmse = Metrics::evaluate(&val.targets, &model.predict_batch(&val.features)).rmse;
                Ok(if rmse.is_finite() { rmse } else { f64::INFINITY })
            })
            .collect::<Result<_, _>>()?;

        let (best_idx, best_rmse) = scores
            .iter()
            .copied()
            .enumerate()
            .fold((0, f64::INFINITY), |best, (i, rmse)| {
                if rmse < best.1 {
                    (i, rmse)
                } else {
                    best
                }
            });
        debug!(trials = scores.len(), best_idx, best_rmse, "random search finished");

        Ok(SearchOutcome {
            params: candidates[best_idx].clone(),
            trials: candidates.len(),
            best_val_rmse: best_rmse.is_finite().then_some(best_rmse),
        })
    }
}

/// Returns a fixed conservative parameter set without searching
#[derive(Debug, Clone)]
pub struct FixedDefault {
    pub params: BoosterParams,
}

impl HyperparamSearch for FixedDefault {
    fn name(&self) -> &'static str {
        "fixed-default"
    }

    fn search(&self, _train: &Dataset, _val: &Dataset) -> Result<SearchOutcome, TrainingError> {
        Ok(SearchOutcome {
            params: self.params.clone(),
            trials: 0,
            best_val_rmse: None,
        })
    }
}

/// Guard choosing between searching and the fixed default set
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPolicy {
    pub min_search_rows: usize,
    pub n_trials: usize,
    pub seed: u64,
    pub default_params: BoosterParams,
}

impl SearchPolicy {
    pub fn from_config(training: &TrainingConfig, search: &SearchConfig) -> Self {
        Self {
            min_search_rows: search.min_search_rows,
            n_trials: search.n_trials,
            seed: search.seed,
            default_params: training.default_params.clone(),
        }
    }

    /// True when a fit on these partitions would use the fixed set
    pub fn is_degraded(&self, train_rows: usize, val_rows: usize) -> bool {
        train_rows < self.min_search_rows || val_rows == 0 || self.n_trials == 0
    }

    pub fn select(&self, train_rows: usize, val_rows: usize) -> Box<dyn HyperparamSearch> {
        if self.is_degraded(train_rows, val_rows) {
            Box::new(FixedDefault {
                params: self.default_params.clone(),
            })
        } else {
            Box::new(RandomSearch::new(
                self.n_trials,
                self.seed,
                self.default_params.clone(),
            ))
        }
    }
}

impl Default for SearchPolicy {
    fn default() -> Self {
        Self::from_config(&TrainingConfig::default(), &SearchConfig::default())
    }
}
