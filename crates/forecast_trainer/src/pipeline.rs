//! Training pipeline: mode selection, per-model fitting and bundle assembly
//!
//! Cross-sectional modes produce one model under the `base` key. Time-series
//! mode produces one model per horizon `k = 1..=H`, each trained only on rows
//! that have a price `k` years after their base year. All models of a run
//! share one scaler fitted over every generated row.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use landcast_forecast_core::artifact::{horizon_key, BASE_KEY};
use landcast_forecast_core::gbdt::{BoosterParams, Model};
use landcast_forecast_core::metrics::residual_std;
use landcast_forecast_core::regional::round_to;
use landcast_forecast_core::{
    ForecastConfig, Metadata, Metrics, Mode, ModelBundle, Predictors, StandardScaler,
};
use tracing::{info, warn};

use crate::corpus::TrainingCorpus;
use crate::dataset::Dataset;
use crate::errors::TrainingError;
use crate::search::SearchPolicy;
use crate::summary::TrainingSummary;
use crate::trainer::GbdtTrainer;

/// Outcome of fitting a single model
#[derive(Debug, Clone)]
pub struct FitResult {
    pub model: Model,
    pub metrics: Metrics,
    pub residual_std: f64,
    pub params: BoosterParams,
    pub degraded: bool,
    pub n_rows: usize,
}

/// Runs a full training job for a corpus
#[derive(Debug, Clone)]
pub struct ModelTrainer {
    config: ForecastConfig,
    policy: SearchPolicy,
}

impl ModelTrainer {
    pub fn new(config: ForecastConfig) -> Self {
        let policy = SearchPolicy::from_config(&config.training, &config.search);
        Self { config, policy }
    }

    pub fn with_policy(mut self, policy: SearchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    pub fn policy(&self) -> &SearchPolicy {
        &self.policy
    }

    /// Train and write the bundle to `dir`
    pub fn run(&self, corpus: &TrainingCorpus, dir: &Path) -> Result<TrainingSummary, TrainingError> {
        let (mut bundle, mut summary) = self.train(corpus, Utc::now())?;
        bundle.save(dir)?;
        summary.model_dir = Some(dir.to_path_buf());
        Ok(summary)
    }

    /// Train in memory; `now` stamps the metadata
    pub fn train(
        &self,
        corpus: &TrainingCorpus,
        now: DateTime<Utc>,
    ) -> Result<(ModelBundle, TrainingSummary), TrainingError> {
        if corpus.is_empty() {
            return Err(TrainingError::NoTrainingData("corpus has no parcels".to_string()));
        }
        let mean_history = corpus.mean_history_length();
        let mode = corpus.select_mode(self.config.training.time_series_threshold);
        info!(
            "Selected {} mode (mean history {:.2} points over {} parcels)",
            mode,
            mean_history,
            corpus.len()
        );

        let bundle = match mode {
            Mode::TimeSeries => self.train_time_series(corpus, now)?,
            Mode::CrossSectional | Mode::EnhancedCrossSectional => {
                self.train_cross_sectional(corpus, mode, now)?
            }
        };

        let meta = &bundle.metadata;
        let summary = TrainingSummary {
            mode,
            version: meta.version.clone(),
            mean_history_length: mean_history,
            n_samples: meta.n_samples,
            n_features: meta.n_features,
            metrics: meta.metrics.clone(),
            degraded: meta.degraded.clone(),
            model_dir: None,
        };
        Ok((bundle, summary))
    }

    fn train_cross_sectional(
        &self,
        corpus: &TrainingCorpus,
        mode: Mode,
        now: DateTime<Utc>,
    ) -> Result<ModelBundle, TrainingError> {
        info!("Building {} rows from {} parcels...", mode, corpus.len());
        let data = corpus.cross_sectional_rows(mode)?;
        if data.is_empty() {
            return Err(TrainingError::NoTrainingData(
                "no parcel has a positive latest valuation".to_string(),
            ));
        }
        info!("Training data: {} samples, {} features", data.len(), data.feature_count());

        let scaler = StandardScaler::fit(&data.features)?;
        let scaled = Dataset::new(scaler.transform(&data.features)?, data.targets.clone())?;
        let fit = self.fit_one(BASE_KEY, &scaled)?;

        let mut metadata = self.metadata(mode, data.len(), now);
        record_fit(&mut metadata, BASE_KEY, &fit);
        metadata.residual_std = Some(fit.residual_std);

        if mode.is_enhanced() {
            let rates = corpus.growth_rates.clone().unwrap_or_default();
            if !rates.is_empty() {
                let mean = rates.values().sum::<f64>() / rates.len() as f64;
                metadata.annual_growth_rate = round_to(mean, 4);
            }
            metadata.sgg_growth_rates = rates;
            metadata.sgg_price_stats = corpus.district_price_stats.clone().unwrap_or_default();
        }

        Ok(ModelBundle::new(metadata, scaler, Predictors::Base(fit.model))?)
    }

    fn train_time_series(
        &self,
        corpus: &TrainingCorpus,
        now: DateTime<Utc>,
    ) -> Result<ModelBundle, TrainingError> {
        let horizon = self.config.horizon.years;
        info!("Building time-series rows from {} parcels...", corpus.len());
        let rows = corpus.time_series_rows(horizon, self.config.training.min_history_points);
        if rows.is_empty() {
            return Err(TrainingError::NoTrainingData(format!(
                "no parcel has {} or more valuation years with a future point",
                self.config.training.min_history_points
            )));
        }
        info!(
            "Training data: {} samples, {} features",
            rows.len(),
            Mode::TimeSeries.feature_count()
        );

        let scaler = StandardScaler::fit(&rows.features)?;
        let scaled = scaler.transform(&rows.features)?;
        let mut metadata = self.metadata(Mode::TimeSeries, rows.len(), now);
        let mut models = BTreeMap::new();

        for k in 1..=horizon {
            let key = horizon_key(k);
            let data = rows.for_horizon(&scaled, k)?;
            if data.is_empty() {
                warn!("Year +{}: no rows with a target, no model trained", k);
                metadata.degraded.push(key);
                continue;
            }
            let fit = self.fit_one(&format!("year +{k}"), &data)?;
            record_fit(&mut metadata, &key, &fit);
            metadata.residual_stds.insert(key, fit.residual_std);
            models.insert(k, fit.model);
        }

        if models.is_empty() {
            return Err(TrainingError::NoTrainingData(
                "no horizon has training rows".to_string(),
            ));
        }
        Ok(ModelBundle::new(metadata, scaler, Predictors::PerHorizon(models))?)
    }

    /// Split, choose parameters, fit and evaluate one model
    ///
    /// Falls back to every row when the training partition is empty, and
    /// evaluates on the first non-empty of test, validation, training.
    pub fn fit_one(&self, label: &str, data: &Dataset) -> Result<FitResult, TrainingError> {
        if data.is_empty() {
            return Err(TrainingError::NoTrainingData(format!("{label}: no rows")));
        }
        let training = &self.config.training;
        let split = data.time_split(training.val_ratio, training.test_ratio);
        let (n_train, n_val) = (split.train.len(), split.val.len());

        let degraded = self.policy.is_degraded(n_train, n_val);
        if degraded {
            warn!(
                "{}: {} training / {} validation rows, using default params",
                label, n_train, n_val
            );
        }
        let search = self.policy.select(n_train, n_val);
        let outcome = search.search(&split.train, &split.val)?;
        if let Some(rmse) = outcome.best_val_rmse {
            info!(
                "{}: {} search best validation RMSE={:.0} over {} trials",
                label,
                search.name(),
                rmse,
                outcome.trials
            );
        }

        let fit_rows = if split.train.is_empty() { data } else { &split.train };
        let model = GbdtTrainer::new(outcome.params.clone())?.fit(fit_rows)?;

        let eval = [&split.test, &split.val, &split.train]
            .into_iter()
            .find(|d| !d.is_empty())
            .unwrap_or(data);
        let predictions = model.predict_batch(&eval.features);
        let metrics = Metrics::evaluate(&eval.targets, &predictions);
        let residual = residual_std(&eval.targets, &predictions);
        info!(
            "{}: RMSE={:.0}, MAE={:.0}, R2={:.4}, MAPE={:.2}%",
            label, metrics.rmse, metrics.mae, metrics.r2, metrics.mape
        );

        Ok(FitResult {
            model,
            metrics,
            residual_std: residual,
            params: outcome.params,
            degraded,
            n_rows: data.len(),
        })
    }

    fn metadata(&self, mode: Mode, n_samples: usize, now: DateTime<Utc>) -> Metadata {
        Metadata {
            mode,
            enhanced: mode.is_enhanced(),
            version: now.format("%Y%m%d_%H%M%S").to_string(),
            n_samples,
            n_features: mode.feature_count(),
            feature_names: mode.feature_names().iter().map(|n| n.to_string()).collect(),
            prediction_years: self.config.horizon.years,
            metrics: BTreeMap::new(),
            residual_std: None,
            residual_stds: BTreeMap::new(),
            annual_growth_rate: self.config.serving.default_growth_rate,
            sgg_growth_rates: BTreeMap::new(),
            sgg_price_stats: BTreeMap::new(),
            n_trials: self.policy.n_trials,
            trained_at: now,
            degraded: Vec::new(),
            best_params: BTreeMap::new(),
            model_hashes: BTreeMap::new(),
        }
    }
}

fn record_fit(metadata: &mut Metadata, key: &str, fit: &FitResult) {
    metadata.metrics.insert(key.to_string(), fit.metrics);
    metadata.best_params.insert(key.to_string(), fit.params.clone());
    if fit.degraded {
        metadata.degraded.push(key.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> ForecastConfig {
        let mut config = ForecastConfig::default();
        config.training.default_params.n_estimators = 20;
        config.training.default_params.max_depth = 3;
        config
    }

    #[test]
    fn test_fit_one_small_data_is_degraded() {
        let data = Dataset::new(
            (0..20).map(|i| vec![i as f64]).collect(),
            (0..20).map(|i| 100.0 + i as f64).collect(),
        )
        .unwrap();
        let trainer = ModelTrainer::new(small_config());
        let fit = trainer.fit_one("test", &data).unwrap();
        assert!(fit.degraded);
        assert_eq!(fit.params.n_estimators, 20);
        assert_eq!(fit.n_rows, 20);
        assert!(fit.residual_std >= 0.0);
    }

    #[test]
    fn test_fit_one_single_row_uses_all_rows() {
        let data = Dataset::new(vec![vec![1.0]], vec![42.0]).unwrap();
        let fit = ModelTrainer::new(small_config()).fit_one("one", &data).unwrap();
        assert_eq!(fit.model.predict(&[1.0]), 42.0);
        assert_eq!(fit.metrics.rmse, 0.0);
    }

    #[test]
    fn test_policy_override_enables_search() {
        let data = Dataset::new(
            (0..40).map(|i| vec![i as f64, (i % 3) as f64]).collect(),
            (0..40).map(|i| 10.0 * i as f64).collect(),
        )
        .unwrap();
        let policy = SearchPolicy {
            min_search_rows: 10,
            n_trials: 2,
            ..SearchPolicy::default()
        };
        let trainer = ModelTrainer::new(small_config()).with_policy(policy);
        assert_eq!(trainer.policy().min_search_rows, 10);
        let fit = trainer.fit_one("searched", &data).unwrap();
        assert!(!fit.degraded);
        assert_eq!(fit.n_rows, 40);
    }

    #[test]
    fn test_empty_corpus_is_rejected() {
        let result = ModelTrainer::new(small_config()).train(&TrainingCorpus::default(), Utc::now());
        assert!(matches!(result, Err(TrainingError::NoTrainingData(_))));
    }
}
