//! Gradient boosted regression trainer
//!
//! Squared-error boosting: the ensemble starts at the target mean and every
//! round fits a tree to gradients `pred - y` with unit hessians. Row and
//! column subsampling draw from an [`LcgRng`] seeded by the parameters, so
//! equal data and parameters always give the same model.

use landcast_forecast_core::gbdt::{BoosterParams, Model};
use tracing::debug;

use crate::binning::BinnedMatrix;
use crate::cart::{CartBuilder, TreeConfig};
use crate::dataset::Dataset;
use crate::deterministic::LcgRng;
use crate::errors::TrainingError;

/// GBDT trainer
#[derive(Clone, Debug)]
pub struct GbdtTrainer {
    params: BoosterParams,
}

impl GbdtTrainer {
    pub fn new(params: BoosterParams) -> Result<Self, TrainingError> {
        params.check().map_err(TrainingError::Params)?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &BoosterParams {
        &self.params
    }

    /// Train a model on the given dataset
    pub fn fit(&self, dataset: &Dataset) -> Result<Model, TrainingError> {
        if dataset.is_empty() {
            return Err(TrainingError::NoTrainingData(
                "cannot fit a model on an empty dataset".to_string(),
            ));
        }
        let binned = BinnedMatrix::from_rows(&dataset.features, self.params.max_bins);
        self.fit_binned(dataset, &binned)
    }

    /// Train on a dataset whose features were already binned
    ///
    /// Lets a hyperparameter search bin the training rows once for all trials.
    pub fn fit_binned(&self, dataset: &Dataset, binned: &BinnedMatrix) -> Result<Model, TrainingError> {
        let n_samples = dataset.len();
        let n_features = dataset.feature_count();
        if n_samples == 0 {
            return Err(TrainingError::NoTrainingData(
                "cannot fit a model on an empty dataset".to_string(),
            ));
        }
        if binned.n_rows() != n_samples || binned.n_features() != n_features {
            return Err(TrainingError::Dataset(format!(
                "binned matrix is {}x{} but dataset is {n_samples}x{n_features}",
                binned.n_rows(),
                binned.n_features()
            )));
        }

        let base_score = mean(&dataset.targets);
        let mut predictions = vec![base_score; n_samples];
        let mut rng = LcgRng::new(self.params.seed);
        let tree_config = TreeConfig::from(&self.params);
        let hessians = vec![1.0; n_samples];
        let mut trees = Vec::with_capacity(self.params.n_estimators);

        for round in 0..self.params.n_estimators {
            let gradients: Vec<f64> = predictions
                .iter()
                .zip(&dataset.targets)
                .map(|(p, y)| p - y)
                .collect();
            let rows = rng.sample_indices(n_samples, self.params.subsample);
            let features = rng.sample_indices(n_features, self.params.colsample_bytree);

            let tree = CartBuilder::new(
                tree_config.clone(),
                binned,
                &gradients,
                &hessians,
                &features,
            )
            .build(&rows, self.params.learning_rate);

            for (pred, row) in predictions.iter_mut().zip(&dataset.features) {
                *pred += tree.contribution(row);
            }
            if round % 50 == 0 {
                debug!(
                    round,
                    leaves = tree.num_leaves(),
                    train_rmse = rmse(&predictions, &dataset.targets),
                    "boosting round"
                );
            }
            trees.push(tree);
        }

        Ok(Model::new(n_features, base_score, trees))
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn rmse(predictions: &[f64], targets: &[f64]) -> f64 {
    let sse: f64 = predictions
        .iter()
        .zip(targets)
        .map(|(p, y)| (p - y) * (p - y))
        .sum();
    (sse / targets.len().max(1) as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_dataset(n: usize) -> Dataset {
        let features: Vec<Vec<f64>> = (0..n)
            .map(|i| vec![i as f64, ((i * 13) % 7) as f64])
            .collect();
        let targets = features.iter().map(|r| 3.0 * r[0] + 10.0).collect();
        Dataset::new(features, targets).unwrap()
    }

    fn params() -> BoosterParams {
        BoosterParams {
            n_estimators: 60,
            max_depth: 4,
            learning_rate: 0.3,
            ..BoosterParams::default()
        }
    }

    #[test]
    fn test_fit_reduces_error() {
        let data = linear_dataset(80);
        let model = GbdtTrainer::new(params()).unwrap().fit(&data).unwrap();
        let preds = model.predict_batch(&data.features);
        let baseline = vec![mean(&data.targets); data.len()];
        assert!(rmse(&preds, &data.targets) < 0.1 * rmse(&baseline, &data.targets));
        assert_eq!(model.num_trees(), 60);
        assert!(model.validate().is_ok());
    }

    #[test]
    fn test_base_score_is_target_mean() {
        let data = linear_dataset(10);
        let model = GbdtTrainer::new(params()).unwrap().fit(&data).unwrap();
        assert_eq!(model.base_score, mean(&data.targets));
    }

    #[test]
    fn test_deterministic_with_subsampling() {
        let data = linear_dataset(50);
        let mut p = params();
        p.subsample = 0.7;
        p.colsample_bytree = 0.5;
        let a = GbdtTrainer::new(p.clone()).unwrap().fit(&data).unwrap();
        let b = GbdtTrainer::new(p).unwrap().fit(&data).unwrap();
        assert_eq!(a.hash_hex().unwrap(), b.hash_hex().unwrap());
    }

    #[test]
    fn test_single_row() {
        let data = Dataset::new(vec![vec![1.0, 2.0]], vec![5.0]).unwrap();
        let model = GbdtTrainer::new(params()).unwrap().fit(&data).unwrap();
        assert_eq!(model.predict(&[1.0, 2.0]), 5.0);
    }

    #[test]
    fn test_rejects_empty_and_bad_params() {
        let trainer = GbdtTrainer::new(params()).unwrap();
        assert!(matches!(
            trainer.fit(&Dataset::default()),
            Err(TrainingError::NoTrainingData(_))
        ));

        let mut p = params();
        p.learning_rate = 0.0;
        assert!(matches!(GbdtTrainer::new(p), Err(TrainingError::Params(_))));
    }
}
