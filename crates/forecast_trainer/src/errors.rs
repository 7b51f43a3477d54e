use landcast_forecast_core::{ArtifactError, ConfigError, ScalerError, SnapshotError};
use thiserror::Error;

/// Errors returned by the trainer and the training pipeline.
#[derive(Debug, Error)]
pub enum TrainingError {
    /// The corpus produced no usable rows for the selected mode
    #[error("no training data generated: {0}")]
    NoTrainingData(String),

    #[error("dataset error: {0}")]
    Dataset(String),

    #[error("invalid hyperparameters: {0}")]
    Params(String),

    #[error("scaling error: {0}")]
    Scaler(#[from] ScalerError),

    #[error("artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
}
