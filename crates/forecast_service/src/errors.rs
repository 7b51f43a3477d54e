//! Prediction service error types

use landcast_forecast_core::{ArtifactError, ParcelCodeError};
use thiserror::Error;

/// Failure reported by a [`ParcelStore`](crate::store::ParcelStore)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store returned corrupt record: {0}")]
    Corrupt(String),
}

/// Prediction errors
///
/// Request-level problems (`InvalidArgument`, `NotFound`,
/// `UnprocessableInput`) are distinct from service-level ones
/// (`ModelUnavailable`, `Store`) so callers can tell a bad input from a
/// service that is not ready.
#[derive(Error, Debug)]
pub enum PredictError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("parcel not found: {0}")]
    NotFound(String),

    #[error("unprocessable input: {0}")]
    UnprocessableInput(String),

    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PredictError {
    /// Whether retrying the same request later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, PredictError::ModelUnavailable(_) | PredictError::Store(_))
    }
}

impl From<ParcelCodeError> for PredictError {
    fn from(err: ParcelCodeError) -> Self {
        PredictError::InvalidArgument(err.to_string())
    }
}

impl From<ArtifactError> for PredictError {
    fn from(err: ArtifactError) -> Self {
        PredictError::ModelUnavailable(err.to_string())
    }
}
