//! Prediction service

use chrono::{Datelike, Utc};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use landcast_forecast_core::config::ServingConfig;
use landcast_forecast_core::{ModelBundle, ParcelCode};

use crate::errors::PredictError;
use crate::forecast::{forecast, ForecastInput};
use crate::store::ParcelStore;
use crate::types::PredictionResponse;

/// Model state; `Loaded` is terminal
#[derive(Debug, Clone)]
pub enum ServiceState {
    Unloaded,
    Loaded(Arc<ModelBundle>),
}

/// Serves forecasts from one immutable model bundle
///
/// The service is a plain value: construct it at startup and share it by
/// reference or behind an `Arc`. Several services with different bundles can
/// live in the same process.
#[derive(Debug, Clone)]
pub struct PredictionService {
    state: ServiceState,
    serving: ServingConfig,
}

impl PredictionService {
    /// Service that rejects every request with `ModelUnavailable`
    pub fn unloaded(serving: ServingConfig) -> Self {
        Self {
            state: ServiceState::Unloaded,
            serving,
        }
    }

    pub fn from_bundle(bundle: ModelBundle, serving: ServingConfig) -> Result<Self, PredictError> {
        bundle.validate()?;
        Ok(Self {
            state: ServiceState::Loaded(Arc::new(bundle)),
            serving,
        })
    }

    /// Load and validate a bundle directory
    pub fn load<P: AsRef<Path>>(dir: P, serving: ServingConfig) -> Result<Self, PredictError> {
        let bundle = ModelBundle::load(dir)?;
        Self::from_bundle(bundle, serving)
    }

    /// Like [`load`](Self::load) but stays `Unloaded` on failure
    pub fn try_load<P: AsRef<Path>>(dir: P, serving: ServingConfig) -> Self {
        match Self::load(dir.as_ref(), serving.clone()) {
            Ok(service) => service,
            Err(e) => {
                warn!("Model bundle not loaded from {}: {}", dir.as_ref().display(), e);
                Self::unloaded(serving)
            }
        }
    }

    pub fn state(&self) -> &ServiceState {
        &self.state
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.state, ServiceState::Loaded(_))
    }

    pub fn bundle(&self) -> Option<&ModelBundle> {
        match &self.state {
            ServiceState::Loaded(bundle) => Some(bundle.as_ref()),
            ServiceState::Unloaded => None,
        }
    }

    /// Forecast the next years for one parcel
    pub async fn predict<S>(&self, store: &S, pnu: &str) -> Result<PredictionResponse, PredictError>
    where
        S: ParcelStore + ?Sized,
    {
        let code = ParcelCode::parse(pnu)?;
        let bundle = self
            .bundle()
            .ok_or_else(|| PredictError::ModelUnavailable("prediction models not loaded".to_string()))?;

        let parcel = store
            .parcel(&code)
            .await?
            .ok_or_else(|| PredictError::NotFound(code.to_string()))?;
        let district = code.district();
        let building = store.building(&code).await?;
        let regional = store.regional_stats(district).await?;
        let district_price_stats = if bundle.metadata.enhanced {
            store.district_price_stats(district).await?
        } else {
            None
        };
        let growth_rate = store.growth_rate(district).await?;

        let now = Utc::now();
        let input = ForecastInput {
            parcel: &parcel,
            building: building.as_ref(),
            regional: regional.as_ref(),
            district_price_stats: district_price_stats.as_ref(),
            growth_rate,
            current_year: now.year(),
        };
        let response = forecast(bundle, &self.serving, &input, now)?;
        debug!(
            pnu = %code,
            rows = response.predictions.len(),
            "prediction complete"
        );
        Ok(response)
    }
}
