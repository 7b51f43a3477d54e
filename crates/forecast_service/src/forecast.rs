//! Forecast computation for one parcel against a loaded bundle
//!
//! Everything here is synchronous and free of I/O; [`crate::service`] does
//! the store lookups and hands the records in through [`ForecastInput`].

use chrono::{DateTime, Utc};
use tracing::debug;

use landcast_forecast_core::config::ServingConfig;
use landcast_forecast_core::regional::round_to;
use landcast_forecast_core::{
    BuildingRecord, DistrictContext, DistrictPriceStats, FeatureBuilder, FeatureInput, Mode,
    ModelBundle, ParcelRecord, Predictors, RegionalStats,
};

use crate::errors::PredictError;
use crate::types::{ModelMetrics, PredictionResponse, PriceHistory, YearlyPrediction};

/// Records gathered for one prediction
#[derive(Debug, Clone, Copy)]
pub struct ForecastInput<'a> {
    pub parcel: &'a ParcelRecord,
    pub building: Option<&'a BuildingRecord>,
    pub regional: Option<&'a RegionalStats>,
    pub district_price_stats: Option<&'a DistrictPriceStats>,
    /// Growth rate supplied by the caller for the parcel's district
    pub growth_rate: Option<f64>,
    /// Base year used when the parcel has a current price but no history
    pub current_year: i32,
}

/// Current price and the year forecasts are counted from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceAnchor {
    pub base_year: i32,
    pub current_price: f64,
}

impl PriceAnchor {
    /// Flat current price wins over the latest valuation; the latest
    /// valuation year is the base year, else `current_year` when only the
    /// flat price exists.
    pub fn resolve(parcel: &ParcelRecord, current_year: i32) -> Result<Self, PredictError> {
        let flat = parcel.current_price.filter(|p| p.is_finite() && *p > 0.0);
        match (parcel.latest_valuation(), flat) {
            (Some(latest), flat) => Ok(Self {
                base_year: latest.year,
                current_price: flat.unwrap_or(latest.price_per_sqm),
            }),
            (None, Some(price)) => Ok(Self {
                base_year: current_year,
                current_price: price,
            }),
            (None, None) => Err(PredictError::UnprocessableInput(
                "insufficient valuation history".to_string(),
            )),
        }
    }
}

/// Growth rate for a district: the rate baked into the bundle, then the
/// caller's rate, then the configured default
pub fn resolve_growth_rate(
    bundle: &ModelBundle,
    district: &str,
    caller_rate: Option<f64>,
    default_rate: f64,
) -> f64 {
    bundle
        .metadata
        .district_growth_rate(district)
        .or(caller_rate.filter(|r| r.is_finite()))
        .unwrap_or(default_rate)
}

/// Confidence margin `z · σ · √k`
pub fn confidence_margin(z_score: f64, residual_std: f64, horizon: u32) -> f64 {
    let sigma = if residual_std.is_finite() {
        residual_std.max(0.0)
    } else {
        0.0
    };
    z_score.abs() * sigma * (horizon as f64).sqrt()
}

/// Round a raw projection into a response row
pub fn yearly_prediction(
    base_year: i32,
    horizon: u32,
    projected: f64,
    margin: f64,
    current_price: f64,
    area: f64,
) -> YearlyPrediction {
    let projected = if projected.is_finite() {
        projected.max(0.0)
    } else {
        0.0
    };
    let price = projected.round() as i64;
    let change = if current_price > 0.0 {
        round_to((projected - current_price) / current_price * 100.0, 2)
    } else {
        0.0
    };
    YearlyPrediction {
        year: base_year + horizon as i32,
        year_offset: horizon,
        predicted_price_per_sqm: price,
        predicted_total_price: (price as f64 * area).round() as i64,
        confidence_lower: (projected - margin).round().max(0.0) as i64,
        confidence_upper: (projected + margin).round() as i64,
        change_from_current_pct: change,
    }
}

/// Produce the full response for one parcel
pub fn forecast(
    bundle: &ModelBundle,
    serving: &ServingConfig,
    input: &ForecastInput<'_>,
    predicted_at: DateTime<Utc>,
) -> Result<PredictionResponse, PredictError> {
    let parcel = input.parcel;
    let anchor = PriceAnchor::resolve(parcel, input.current_year)?;
    let meta = &bundle.metadata;
    let area = parcel.area.filter(|a| a.is_finite() && *a > 0.0).unwrap_or(1.0);

    let features = FeatureInput {
        parcel,
        building: input.building,
        regional: input.regional,
        reference_year: anchor.base_year,
    };

    let predictions: Vec<YearlyPrediction> = match (&bundle.predictors, meta.mode) {
        (Predictors::PerHorizon(models), Mode::TimeSeries) => {
            let row = FeatureBuilder::time_series(&features).to_vec();
            let scaled = scale(bundle, &row)?;
            models
                .iter()
                .filter(|(k, _)| **k <= meta.prediction_years)
                .map(|(&k, model)| {
                    let raw = model.predict(&scaled);
                    let margin =
                        confidence_margin(serving.z_score, meta.residual_std_for(k), k);
                    yearly_prediction(anchor.base_year, k, raw, margin, anchor.current_price, area)
                })
                .collect()
        }
        (Predictors::Base(model), mode) if !mode.is_time_series() => {
            let growth = resolve_growth_rate(
                bundle,
                parcel.district(),
                input.growth_rate,
                serving.default_growth_rate,
            );
            let district = DistrictContext {
                current_price: Some(anchor.current_price),
                price_stats: input.district_price_stats,
                growth_rate: growth,
            };
            let row = FeatureBuilder::build(mode, &features, Some(&district)).to_vec();
            let scaled = scale(bundle, &row)?;

            let estimate = model.predict(&scaled).max(1.0);
            let price_ratio = anchor.current_price / estimate;
            debug!(
                pnu = %parcel.pnu,
                estimate,
                price_ratio,
                growth,
                "cross-sectional projection"
            );

            let margin_std = meta.residual_std_for(0);
            (1..=meta.prediction_years)
                .map(|k| {
                    let projected = estimate * (1.0 + growth).powi(k as i32) * price_ratio;
                    let margin = confidence_margin(serving.z_score, margin_std, k);
                    yearly_prediction(
                        anchor.base_year,
                        k,
                        projected,
                        margin,
                        anchor.current_price,
                        area,
                    )
                })
                .collect()
        }
        _ => {
            return Err(PredictError::ModelUnavailable(format!(
                "model layout does not match mode {}",
                meta.mode
            )))
        }
    };

    Ok(PredictionResponse {
        pnu: parcel.pnu.to_string(),
        current_price_per_sqm: Some(anchor.current_price.round() as i64),
        area: parcel.area,
        land_category: parcel.land_category.clone(),
        use_zone: parcel.use_zone.clone(),
        price_history: parcel
            .sorted_valuations()
            .iter()
            .map(|p| PriceHistory {
                year: p.year,
                price_per_sqm: p.price_per_sqm.round() as i64,
            })
            .collect(),
        predictions,
        model_version: meta.version.clone(),
        model_metrics: meta.average_metrics().map(ModelMetrics::from),
        predicted_at,
    })
}

fn scale(bundle: &ModelBundle, row: &[f64]) -> Result<Vec<f64>, PredictError> {
    bundle
        .scaler
        .transform_row(row)
        .map_err(|e| PredictError::ModelUnavailable(e.to_string()))
}
