//! Prediction response types

use chrono::{DateTime, Utc};
use landcast_forecast_core::Metrics;
use serde::{Deserialize, Serialize};

/// One past valuation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceHistory {
    pub year: i32,
    pub price_per_sqm: i64,
}

/// Forecast for one future year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyPrediction {
    pub year: i32,
    /// Years after the base year
    pub year_offset: u32,
    pub predicted_price_per_sqm: i64,
    /// Price per m² times parcel area
    pub predicted_total_price: i64,
    pub confidence_lower: i64,
    pub confidence_upper: i64,
    /// Change against the current price in percent, two decimals
    pub change_from_current_pct: f64,
}

/// Average accuracy of the models behind a forecast
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
    pub mape: f64,
}

impl From<Metrics> for ModelMetrics {
    fn from(m: Metrics) -> Self {
        Self {
            rmse: m.rmse,
            mae: m.mae,
            r2: m.r2,
            mape: m.mape,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub pnu: String,
    pub current_price_per_sqm: Option<i64>,
    pub area: Option<f64>,
    pub land_category: Option<String>,
    pub use_zone: Option<String>,
    pub price_history: Vec<PriceHistory>,
    /// Ascending by year
    pub predictions: Vec<YearlyPrediction>,
    pub model_version: String,
    pub model_metrics: Option<ModelMetrics>,
    pub predicted_at: DateTime<Utc>,
}
