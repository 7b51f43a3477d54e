//! Landcast forecast service
//!
//! Turns a parcel record and a trained model bundle into an ordered list of
//! yearly land-price forecasts with confidence bounds.

pub mod errors;
pub mod forecast;
pub mod service;
pub mod store;
pub mod types;

pub use errors::{PredictError, StoreError};
pub use forecast::{forecast, ForecastInput, PriceAnchor};
pub use service::{PredictionService, ServiceState};
pub use store::{InMemoryStore, ParcelStore};
pub use types::{ModelMetrics, PredictionResponse, PriceHistory, YearlyPrediction};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
