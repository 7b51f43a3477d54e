//! Landcast forecast core
//!
//! Shared building blocks for parcel land-price forecasting: input records,
//! parcel codes, feature construction, standardization, tree-ensemble
//! inference, accuracy metrics and the model bundle that couples the trainer
//! to the prediction service.

pub mod artifact;
pub mod config;
pub mod errors;
pub mod features;
pub mod gbdt;
pub mod metrics;
pub mod pnu;
pub mod regional;
pub mod scaler;
pub mod schema;
pub mod serde_canon;
pub mod snapshot;
pub mod types;

pub use artifact::{Metadata, ModelBundle, Predictors};
pub use config::ForecastConfig;
pub use errors::{ArtifactError, ConfigError, ParcelCodeError, ScalerError, SnapshotError};
pub use features::{DistrictContext, FeatureBuilder, FeatureInput, FeatureVector};
pub use gbdt::{BoosterParams, Model};
pub use metrics::Metrics;
pub use pnu::ParcelCode;
pub use scaler::StandardScaler;
pub use schema::Mode;
pub use snapshot::RecordSnapshot;
pub use types::{BuildingRecord, DistrictPriceStats, ParcelRecord, RegionalStats, ValuationPoint};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
