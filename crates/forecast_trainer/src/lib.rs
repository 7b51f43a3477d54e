//! Landcast forecast trainer
//!
//! Fits the boosted-tree models behind parcel land-price forecasts. A run
//! picks a forecasting mode from the shape of the corpus, builds feature rows,
//! fits one model (cross-sectional) or one model per horizon (time series)
//! and writes a [`ModelBundle`](landcast_forecast_core::ModelBundle).
//! Training is deterministic for a fixed configuration.

pub mod binning;
pub mod cart;
pub mod corpus;
pub mod dataset;
pub mod deterministic;
pub mod errors;
pub mod pipeline;
pub mod price_history;
pub mod search;
pub mod summary;
pub mod trainer;

pub use corpus::{TimeSeriesRows, TrainingCorpus};
pub use dataset::{Dataset, Split};
pub use deterministic::{LcgRng, SplitTieBreaker};
pub use errors::TrainingError;
pub use pipeline::{FitResult, ModelTrainer};
pub use price_history::{merge_price_history, read_price_history, PriceHistory};
pub use search::{FixedDefault, HyperparamSearch, RandomSearch, SearchOutcome, SearchPolicy, SearchSpace};
pub use summary::TrainingSummary;
pub use trainer::GbdtTrainer;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
