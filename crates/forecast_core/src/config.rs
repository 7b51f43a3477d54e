//! Forecasting configuration
//!
//! Loaded from TOML; every section may be omitted and falls back to defaults.
//! A handful of `LANDCAST_*` environment variables override file values.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::errors::ConfigError;
use crate::gbdt::BoosterParams;
use crate::schema::{DEFAULT_ANNUAL_GROWTH_RATE, PREDICTION_YEARS};

pub const ENV_MODEL_DIR: &str = "LANDCAST_MODEL_DIR";
pub const ENV_N_TRIALS: &str = "LANDCAST_N_TRIALS";
pub const ENV_LOG_LEVEL: &str = "LANDCAST_LOG_LEVEL";
pub const ENV_HORIZON_YEARS: &str = "LANDCAST_HORIZON_YEARS";

/// z-value for the confidence margin (one-sided 95%)
pub const DEFAULT_Z_SCORE: f64 = 1.645;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ForecastConfig {
    pub horizon: HorizonConfig,
    pub training: TrainingConfig,
    pub search: SearchConfig,
    pub serving: ServingConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HorizonConfig {
    /// Number of years forecast beyond the base year
    pub years: u32,
}

impl Default for HorizonConfig {
    fn default() -> Self {
        Self {
            years: PREDICTION_YEARS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Mean history length at or above which time-series mode is chosen
    pub time_series_threshold: f64,
    /// Distinct valuation years a parcel needs to yield time-series rows
    pub min_history_points: usize,
    pub val_ratio: f64,
    pub test_ratio: f64,
    pub model_dir: PathBuf,
    /// Parameters used when the training partition is too small to search
    pub default_params: BoosterParams,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            time_series_threshold: 3.0,
            min_history_points: 3,
            val_ratio: 0.15,
            test_ratio: 0.15,
            model_dir: PathBuf::from("models/prediction"),
            default_params: BoosterParams::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Trial budget for hyperparameter search
    pub n_trials: usize,
    /// Training rows required before search is attempted
    pub min_search_rows: usize,
    pub seed: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            n_trials: 50,
            min_search_rows: 50,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServingConfig {
    pub z_score: f64,
    /// Growth rate used when neither metadata nor the store supplies one
    pub default_growth_rate: f64,
}

impl Default for ServingConfig {
    fn default() -> Self {
        Self {
            z_score: DEFAULT_Z_SCORE,
            default_growth_rate: DEFAULT_ANNUAL_GROWTH_RATE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive, e.g. "info" or "landcast_forecast_trainer=debug"
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl ForecastConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        info!("Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Apply `LANDCAST_*` variables from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<Vec<String>, ConfigError> {
        self.apply_overrides_with(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup; returns the keys that were set
    pub fn apply_overrides_with<F>(&mut self, lookup: F) -> Result<Vec<String>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut applied = Vec::new();

        if let Some(val) = lookup(ENV_MODEL_DIR) {
            self.training.model_dir = PathBuf::from(val);
            applied.push("training.model_dir".to_string());
        }
        if let Some(val) = lookup(ENV_N_TRIALS) {
            self.search.n_trials = parse_value(ENV_N_TRIALS, &val)?;
            applied.push("search.n_trials".to_string());
        }
        if let Some(val) = lookup(ENV_LOG_LEVEL) {
            self.logging.level = val;
            applied.push("logging.level".to_string());
        }
        if let Some(val) = lookup(ENV_HORIZON_YEARS) {
            self.horizon.years = parse_value(ENV_HORIZON_YEARS, &val)?;
            applied.push("horizon.years".to_string());
        }

        if !applied.is_empty() {
            info!("Applied environment overrides: {:?}", applied);
        }
        Ok(applied)
    }

    /// Reject unusable values; return warnings for suspicious ones
    pub fn validate(&self) -> Result<Vec<String>, ConfigError> {
        if self.horizon.years == 0 {
            return Err(invalid("horizon.years", self.horizon.years));
        }
        let t = &self.training;
        for (key, ratio) in [("training.val_ratio", t.val_ratio), ("training.test_ratio", t.test_ratio)] {
            if !(0.0..1.0).contains(&ratio) {
                return Err(invalid(key, ratio));
            }
        }
        if t.val_ratio + t.test_ratio >= 1.0 {
            return Err(invalid(
                "training.val_ratio + training.test_ratio",
                t.val_ratio + t.test_ratio,
            ));
        }
        if !(t.time_series_threshold > 0.0) {
            return Err(invalid("training.time_series_threshold", t.time_series_threshold));
        }
        t.default_params
            .check()
            .map_err(|e| invalid("training.default_params", e))?;
        if !(self.serving.z_score > 0.0) {
            return Err(invalid("serving.z_score", self.serving.z_score));
        }

        let mut warnings = Vec::new();
        if self.search.n_trials == 0 {
            warnings.push("search.n_trials is 0, every fit uses default parameters".to_string());
        }
        if t.min_history_points < 2 {
            warnings.push(format!(
                "training.min_history_points is {}, time-series rows need a future point",
                t.min_history_points
            ));
        }
        if self.horizon.years > 10 {
            warnings.push(format!(
                "horizon.years is {}, long horizons have little training signal",
                self.horizon.years
            ));
        }
        if !(-0.5..=0.5).contains(&self.serving.default_growth_rate) {
            warnings.push(format!(
                "serving.default_growth_rate {} looks implausible",
                self.serving.default_growth_rate
            ));
        }

        if warnings.is_empty() {
            info!("Configuration validation passed");
        } else {
            warn!("Configuration validation warnings: {:?}", warnings);
        }
        Ok(warnings)
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw.to_string(),
    })
}

fn invalid(key: &str, value: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}
