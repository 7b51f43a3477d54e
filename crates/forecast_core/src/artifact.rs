//! Model bundle: scaler, fitted models and metadata written and loaded together
//!
//! On-disk layout of a bundle directory:
//!
//! ```text
//! <dir>/scaler.json            StandardScaler, canonical JSON
//! <dir>/model_base.json        cross-sectional modes
//! <dir>/model_year_{k}.json    time-series mode, one per horizon
//! <dir>/metadata.json          Metadata, indented canonical JSON
//! ```
//!
//! A bundle is written into a staging directory next to the target and then
//! renamed into place, so readers never observe a partially written bundle.
//! Metadata records a blake3 digest of every model file; [`ModelBundle::load`]
//! verifies them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::errors::ArtifactError;
use crate::gbdt::{BoosterParams, Model};
use crate::metrics::Metrics;
use crate::scaler::StandardScaler;
use crate::schema::Mode;
use crate::serde_canon::{hash_bytes_hex, to_canonical_json, to_canonical_json_pretty};
use crate::types::DistrictPriceStats;

pub const SCALER_FILE: &str = "scaler.json";
pub const METADATA_FILE: &str = "metadata.json";
pub const BASE_MODEL_FILE: &str = "model_base.json";

/// Metrics key used by the single cross-sectional model
pub const BASE_KEY: &str = "base";

/// Model file name for horizon `k`
pub fn horizon_model_file(k: u32) -> String {
    format!("model_year_{k}.json")
}

/// Metrics / residual key for horizon `k`
pub fn horizon_key(k: u32) -> String {
    k.to_string()
}

/// Description of a training run, stored next to its models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub mode: Mode,
    pub enhanced: bool,
    /// Training timestamp formatted `%Y%m%d_%H%M%S`
    pub version: String,
    pub n_samples: usize,
    pub n_features: usize,
    pub feature_names: Vec<String>,
    pub prediction_years: u32,
    /// Keyed by [`BASE_KEY`] or by horizon
    pub metrics: BTreeMap<String, Metrics>,
    /// Cross-sectional residual standard deviation
    #[serde(default)]
    pub residual_std: Option<f64>,
    /// Time-series residual standard deviation per horizon
    #[serde(default)]
    pub residual_stds: BTreeMap<String, f64>,
    pub annual_growth_rate: f64,
    #[serde(default)]
    pub sgg_growth_rates: BTreeMap<String, f64>,
    #[serde(default)]
    pub sgg_price_stats: BTreeMap<String, DistrictPriceStats>,
    pub n_trials: usize,
    pub trained_at: DateTime<Utc>,
    /// Fits that fell back to default parameters, by metrics key
    #[serde(default)]
    pub degraded: Vec<String>,
    #[serde(default)]
    pub best_params: BTreeMap<String, BoosterParams>,
    /// blake3 digest of each model file, by file name
    #[serde(default)]
    pub model_hashes: BTreeMap<String, String>,
}

impl Metadata {
    /// Residual standard deviation for a horizon (time series) or the base model
    pub fn residual_std_for(&self, horizon: u32) -> f64 {
        if self.mode.is_time_series() {
            self.residual_stds
                .get(&horizon_key(horizon))
                .copied()
                .unwrap_or(0.0)
        } else {
            self.residual_std.unwrap_or(0.0)
        }
    }

    /// Growth rate recorded for a district at training time
    pub fn district_growth_rate(&self, district: &str) -> Option<f64> {
        self.sgg_growth_rates.get(district).copied()
    }

    /// Mean of all recorded metric sets
    pub fn average_metrics(&self) -> Option<Metrics> {
        Metrics::average(self.metrics.values())
    }

    /// Mode, enhanced flag, feature count and feature names must agree
    pub fn check(&self) -> Result<(), ArtifactError> {
        if self.enhanced != self.mode.is_enhanced() {
            return Err(ArtifactError::Mismatch(format!(
                "enhanced flag {} disagrees with mode {}",
                self.enhanced, self.mode
            )));
        }
        let expected = self.mode.feature_count();
        if self.n_features != expected || self.feature_names.len() != expected {
            return Err(ArtifactError::Mismatch(format!(
                "mode {} expects {expected} features, metadata declares {} with {} names",
                self.mode,
                self.n_features,
                self.feature_names.len()
            )));
        }
        let names = self.mode.feature_names();
        if let Some(i) = (0..expected).find(|&i| names[i] != self.feature_names[i]) {
            return Err(ArtifactError::Mismatch(format!(
                "feature {i} is '{}', expected '{}'",
                self.feature_names[i], names[i]
            )));
        }
        if self.prediction_years == 0 {
            return Err(ArtifactError::Mismatch("prediction_years is 0".to_string()));
        }
        Ok(())
    }
}

/// The fitted regressors of a bundle
#[derive(Debug, Clone, PartialEq)]
pub enum Predictors {
    /// Time series: one model per horizon; horizons without training rows are absent
    PerHorizon(BTreeMap<u32, Model>),
    /// Cross-sectional: a single price-level model
    Base(Model),
}

impl Predictors {
    fn files(&self) -> Vec<(String, &Model)> {
        match self {
            Predictors::PerHorizon(models) => models
                .iter()
                .map(|(k, m)| (horizon_model_file(*k), m))
                .collect(),
            Predictors::Base(model) => vec![(BASE_MODEL_FILE.to_string(), model)],
        }
    }
}

/// Everything the prediction side needs, loaded and validated as a unit
#[derive(Debug, Clone, PartialEq)]
pub struct ModelBundle {
    pub metadata: Metadata,
    pub scaler: StandardScaler,
    pub predictors: Predictors,
}

impl ModelBundle {
    pub fn new(
        metadata: Metadata,
        scaler: StandardScaler,
        predictors: Predictors,
    ) -> Result<Self, ArtifactError> {
        let bundle = Self {
            metadata,
            scaler,
            predictors,
        };
        bundle.validate()?;
        Ok(bundle)
    }

    /// Cross-check metadata, scaler and models
    pub fn validate(&self) -> Result<(), ArtifactError> {
        let meta = &self.metadata;
        meta.check()?;

        if !self.scaler.is_consistent() || self.scaler.n_features != meta.n_features {
            return Err(ArtifactError::Mismatch(format!(
                "scaler has {} features, metadata declares {}",
                self.scaler.n_features, meta.n_features
            )));
        }

        match (&self.predictors, meta.mode.is_time_series()) {
            (Predictors::PerHorizon(models), true) => {
                if models.is_empty() {
                    return Err(ArtifactError::Missing("model_year_*.json".to_string()));
                }
                if let Some(k) = models.keys().find(|k| **k == 0 || **k > meta.prediction_years) {
                    return Err(ArtifactError::Mismatch(format!(
                        "horizon {k} outside 1..={}",
                        meta.prediction_years
                    )));
                }
            }
            (Predictors::Base(_), false) => {}
            _ => {
                return Err(ArtifactError::Mismatch(format!(
                    "model layout does not match mode {}",
                    meta.mode
                )))
            }
        }

        for (file, model) in self.predictors.files() {
            model.validate()?;
            if model.n_features != meta.n_features {
                return Err(ArtifactError::Mismatch(format!(
                    "{file} expects {} features, metadata declares {}",
                    model.n_features, meta.n_features
                )));
            }
        }
        Ok(())
    }

    /// Model for a horizon (time series) or the single base model
    pub fn model_for(&self, horizon: u32) -> Option<&Model> {
        match &self.predictors {
            Predictors::PerHorizon(models) => models.get(&horizon),
            Predictors::Base(model) => Some(model),
        }
    }

    /// Write the bundle atomically into `dir`, replacing any previous bundle
    ///
    /// Model hashes are recomputed and stored in the metadata before writing.
    pub fn save<P: AsRef<Path>>(&mut self, dir: P) -> Result<(), ArtifactError> {
        self.validate()?;
        let dir = dir.as_ref();
        let parent = dir
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)?;

        let staging = tempfile::Builder::new()
            .prefix(".landcast-staging-")
            .tempdir_in(parent)?;

        let mut hashes = BTreeMap::new();
        for (file, model) in self.predictors.files() {
            let json = model.to_canonical_json()?;
            hashes.insert(file.clone(), hash_bytes_hex(json.as_bytes()));
            fs::write(staging.path().join(&file), json)?;
        }
        self.metadata.model_hashes = hashes;

        fs::write(
            staging.path().join(SCALER_FILE),
            to_canonical_json(&self.scaler)?,
        )?;
        fs::write(
            staging.path().join(METADATA_FILE),
            to_canonical_json_pretty(&self.metadata)?,
        )?;

        swap_into_place(staging.path(), dir)?;
        info!(
            "Model bundle written to {} ({} model files)",
            dir.display(),
            self.metadata.model_hashes.len()
        );
        Ok(())
    }

    /// Load and validate a bundle, verifying recorded model hashes
    ///
    /// A save interrupted between its two renames leaves only the previous
    /// bundle under its backup name; it is moved back into place first.
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self, ArtifactError> {
        let dir = dir.as_ref();
        restore_interrupted_swap(dir)?;
        let metadata: Metadata = serde_json::from_str(&read_required(dir, METADATA_FILE)?)?;
        metadata.check()?;
        let scaler: StandardScaler = serde_json::from_str(&read_required(dir, SCALER_FILE)?)?;

        let predictors = if metadata.mode.is_time_series() {
            let mut models = BTreeMap::new();
            for k in 1..=metadata.prediction_years {
                let file = horizon_model_file(k);
                let path = dir.join(&file);
                if !path.exists() {
                    if metadata.model_hashes.contains_key(&file) {
                        return Err(ArtifactError::Missing(file));
                    }
                    debug!("No model for horizon {}, skipping", k);
                    continue;
                }
                models.insert(k, load_model(dir, &file, &metadata)?);
            }
            Predictors::PerHorizon(models)
        } else {
            Predictors::Base(load_model(dir, BASE_MODEL_FILE, &metadata)?)
        };

        let bundle = Self {
            metadata,
            scaler,
            predictors,
        };
        bundle.validate()?;
        info!(
            "Loaded {} model bundle version {} from {}",
            bundle.metadata.mode,
            bundle.metadata.version,
            dir.display()
        );
        Ok(bundle)
    }
}

fn read_required(dir: &Path, file: &str) -> Result<String, ArtifactError> {
    let path = dir.join(file);
    if !path.exists() {
        return Err(ArtifactError::Missing(path.display().to_string()));
    }
    Ok(fs::read_to_string(path)?)
}

fn load_model(dir: &Path, file: &str, metadata: &Metadata) -> Result<Model, ArtifactError> {
    let json = read_required(dir, file)?;
    if let Some(expected) = metadata.model_hashes.get(file) {
        let actual = hash_bytes_hex(json.as_bytes());
        if &actual != expected {
            return Err(ArtifactError::Integrity {
                file: file.to_string(),
                expected: expected.clone(),
                actual,
            });
        }
    }
    let model: Model = serde_json::from_str(&json)?;
    model.validate()?;
    Ok(model)
}

/// Replace `target` with the fully written `staged` directory
fn swap_into_place(staged: &Path, target: &Path) -> Result<(), ArtifactError> {
    if !target.exists() {
        fs::rename(staged, target)?;
        return Ok(());
    }

    let backup = backup_path(target);
    if backup.exists() {
        fs::remove_dir_all(&backup)?;
    }
    fs::rename(target, &backup)?;
    if let Err(e) = fs::rename(staged, target) {
        // Restore the previous bundle before reporting
        fs::rename(&backup, target)?;
        return Err(e.into());
    }
    if let Err(e) = fs::remove_dir_all(&backup) {
        warn!("Could not remove previous bundle {}: {}", backup.display(), e);
    }
    Ok(())
}

fn restore_interrupted_swap(target: &Path) -> Result<(), ArtifactError> {
    let backup = backup_path(target);
    if !target.exists() && backup.is_dir() {
        warn!(
            "Bundle {} missing after an interrupted save, restoring {}",
            target.display(),
            backup.display()
        );
        fs::rename(&backup, target)?;
    }
    Ok(())
}

fn backup_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "bundle".to_string());
    target.with_file_name(format!(".{name}.previous"))
}
