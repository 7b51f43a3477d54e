//! Training corpus, mode selection and row construction

use std::collections::BTreeMap;

use landcast_forecast_core::schema::DEFAULT_ANNUAL_GROWTH_RATE;
use landcast_forecast_core::{
    BuildingRecord, DistrictContext, DistrictPriceStats, FeatureBuilder, FeatureInput, Mode,
    ParcelCode, ParcelRecord, RecordSnapshot, RegionalStats,
};
use tracing::debug;

use crate::dataset::Dataset;
use crate::errors::TrainingError;

/// Parcels plus the side tables used to build training rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingCorpus {
    pub parcels: Vec<ParcelRecord>,
    pub buildings: BTreeMap<ParcelCode, BuildingRecord>,
    /// Keyed by 5-digit district code
    pub regional_stats: BTreeMap<String, RegionalStats>,
    /// Present only when the caller supplies district price context
    pub district_price_stats: Option<BTreeMap<String, DistrictPriceStats>>,
    pub growth_rates: Option<BTreeMap<String, f64>>,
}

impl TrainingCorpus {
    /// Build a corpus from a snapshot. District price context is attached only
    /// when `enhanced` is set and the snapshot carries both tables.
    pub fn from_snapshot(snapshot: RecordSnapshot, enhanced: bool) -> Self {
        let with_context = enhanced
            && !snapshot.district_price_stats.is_empty()
            && !snapshot.growth_rates.is_empty();
        Self {
            parcels: snapshot.parcels,
            buildings: snapshot.buildings,
            regional_stats: snapshot.regional_stats,
            district_price_stats: with_context.then_some(snapshot.district_price_stats),
            growth_rates: with_context.then_some(snapshot.growth_rates),
        }
    }

    /// Keep only parcels whose code starts with `prefix` (district or province)
    pub fn filter_district(mut self, prefix: &str) -> Self {
        let before = self.parcels.len();
        self.parcels.retain(|p| p.pnu.as_str().starts_with(prefix));
        debug!(
            "District filter {}: {} of {} parcels kept",
            prefix,
            self.parcels.len(),
            before
        );
        self
    }

    pub fn len(&self) -> usize {
        self.parcels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parcels.is_empty()
    }

    /// Mean number of valuation points per parcel; 0 for an empty corpus
    pub fn mean_history_length(&self) -> f64 {
        if self.parcels.is_empty() {
            return 0.0;
        }
        let total: usize = self.parcels.iter().map(|p| p.valuations.len()).sum();
        total as f64 / self.parcels.len() as f64
    }

    pub fn has_district_context(&self) -> bool {
        self.district_price_stats.is_some() && self.growth_rates.is_some()
    }

    /// Time series at or above `threshold`, otherwise enhanced when district
    /// context is present, otherwise plain cross-sectional
    pub fn select_mode(&self, threshold: f64) -> Mode {
        if self.mean_history_length() >= threshold {
            Mode::TimeSeries
        } else if self.has_district_context() {
            Mode::EnhancedCrossSectional
        } else {
            Mode::CrossSectional
        }
    }

    fn input<'a>(&'a self, parcel: &'a ParcelRecord, reference_year: i32) -> FeatureInput<'a> {
        FeatureInput {
            parcel,
            building: self.buildings.get(&parcel.pnu),
            regional: self.regional_stats.get(parcel.district()),
            reference_year,
        }
    }

    /// Growth rate for a district, default 3% when not recorded
    pub fn growth_rate_for(&self, district: &str) -> f64 {
        self.growth_rates
            .as_ref()
            .and_then(|rates| rates.get(district))
            .copied()
            .unwrap_or(DEFAULT_ANNUAL_GROWTH_RATE)
    }

    /// One row per parcel at its latest valuation year, targeting that price
    ///
    /// Parcels whose latest price is missing or non-positive are skipped.
    /// `mode` must be one of the cross-sectional modes.
    pub fn cross_sectional_rows(&self, mode: Mode) -> Result<Dataset, TrainingError> {
        let mut features = Vec::new();
        let mut targets = Vec::new();

        for parcel in &self.parcels {
            let Some(latest) = parcel.latest_valuation() else {
                continue;
            };
            if !(latest.price_per_sqm > 0.0 && latest.price_per_sqm.is_finite()) {
                continue;
            }
            let input = self.input(parcel, latest.year);

            let vector = if mode.is_enhanced() {
                let district = parcel.district();
                let current_price = parcel
                    .current_price
                    .filter(|p| *p > 0.0)
                    .unwrap_or(latest.price_per_sqm);
                let context = DistrictContext {
                    current_price: Some(current_price),
                    price_stats: self
                        .district_price_stats
                        .as_ref()
                        .and_then(|stats| stats.get(district)),
                    growth_rate: self.growth_rate_for(district),
                };
                FeatureBuilder::enhanced(&input, &context)
            } else {
                FeatureBuilder::cross_sectional(&input)
            };

            features.push(vector.to_vec());
            targets.push(latest.price_per_sqm);
        }

        Dataset::new(features, targets)
    }

    /// Direct multi-step rows: one per (parcel, base year) with any target
    /// within `horizon` years
    ///
    /// Parcels need at least `min_history_points` distinct valuation years.
    pub fn time_series_rows(&self, horizon: u32, min_history_points: usize) -> TimeSeriesRows {
        let mut rows = TimeSeriesRows {
            horizon,
            features: Vec::new(),
            targets: Vec::new(),
        };

        for parcel in &self.parcels {
            let year_price: BTreeMap<i32, f64> = parcel
                .valuations
                .iter()
                .filter(|p| p.price_per_sqm.is_finite())
                .map(|p| (p.year, p.price_per_sqm))
                .collect();
            if year_price.len() < min_history_points {
                continue;
            }

            for &base_year in year_price.keys() {
                let targets: Vec<Option<f64>> = (1..=horizon)
                    .map(|k| year_price.get(&(base_year + k as i32)).copied())
                    .collect();
                if targets.iter().all(Option::is_none) {
                    continue;
                }
                let vector = FeatureBuilder::time_series(&self.input(parcel, base_year));
                rows.features.push(vector.to_vec());
                rows.targets.push(targets);
            }
        }
        rows
    }
}

/// Time-series rows with a per-horizon target, `None` where the year is missing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeriesRows {
    pub horizon: u32,
    pub features: Vec<Vec<f64>>,
    /// `targets[row][k - 1]` is the price `k` years after the row's base year
    pub targets: Vec<Vec<Option<f64>>>,
}

impl TimeSeriesRows {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Rows of `features` (same order as `self.features`) having a target at horizon `k`
    pub fn for_horizon(&self, features: &[Vec<f64>], k: u32) -> Result<Dataset, TrainingError> {
        if features.len() != self.targets.len() {
            return Err(TrainingError::Dataset(format!(
                "{} feature rows for {} target rows",
                features.len(),
                self.targets.len()
            )));
        }
        if k == 0 || k > self.horizon {
            return Err(TrainingError::Dataset(format!(
                "horizon {k} outside 1..={}",
                self.horizon
            )));
        }
        let idx = (k - 1) as usize;
        let (x, y): (Vec<Vec<f64>>, Vec<f64>) = features
            .iter()
            .zip(&self.targets)
            .filter_map(|(row, targets)| targets[idx].map(|t| (row.clone(), t)))
            .unzip();
        Dataset::new(x, y)
    }
}
