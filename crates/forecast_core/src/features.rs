//! Feature construction for land-price models
//!
//! Converts parcel, building and regional records into fixed-length numeric
//! vectors. Every function here is pure: the same records and reference year
//! always produce the same vector.
//!
//! Layouts:
//! - time series: land(16) + price series(10) + building(6) + regional(3) = 35
//! - cross-sectional: land(16) + building(6) + regional(3) = 25
//! - enhanced cross-sectional: cross-sectional(25) + district price(4) = 29
//!
//! Missing or non-positive inputs never raise. They are substituted through
//! [`safe_log1p`], [`safe_ratio_clamped`] and [`finite_or_zero`].

use crate::schema::{
    use_zone_group, Mode, BUILDING_FEATURE_COUNT, CROSS_SECTIONAL_FEATURE_COUNT,
    DISTRICT_PRICE_FEATURE_COUNT, ENHANCED_FEATURE_COUNT, LAND_CATEGORIES, LAND_FEATURE_COUNT,
    PRICE_SERIES_FEATURE_COUNT, PRIVATE_OWNERSHIP, REGIONAL_FEATURE_COUNT,
    TIME_SERIES_FEATURE_COUNT, USE_ZONE_GROUPS,
};
use crate::types::{BuildingRecord, DistrictPriceStats, ParcelRecord, RegionalStats, ValuationPoint};

/// Upper bound for district price ratios
pub const MAX_DISTRICT_PRICE_RATIO: f64 = 5.0;

/// `ln(1 + x)` for positive finite `x`, otherwise exactly 0.0
pub fn safe_log1p(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v > 0.0 && v.is_finite() => v.ln_1p(),
        _ => 0.0,
    }
}

/// `numerator / denominator` clamped to `[0, max]`, or `fallback` when the
/// denominator is not strictly positive
pub fn safe_ratio_clamped(numerator: f64, denominator: f64, max: f64, fallback: f64) -> f64 {
    if denominator > 0.0 && denominator.is_finite() && numerator.is_finite() {
        (numerator / denominator).clamp(0.0, max)
    } else {
        fallback
    }
}

/// The value itself when finite, otherwise 0.0
pub fn finite_or_zero(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

fn is_private(ownership: Option<&str>) -> bool {
    matches!(ownership, Some(o) if o == PRIVATE_OWNERSHIP || o.eq_ignore_ascii_case("private"))
}

/// Land attributes (16 values)
///
/// `[area_log, category one-hot (9), use-zone one-hot (4), ownership_private, owner_count]`
pub fn land_features(
    area: Option<f64>,
    category: Option<&str>,
    use_zone: Option<&str>,
    ownership: Option<&str>,
    owner_count: Option<u32>,
) -> [f64; LAND_FEATURE_COUNT] {
    let mut out = [0.0; LAND_FEATURE_COUNT];
    out[0] = safe_log1p(area);

    // Only the first character of the category code is significant
    let lead = category.and_then(|c| c.chars().next());
    for (i, cat) in LAND_CATEGORIES.iter().enumerate() {
        if lead.is_some_and(|ch| cat.starts_with(ch)) {
            out[1 + i] = 1.0;
        }
    }

    let group = use_zone.and_then(use_zone_group);
    for (i, name) in USE_ZONE_GROUPS.iter().enumerate() {
        if group == Some(*name) {
            out[10 + i] = 1.0;
        }
    }

    out[14] = if is_private(ownership) { 1.0 } else { 0.0 };
    out[15] = match owner_count {
        Some(n) if n > 0 => n as f64,
        _ => 1.0,
    };
    out
}

/// Price-history statistics at `reference_year` (10 values)
///
/// Only points with `year <= reference_year` contribute.
pub fn price_series_features(
    points: &[ValuationPoint],
    reference_year: i32,
) -> [f64; PRICE_SERIES_FEATURE_COUNT] {
    let mut eligible: Vec<ValuationPoint> = points
        .iter()
        .copied()
        .filter(|p| p.year <= reference_year && p.price_per_sqm.is_finite())
        .collect();
    if eligible.is_empty() {
        return [0.0; PRICE_SERIES_FEATURE_COUNT];
    }
    eligible.sort_by_key(|p| p.year);

    let values: Vec<f64> = eligible.iter().map(|p| p.price_per_sqm).collect();
    let n = values.len();
    let back = |k: usize| values[n - 1 - k];

    let level = safe_log1p(Some(back(0)));
    let lag1 = if n >= 2 { safe_log1p(Some(back(1))) } else { level };
    let lag2 = if n >= 3 { safe_log1p(Some(back(2))) } else { lag1 };
    let lag3 = if n >= 4 { safe_log1p(Some(back(3))) } else { lag2 };

    let rolling_mean_3 = safe_log1p(Some(mean(tail(&values, 3))));
    let rolling_mean_5 = safe_log1p(Some(mean(tail(&values, 5))));

    let recent = tail(&values, 3);
    let rolling_std_3 = if recent.len() > 1 { population_std(recent) } else { 0.0 };

    let yoy_change = if n >= 2 && back(1) > 0.0 {
        (back(0) - back(1)) / back(1)
    } else {
        0.0
    };

    let trend_slope = if n >= 2 {
        let mean_price = mean(&values);
        if mean_price > 0.0 {
            least_squares_slope(&values) / mean_price
        } else {
            0.0
        }
    } else {
        0.0
    };

    [
        level,
        lag1,
        lag2,
        lag3,
        rolling_mean_3,
        rolling_mean_5,
        rolling_std_3,
        yoy_change,
        trend_slope,
        n as f64,
    ]
}

/// Building attributes (6 values); all zero when no building exists
///
/// `[has_building, floor_area_log, bcr, far, above_ground_floors, building_age]`
pub fn building_features(
    building: Option<&BuildingRecord>,
    reference_year: i32,
) -> [f64; BUILDING_FEATURE_COUNT] {
    let Some(b) = building else {
        return [0.0; BUILDING_FEATURE_COUNT];
    };
    let age = b
        .approval_year()
        .map(|year| (reference_year - year) as f64)
        .unwrap_or(0.0);

    [
        1.0,
        safe_log1p(b.total_floor_area),
        finite_or_zero(b.coverage_ratio),
        finite_or_zero(b.floor_area_ratio),
        b.above_ground_floors.map(f64::from).unwrap_or(0.0),
        age,
    ]
}

/// District transaction statistics (3 values)
pub fn regional_features(stats: Option<&RegionalStats>) -> [f64; REGIONAL_FEATURE_COUNT] {
    match stats {
        Some(s) => [
            safe_log1p(s.avg_sale_price),
            safe_log1p(s.sale_volume),
            safe_log1p(s.avg_deposit),
        ],
        None => [0.0; REGIONAL_FEATURE_COUNT],
    }
}

/// District price context (4 values), enhanced mode only
///
/// `[price_log, price / median, price / mean, growth_rate]`
pub fn district_price_features(
    current_price: Option<f64>,
    stats: Option<&DistrictPriceStats>,
    growth_rate: f64,
) -> [f64; DISTRICT_PRICE_FEATURE_COUNT] {
    let price = finite_or_zero(current_price);
    let (rank, ratio) = match stats {
        Some(s) if s.mean_price > 0.0 => (
            safe_ratio_clamped(price, s.median_price, MAX_DISTRICT_PRICE_RATIO, 1.0),
            safe_ratio_clamped(price, s.mean_price, MAX_DISTRICT_PRICE_RATIO, 1.0),
        ),
        _ => (1.0, 1.0),
    };
    [safe_log1p(Some(price)), rank, ratio, growth_rate]
}

/// Records describing one parcel at one reference year
#[derive(Debug, Clone, Copy)]
pub struct FeatureInput<'a> {
    pub parcel: &'a ParcelRecord,
    pub building: Option<&'a BuildingRecord>,
    pub regional: Option<&'a RegionalStats>,
    pub reference_year: i32,
}

/// Extra district context required by the enhanced layout
#[derive(Debug, Clone, Copy)]
pub struct DistrictContext<'a> {
    pub current_price: Option<f64>,
    pub price_stats: Option<&'a DistrictPriceStats>,
    pub growth_rate: f64,
}

/// A feature vector whose length is fixed by its mode
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureVector {
    TimeSeries([f64; TIME_SERIES_FEATURE_COUNT]),
    CrossSectional([f64; CROSS_SECTIONAL_FEATURE_COUNT]),
    EnhancedCrossSectional([f64; ENHANCED_FEATURE_COUNT]),
}

impl FeatureVector {
    pub fn mode(&self) -> Mode {
        match self {
            FeatureVector::TimeSeries(_) => Mode::TimeSeries,
            FeatureVector::CrossSectional(_) => Mode::CrossSectional,
            FeatureVector::EnhancedCrossSectional(_) => Mode::EnhancedCrossSectional,
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        match self {
            FeatureVector::TimeSeries(v) => v,
            FeatureVector::CrossSectional(v) => v,
            FeatureVector::EnhancedCrossSectional(v) => v,
        }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.as_slice().to_vec()
    }
}

/// Builds feature vectors for each mode
pub struct FeatureBuilder;

impl FeatureBuilder {
    fn land(input: &FeatureInput<'_>) -> [f64; LAND_FEATURE_COUNT] {
        let p = input.parcel;
        land_features(
            p.area,
            p.land_category.as_deref(),
            p.use_zone.as_deref(),
            p.ownership.as_deref(),
            p.owner_count,
        )
    }

    /// 35-feature vector including the parcel's own price history
    pub fn time_series(input: &FeatureInput<'_>) -> FeatureVector {
        let out = assemble::<TIME_SERIES_FEATURE_COUNT>(
            Mode::TimeSeries,
            &[
                &Self::land(input),
                &price_series_features(&input.parcel.valuations, input.reference_year),
                &building_features(input.building, input.reference_year),
                &regional_features(input.regional),
            ],
        );
        FeatureVector::TimeSeries(out)
    }

    /// 25-feature vector; price history is omitted because price is the target
    pub fn cross_sectional(input: &FeatureInput<'_>) -> FeatureVector {
        let out = assemble::<CROSS_SECTIONAL_FEATURE_COUNT>(
            Mode::CrossSectional,
            &[
                &Self::land(input),
                &building_features(input.building, input.reference_year),
                &regional_features(input.regional),
            ],
        );
        FeatureVector::CrossSectional(out)
    }

    /// 29-feature vector with district price context appended
    pub fn enhanced(input: &FeatureInput<'_>, district: &DistrictContext<'_>) -> FeatureVector {
        let out = assemble::<ENHANCED_FEATURE_COUNT>(
            Mode::EnhancedCrossSectional,
            &[
                &Self::land(input),
                &building_features(input.building, input.reference_year),
                &regional_features(input.regional),
                &district_price_features(
                    district.current_price,
                    district.price_stats,
                    district.growth_rate,
                ),
            ],
        );
        FeatureVector::EnhancedCrossSectional(out)
    }

    /// Dispatch on mode. Enhanced mode without district context falls back to
    /// neutral context (no current price, no statistics, zero growth).
    pub fn build(
        mode: Mode,
        input: &FeatureInput<'_>,
        district: Option<&DistrictContext<'_>>,
    ) -> FeatureVector {
        match mode {
            Mode::TimeSeries => Self::time_series(input),
            Mode::CrossSectional => Self::cross_sectional(input),
            Mode::EnhancedCrossSectional => {
                let neutral = DistrictContext {
                    current_price: None,
                    price_stats: None,
                    growth_rate: 0.0,
                };
                Self::enhanced(input, district.unwrap_or(&neutral))
            }
        }
    }
}

fn assemble<const N: usize>(mode: Mode, blocks: &[&[f64]]) -> [f64; N] {
    let total: usize = blocks.iter().map(|b| b.len()).sum();
    assert_eq!(
        total,
        mode.feature_names().len(),
        "feature vector length mismatch for {mode}: {total} values"
    );
    assert_eq!(total, N, "feature layout for {mode} does not match its array size");

    let mut out = [0.0; N];
    let mut offset = 0;
    for block in blocks {
        out[offset..offset + block.len()].copy_from_slice(block);
        offset += block.len();
    }
    out
}

fn tail(values: &[f64], k: usize) -> &[f64] {
    &values[values.len().saturating_sub(k)..]
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Standard deviation with denominator `n`
pub(crate) fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Least-squares slope of `values` against their index
fn least_squares_slope(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = mean(values);
    let mut num = 0.0;
    let mut den = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        num += dx * (y - y_mean);
        den += dx * dx;
    }
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}
