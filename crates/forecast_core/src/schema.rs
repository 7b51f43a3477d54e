//! Feature schema: vocabularies, feature-name lists and the forecasting mode

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of forecast years produced by default
pub const PREDICTION_YEARS: u32 = 5;

/// Annual growth rate used when no district rate is known
pub const DEFAULT_ANNUAL_GROWTH_RATE: f64 = 0.03;

/// Land-category vocabulary, matched against the first character of the code
pub const LAND_CATEGORIES: [&str; 9] = ["대", "전", "답", "임", "잡", "공", "도", "과", "목"];

/// Coarse use-zone groups, in feature order
pub const USE_ZONE_GROUPS: [&str; 4] = ["주거", "상업", "공업", "녹지"];

/// Ownership value that sets the private-ownership indicator
pub const PRIVATE_OWNERSHIP: &str = "개인";

/// Map a use-zone name onto its coarse group
pub fn use_zone_group(zone: &str) -> Option<&'static str> {
    match zone {
        "제1종전용주거지역" | "제2종전용주거지역" | "제1종일반주거지역" | "제2종일반주거지역"
        | "제3종일반주거지역" | "준주거지역" => Some("주거"),
        "중심상업지역" | "일반상업지역" | "근린상업지역" | "유통상업지역" => Some("상업"),
        "전용공업지역" | "일반공업지역" | "준공업지역" => Some("공업"),
        "보전녹지지역" | "생산녹지지역" | "자연녹지지역" => Some("녹지"),
        _ => None,
    }
}

pub const LAND_FEATURE_COUNT: usize = 16;
pub const PRICE_SERIES_FEATURE_COUNT: usize = 10;
pub const BUILDING_FEATURE_COUNT: usize = 6;
pub const REGIONAL_FEATURE_COUNT: usize = 3;
pub const DISTRICT_PRICE_FEATURE_COUNT: usize = 4;

pub const TIME_SERIES_FEATURE_COUNT: usize = LAND_FEATURE_COUNT
    + PRICE_SERIES_FEATURE_COUNT
    + BUILDING_FEATURE_COUNT
    + REGIONAL_FEATURE_COUNT;
pub const CROSS_SECTIONAL_FEATURE_COUNT: usize =
    LAND_FEATURE_COUNT + BUILDING_FEATURE_COUNT + REGIONAL_FEATURE_COUNT;
pub const ENHANCED_FEATURE_COUNT: usize =
    CROSS_SECTIONAL_FEATURE_COUNT + DISTRICT_PRICE_FEATURE_COUNT;

const LAND_NAMES: [&str; LAND_FEATURE_COUNT] = [
    "area_log",
    "jimok_대",
    "jimok_전",
    "jimok_답",
    "jimok_임",
    "jimok_잡",
    "jimok_공",
    "jimok_도",
    "jimok_과",
    "jimok_목",
    "use_zone_주거",
    "use_zone_상업",
    "use_zone_공업",
    "use_zone_녹지",
    "ownership_private",
    "owner_count",
];

const PRICE_SERIES_NAMES: [&str; PRICE_SERIES_FEATURE_COUNT] = [
    "price_level_log",
    "price_lag_1",
    "price_lag_2",
    "price_lag_3",
    "rolling_mean_3",
    "rolling_mean_5",
    "rolling_std_3",
    "yoy_change",
    "trend_slope",
    "history_length",
];

const BUILDING_NAMES: [&str; BUILDING_FEATURE_COUNT] = [
    "has_building",
    "floor_area_log",
    "bcr",
    "far",
    "above_ground_floors",
    "building_age",
];

const REGIONAL_NAMES: [&str; REGIONAL_FEATURE_COUNT] =
    ["avg_sale_price_log", "sale_volume_log", "avg_deposit_log"];

const DISTRICT_PRICE_NAMES: [&str; DISTRICT_PRICE_FEATURE_COUNT] = [
    "price_per_sqm_log",
    "price_rank_in_sgg",
    "price_to_sgg_ratio",
    "sgg_growth_rate",
];

/// Forecasting strategy, fixed by the shape of the training corpus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// One model per horizon trained on per-parcel history
    TimeSeries,
    /// One price-level model extrapolated by a growth rate
    CrossSectional,
    /// Cross-sectional plus district price context
    EnhancedCrossSectional,
}

impl Mode {
    /// Declared feature count for vectors of this mode
    pub fn feature_count(self) -> usize {
        match self {
            Mode::TimeSeries => TIME_SERIES_FEATURE_COUNT,
            Mode::CrossSectional => CROSS_SECTIONAL_FEATURE_COUNT,
            Mode::EnhancedCrossSectional => ENHANCED_FEATURE_COUNT,
        }
    }

    /// Ordered feature names for this mode
    pub fn feature_names(self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = LAND_NAMES.to_vec();
        match self {
            Mode::TimeSeries => {
                names.extend(PRICE_SERIES_NAMES);
                names.extend(BUILDING_NAMES);
                names.extend(REGIONAL_NAMES);
            }
            Mode::CrossSectional => {
                names.extend(BUILDING_NAMES);
                names.extend(REGIONAL_NAMES);
            }
            Mode::EnhancedCrossSectional => {
                names.extend(BUILDING_NAMES);
                names.extend(REGIONAL_NAMES);
                names.extend(DISTRICT_PRICE_NAMES);
            }
        }
        names
    }

    pub fn is_time_series(self) -> bool {
        matches!(self, Mode::TimeSeries)
    }

    pub fn is_enhanced(self) -> bool {
        matches!(self, Mode::EnhancedCrossSectional)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::TimeSeries => "time_series",
            Mode::CrossSectional => "cross_sectional",
            Mode::EnhancedCrossSectional => "enhanced_cross_sectional",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
