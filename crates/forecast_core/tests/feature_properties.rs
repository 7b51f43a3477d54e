use landcast_forecast_core::features::{
    building_features, land_features, price_series_features, regional_features, safe_log1p,
};
use landcast_forecast_core::schema::{LAND_CATEGORIES, USE_ZONE_GROUPS};
use landcast_forecast_core::{
    BuildingRecord, DistrictContext, DistrictPriceStats, FeatureBuilder, FeatureInput, Mode,
    ParcelCode, ParcelRecord, RegionalStats, ValuationPoint,
};
use proptest::prelude::*;

const ZONES: [&str; 6] = [
    "제2종일반주거지역",
    "일반상업지역",
    "준공업지역",
    "자연녹지지역",
    "관리지역",
    "",
];

fn optional_price() -> impl Strategy<Value = Option<f64>> {
    prop_oneof![
        Just(None),
        Just(Some(0.0)),
        Just(Some(-1.0)),
        Just(Some(f64::NAN)),
        (0.0f64..1e9).prop_map(Some),
    ]
}

fn history() -> impl Strategy<Value = Vec<ValuationPoint>> {
    prop::collection::btree_map(1990i32..2030, 0.0f64..1e8, 0..12).prop_map(|m| {
        m.into_iter()
            .map(|(year, price)| ValuationPoint::new(year, price))
            .collect()
    })
}

fn parcel_strategy() -> impl Strategy<Value = ParcelRecord> {
    (
        optional_price(),
        prop::option::of(prop::sample::select(
            ["대", "전지", "임야", "하천", "x", ""].to_vec(),
        )),
        prop::option::of(prop::sample::select(ZONES.to_vec())),
        prop::option::of(prop::sample::select(["개인", "국유", "법인"].to_vec())),
        prop::option::of(0u32..20),
        history(),
    )
        .prop_map(|(area, category, zone, ownership, owners, valuations)| {
            let mut parcel = ParcelRecord::new(ParcelCode::parse("1168010100100010000").unwrap());
            parcel.area = area;
            parcel.land_category = category.map(str::to_string);
            parcel.use_zone = zone.map(str::to_string);
            parcel.ownership = ownership.map(str::to_string);
            parcel.owner_count = owners;
            parcel.valuations = valuations;
            parcel
        })
}

proptest! {
    #[test]
    fn vectors_have_declared_length_and_are_finite(
        parcel in parcel_strategy(),
        reference_year in 1995i32..2035,
        has_building in any::<bool>(),
        current_price in optional_price(),
        growth_rate in -0.2f64..0.2,
    ) {
        let building = BuildingRecord {
            total_floor_area: Some(120.0),
            coverage_ratio: Some(55.0),
            floor_area_ratio: Some(180.0),
            above_ground_floors: Some(3),
            approval_date: Some("19980101".to_string()),
        };
        let regional = RegionalStats {
            avg_sale_price: Some(5e8),
            sale_volume: Some(120.0),
            avg_deposit: None,
        };
        let stats = DistrictPriceStats { mean_price: 1e6, median_price: 8e5, count: 40 };
        let input = FeatureInput {
            parcel: &parcel,
            building: has_building.then_some(&building),
            regional: Some(&regional),
            reference_year,
        };
        let district = DistrictContext {
            current_price,
            price_stats: Some(&stats),
            growth_rate,
        };

        for mode in [Mode::TimeSeries, Mode::CrossSectional, Mode::EnhancedCrossSectional] {
            let v = FeatureBuilder::build(mode, &input, Some(&district));
            prop_assert_eq!(v.len(), mode.feature_count());
            prop_assert_eq!(v.mode(), mode);
            prop_assert!(v.as_slice().iter().all(|x| x.is_finite()));
        }
    }

    #[test]
    fn log_features_are_non_negative(value in optional_price()) {
        let out = safe_log1p(value);
        prop_assert!(out.is_finite());
        prop_assert!(out >= 0.0);
        if !matches!(value, Some(v) if v > 0.0) {
            prop_assert_eq!(out, 0.0);
        }
    }

    #[test]
    fn one_hot_blocks_fire_at_most_once(parcel in parcel_strategy()) {
        let land = land_features(
            parcel.area,
            parcel.land_category.as_deref(),
            parcel.use_zone.as_deref(),
            parcel.ownership.as_deref(),
            parcel.owner_count,
        );
        let categories: f64 = land[1..1 + LAND_CATEGORIES.len()].iter().sum();
        let zones: f64 = land[10..10 + USE_ZONE_GROUPS.len()].iter().sum();
        prop_assert!(categories == 0.0 || categories == 1.0);
        prop_assert!(zones == 0.0 || zones == 1.0);
        prop_assert!(land[15] >= 1.0);
    }

    #[test]
    fn price_series_ignores_future_points(points in history(), reference_year in 1990i32..2030) {
        let past: Vec<ValuationPoint> =
            points.iter().copied().filter(|p| p.year <= reference_year).collect();
        prop_assert_eq!(
            price_series_features(&points, reference_year),
            price_series_features(&past, reference_year)
        );
        let f = price_series_features(&points, reference_year);
        prop_assert_eq!(f[9], past.len() as f64);
    }
}

#[test]
fn absent_side_records_map_to_zero_blocks() {
    assert_eq!(building_features(None, 2024), [0.0; 6]);
    assert_eq!(regional_features(None), [0.0; 3]);
}
