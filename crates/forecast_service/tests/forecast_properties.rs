use landcast_forecast_service::forecast::{confidence_margin, yearly_prediction};
use proptest::prelude::*;

proptest! {
    #[test]
    fn bounds_bracket_the_point_estimate(
        projected in -1.0e5f64..5.0e7,
        sigma in 0.0f64..1.0e6,
        horizon in 1u32..=10,
        current in 0.0f64..5.0e7,
        area in 0.1f64..1.0e4,
    ) {
        let margin = confidence_margin(1.645, sigma, horizon);
        let row = yearly_prediction(2023, horizon, projected, margin, current, area);
        prop_assert!(row.confidence_lower >= 0);
        prop_assert!(row.predicted_price_per_sqm >= 0);
        prop_assert!(row.confidence_lower <= row.predicted_price_per_sqm);
        prop_assert!(row.predicted_price_per_sqm <= row.confidence_upper);
        prop_assert_eq!(row.year, 2023 + horizon as i32);
    }

    #[test]
    fn margin_is_non_decreasing_in_horizon(sigma in 0.0f64..1.0e6, horizon in 1u32..30) {
        let near = confidence_margin(1.645, sigma, horizon);
        let far = confidence_margin(1.645, sigma, horizon + 1);
        prop_assert!(far >= near);
        prop_assert!(near >= 0.0);
    }
}
