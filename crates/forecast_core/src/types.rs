//! Input records supplied by the storage collaborator
//!
//! These are read-only inputs to feature construction. Every field that the
//! upstream data may leave empty is an `Option`; substitution rules live in
//! [`crate::features`].

use serde::{Deserialize, Serialize};

use crate::pnu::ParcelCode;

/// One official valuation observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValuationPoint {
    pub year: i32,
    pub price_per_sqm: f64,
}

impl ValuationPoint {
    pub fn new(year: i32, price_per_sqm: f64) -> Self {
        Self { year, price_per_sqm }
    }
}

/// Cadastral parcel with its valuation history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParcelRecord {
    pub pnu: ParcelCode,
    /// Area in square meters
    #[serde(default)]
    pub area: Option<f64>,
    /// Land-category code (jimok), e.g. "대", "전"
    #[serde(default)]
    pub land_category: Option<String>,
    /// Use-zone name, e.g. "제2종일반주거지역"
    #[serde(default)]
    pub use_zone: Option<String>,
    #[serde(default)]
    pub ownership: Option<String>,
    #[serde(default)]
    pub owner_count: Option<u32>,
    /// Flat current official price per m², when the store carries one
    #[serde(default)]
    pub current_price: Option<f64>,
    /// Valuation history; years are unique per parcel
    #[serde(default)]
    pub valuations: Vec<ValuationPoint>,
}

impl ParcelRecord {
    pub fn new(pnu: ParcelCode) -> Self {
        Self {
            pnu,
            area: None,
            land_category: None,
            use_zone: None,
            ownership: None,
            owner_count: None,
            current_price: None,
            valuations: Vec::new(),
        }
    }

    /// Valuation points sorted by ascending year
    pub fn sorted_valuations(&self) -> Vec<ValuationPoint> {
        let mut points = self.valuations.clone();
        points.sort_by_key(|p| p.year);
        points
    }

    /// Most recent valuation point, if any
    pub fn latest_valuation(&self) -> Option<ValuationPoint> {
        self.valuations.iter().copied().max_by_key(|p| p.year)
    }

    pub fn district(&self) -> &str {
        self.pnu.district()
    }
}

/// Building register summary for a parcel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildingRecord {
    #[serde(default)]
    pub total_floor_area: Option<f64>,
    /// Building-coverage ratio
    #[serde(default)]
    pub coverage_ratio: Option<f64>,
    /// Floor-area ratio
    #[serde(default)]
    pub floor_area_ratio: Option<f64>,
    #[serde(default)]
    pub above_ground_floors: Option<u32>,
    /// Approval date as recorded upstream ("YYYYMMDD" or "YYYY-MM-DD")
    #[serde(default)]
    pub approval_date: Option<String>,
}

impl BuildingRecord {
    /// Year parsed from the first four characters of the approval date
    pub fn approval_year(&self) -> Option<i32> {
        let date = self.approval_date.as_deref()?;
        let prefix = date.get(..4)?;
        prefix.parse::<i32>().ok()
    }
}

/// District-level transaction statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionalStats {
    #[serde(default)]
    pub avg_sale_price: Option<f64>,
    #[serde(default)]
    pub sale_volume: Option<f64>,
    #[serde(default)]
    pub avg_deposit: Option<f64>,
}

/// District-level official valuation statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DistrictPriceStats {
    pub mean_price: f64,
    pub median_price: f64,
    #[serde(default)]
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code() -> ParcelCode {
        ParcelCode::parse("1111010100100010000").unwrap()
    }

    #[test]
    fn test_latest_and_sorted_valuations() {
        let mut parcel = ParcelRecord::new(code());
        parcel.valuations = vec![
            ValuationPoint::new(2023, 3.0),
            ValuationPoint::new(2021, 1.0),
            ValuationPoint::new(2022, 2.0),
        ];

        assert_eq!(parcel.latest_valuation().map(|p| p.year), Some(2023));
        let years: Vec<i32> = parcel.sorted_valuations().iter().map(|p| p.year).collect();
        assert_eq!(years, vec![2021, 2022, 2023]);
    }

    #[test]
    fn test_approval_year() {
        let mut building = BuildingRecord {
            approval_date: Some("19990315".to_string()),
            ..Default::default()
        };
        assert_eq!(building.approval_year(), Some(1999));

        building.approval_date = Some("99".to_string());
        assert_eq!(building.approval_year(), None);

        building.approval_date = Some("abcd-01-01".to_string());
        assert_eq!(building.approval_year(), None);

        building.approval_date = None;
        assert_eq!(building.approval_year(), None);
    }

    #[test]
    fn test_parcel_deserializes_with_missing_fields() {
        let json = r#"{"pnu":"1111010100100010000"}"#;
        let parcel: ParcelRecord = serde_json::from_str(json).unwrap();
        assert!(parcel.valuations.is_empty());
        assert_eq!(parcel.area, None);
    }
}
