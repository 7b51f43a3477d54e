//! JSON snapshot of storage records
//!
//! A snapshot carries everything the trainer and the prediction service read
//! from storage: parcels, buildings, district statistics and optionally the
//! raw transactions those statistics are derived from.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, info};

use crate::errors::SnapshotError;
use crate::pnu::ParcelCode;
use crate::regional::{
    district_growth_rates, district_price_stats, summarize_sales, RentalTransaction,
    SaleTransaction,
};
use crate::types::{BuildingRecord, DistrictPriceStats, ParcelRecord, RegionalStats};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordSnapshot {
    pub parcels: Vec<ParcelRecord>,
    pub buildings: BTreeMap<ParcelCode, BuildingRecord>,
    /// Keyed by 5-digit district code
    pub regional_stats: BTreeMap<String, RegionalStats>,
    pub district_price_stats: BTreeMap<String, DistrictPriceStats>,
    pub growth_rates: BTreeMap<String, f64>,
    pub sales: Vec<SaleTransaction>,
    pub rentals: Vec<RentalTransaction>,
}

impl RecordSnapshot {
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self, SnapshotError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SnapshotError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let snapshot: RecordSnapshot = serde_json::from_str(&text)?;
        info!(
            "Loaded snapshot {}: {} parcels, {} buildings, {} districts",
            path.display(),
            snapshot.parcels.len(),
            snapshot.buildings.len(),
            snapshot.regional_stats.len()
        );
        Ok(snapshot)
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), SnapshotError> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Districts of all parcels, sorted
    pub fn districts(&self) -> BTreeSet<String> {
        self.parcels
            .iter()
            .map(|p| p.district().to_string())
            .collect()
    }

    /// Fill district tables that are empty from raw transactions and parcel prices
    ///
    /// Tables that already hold entries are left untouched.
    pub fn derive_district_tables(&mut self, reference_date: NaiveDate) {
        let districts = self.districts();

        if self.regional_stats.is_empty() && !(self.sales.is_empty() && self.rentals.is_empty()) {
            self.regional_stats = summarize_sales(&self.sales, &self.rentals, reference_date);
            debug!("Derived regional stats for {} districts", self.regional_stats.len());
        }

        if self.growth_rates.is_empty() && !self.sales.is_empty() {
            self.growth_rates = district_growth_rates(
                &self.sales,
                districts.iter().map(String::as_str),
                reference_date,
            );
            debug!("Derived growth rates for {} districts", self.growth_rates.len());
        }

        if self.district_price_stats.is_empty() {
            let mut prices: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
            for parcel in &self.parcels {
                if let Some(price) = parcel.current_price {
                    prices.entry(parcel.district()).or_default().push(price);
                }
            }
            self.district_price_stats = prices
                .into_iter()
                .map(|(district, values)| (district.to_string(), district_price_stats(&values)))
                .filter(|(_, stats)| stats.count > 0)
                .collect();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parcel(code: &str, price: Option<f64>) -> ParcelRecord {
        let mut p = ParcelRecord::new(ParcelCode::parse(code).unwrap());
        p.current_price = price;
        p
    }

    #[test]
    fn test_json_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snapshot.json");
        let mut snapshot = RecordSnapshot::default();
        snapshot.parcels.push(parcel("1111010100100010000", Some(1.0)));
        snapshot.buildings.insert(
            ParcelCode::parse("1111010100100010000").unwrap(),
            BuildingRecord::default(),
        );
        snapshot.save_json(&path).unwrap();

        assert_eq!(RecordSnapshot::load_json(&path).unwrap(), snapshot);
    }

    #[test]
    fn test_derive_district_tables() {
        let mut snapshot = RecordSnapshot {
            parcels: vec![
                parcel("1111010100100010000", Some(100.0)),
                parcel("1111010100100020000", Some(300.0)),
                parcel("2611010100100010000", None),
            ],
            sales: vec![SaleTransaction {
                district: "11110".to_string(),
                date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
                amount: Some(10.0),
            }],
            ..Default::default()
        };
        snapshot.derive_district_tables(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());

        assert_eq!(snapshot.regional_stats["11110"].sale_volume, Some(1.0));
        assert_eq!(snapshot.growth_rates["11110"], 0.03);
        assert_eq!(snapshot.growth_rates["26110"], 0.03);
        assert_eq!(snapshot.district_price_stats["11110"].median_price, 200.0);
        assert!(!snapshot.district_price_stats.contains_key("26110"));
    }
}
