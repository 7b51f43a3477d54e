//! Storage collaborator seam
//!
//! The service reads parcels and district tables through [`ParcelStore`].
//! [`InMemoryStore`] serves a [`RecordSnapshot`] and backs the CLI and tests.

use async_trait::async_trait;
use std::collections::HashMap;

use landcast_forecast_core::{
    BuildingRecord, DistrictPriceStats, ParcelCode, ParcelRecord, RecordSnapshot, RegionalStats,
};

use crate::errors::StoreError;

/// Read access to the records a prediction needs
#[async_trait]
pub trait ParcelStore: Send + Sync {
    async fn parcel(&self, pnu: &ParcelCode) -> Result<Option<ParcelRecord>, StoreError>;

    async fn building(&self, pnu: &ParcelCode) -> Result<Option<BuildingRecord>, StoreError>;

    /// Transaction statistics for a 5-digit district code
    async fn regional_stats(&self, district: &str) -> Result<Option<RegionalStats>, StoreError>;

    async fn district_price_stats(
        &self,
        district: &str,
    ) -> Result<Option<DistrictPriceStats>, StoreError>;

    /// Current annual growth rate for a district
    async fn growth_rate(&self, district: &str) -> Result<Option<f64>, StoreError>;
}

/// Immutable in-memory store
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    parcels: HashMap<ParcelCode, ParcelRecord>,
    buildings: HashMap<ParcelCode, BuildingRecord>,
    regional_stats: HashMap<String, RegionalStats>,
    district_price_stats: HashMap<String, DistrictPriceStats>,
    growth_rates: HashMap<String, f64>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parcel(mut self, parcel: ParcelRecord) -> Self {
        self.parcels.insert(parcel.pnu.clone(), parcel);
        self
    }

    pub fn with_building(mut self, pnu: ParcelCode, building: BuildingRecord) -> Self {
        self.buildings.insert(pnu, building);
        self
    }

    pub fn with_regional_stats(mut self, district: &str, stats: RegionalStats) -> Self {
        self.regional_stats.insert(district.to_string(), stats);
        self
    }

    pub fn with_growth_rate(mut self, district: &str, rate: f64) -> Self {
        self.growth_rates.insert(district.to_string(), rate);
        self
    }

    pub fn len(&self) -> usize {
        self.parcels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parcels.is_empty()
    }
}

impl From<RecordSnapshot> for InMemoryStore {
    fn from(snapshot: RecordSnapshot) -> Self {
        Self {
            parcels: snapshot
                .parcels
                .into_iter()
                .map(|p| (p.pnu.clone(), p))
                .collect(),
            buildings: snapshot.buildings.into_iter().collect(),
            regional_stats: snapshot.regional_stats.into_iter().collect(),
            district_price_stats: snapshot.district_price_stats.into_iter().collect(),
            growth_rates: snapshot.growth_rates.into_iter().collect(),
        }
    }
}

#[async_trait]
impl ParcelStore for InMemoryStore {
    async fn parcel(&self, pnu: &ParcelCode) -> Result<Option<ParcelRecord>, StoreError> {
        Ok(self.parcels.get(pnu).cloned())
    }

    async fn building(&self, pnu: &ParcelCode) -> Result<Option<BuildingRecord>, StoreError> {
        Ok(self.buildings.get(pnu).cloned())
    }

    async fn regional_stats(&self, district: &str) -> Result<Option<RegionalStats>, StoreError> {
        Ok(self.regional_stats.get(district).cloned())
    }

    async fn district_price_stats(
        &self,
        district: &str,
    ) -> Result<Option<DistrictPriceStats>, StoreError> {
        Ok(self.district_price_stats.get(district).copied())
    }

    async fn growth_rate(&self, district: &str) -> Result<Option<f64>, StoreError> {
        Ok(self.growth_rates.get(district).copied())
    }
}
