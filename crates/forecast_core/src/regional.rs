//! District-level statistics derived from raw transactions and valuations
//!
//! These helpers turn the storage collaborator's raw rows into the
//! [`RegionalStats`], [`DistrictPriceStats`] and growth-rate maps consumed by
//! feature construction.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::schema::DEFAULT_ANNUAL_GROWTH_RATE;
use crate::types::{DistrictPriceStats, RegionalStats};

/// Look-back window for sale and rental averages
pub const TRANSACTION_WINDOW_DAYS: i64 = 730;

/// Look-back window for the per-year sale averages behind growth rates
pub const GROWTH_WINDOW_DAYS: i64 = 1095;

/// One real-estate sale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleTransaction {
    /// 5-digit district code
    pub district: String,
    pub date: NaiveDate,
    pub amount: Option<f64>,
}

/// One rental contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentalTransaction {
    pub district: String,
    pub date: NaiveDate,
    pub deposit: Option<f64>,
}

/// Round half away from zero to `decimals` places
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Compound annual growth between the first and last year of a series
///
/// Needs at least two years, a positive first price and a positive span;
/// otherwise returns [`DEFAULT_ANNUAL_GROWTH_RATE`]. The result is rounded to
/// four decimals.
pub fn compound_growth_rate(yearly_avg_sale: &BTreeMap<i32, f64>) -> f64 {
    let (Some((&first_year, &first)), Some((&last_year, &last))) =
        (yearly_avg_sale.first_key_value(), yearly_avg_sale.last_key_value())
    else {
        return DEFAULT_ANNUAL_GROWTH_RATE;
    };
    let span = last_year - first_year;
    if yearly_avg_sale.len() < 2 || first <= 0.0 || span <= 0 {
        return DEFAULT_ANNUAL_GROWTH_RATE;
    }
    let cagr = (last / first).powf(1.0 / f64::from(span)) - 1.0;
    if cagr.is_finite() {
        round_to(cagr, 4)
    } else {
        DEFAULT_ANNUAL_GROWTH_RATE
    }
}

/// Mean and median over strictly positive valuations
///
/// The median interpolates between the two middle values for even counts.
pub fn district_price_stats(prices: &[f64]) -> DistrictPriceStats {
    let mut positive: Vec<f64> = prices
        .iter()
        .copied()
        .filter(|p| *p > 0.0 && p.is_finite())
        .collect();
    if positive.is_empty() {
        return DistrictPriceStats::default();
    }
    positive.sort_by(f64::total_cmp);

    let n = positive.len();
    let mean_price = positive.iter().sum::<f64>() / n as f64;
    let median_price = if n % 2 == 1 {
        positive[n / 2]
    } else {
        (positive[n / 2 - 1] + positive[n / 2]) / 2.0
    };

    DistrictPriceStats {
        mean_price,
        median_price,
        count: n as u64,
    }
}

/// Per-district sale and rental averages over the two years ending at `reference_date`
///
/// Districts with no qualifying sales get `None` sale fields; likewise for deposits.
pub fn summarize_sales(
    sales: &[SaleTransaction],
    rentals: &[RentalTransaction],
    reference_date: NaiveDate,
) -> BTreeMap<String, RegionalStats> {
    let cutoff = reference_date - Duration::days(TRANSACTION_WINDOW_DAYS);

    let mut sale_acc: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for sale in sales.iter().filter(|s| s.date >= cutoff) {
        if let Some(amount) = sale.amount.filter(|a| a.is_finite()) {
            let entry = sale_acc.entry(sale.district.as_str()).or_default();
            entry.0 += amount;
            entry.1 += 1;
        }
    }

    let mut rental_acc: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for rental in rentals.iter().filter(|r| r.date >= cutoff) {
        if let Some(deposit) = rental.deposit.filter(|d| d.is_finite()) {
            let entry = rental_acc.entry(rental.district.as_str()).or_default();
            entry.0 += deposit;
            entry.1 += 1;
        }
    }

    let mut out: BTreeMap<String, RegionalStats> = BTreeMap::new();
    for (district, (sum, count)) in sale_acc {
        let stats = out.entry(district.to_string()).or_default();
        stats.avg_sale_price = Some(sum / count as f64);
        stats.sale_volume = Some(count as f64);
    }
    for (district, (sum, count)) in rental_acc {
        out.entry(district.to_string()).or_default().avg_deposit = Some(sum / count as f64);
    }
    out
}

/// Average positive sale amount per calendar year for one district,
/// over the three years ending at `reference_date`
pub fn yearly_average_sale_prices(
    sales: &[SaleTransaction],
    district: &str,
    reference_date: NaiveDate,
) -> BTreeMap<i32, f64> {
    let cutoff = reference_date - Duration::days(GROWTH_WINDOW_DAYS);
    let mut acc: BTreeMap<i32, (f64, usize)> = BTreeMap::new();
    for sale in sales
        .iter()
        .filter(|s| s.district == district && s.date >= cutoff)
    {
        if let Some(amount) = sale.amount.filter(|a| *a > 0.0 && a.is_finite()) {
            let entry = acc.entry(sale.date.year()).or_default();
            entry.0 += amount;
            entry.1 += 1;
        }
    }
    acc.into_iter()
        .map(|(year, (sum, count))| (year, sum / count as f64))
        .collect()
}

/// Growth rate for every requested district
pub fn district_growth_rates<'a, I>(
    sales: &[SaleTransaction],
    districts: I,
    reference_date: NaiveDate,
) -> BTreeMap<String, f64>
where
    I: IntoIterator<Item = &'a str>,
{
    districts
        .into_iter()
        .map(|district| {
            let yearly = yearly_average_sale_prices(sales, district, reference_date);
            (district.to_string(), compound_growth_rate(&yearly))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sale(district: &str, d: NaiveDate, amount: f64) -> SaleTransaction {
        SaleTransaction {
            district: district.to_string(),
            date: d,
            amount: Some(amount),
        }
    }

    #[test]
    fn test_compound_growth_rate() {
        let yearly: BTreeMap<i32, f64> = [(2022, 100.0), (2024, 121.0)].into_iter().collect();
        assert_eq!(compound_growth_rate(&yearly), 0.1);

        let single: BTreeMap<i32, f64> = [(2024, 121.0)].into_iter().collect();
        assert_eq!(compound_growth_rate(&single), DEFAULT_ANNUAL_GROWTH_RATE);

        let zero_start: BTreeMap<i32, f64> = [(2022, 0.0), (2024, 121.0)].into_iter().collect();
        assert_eq!(compound_growth_rate(&zero_start), DEFAULT_ANNUAL_GROWTH_RATE);

        assert_eq!(compound_growth_rate(&BTreeMap::new()), DEFAULT_ANNUAL_GROWTH_RATE);
    }

    #[test]
    fn test_growth_rate_is_rounded() {
        let yearly: BTreeMap<i32, f64> = [(2023, 3.0), (2024, 4.0)].into_iter().collect();
        assert_eq!(compound_growth_rate(&yearly), 0.3333);
    }

    #[test]
    fn test_district_price_stats() {
        let stats = district_price_stats(&[0.0, -1.0, 100.0, 300.0, 200.0, 400.0]);
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean_price, 250.0);
        assert_eq!(stats.median_price, 250.0);

        let odd = district_price_stats(&[5.0, 1.0, 3.0]);
        assert_eq!(odd.median_price, 3.0);

        assert_eq!(district_price_stats(&[]), DistrictPriceStats::default());
    }

    #[test]
    fn test_summarize_sales_window() {
        let today = date(2024, 6, 1);
        let sales = vec![
            sale("11110", date(2024, 1, 1), 100.0),
            sale("11110", date(2023, 1, 1), 300.0),
            sale("11110", date(2020, 1, 1), 9_999.0),
            SaleTransaction {
                district: "11110".to_string(),
                date: date(2024, 2, 1),
                amount: None,
            },
        ];
        let rentals = vec![RentalTransaction {
            district: "26110".to_string(),
            date: date(2024, 3, 1),
            deposit: Some(50.0),
        }];

        let stats = summarize_sales(&sales, &rentals, today);
        let gangnam = &stats["11110"];
        assert_eq!(gangnam.avg_sale_price, Some(200.0));
        assert_eq!(gangnam.sale_volume, Some(2.0));
        assert_eq!(gangnam.avg_deposit, None);

        let busan = &stats["26110"];
        assert_eq!(busan.avg_sale_price, None);
        assert_eq!(busan.avg_deposit, Some(50.0));
    }

    #[test]
    fn test_district_growth_rates() {
        let today = date(2024, 12, 31);
        let sales = vec![
            sale("11110", date(2022, 3, 1), 100.0),
            sale("11110", date(2022, 9, 1), 100.0),
            sale("11110", date(2024, 3, 1), 121.0),
        ];
        let rates = district_growth_rates(&sales, ["11110", "26110"], today);
        assert_eq!(rates["11110"], 0.1);
        assert_eq!(rates["26110"], DEFAULT_ANNUAL_GROWTH_RATE);
    }
}
