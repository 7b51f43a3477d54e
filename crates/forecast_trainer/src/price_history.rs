//! Official land-price history files (`AL_D151_*.csv` / `AL_D151_*.zip`)
//!
//! Files are named `AL_D151_<province>_<...>`; the third underscore-separated
//! part is the 2-digit province code used to skip irrelevant files early.
//! Government exports are CP949; UTF-8 files (with or without a byte-order
//! mark) are read as well.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use encoding_rs::{EUC_KR, UTF_8};
use landcast_forecast_core::pnu::PNU_LENGTH;
use landcast_forecast_core::{ParcelCode, ParcelRecord, ValuationPoint};
use tracing::{debug, info, warn};

pub const FILE_PREFIX: &str = "AL_D151_";

const PNU_COLUMNS: [&str; 3] = ["고유번호", "필지고유번호", "pnu"];
const YEAR_COLUMN: &str = "기준연도";
const PRICE_COLUMN: &str = "공시지가";

/// Ascending valuation history per parcel
pub type PriceHistory = BTreeMap<ParcelCode, Vec<ValuationPoint>>;

#[derive(Default)]
struct Accumulator {
    prices: BTreeMap<ParcelCode, BTreeMap<i32, f64>>,
    records: usize,
    skipped: usize,
}

impl Accumulator {
    fn finish(self) -> PriceHistory {
        self.prices
            .into_iter()
            .map(|(pnu, years)| {
                let history = years
                    .into_iter()
                    .map(|(year, price)| ValuationPoint::new(year, price))
                    .collect();
                (pnu, history)
            })
            .collect()
    }
}

/// Read every price-history file in `dir`, archives first, then loose CSVs
///
/// With `district` set, only parcels whose code starts with it are kept and
/// files of other provinces are skipped. For a repeated (parcel, year) the
/// last record read wins. A missing directory yields an empty history.
pub fn read_price_history(dir: &Path, district: Option<&str>) -> Result<PriceHistory> {
    if !dir.exists() {
        warn!("Price history directory not found: {}", dir.display());
        return Ok(PriceHistory::new());
    }
    let province = district.and_then(|d| d.get(..2));
    let mut acc = Accumulator::default();

    for path in list_files(dir, "zip")? {
        if !matches_province(&path, province) {
            continue;
        }
        info!("Reading {} ...", path.display());
        if let Err(e) = read_zip(&path, district, &mut acc) {
            warn!("Skipping unreadable archive {}: {:#}", path.display(), e);
        }
    }

    for path in list_files(dir, "csv")? {
        if !matches_province(&path, province) {
            continue;
        }
        info!("Reading {} ...", path.display());
        let bytes =
            std::fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
        read_records(&bytes, district, &mut acc)
            .with_context(|| format!("failed to parse {}", path.display()))?;
    }

    info!(
        "Price history loaded: {} parcels, {} records ({} rows skipped)",
        acc.prices.len(),
        acc.records,
        acc.skipped
    );
    Ok(acc.finish())
}

fn list_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("failed to list {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path.extension().and_then(|e| e.to_str()) == Some(extension)
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(FILE_PREFIX))
        })
        .collect();
    files.sort();
    Ok(files)
}

fn matches_province(path: &Path, province: Option<&str>) -> bool {
    let Some(province) = province else {
        return true;
    };
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    stem.split('_').nth(2) == Some(province)
}

fn read_zip(path: &Path, district: Option<&str>, acc: &mut Accumulator) -> Result<()> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut archive = zip::ZipArchive::new(file)
        .with_context(|| format!("invalid zip archive {}", path.display()))?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();
        if !name.ends_with(".csv") {
            continue;
        }
        debug!("Reading archive entry {}", name);
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut bytes)
            .with_context(|| format!("failed to extract {name}"))?;
        read_records(&bytes, district, acc).with_context(|| format!("failed to parse {name}"))?;
    }
    Ok(())
}

/// UTF-8 when the bytes are valid UTF-8, CP949 otherwise
fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    if let Some(text) = UTF_8.decode_without_bom_handling_and_without_replacement(bytes) {
        return text;
    }
    // encoding_rs implements EUC-KR as the CP949 superset
    let (text, had_errors) = EUC_KR.decode_without_bom_handling(bytes);
    if had_errors {
        warn!("Undecodable bytes replaced while reading CP949 input");
    }
    text
}

fn read_records(bytes: &[u8], district: Option<&str>, acc: &mut Accumulator) -> Result<()> {
    let text = decode_text(bytes);
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let column = |name: &str| headers.iter().position(|h| h == name);

    let pnu_columns: Vec<usize> = PNU_COLUMNS.iter().filter_map(|c| column(c)).collect();
    let (Some(year_col), Some(price_col)) = (column(YEAR_COLUMN), column(PRICE_COLUMN)) else {
        warn!("Price columns missing, headers: {:?}", headers);
        return Ok(());
    };

    for record in csv_reader.records() {
        let record = record?;
        let field = |i: usize| record.get(i);

        let Some(pnu) = pnu_columns.iter().find_map(|&i| field(i).and_then(extract_pnu)) else {
            acc.skipped += 1;
            continue;
        };
        if district.is_some_and(|d| !pnu.as_str().starts_with(d)) {
            continue;
        }
        let (Some(year), Some(price)) = (
            field(year_col).and_then(parse_year),
            field(price_col).and_then(parse_price),
        ) else {
            acc.skipped += 1;
            continue;
        };

        acc.prices.entry(pnu).or_default().insert(year, price);
        acc.records += 1;
    }
    Ok(())
}

/// First 19 characters of a code column, when long enough and numeric
fn extract_pnu(raw: &str) -> Option<ParcelCode> {
    let raw = raw.trim();
    ParcelCode::parse(raw.get(..PNU_LENGTH)?).ok()
}

fn parse_year(raw: &str) -> Option<i32> {
    raw.trim().parse().ok()
}

/// Positive price; thousands separators are ignored
fn parse_price(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite() && *p > 0.0)
}

/// Attach file histories to stored parcel attributes
///
/// Parcels without a file history are dropped. With `supplement`, years found
/// only in the stored history are added.
pub fn merge_price_history(
    history: &PriceHistory,
    parcels: &[ParcelRecord],
    supplement: bool,
) -> Vec<ParcelRecord> {
    let by_code: BTreeMap<&ParcelCode, &ParcelRecord> =
        parcels.iter().map(|p| (&p.pnu, p)).collect();

    let merged: Vec<ParcelRecord> = history
        .iter()
        .filter_map(|(pnu, points)| {
            let parcel = by_code.get(pnu)?;
            let mut years: BTreeMap<i32, f64> =
                points.iter().map(|p| (p.year, p.price_per_sqm)).collect();
            if supplement {
                for p in &parcel.valuations {
                    if p.year > 0 {
                        years.entry(p.year).or_insert(p.price_per_sqm);
                    }
                }
            }
            let mut record = (*parcel).clone();
            record.valuations = years
                .into_iter()
                .map(|(year, price)| ValuationPoint::new(year, price))
                .collect();
            Some(record)
        })
        .collect();

    info!(
        "Merged price history: {} file parcels, {} matched stored parcels",
        history.len(),
        merged.len()
    );
    merged
}
