//! End-to-end training runs over synthetic corpora

use std::collections::BTreeMap;

use chrono::{TimeZone, Utc};
use landcast_forecast_core::{
    DistrictPriceStats, ForecastConfig, Mode, ModelBundle, ParcelCode, ParcelRecord, Predictors,
    ValuationPoint,
};
use landcast_forecast_trainer::{ModelTrainer, TrainingCorpus, TrainingError};

fn parcel(i: usize, years: std::ops::RangeInclusive<i32>) -> ParcelRecord {
    let code = format!("1111010100{}{:04}0000", 1 + i % 2, i);
    let mut p = ParcelRecord::new(ParcelCode::parse(&code).unwrap());
    let area = 50.0 + (i % 17) as f64 * 10.0;
    p.area = Some(area);
    p.land_category = Some(if i % 3 == 0 { "전" } else { "대" }.to_string());
    p.use_zone = Some("제2종일반주거지역".to_string());
    p.ownership = Some("개인".to_string());
    let base = 500_000.0 + area * 1_000.0;
    p.valuations = years
        .map(|y| ValuationPoint::new(y, (base * 1.05f64.powi(y - 2019)).round()))
        .collect();
    p
}

fn corpus(n: usize, years: std::ops::RangeInclusive<i32>) -> TrainingCorpus {
    TrainingCorpus {
        parcels: (0..n).map(|i| parcel(i, years.clone())).collect(),
        ..TrainingCorpus::default()
    }
}

fn fast_config() -> ForecastConfig {
    let mut config = ForecastConfig::default();
    config.search.n_trials = 1;
    config.training.default_params.n_estimators = 30;
    config.training.default_params.max_depth = 3;
    config
}

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

#[test]
fn time_series_training_produces_per_horizon_models() {
    let corpus = corpus(60, 2019..=2023);
    let (bundle, summary) = ModelTrainer::new(fast_config()).train(&corpus, now()).unwrap();

    assert_eq!(summary.mode, Mode::TimeSeries);
    // base years 2019..=2022 for every parcel
    assert_eq!(summary.n_samples, 240);
    assert_eq!(summary.n_features, 35);
    assert_eq!(bundle.metadata.version, "20240301_120000");

    let Predictors::PerHorizon(models) = &bundle.predictors else {
        panic!("expected per-horizon models");
    };
    // no parcel has a price five years after any base year
    assert_eq!(models.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    assert!(summary.degraded.contains(&"5".to_string()));
    assert_eq!(bundle.metadata.residual_stds.len(), 4);
    // 60 rows for +4y leave 42 training rows, below the search guard
    assert!(summary.degraded.contains(&"4".to_string()));
    assert!(!summary.degraded.contains(&"1".to_string()));
}

#[test]
fn training_is_deterministic() {
    let corpus = corpus(60, 2019..=2023);
    let trainer = ModelTrainer::new(fast_config());
    let (a, _) = trainer.train(&corpus, now()).unwrap();
    let (b, _) = trainer.train(&corpus, now()).unwrap();
    for k in 1..=4 {
        assert_eq!(
            a.model_for(k).unwrap().hash_hex().unwrap(),
            b.model_for(k).unwrap().hash_hex().unwrap()
        );
    }
    assert_eq!(a, b);
}

#[test]
fn cross_sectional_training_round_trips_through_disk() {
    let corpus = corpus(40, 2023..=2023);
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("bundle");

    let summary = ModelTrainer::new(fast_config()).run(&corpus, &out).unwrap();
    assert_eq!(summary.mode, Mode::CrossSectional);
    assert_eq!(summary.n_features, 25);
    assert_eq!(summary.degraded, vec!["base".to_string()]);
    assert_eq!(summary.model_dir.as_deref(), Some(out.as_path()));

    let loaded = ModelBundle::load(&out).unwrap();
    assert_eq!(loaded.metadata.mode, Mode::CrossSectional);
    assert!(loaded.metadata.residual_std.is_some());
    assert_eq!(loaded.metadata.annual_growth_rate, 0.03);
    assert!(matches!(loaded.predictors, Predictors::Base(_)));
}

#[test]
fn enhanced_training_records_district_context() {
    let mut corpus = corpus(30, 2022..=2023);
    let mut stats = BTreeMap::new();
    stats.insert(
        "11110".to_string(),
        DistrictPriceStats {
            mean_price: 600_000.0,
            median_price: 580_000.0,
            count: 30,
        },
    );
    let mut rates = BTreeMap::new();
    rates.insert("11110".to_string(), 0.04);
    rates.insert("26110".to_string(), 0.05);
    corpus.district_price_stats = Some(stats);
    corpus.growth_rates = Some(rates);

    let (bundle, summary) = ModelTrainer::new(fast_config()).train(&corpus, now()).unwrap();
    assert_eq!(summary.mode, Mode::EnhancedCrossSectional);
    assert_eq!(summary.n_features, 29);
    assert!(bundle.metadata.enhanced);
    assert_eq!(bundle.metadata.annual_growth_rate, 0.045);
    assert_eq!(bundle.metadata.district_growth_rate("11110"), Some(0.04));
    assert_eq!(bundle.metadata.sgg_price_stats.len(), 1);
}

#[test]
fn corpus_without_usable_rows_is_rejected() {
    let mut empty_prices = corpus(5, 2023..=2023);
    for p in &mut empty_prices.parcels {
        p.valuations.clear();
    }
    let result = ModelTrainer::new(fast_config()).train(&empty_prices, now());
    assert!(matches!(result, Err(TrainingError::NoTrainingData(_))));
}
