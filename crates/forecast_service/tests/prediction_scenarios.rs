//! Prediction scenarios against trained and hand-built bundles

use std::collections::BTreeMap;

use chrono::{TimeZone, Utc};
use landcast_forecast_core::config::ServingConfig;
use landcast_forecast_core::{
    ForecastConfig, Metadata, Metrics, Mode, Model, ModelBundle, ParcelCode, ParcelRecord,
    Predictors, StandardScaler, ValuationPoint,
};
use landcast_forecast_service::{
    InMemoryStore, PredictError, PredictionResponse, PredictionService,
};
use landcast_forecast_trainer::{ModelTrainer, TrainingCorpus};

const SCENARIO_PNU: &str = "1111010100199990000";

fn scenario_parcel(valuations: Vec<ValuationPoint>) -> ParcelRecord {
    let mut p = ParcelRecord::new(ParcelCode::parse(SCENARIO_PNU).unwrap());
    p.area = Some(100.0);
    p.land_category = Some("대".to_string());
    p.use_zone = Some("제2종일반주거지역".to_string());
    p.ownership = Some("개인".to_string());
    p.valuations = valuations;
    p
}

fn scenario_one_parcel() -> ParcelRecord {
    scenario_parcel(vec![
        ValuationPoint::new(2021, 1_000_000.0),
        ValuationPoint::new(2022, 1_050_000.0),
        ValuationPoint::new(2023, 1_113_000.0),
    ])
}

fn training_corpus() -> TrainingCorpus {
    let parcels = (0..30)
        .map(|i| {
            let code = format!("1111010100{}{:04}0000", 1 + i % 2, i);
            let mut p = ParcelRecord::new(ParcelCode::parse(&code).unwrap());
            let area = 60.0 + (i % 11) as f64 * 15.0;
            p.area = Some(area);
            p.land_category = Some(if i % 4 == 0 { "전" } else { "대" }.to_string());
            p.use_zone = Some("제2종일반주거지역".to_string());
            p.ownership = Some("개인".to_string());
            let base = 600_000.0 + area * 2_000.0;
            p.valuations = (2015..=2023)
                .map(|y| ValuationPoint::new(y, (base * 1.04f64.powi(y - 2015)).round()))
                .collect();
            p
        })
        .collect();
    TrainingCorpus {
        parcels,
        ..TrainingCorpus::default()
    }
}

fn trained_bundle() -> ModelBundle {
    let mut config = ForecastConfig::default();
    config.search.n_trials = 1;
    config.training.default_params.n_estimators = 30;
    config.training.default_params.max_depth = 3;
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let (bundle, _) = ModelTrainer::new(config)
        .train(&training_corpus(), now)
        .unwrap();
    bundle
}

fn constant_bundle(mode: Mode, estimate: f64, residual_std: f64) -> ModelBundle {
    let n = mode.feature_count();
    let mut metrics = BTreeMap::new();
    metrics.insert(
        "base".to_string(),
        Metrics {
            rmse: 10.0,
            mae: 8.0,
            r2: 0.9,
            mape: 1.5,
        },
    );
    let metadata = Metadata {
        mode,
        enhanced: mode.is_enhanced(),
        version: "20240301_120000".to_string(),
        n_samples: 100,
        n_features: n,
        feature_names: mode.feature_names().iter().map(|s| s.to_string()).collect(),
        prediction_years: 5,
        metrics,
        residual_std: Some(residual_std),
        residual_stds: BTreeMap::new(),
        annual_growth_rate: 0.03,
        sgg_growth_rates: BTreeMap::new(),
        sgg_price_stats: BTreeMap::new(),
        n_trials: 0,
        trained_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        degraded: Vec::new(),
        best_params: BTreeMap::new(),
        model_hashes: BTreeMap::new(),
    };
    ModelBundle::new(
        metadata,
        StandardScaler::identity(n),
        Predictors::Base(Model::constant(n, estimate)),
    )
    .unwrap()
}

fn without_timestamp(mut response: PredictionResponse) -> PredictionResponse {
    response.predicted_at = Utc.timestamp_opt(0, 0).unwrap();
    response
}

#[tokio::test]
async fn time_series_bundle_forecasts_five_years() {
    let service = PredictionService::from_bundle(trained_bundle(), ServingConfig::default()).unwrap();
    let store = InMemoryStore::new().with_parcel(scenario_one_parcel());

    let response = service.predict(&store, SCENARIO_PNU).await.unwrap();
    assert_eq!(response.pnu, SCENARIO_PNU);
    assert_eq!(response.current_price_per_sqm, Some(1_113_000));
    assert_eq!(response.price_history.len(), 3);
    assert_eq!(response.model_version, "20240301_120000");
    assert!(response.model_metrics.is_some());

    let years: Vec<i32> = response.predictions.iter().map(|p| p.year).collect();
    assert_eq!(years, vec![2024, 2025, 2026, 2027, 2028]);
    for (i, row) in response.predictions.iter().enumerate() {
        assert_eq!(row.year_offset, i as u32 + 1);
        assert!(row.predicted_price_per_sqm > 0);
        assert_eq!(row.predicted_total_price, row.predicted_price_per_sqm * 100);
        assert!(row.confidence_lower >= 0);
        assert!(row.confidence_lower <= row.predicted_price_per_sqm);
        assert!(row.predicted_price_per_sqm <= row.confidence_upper);
    }
}

#[tokio::test]
async fn parcel_without_price_signal_is_unprocessable() {
    let service = PredictionService::from_bundle(trained_bundle(), ServingConfig::default()).unwrap();
    let store = InMemoryStore::new().with_parcel(scenario_parcel(Vec::new()));

    let err = service.predict(&store, SCENARIO_PNU).await.unwrap_err();
    assert!(matches!(err, PredictError::UnprocessableInput(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn cross_sectional_projection_applies_price_ratio() {
    let bundle = constant_bundle(Mode::CrossSectional, 400_000.0, 0.0);
    let service = PredictionService::from_bundle(bundle, ServingConfig::default()).unwrap();
    let store = InMemoryStore::new()
        .with_parcel(scenario_parcel(vec![ValuationPoint::new(2023, 500_000.0)]));

    let response = service.predict(&store, SCENARIO_PNU).await.unwrap();
    assert_eq!(response.predictions.len(), 5);

    let first = &response.predictions[0];
    assert_eq!(first.year, 2024);
    assert_eq!(first.predicted_price_per_sqm, 515_000);
    assert_eq!(first.predicted_total_price, 51_500_000);
    assert_eq!(first.confidence_lower, 515_000);
    assert_eq!(first.confidence_upper, 515_000);
    assert_eq!(first.change_from_current_pct, 3.0);
    assert_eq!(response.predictions[1].predicted_price_per_sqm, 530_450);

    let metrics = response.model_metrics.unwrap();
    assert_eq!(metrics.rmse, 10.0);
}

#[tokio::test]
async fn growth_rate_prefers_bundle_district_rate() {
    let mut bundle = constant_bundle(Mode::EnhancedCrossSectional, 400_000.0, 1_000.0);
    bundle
        .metadata
        .sgg_growth_rates
        .insert("11110".to_string(), 0.05);
    let service = PredictionService::from_bundle(bundle, ServingConfig::default()).unwrap();
    let parcel = scenario_parcel(vec![ValuationPoint::new(2023, 400_000.0)]);

    let store = InMemoryStore::new()
        .with_parcel(parcel.clone())
        .with_growth_rate("11110", 0.10);
    let response = service.predict(&store, SCENARIO_PNU).await.unwrap();
    assert_eq!(response.predictions[0].predicted_price_per_sqm, 420_000);
    // 1.645 * 1000 * sqrt(1)
    assert_eq!(response.predictions[0].confidence_upper, 421_645);

    // caller rate applies when the bundle has none for the district
    let plain = constant_bundle(Mode::CrossSectional, 400_000.0, 0.0);
    let service = PredictionService::from_bundle(plain, ServingConfig::default()).unwrap();
    let response = service.predict(&store, SCENARIO_PNU).await.unwrap();
    assert_eq!(response.predictions[0].predicted_price_per_sqm, 440_000);
}

#[tokio::test]
async fn flat_price_without_history_uses_current_year() {
    let bundle = constant_bundle(Mode::CrossSectional, 400_000.0, 0.0);
    let service = PredictionService::from_bundle(bundle, ServingConfig::default()).unwrap();
    let mut parcel = scenario_parcel(Vec::new());
    parcel.current_price = Some(400_000.0);
    let store = InMemoryStore::new().with_parcel(parcel);

    let response = service.predict(&store, SCENARIO_PNU).await.unwrap();
    assert!(response.price_history.is_empty());
    let base_year = response.predicted_at.format("%Y").to_string().parse::<i32>().unwrap();
    assert_eq!(response.predictions[0].year, base_year + 1);
}

#[tokio::test]
async fn request_errors_are_classified() {
    let unloaded = PredictionService::unloaded(ServingConfig::default());
    let store = InMemoryStore::new();
    assert!(matches!(
        unloaded.predict(&store, SCENARIO_PNU).await,
        Err(PredictError::ModelUnavailable(_))
    ));

    let bundle = constant_bundle(Mode::CrossSectional, 400_000.0, 0.0);
    let service = PredictionService::from_bundle(bundle, ServingConfig::default()).unwrap();
    for bad in ["", "123", "11110101001999900001", "111101010019999000a"] {
        assert!(matches!(
            service.predict(&store, bad).await,
            Err(PredictError::InvalidArgument(_))
        ));
    }
    assert!(matches!(
        service.predict(&store, SCENARIO_PNU).await,
        Err(PredictError::NotFound(_))
    ));
}

#[tokio::test]
async fn saved_bundle_reloads_with_identical_predictions() {
    let mut bundle = trained_bundle();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("model");
    bundle.save(&out).unwrap();

    let store = InMemoryStore::new().with_parcel(scenario_one_parcel());
    let in_memory = PredictionService::from_bundle(bundle, ServingConfig::default()).unwrap();
    let loaded = PredictionService::load(&out, ServingConfig::default()).unwrap();
    assert!(loaded.is_loaded());

    let a = loaded.predict(&store, SCENARIO_PNU).await.unwrap();
    let b = loaded.predict(&store, SCENARIO_PNU).await.unwrap();
    let c = in_memory.predict(&store, SCENARIO_PNU).await.unwrap();
    assert_eq!(without_timestamp(a.clone()), without_timestamp(b));
    assert_eq!(a.predictions, c.predictions);
}

#[test]
fn corrupt_bundle_leaves_service_unloaded() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("metadata.json"), b"{not json").unwrap();
    let service = PredictionService::try_load(dir.path(), ServingConfig::default());
    assert!(!service.is_loaded());
    assert!(matches!(
        PredictionService::load(dir.path(), ServingConfig::default()),
        Err(PredictError::ModelUnavailable(_))
    ));
}
