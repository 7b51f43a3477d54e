//! Landcast training CLI
//!
//! Trains the land-price forecasting models from a record snapshot and
//! optional official price-history files.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use landcast_forecast_core::{ForecastConfig, RecordSnapshot};
use landcast_forecast_trainer::{
    merge_price_history, read_price_history, ModelTrainer, TrainingCorpus,
};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "landcast-train")]
#[command(author = "Landcast Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train parcel land-price forecasting models", long_about = None)]
struct Args {
    /// JSON record snapshot (parcels, buildings, district tables)
    #[arg(short, long)]
    snapshot: PathBuf,

    /// Directory holding AL_D151_*.csv / AL_D151_*.zip price-history files
    #[arg(long)]
    price_dir: Option<PathBuf>,

    /// Restrict training to parcels of one district (5-digit code)
    #[arg(short, long)]
    district: Option<String>,

    /// Output directory for the model bundle (overrides the config)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Hyperparameter search trials (overrides the config)
    #[arg(long)]
    n_trials: Option<usize>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Never use district price context, even when the snapshot has it
    #[arg(long)]
    no_enhanced: bool,

    /// Do not fill file histories with years from the stored parcel history
    #[arg(long)]
    no_supplement: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ForecastConfig::load_from_file(path).context("Failed to load config")?,
        None => ForecastConfig::default(),
    };
    config
        .apply_env_overrides()
        .context("Invalid environment override")?;
    if let Some(n) = args.n_trials {
        config.search.n_trials = n;
    }
    if let Some(dir) = &args.output {
        config.training.model_dir = dir.clone();
    }

    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("Landcast forecast trainer v{}", env!("CARGO_PKG_VERSION"));
    info!("═══════════════════════════════════════════");

    for warning in config.validate().context("Invalid configuration")? {
        warn!("{}", warning);
    }

    info!("Loading snapshot from: {}", args.snapshot.display());
    let mut snapshot = RecordSnapshot::load_json(&args.snapshot).context("Failed to load snapshot")?;
    snapshot.derive_district_tables(Utc::now().date_naive());

    if let Some(dir) = &args.price_dir {
        let history = read_price_history(dir, args.district.as_deref())
            .context("Failed to read price history")?;
        if history.is_empty() {
            warn!("No price history found in {}, using stored histories", dir.display());
        } else {
            snapshot.parcels = merge_price_history(&history, &snapshot.parcels, !args.no_supplement);
        }
    }

    let mut corpus = TrainingCorpus::from_snapshot(snapshot, !args.no_enhanced);
    if let Some(district) = &args.district {
        corpus = corpus.filter_district(district);
    }
    info!(
        "Corpus: {} parcels, {} buildings, {} districts with stats",
        corpus.len(),
        corpus.buildings.len(),
        corpus.regional_stats.len()
    );

    info!("Training configuration:");
    info!("  Horizon: {} years", config.horizon.years);
    info!("  Search trials: {}", config.search.n_trials);
    info!("  Split: val {} / test {}", config.training.val_ratio, config.training.test_ratio);

    info!("═══════════════════════════════════════════");
    info!("Starting training...");
    let output = config.training.model_dir.clone();
    let summary = ModelTrainer::new(config)
        .run(&corpus, &output)
        .context("Training failed")?;

    info!("═══════════════════════════════════════════");
    info!("✓ Training completed successfully");
    println!("{summary}");

    Ok(())
}
