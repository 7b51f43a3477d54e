//! Landcast prediction CLI
//!
//! Loads a model bundle and a record snapshot and prints the forecast for
//! one or more parcels as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use landcast_forecast_core::{ForecastConfig, RecordSnapshot};
use landcast_forecast_service::{InMemoryStore, PredictionService};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "landcast-predict")]
#[command(author = "Landcast Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Forecast official land prices for parcels", long_about = None)]
struct Args {
    /// Model bundle directory (overrides the config)
    #[arg(short, long)]
    model_dir: Option<PathBuf>,

    /// JSON record snapshot used as the parcel store
    #[arg(short, long)]
    snapshot: PathBuf,

    /// 19-digit parcel codes to forecast
    #[arg(short, long, required = true, num_args = 1..)]
    pnu: Vec<String>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ForecastConfig::load_from_file(path).context("Failed to load config")?,
        None => ForecastConfig::default(),
    };
    config
        .apply_env_overrides()
        .context("Invalid environment override")?;
    if let Some(dir) = &args.model_dir {
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
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("Landcast prediction service v{}", env!("CARGO_PKG_VERSION"));
    for warning in config.validate().context("Invalid configuration")? {
        warn!("{}", warning);
    }

    let service = PredictionService::load(&config.training.model_dir, config.serving.clone())
        .with_context(|| {
            format!(
                "Failed to load model bundle from {}",
                config.training.model_dir.display()
            )
        })?;

    let snapshot = RecordSnapshot::load_json(&args.snapshot).context("Failed to load snapshot")?;
    let store = InMemoryStore::from(snapshot);
    info!("Store: {} parcels", store.len());

    let mut failures = 0usize;
    for pnu in &args.pnu {
        match service.predict(&store, pnu).await {
            Ok(response) => {
                let json = serde_json::to_string_pretty(&response)
                    .context("Failed to serialize response")?;
                println!("{json}");
            }
            Err(e) => {
                error!("{}: {}", pnu, e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} of {} predictions failed", args.pnu.len());
    }
    Ok(())
}
