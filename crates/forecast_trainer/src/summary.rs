//! Human-readable result of a training run

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use landcast_forecast_core::{Metrics, Mode};

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSummary {
    pub mode: Mode,
    pub version: String,
    pub mean_history_length: f64,
    pub n_samples: usize,
    pub n_features: usize,
    /// Keyed by `base` or by horizon
    pub metrics: BTreeMap<String, Metrics>,
    /// Fits that used the fixed default parameters
    pub degraded: Vec<String>,
    pub model_dir: Option<PathBuf>,
}

impl TrainingSummary {
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }

    /// Metric rows in display order: horizons numerically, then named keys
    pub fn metric_rows(&self) -> Vec<(&str, &Metrics)> {
        let mut rows: Vec<(&str, &Metrics)> =
            self.metrics.iter().map(|(k, m)| (k.as_str(), m)).collect();
        rows.sort_by_key(|(k, _)| (k.parse::<u32>().unwrap_or(u32::MAX), k.to_string()));
        rows
    }
}

impl fmt::Display for TrainingSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Mode:            {}", self.mode)?;
        writeln!(f, "Version:         {}", self.version)?;
        writeln!(f, "Mean history:    {:.2} points/parcel", self.mean_history_length)?;
        writeln!(f, "Samples:         {}", self.n_samples)?;
        writeln!(f, "Features:        {}", self.n_features)?;
        if let Some(dir) = &self.model_dir {
            writeln!(f, "Model directory: {}", dir.display())?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:<8} {:>14} {:>14} {:>8} {:>8}",
            "model", "RMSE", "MAE", "R2", "MAPE%"
        )?;
        for (key, m) in self.metric_rows() {
            let label = match key.parse::<u32>() {
                Ok(k) => format!("+{k}y"),
                Err(_) => key.to_string(),
            };
            let flag = if self.degraded.iter().any(|d| d == key) {
                " (default params)"
            } else {
                ""
            };
            writeln!(
                f,
                "{:<8} {:>14.0} {:>14.0} {:>8.4} {:>8.2}{}",
                label, m.rmse, m.mae, m.r2, m.mape, flag
            )?;
        }
        if self.is_degraded() {
            writeln!(f)?;
            write!(f, "Degraded fits: {}", self.degraded.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(rmse: f64) -> Metrics {
        Metrics {
            rmse,
            mae: rmse / 2.0,
            r2: 0.9,
            mape: 1.5,
        }
    }

    #[test]
    fn test_rows_sorted_numerically() {
        let mut summary = TrainingSummary {
            mode: Mode::TimeSeries,
            version: "20240101_000000".to_string(),
            mean_history_length: 4.0,
            n_samples: 10,
            n_features: 35,
            metrics: BTreeMap::new(),
            degraded: vec!["10".to_string()],
            model_dir: None,
        };
        for k in [1, 2, 10] {
            summary.metrics.insert(k.to_string(), metrics(k as f64));
        }
        let keys: Vec<&str> = summary.metric_rows().iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["1", "2", "10"]);

        let text = summary.to_string();
        assert!(text.contains("+10y"));
        assert!(text.contains("(default params)"));
        assert!(text.contains("Degraded fits: 10"));
    }
}
