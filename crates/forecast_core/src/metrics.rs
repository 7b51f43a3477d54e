//! Regression accuracy metrics

use serde::{Deserialize, Serialize};

/// Accuracy on a held-out set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
    /// Mean absolute percentage error over targets that are not zero, in percent
    pub mape: f64,
}

impl Metrics {
    /// Compute metrics for paired targets and predictions
    ///
    /// `r2` is 0.0 when fewer than two samples exist or the targets have no
    /// variance; `mape` is 0.0 when every target is zero.
    pub fn evaluate(y_true: &[f64], y_pred: &[f64]) -> Self {
        let n = y_true.len().min(y_pred.len());
        if n == 0 {
            return Self {
                rmse: 0.0,
                mae: 0.0,
                r2: 0.0,
                mape: 0.0,
            };
        }
        let pairs = || y_true.iter().zip(y_pred).take(n);

        let sse: f64 = pairs().map(|(y, p)| (y - p).powi(2)).sum();
        let sae: f64 = pairs().map(|(y, p)| (y - p).abs()).sum();
        let rmse = (sse / n as f64).sqrt();
        let mae = sae / n as f64;

        let r2 = if n > 1 {
            let mean = y_true[..n].iter().sum::<f64>() / n as f64;
            let sst: f64 = y_true[..n].iter().map(|y| (y - mean).powi(2)).sum();
            if sst > 0.0 {
                1.0 - sse / sst
            } else {
                0.0
            }
        } else {
            0.0
        };

        let (ape_sum, ape_n) = pairs()
            .filter(|(y, _)| **y != 0.0)
            .fold((0.0, 0usize), |(s, c), (y, p)| (s + ((y - p) / y).abs(), c + 1));
        let mape = if ape_n > 0 {
            ape_sum / ape_n as f64 * 100.0
        } else {
            0.0
        };

        Self { rmse, mae, r2, mape }
    }

    /// Per-field arithmetic mean of several metric sets
    pub fn average<'a, I>(items: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Metrics>,
    {
        let mut n = 0usize;
        let mut acc = Self {
            rmse: 0.0,
            mae: 0.0,
            r2: 0.0,
            mape: 0.0,
        };
        for m in items {
            acc.rmse += m.rmse;
            acc.mae += m.mae;
            acc.r2 += m.r2;
            acc.mape += m.mape;
            n += 1;
        }
        if n == 0 {
            return None;
        }
        let n = n as f64;
        Some(Self {
            rmse: acc.rmse / n,
            mae: acc.mae / n,
            r2: acc.r2 / n,
            mape: acc.mape / n,
        })
    }
}

/// Population standard deviation of `y_true - y_pred`
pub fn residual_std(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let residuals: Vec<f64> = y_true.iter().zip(y_pred).map(|(y, p)| y - p).collect();
    crate::features::population_std(&residuals)
}
