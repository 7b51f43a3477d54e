//! Per-feature standardization
//!
//! `z = (x - mean) / scale`, where `scale` is the population standard
//! deviation of the training column, or 1.0 when that deviation is zero.

use serde::{Deserialize, Serialize};

use crate::errors::ScalerError;

/// Fitted standardization parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
    pub n_features: usize,
}

impl StandardScaler {
    /// Fit on training rows. Every row must have the same length.
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self, ScalerError> {
        let first = rows.first().ok_or(ScalerError::EmptyData)?;
        let n_features = first.len();
        let n = rows.len() as f64;

        let mut mean = vec![0.0; n_features];
        for row in rows {
            check_width(n_features, row.len())?;
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        for m in &mut mean {
            *m /= n;
        }

        let mut var = vec![0.0; n_features];
        for row in rows {
            for ((acc, v), m) in var.iter_mut().zip(row).zip(&mean) {
                *acc += (v - m).powi(2);
            }
        }
        let scale = var
            .into_iter()
            .map(|s| {
                let std = (s / n).sqrt();
                if std > 0.0 && std.is_finite() {
                    std
                } else {
                    1.0
                }
            })
            .collect();

        Ok(Self {
            mean,
            scale,
            n_features,
        })
    }

    /// Identity scaler for `n_features` columns
    pub fn identity(n_features: usize) -> Self {
        Self {
            mean: vec![0.0; n_features],
            scale: vec![1.0; n_features],
            n_features,
        }
    }

    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>, ScalerError> {
        check_width(self.n_features, row.len())?;
        Ok(row
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (m, s))| (x - m) / s)
            .collect())
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, ScalerError> {
        rows.iter().map(|row| self.transform_row(row)).collect()
    }

    /// Checks internal consistency after deserialization
    pub fn is_consistent(&self) -> bool {
        self.mean.len() == self.n_features
            && self.scale.len() == self.n_features
            && self.scale.iter().all(|s| *s > 0.0 && s.is_finite())
            && self.mean.iter().all(|m| m.is_finite())
    }
}

fn check_width(expected: usize, actual: usize) -> Result<(), ScalerError> {
    if expected == actual {
        Ok(())
    } else {
        Err(ScalerError::DimensionMismatch { expected, actual })
    }
}
