//! In-memory training matrices and the order-preserving split

use crate::errors::TrainingError;

/// Feature rows with one target each
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    pub features: Vec<Vec<f64>>,
    pub targets: Vec<f64>,
}

/// Train / validation / test partitions
#[derive(Clone, Debug, PartialEq)]
pub struct Split {
    pub train: Dataset,
    pub val: Dataset,
    pub test: Dataset,
}

impl Dataset {
    pub fn new(features: Vec<Vec<f64>>, targets: Vec<f64>) -> Result<Self, TrainingError> {
        if features.len() != targets.len() {
            return Err(TrainingError::Dataset(format!(
                "{} feature rows but {} targets",
                features.len(),
                targets.len()
            )));
        }
        if let Some(first) = features.first() {
            let width = first.len();
            if let Some(i) = features.iter().position(|row| row.len() != width) {
                return Err(TrainingError::Dataset(format!(
                    "row {i} has {} features, expected {width}",
                    features[i].len()
                )));
            }
        }
        if let Some(i) = targets.iter().position(|t| !t.is_finite()) {
            return Err(TrainingError::Dataset(format!("target {i} is not finite")));
        }
        Ok(Self { features, targets })
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn feature_count(&self) -> usize {
        self.features.first().map_or(0, Vec::len)
    }

    fn slice(&self, start: usize, end: usize) -> Dataset {
        Dataset {
            features: self.features[start..end].to_vec(),
            targets: self.targets[start..end].to_vec(),
        }
    }

    /// Split by original row order, without shuffling
    ///
    /// `test` starts at `floor(n * (1 - test_ratio))` and `val` at
    /// `floor(n * (1 - test_ratio - val_ratio))`.
    pub fn time_split(&self, val_ratio: f64, test_ratio: f64) -> Split {
        let n = self.len();
        let test_start = ((n as f64 * (1.0 - test_ratio)) as usize).min(n);
        let val_start = ((n as f64 * (1.0 - test_ratio - val_ratio)) as usize).min(test_start);
        Split {
            train: self.slice(0, val_start),
            val: self.slice(val_start, test_start),
            test: self.slice(test_start, n),
        }
    }
}
