//! Boosted ensemble of regression trees
//!
//! A prediction is `base_score + Σ tree.weight · tree.evaluate(x)`. Models are
//! written as canonical JSON so that equal models hash identically.

use super::tree::Tree;
use crate::errors::ArtifactError;
use crate::serde_canon::{hash_canonical_hex, to_canonical_json};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Current on-disk model format version
pub const MODEL_FORMAT_VERSION: i32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Model {
    pub version: i32,
    /// Feature count the model was trained on
    pub n_features: usize,
    /// Initial prediction before any tree is applied
    pub base_score: f64,
    pub trees: Vec<Tree>,
}

impl Model {
    pub fn new(n_features: usize, base_score: f64, trees: Vec<Tree>) -> Self {
        Self {
            version: MODEL_FORMAT_VERSION,
            n_features,
            base_score,
            trees,
        }
    }

    /// A model with no trees; predicts `base_score` everywhere
    pub fn constant(n_features: usize, base_score: f64) -> Self {
        Self::new(n_features, base_score, Vec::new())
    }

    pub fn validate(&self) -> Result<(), ArtifactError> {
        if self.version != MODEL_FORMAT_VERSION {
            return Err(ArtifactError::Validation(format!(
                "unsupported model version: {}",
                self.version
            )));
        }
        if !self.base_score.is_finite() {
            return Err(ArtifactError::Validation(format!(
                "base score is not finite: {}",
                self.base_score
            )));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features)
                .map_err(|e| ArtifactError::Validation(format!("tree {i}: {e}")))?;
        }
        Ok(())
    }

    /// Predict one target for one (already scaled) feature vector
    pub fn predict(&self, features: &[f64]) -> f64 {
        self.trees
            .iter()
            .fold(self.base_score, |acc, tree| acc + tree.contribution(features))
    }

    /// Predict one target per row
    pub fn predict_batch(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.iter().map(|row| self.predict(row)).collect()
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn to_canonical_json(&self) -> Result<String, ArtifactError> {
        Ok(to_canonical_json(self)?)
    }

    /// Blake3 hash of the canonical JSON form
    pub fn hash_hex(&self) -> Result<String, ArtifactError> {
        Ok(hash_canonical_hex(self)?)
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), ArtifactError> {
        fs::write(path, self.to_canonical_json()?)?;
        Ok(())
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self, ArtifactError> {
        let json = fs::read_to_string(path)?;
        let model: Model = serde_json::from_str(&json)?;
        model.validate()?;
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gbdt::tree::Node;

    fn test_model() -> Model {
        let t1 = Tree::new(
            vec![
                Node::internal(0, 0, 50.0, 1, 2),
                Node::leaf(1, 100.0),
                Node::leaf(2, 200.0),
            ],
            0.5,
        );
        let t2 = Tree::new(
            vec![
                Node::internal(0, 1, 30.0, 1, 2),
                Node::leaf(1, -50.0),
                Node::leaf(2, 50.0),
            ],
            0.5,
        );
        Model::new(2, 10.0, vec![t1, t2])
    }

    #[test]
    fn test_predict() {
        let model = test_model();
        // 10 + 0.5*100 + 0.5*(-50)
        assert_eq!(model.predict(&[30.0, 20.0]), 35.0);
        // 10 + 0.5*200 + 0.5*50
        assert_eq!(model.predict(&[60.0, 40.0]), 135.0);
        assert_eq!(model.predict_batch(&[vec![30.0, 20.0]]), vec![35.0]);
    }

    #[test]
    fn test_constant_model() {
        let model = Model::constant(4, 7.5);
        assert!(model.validate().is_ok());
        assert_eq!(model.predict(&[0.0; 4]), 7.5);
    }

    #[test]
    fn test_hash_deterministic_and_sensitive() {
        let a = test_model();
        let b = test_model();
        assert_eq!(a.hash_hex().unwrap(), b.hash_hex().unwrap());

        let mut c = test_model();
        c.base_score = 11.0;
        assert_ne!(a.hash_hex().unwrap(), c.hash_hex().unwrap());
    }

    #[test]
    fn test_validation() {
        let mut m = test_model();
        m.version = 99;
        assert!(m.validate().is_err());

        let mut m = test_model();
        m.n_features = 1;
        assert!(m.validate().is_err());
    }

    #[test]
    fn test_save_load_json() {
        use tempfile::NamedTempFile;

        let model = test_model();
        let file = NamedTempFile::new().unwrap();
        model.save_json(file.path()).unwrap();
        let loaded = Model::load_json(file.path()).unwrap();
        assert_eq!(model, loaded);
        assert_eq!(model.hash_hex().unwrap(), loaded.hash_hex().unwrap());
    }
}
