//! Regression tree nodes and traversal

use serde::{Deserialize, Serialize};

/// A decision tree node (internal or leaf)
///
/// Internal nodes carry `feature_idx >= 0`, a threshold and two child indices.
/// Leaf nodes carry `feature_idx == -1`, children `-1` and a leaf value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    pub id: i32,
    pub left: i32,
    pub right: i32,
    #[serde(rename = "feature_idx", alias = "feature")]
    pub feature_idx: i32,
    /// Samples with `x <= threshold` go left
    pub threshold: f64,
    pub leaf: Option<f64>,
}

impl Node {
    pub fn internal(id: i32, feature_idx: i32, threshold: f64, left: i32, right: i32) -> Self {
        Self {
            id,
            left,
            right,
            feature_idx,
            threshold,
            leaf: None,
        }
    }

    pub fn leaf(id: i32, value: f64) -> Self {
        Self {
            id,
            left: -1,
            right: -1,
            feature_idx: -1,
            threshold: 0.0,
            leaf: Some(value),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.feature_idx == -1 || self.leaf.is_some()
    }
}

/// A single regression tree; node 0 is the root
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tree {
    pub nodes: Vec<Node>,
    /// Shrinkage applied to every leaf value of this tree
    pub weight: f64,
}

impl Tree {
    pub fn new(nodes: Vec<Node>, weight: f64) -> Self {
        Self { nodes, weight }
    }

    /// Leaf value reached by `features`, before shrinkage
    ///
    /// Malformed trees evaluate to 0.0; [`Tree::validate`] rejects them at load time.
    pub fn evaluate(&self, features: &[f64]) -> f64 {
        let mut idx = 0usize;
        // Children always follow their parent, so the walk is bounded by the node count
        for _ in 0..self.nodes.len() {
            let Some(node) = self.nodes.get(idx) else {
                return 0.0;
            };
            if node.is_leaf() {
                return node.leaf.unwrap_or(0.0);
            }
            let Some(&value) = features.get(node.feature_idx as usize) else {
                return 0.0;
            };
            let next = if value <= node.threshold {
                node.left
            } else {
                node.right
            };
            if next < 0 {
                return 0.0;
            }
            idx = next as usize;
        }
        0.0
    }

    /// Weighted contribution of this tree
    pub fn contribution(&self, features: &[f64]) -> f64 {
        self.weight * self.evaluate(features)
    }

    /// Number of leaves
    pub fn num_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Depth of the deepest leaf (a single leaf has depth 0)
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize, depth: usize) -> usize {
            match nodes.get(idx) {
                Some(node) if !node.is_leaf() => walk(nodes, node.left as usize, depth + 1)
                    .max(walk(nodes, node.right as usize, depth + 1)),
                _ => depth,
            }
        }
        walk(&self.nodes, 0, 0)
    }

    /// Structural checks: child indices in range and forward-pointing,
    /// feature indices below `n_features`, finite thresholds and leaves
    pub fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        if !self.weight.is_finite() {
            return Err(format!("tree weight is not finite: {}", self.weight));
        }

        for (i, node) in self.nodes.iter().enumerate() {
            if node.is_leaf() {
                match node.leaf {
                    Some(v) if v.is_finite() => {}
                    Some(v) => return Err(format!("leaf node {i} has non-finite value {v}")),
                    None => return Err(format!("leaf node {i} has no leaf value")),
                }
                continue;
            }

            for (side, child) in [("left", node.left), ("right", node.right)] {
                if child <= i as i32 || child as usize >= self.nodes.len() {
                    return Err(format!("node {i} has invalid {side} child: {child}"));
                }
            }
            if node.feature_idx < 0 || node.feature_idx as usize >= n_features {
                return Err(format!(
                    "node {i} splits on feature {} but the model has {n_features} features",
                    node.feature_idx
                ));
            }
            if !node.threshold.is_finite() {
                return Err(format!("node {i} has non-finite threshold"));
            }
        }
        Ok(())
    }
}
