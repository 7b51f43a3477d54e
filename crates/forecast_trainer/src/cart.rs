//! Regression tree builder for second-order boosting
//!
//! Splits are found greedily over histogram bins. For gradient sum `G` and
//! hessian sum `H` of a node:
//!
//! - leaf weight: `-T(G) / (H + lambda)`
//! - split gain: `0.5 * [T(GL)^2/(HL+lambda) + T(GR)^2/(HR+lambda) - T(G)^2/(H+lambda)] - gamma`
//!
//! where `T` is soft-thresholding by the L1 penalty `alpha`.

use landcast_forecast_core::gbdt::{BoosterParams, Node, Tree};

use crate::binning::BinnedMatrix;
use crate::deterministic::SplitTieBreaker;

/// Per-tree growth parameters
#[derive(Clone, Debug, PartialEq)]
pub struct TreeConfig {
    pub max_depth: usize,
    pub reg_lambda: f64,
    pub reg_alpha: f64,
    pub gamma: f64,
    pub min_child_weight: f64,
}

impl From<&BoosterParams> for TreeConfig {
    fn from(p: &BoosterParams) -> Self {
        Self {
            max_depth: p.max_depth,
            reg_lambda: p.reg_lambda,
            reg_alpha: p.reg_alpha,
            gamma: p.gamma,
            min_child_weight: p.min_child_weight,
        }
    }
}

#[derive(Debug, Clone)]
struct SplitCandidate {
    feature_idx: usize,
    bin: usize,
    gain: f64,
    tie_breaker: SplitTieBreaker,
}

#[derive(Clone, Copy, Default)]
struct BinStats {
    grad: f64,
    hess: f64,
    count: usize,
}

/// Builds one tree from gradients and hessians over a row subset
pub struct CartBuilder<'a> {
    config: TreeConfig,
    binned: &'a BinnedMatrix,
    gradients: &'a [f64],
    hessians: &'a [f64],
    features: &'a [usize],
}

impl<'a> CartBuilder<'a> {
    pub fn new(
        config: TreeConfig,
        binned: &'a BinnedMatrix,
        gradients: &'a [f64],
        hessians: &'a [f64],
        features: &'a [usize],
    ) -> Self {
        assert_eq!(binned.n_rows(), gradients.len());
        assert_eq!(gradients.len(), hessians.len());
        Self {
            config,
            binned,
            gradients,
            hessians,
            features,
        }
    }

    /// Grow a tree over `rows`; `weight` is stored as the tree's shrinkage
    pub fn build(&self, rows: &[usize], weight: f64) -> Tree {
        let mut nodes = Vec::new();
        self.build_node(rows, 0, &mut nodes);
        Tree::new(nodes, weight)
    }

    fn build_node(&self, rows: &[usize], depth: usize, nodes: &mut Vec<Node>) -> i32 {
        let current = nodes.len();
        let (g, h) = rows.iter().fold((0.0, 0.0), |(g, h), &r| {
            (g + self.gradients[r], h + self.hessians[r])
        });
        let leaf = Node::leaf(current as i32, self.leaf_weight(g, h));

        if depth >= self.config.max_depth
            || rows.len() < 2
            || h < 2.0 * self.config.min_child_weight
        {
            nodes.push(leaf);
            return current as i32;
        }

        let Some(split) = self.find_best_split(rows, g, h) else {
            nodes.push(leaf);
            return current as i32;
        };

        let threshold = self.binned.threshold(split.feature_idx, split.bin);
        nodes.push(Node::internal(
            current as i32,
            split.feature_idx as i32,
            threshold,
            -1,
            -1,
        ));

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .partition(|&&r| self.binned.bin(split.feature_idx, r) <= split.bin);

        let left = self.build_node(&left_rows, depth + 1, nodes);
        let right = self.build_node(&right_rows, depth + 1, nodes);
        nodes[current].left = left;
        nodes[current].right = right;
        current as i32
    }

    fn find_best_split(&self, rows: &[usize], g: f64, h: f64) -> Option<SplitCandidate> {
        let parent_score = self.score(g, h);
        let mut best: Option<SplitCandidate> = None;

        for &feature_idx in self.features {
            let n_bins = self.binned.n_bins(feature_idx);
            if n_bins < 2 {
                continue;
            }
            let mut hist = vec![BinStats::default(); n_bins];
            for &r in rows {
                let slot = &mut hist[self.binned.bin(feature_idx, r)];
                slot.grad += self.gradients[r];
                slot.hess += self.hessians[r];
                slot.count += 1;
            }

            let mut left = BinStats::default();
            for (bin, stats) in hist.iter().enumerate().take(n_bins - 1) {
                left.grad += stats.grad;
                left.hess += stats.hess;
                left.count += stats.count;
                let right_count = rows.len() - left.count;
                let (gr, hr) = (g - left.grad, h - left.hess);

                if left.count == 0
                    || right_count == 0
                    || left.hess < self.config.min_child_weight
                    || hr < self.config.min_child_weight
                {
                    continue;
                }

                let gain = 0.5 * (self.score(left.grad, left.hess) + self.score(gr, hr) - parent_score)
                    - self.config.gamma;
                if !(gain > 0.0) {
                    continue;
                }

                let candidate = SplitCandidate {
                    feature_idx,
                    bin,
                    gain,
                    tie_breaker: SplitTieBreaker::new(feature_idx, bin),
                };
                best = match best {
                    None => Some(candidate),
                    Some(current) => {
                        if gain > current.gain
                            || (gain == current.gain && candidate.tie_breaker < current.tie_breaker)
                        {
                            Some(candidate)
                        } else {
                            Some(current)
                        }
                    }
                };
            }
        }
        best
    }

    fn soft_threshold(&self, g: f64) -> f64 {
        let alpha = self.config.reg_alpha;
        if g > alpha {
            g - alpha
        } else if g < -alpha {
            g + alpha
        } else {
            0.0
        }
    }

    fn score(&self, g: f64, h: f64) -> f64 {
        let t = self.soft_threshold(g);
        t * t / (h + self.config.reg_lambda)
    }

    fn leaf_weight(&self, g: f64, h: f64) -> f64 {
        let denom = h + self.config.reg_lambda;
        if denom <= 0.0 {
            return 0.0;
        }
        -self.soft_threshold(g) / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TreeConfig {
        TreeConfig {
            max_depth: 3,
            reg_lambda: 0.0,
            reg_alpha: 0.0,
            gamma: 0.0,
            min_child_weight: 1.0,
        }
    }

    #[test]
    fn test_single_split_recovers_step_function() {
        // target = 0 for x <= 4, 10 for x > 4; prediction starts at 0
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let targets: Vec<f64> = (0..10).map(|i| if i <= 4 { 0.0 } else { 10.0 }).collect();
        let gradients: Vec<f64> = targets.iter().map(|y| 0.0 - y).collect();
        let hessians = vec![1.0; 10];
        let binned = BinnedMatrix::from_rows(&rows, 256);
        let features = [0usize];
        let mut cfg = config();
        cfg.max_depth = 1;

        let tree = CartBuilder::new(cfg, &binned, &gradients, &hessians, &features)
            .build(&(0..10).collect::<Vec<_>>(), 1.0);

        assert_eq!(tree.nodes.len(), 3);
        assert_eq!(tree.nodes[0].threshold, 4.0);
        assert_eq!(tree.evaluate(&[2.0]), 0.0);
        assert_eq!(tree.evaluate(&[7.0]), 10.0);
        assert!(tree.validate(1).is_ok());
    }

    #[test]
    fn test_leaf_weight_with_regularization() {
        let rows = vec![vec![0.0]; 4];
        let gradients = vec![-2.0; 4];
        let hessians = vec![1.0; 4];
        let binned = BinnedMatrix::from_rows(&rows, 256);
        let features = [0usize];
        let mut cfg = config();
        cfg.reg_lambda = 4.0;
        cfg.reg_alpha = 2.0;

        let tree = CartBuilder::new(cfg, &binned, &gradients, &hessians, &features)
            .build(&[0, 1, 2, 3], 1.0);
        // G = -8, T(G) = -6, H + lambda = 8
        assert_eq!(tree.nodes.len(), 1);
        assert_eq!(tree.nodes[0].leaf, Some(0.75));
    }

    #[test]
    fn test_gamma_prunes_weak_splits() {
        let rows: Vec<Vec<f64>> = (0..4).map(|i| vec![i as f64]).collect();
        let gradients = vec![-1.0, -1.0, -1.1, -1.1];
        let hessians = vec![1.0; 4];
        let binned = BinnedMatrix::from_rows(&rows, 256);
        let features = [0usize];
        let mut cfg = config();
        cfg.gamma = 1.0;

        let tree = CartBuilder::new(cfg, &binned, &gradients, &hessians, &features)
            .build(&[0, 1, 2, 3], 1.0);
        assert_eq!(tree.nodes.len(), 1);
    }

    #[test]
    fn test_min_child_weight_blocks_small_children() {
        let rows: Vec<Vec<f64>> = (0..4).map(|i| vec![i as f64]).collect();
        let gradients = vec![-10.0, 0.0, 0.0, 0.0];
        let hessians = vec![1.0; 4];
        let binned = BinnedMatrix::from_rows(&rows, 256);
        let features = [0usize];
        let mut cfg = config();
        cfg.min_child_weight = 3.0;

        let tree = CartBuilder::new(cfg, &binned, &gradients, &hessians, &features)
            .build(&[0, 1, 2, 3], 1.0);
        assert_eq!(tree.nodes.len(), 1);
    }
}
