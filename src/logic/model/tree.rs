//! CART regression tree (squared-error splits).
//!
//! Used directly by the decision-tree families and as the base learner for
//! the forest and boosting ensembles.

use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::logic::error::{CoreError, CoreResult};
use super::family::TreeParams;

/// Minimum SSE reduction for a split to count
const MIN_GAIN: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        value: f64,
        n_samples: usize,
    },
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    root: TreeNode,
    params: TreeParams,
    /// L2 shrinkage on leaf values: value = sum / (n + l2). 0 for plain CART.
    l2_leaf: f64,
    n_features: usize,
}

/// Running sums over one side of a candidate split
#[derive(Clone, Copy, Default)]
struct SideStats {
    count: usize,
    sum: f64,
    sq_sum: f64,
}

impl SideStats {
    fn add(&mut self, y: f64) {
        self.count += 1;
        self.sum += y;
        self.sq_sum += y * y;
    }

    fn sse(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        (self.sq_sum - self.sum * self.sum / self.count as f64).max(0.0)
    }
}

struct Builder<'a> {
    x: &'a Array2<f64>,
    y: &'a Array1<f64>,
    params: TreeParams,
    l2_leaf: f64,
}

impl RegressionTree {
    /// Fit a plain CART regressor
    pub fn fit(x: &Array2<f64>, y: &Array1<f64>, params: TreeParams) -> CoreResult<Self> {
        Self::fit_with_l2(x, y, params, 0.0)
    }

    /// Fit with L2-shrunk leaves (boosting base learner)
    pub fn fit_with_l2(
        x: &Array2<f64>,
        y: &Array1<f64>,
        params: TreeParams,
        l2_leaf: f64,
    ) -> CoreResult<Self> {
        if x.nrows() != y.len() {
            return Err(CoreError::Training(format!(
                "Shape mismatch: {} feature rows, {} targets",
                x.nrows(),
                y.len()
            )));
        }
        if y.is_empty() {
            return Err(CoreError::Training("Cannot fit a tree on zero rows".to_string()));
        }
        if !x.iter().chain(y.iter()).all(|v| v.is_finite()) {
            return Err(CoreError::Training("Non-finite value in training data".to_string()));
        }

        let builder = Builder { x, y, params, l2_leaf };
        let mut indices: Vec<usize> = (0..y.len()).collect();
        let root = builder.build(&mut indices, 0);

        Ok(Self {
            root,
            params,
            l2_leaf,
            n_features: x.ncols(),
        })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Predict one sample
    pub fn predict_row(&self, sample: ArrayView1<f64>) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                TreeNode::Leaf { value, .. } => return *value,
                TreeNode::Split { feature_idx, threshold, left, right, .. } => {
                    node = if sample[*feature_idx] <= *threshold { left } else { right };
                }
            }
        }
    }

    /// Predict every row of `x`
    pub fn predict(&self, x: &Array2<f64>) -> Array1<f64> {
        x.rows().into_iter().map(|row| self.predict_row(row)).collect()
    }

    pub fn depth(&self) -> usize {
        fn node_depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => 1 + node_depth(left).max(node_depth(right)),
            }
        }
        node_depth(&self.root)
    }

    pub fn n_leaves(&self) -> usize {
        fn count(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => count(left) + count(right),
            }
        }
        count(&self.root)
    }
}

/// Split point between two distinct sorted values. Falls back to `low`
/// when the midpoint rounds up to `high` (adjacent floats) or overflows.
fn midpoint(low: f64, high: f64) -> f64 {
    let mid = low / 2.0 + high / 2.0;
    if mid.is_finite() && mid >= low && mid < high {
        mid
    } else {
        low
    }
}

impl<'a> Builder<'a> {
    fn build(&self, indices: &mut [usize], depth: usize) -> TreeNode {
        let n_samples = indices.len();
        let mut stats = SideStats::default();
        for &i in indices.iter() {
            stats.add(self.y[i]);
        }

        let should_stop = n_samples < self.params.min_samples_split
            || n_samples < 2 * self.params.min_samples_leaf
            || self.params.max_depth.map_or(false, |d| depth >= d)
            || stats.sse() <= MIN_GAIN;

        if should_stop {
            return self.leaf(&stats);
        }

        let Some((feature_idx, threshold)) = self.find_best_split(indices, &stats) else {
            return self.leaf(&stats);
        };

        // Partition in place: left side first
        let mut split_at = 0;
        for pos in 0..n_samples {
            if self.x[[indices[pos], feature_idx]] <= threshold {
                indices.swap(pos, split_at);
                split_at += 1;
            }
        }

        // Threshold failed to separate the rows
        if split_at == 0 || split_at == n_samples {
            return self.leaf(&stats);
        }

        let (left_idx, right_idx) = indices.split_at_mut(split_at);
        let left = Box::new(self.build(left_idx, depth + 1));
        let right = Box::new(self.build(right_idx, depth + 1));

        TreeNode::Split {
            feature_idx,
            threshold,
            left,
            right,
            n_samples,
        }
    }

    fn leaf(&self, stats: &SideStats) -> TreeNode {
        let denom = stats.count as f64 + self.l2_leaf;
        let value = if denom > 0.0 { stats.sum / denom } else { 0.0 };
        TreeNode::Leaf { value, n_samples: stats.count }
    }

    /// Best (feature, threshold) by SSE reduction. Earlier features win ties.
    fn find_best_split(&self, indices: &[usize], total: &SideStats) -> Option<(usize, f64)> {
        let n = indices.len();
        let min_leaf = self.params.min_samples_leaf.max(1);
        let parent_sse = total.sse();

        let mut best: Option<(usize, f64, f64)> = None;
        let mut order: Vec<usize> = indices.to_vec();

        for feature_idx in 0..self.x.ncols() {
            order.sort_by(|&a, &b| {
                self.x[[a, feature_idx]]
                    .partial_cmp(&self.x[[b, feature_idx]])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            let mut left = SideStats::default();
            for pos in 0..n - 1 {
                left.add(self.y[order[pos]]);

                let here = self.x[[order[pos], feature_idx]];
                let next = self.x[[order[pos + 1], feature_idx]];
                if here >= next {
                    continue;
                }
                if left.count < min_leaf || n - left.count < min_leaf {
                    continue;
                }

                let right = SideStats {
                    count: total.count - left.count,
                    sum: total.sum - left.sum,
                    sq_sum: total.sq_sum - left.sq_sum,
                };
                let gain = parent_sse - left.sse() - right.sse();

                if gain > MIN_GAIN && best.map_or(true, |(_, _, g)| gain > g) {
                    best = Some((feature_idx, midpoint(here, next), gain));
                }
            }
        }

        best.map(|(feature_idx, threshold, _)| (feature_idx, threshold))
    }
}
