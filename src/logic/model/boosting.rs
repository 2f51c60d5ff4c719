//! Gradient-boosted regression trees (squared error).
//!
//! Starts from the target mean and fits each round's tree to the current
//! residuals; leaf values carry L2 shrinkage (`reg_lambda`) and every tree's
//! output is scaled by the learning rate.

use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::logic::error::{CoreError, CoreResult};
use super::family::TreeParams;
use super::tree::RegressionTree;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedRegressor {
    base_score: f64,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
}

impl GradientBoostedRegressor {
    pub fn fit(
        x: &Array2<f64>,
        y: &Array1<f64>,
        n_estimators: usize,
        max_depth: usize,
        learning_rate: f64,
        reg_lambda: f64,
    ) -> CoreResult<Self> {
        if x.nrows() != y.len() || y.is_empty() {
            return Err(CoreError::Training(format!(
                "Cannot fit boosting on {} feature rows / {} targets",
                x.nrows(),
                y.len()
            )));
        }
        if !(learning_rate > 0.0) {
            return Err(CoreError::Training(format!("Invalid learning rate: {}", learning_rate)));
        }

        let base_score = y.mean().unwrap_or(0.0);
        let mut predictions = Array1::from_elem(y.len(), base_score);
        let params = TreeParams {
            max_depth: Some(max_depth),
            ..TreeParams::default()
        };

        let mut trees = Vec::with_capacity(n_estimators);
        for _ in 0..n_estimators {
            let residuals = y - &predictions;
            let tree = RegressionTree::fit_with_l2(x, &residuals, params, reg_lambda)?;

            let update = tree.predict(x);
            predictions.scaled_add(learning_rate, &update);
            trees.push(tree);
        }

        Ok(Self {
            base_score,
            learning_rate,
            trees,
        })
    }

    pub fn n_rounds(&self) -> usize {
        self.trees.len()
    }

    pub fn predict_row(&self, sample: ArrayView1<f64>) -> f64 {
        self.trees
            .iter()
            .fold(self.base_score, |acc, tree| acc + self.learning_rate * tree.predict_row(sample))
    }

    pub fn predict(&self, x: &Array2<f64>) -> Array1<f64> {
        x.rows().into_iter().map(|row| self.predict_row(row)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quadratic_data(n: usize) -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((n, 3), |(i, j)| i as f64 + j as f64 * 0.5);
        let y = Array1::from_shape_fn(n, |i| (i as f64 - 20.0).powi(2) / 10.0);
        (x, y)
    }

    #[test]
    fn test_boosting_reduces_error() {
        let (x, y) = quadratic_data(50);
        let model = GradientBoostedRegressor::fit(&x, &y, 30, 3, 0.3, 1.0).unwrap();
        assert_eq!(model.n_rounds(), 30);

        let preds = model.predict(&x);
        let mse = (&preds - &y).mapv(|d| d * d).mean().unwrap();
        let var = y.var(0.0);
        assert!(mse < var, "MSE ({}) should be less than variance ({})", mse, var);
    }

    #[test]
    fn test_zero_rounds_predicts_mean() {
        let (x, y) = quadratic_data(10);
        let model = GradientBoostedRegressor::fit(&x, &y, 0, 3, 0.1, 1.0).unwrap();
        let mean = y.mean().unwrap();
        assert!((model.predict_row(x.row(0)) - mean).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_learning_rate() {
        let (x, y) = quadratic_data(10);
        assert!(GradientBoostedRegressor::fit(&x, &y, 5, 3, 0.0, 1.0).is_err());
    }
}
