//! Random forest regressor: bagged CART trees, averaged.

use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::logic::error::{CoreError, CoreResult};
use super::family::TreeParams;
use super::tree::RegressionTree;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    trees: Vec<RegressionTree>,
    bootstrap: bool,
    random_state: u64,
}

impl RandomForestRegressor {
    pub fn fit(
        x: &Array2<f64>,
        y: &Array1<f64>,
        n_estimators: usize,
        bootstrap: bool,
        params: TreeParams,
        random_state: u64,
    ) -> CoreResult<Self> {
        if n_estimators == 0 {
            return Err(CoreError::Training("Forest needs at least one tree".to_string()));
        }
        if x.nrows() != y.len() || y.is_empty() {
            return Err(CoreError::Training(format!(
                "Cannot fit forest on {} feature rows / {} targets",
                x.nrows(),
                y.len()
            )));
        }

        let n_samples = y.len();

        // Each tree owns its seed, so results do not depend on thread scheduling
        let trees = (0..n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let sample: Vec<usize> = if bootstrap {
                    let mut rng = StdRng::seed_from_u64(random_state.wrapping_add(tree_idx as u64));
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
                } else {
                    (0..n_samples).collect()
                };

                let x_boot = x.select(Axis(0), &sample);
                let y_boot = y.select(Axis(0), &sample);
                RegressionTree::fit(&x_boot, &y_boot, params)
            })
            .collect::<CoreResult<Vec<_>>>()?;

        Ok(Self {
            trees,
            bootstrap,
            random_state,
        })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn predict_row(&self, sample: ArrayView1<f64>) -> f64 {
        let total: f64 = self.trees.iter().map(|t| t.predict_row(sample)).sum();
        total / self.trees.len() as f64
    }

    pub fn predict(&self, x: &Array2<f64>) -> Array1<f64> {
        x.rows().into_iter().map(|row| self.predict_row(row)).collect()
    }
}
