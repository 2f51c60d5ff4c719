//! Trainer - fits one model family on one crop's rows.
//!
//! Persistence is the caller's job (see `registry`).

use std::time::Instant;

use crate::logic::dataset::CropSlice;
use crate::logic::error::{CoreError, CoreResult};
use crate::logic::model::boosting::GradientBoostedRegressor;
use crate::logic::model::forest::RandomForestRegressor;
use crate::logic::model::tree::RegressionTree;
use crate::logic::model::{Hyperparameters, ModelFamily, TrainedModel};

#[derive(Debug, Clone, Copy, Default)]
pub struct Trainer;

impl Trainer {
    pub fn new() -> Self {
        Self
    }

    /// Fit `family` on `slice`. An empty slice is `InsufficientData`.
    pub fn train(&self, family: ModelFamily, slice: &CropSlice) -> CoreResult<TrainedModel> {
        if slice.is_empty() {
            return Err(CoreError::InsufficientData {
                crop_type: slice.crop_type.clone(),
            });
        }

        let start = Instant::now();
        let x = &slice.features;
        let y = &slice.targets;

        let model = match family.hyperparameters() {
            Hyperparameters::DecisionTree { tree } => {
                TrainedModel::Tree(RegressionTree::fit(x, y, tree)?)
            }
            Hyperparameters::RandomForest { n_estimators, bootstrap, tree, random_state } => {
                TrainedModel::Forest(RandomForestRegressor::fit(
                    x, y, n_estimators, bootstrap, tree, random_state,
                )?)
            }
            Hyperparameters::GradientBoosted { n_estimators, max_depth, learning_rate, reg_lambda, .. } => {
                TrainedModel::Boosted(GradientBoostedRegressor::fit(
                    x, y, n_estimators, max_depth, learning_rate, reg_lambda,
                )?)
            }
        };

        log::info!(
            "Trained {} for '{}' on {} rows in {} ms",
            family,
            slice.crop_type,
            slice.len(),
            start.elapsed().as_millis()
        );

        Ok(model)
    }
}
