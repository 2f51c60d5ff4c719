//! Fitted model wrapper served by the registry and prediction service.

use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::logic::dataset::FEATURE_COUNT;
use super::boosting::GradientBoostedRegressor;
use super::forest::RandomForestRegressor;
use super::tree::RegressionTree;

// ============================================================================
// REGRESSOR TRAIT
// ============================================================================

/// Common inference surface for fitted models
pub trait Regressor {
    fn predict_row(&self, sample: ArrayView1<f64>) -> f64;

    fn predict(&self, x: &Array2<f64>) -> Array1<f64> {
        x.rows().into_iter().map(|row| self.predict_row(row)).collect()
    }

    /// Predict a single feature vector in canonical column order
    fn predict_one(&self, features: [f64; FEATURE_COUNT]) -> f64 {
        self.predict_row(ArrayView1::from(&features[..]))
    }
}

// ============================================================================
// TRAINED MODEL
// ============================================================================

/// Any fitted model produced by the trainer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "params")]
pub enum TrainedModel {
    Tree(RegressionTree),
    Forest(RandomForestRegressor),
    Boosted(GradientBoostedRegressor),
}

impl TrainedModel {
    pub fn kind(&self) -> &'static str {
        match self {
            TrainedModel::Tree(_) => "tree",
            TrainedModel::Forest(_) => "forest",
            TrainedModel::Boosted(_) => "boosted",
        }
    }
}

impl Regressor for TrainedModel {
    fn predict_row(&self, sample: ArrayView1<f64>) -> f64 {
        match self {
            TrainedModel::Tree(m) => m.predict_row(sample),
            TrainedModel::Forest(m) => m.predict_row(sample),
            TrainedModel::Boosted(m) => m.predict_row(sample),
        }
    }
}
