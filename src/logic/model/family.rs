//! Model families and their fixed hyperparameter table.
//!
//! Adding a family means one enum variant plus one entry in
//! `ModelFamily::hyperparameters`. Nothing else branches on family names.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Seed shared by every family so fits are reproducible
pub const RANDOM_STATE: u64 = 42;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelFamily {
    RandomForest,
    DecisionTree,
    DecisionTreeOptimized,
    GradientBoosted,
    GradientBoostedOptimized,
}

/// Tree growth limits shared by all tree-based families
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    /// None = grow until leaves are pure or too small
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Hyperparameters {
    DecisionTree {
        tree: TreeParams,
    },
    RandomForest {
        n_estimators: usize,
        bootstrap: bool,
        tree: TreeParams,
        random_state: u64,
    },
    GradientBoosted {
        n_estimators: usize,
        max_depth: usize,
        learning_rate: f64,
        reg_lambda: f64,
        random_state: u64,
    },
}

impl ModelFamily {
    pub const ALL: [ModelFamily; 5] = [
        ModelFamily::RandomForest,
        ModelFamily::DecisionTree,
        ModelFamily::DecisionTreeOptimized,
        ModelFamily::GradientBoosted,
        ModelFamily::GradientBoostedOptimized,
    ];

    pub fn all() -> &'static [ModelFamily] {
        &Self::ALL
    }

    /// Stable identifier used in artifact filenames and on the command layer
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelFamily::RandomForest => "RandomForest",
            ModelFamily::DecisionTree => "DecisionTree",
            ModelFamily::DecisionTreeOptimized => "DecisionTreeOptimized",
            ModelFamily::GradientBoosted => "GradientBoosted",
            ModelFamily::GradientBoostedOptimized => "GradientBoostedOptimized",
        }
    }

    /// Human-readable label for selectors
    pub fn display_name(&self) -> &'static str {
        match self {
            ModelFamily::RandomForest => "Random forest regression",
            ModelFamily::DecisionTree => "CART decision tree regression",
            ModelFamily::DecisionTreeOptimized => "Optimized CART decision tree regression",
            ModelFamily::GradientBoosted => "Gradient-boosted trees regression",
            ModelFamily::GradientBoostedOptimized => "Optimized gradient-boosted trees regression",
        }
    }

    /// The fixed configuration for this family.
    ///
    /// The optimized entries come from an offline particle-swarm search and
    /// must stay exactly as written.
    pub fn hyperparameters(&self) -> Hyperparameters {
        match self {
            ModelFamily::RandomForest => Hyperparameters::RandomForest {
                n_estimators: 100,
                bootstrap: true,
                tree: TreeParams::default(),
                random_state: RANDOM_STATE,
            },
            ModelFamily::DecisionTree => Hyperparameters::DecisionTree {
                tree: TreeParams::default(),
            },
            ModelFamily::DecisionTreeOptimized => Hyperparameters::DecisionTree {
                tree: TreeParams {
                    max_depth: Some(20),
                    min_samples_split: 3,
                    min_samples_leaf: 1,
                },
            },
            ModelFamily::GradientBoosted => Hyperparameters::GradientBoosted {
                n_estimators: 100,
                max_depth: 6,
                learning_rate: 0.3,
                reg_lambda: 1.0,
                random_state: RANDOM_STATE,
            },
            ModelFamily::GradientBoostedOptimized => Hyperparameters::GradientBoosted {
                n_estimators: 200,
                max_depth: 10,
                learning_rate: 0.09713775005616568,
                reg_lambda: 1.0,
                random_state: RANDOM_STATE,
            },
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnknownFamily(pub String);

impl fmt::Display for UnknownFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown model family: '{}'", self.0)
    }
}

impl std::error::Error for UnknownFamily {}

impl FromStr for ModelFamily {
    type Err = UnknownFamily;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let family = match s.trim() {
            "RandomForest" => ModelFamily::RandomForest,
            "DecisionTree" => ModelFamily::DecisionTree,
            "DecisionTreeOptimized" => ModelFamily::DecisionTreeOptimized,
            // XGBoost* are the names older artifact folders used
            "GradientBoosted" | "XGBoost" => ModelFamily::GradientBoosted,
            "GradientBoostedOptimized" | "XGBoostOptimized" => ModelFamily::GradientBoostedOptimized,
            other => return Err(UnknownFamily(other.to_string())),
        };
        Ok(family)
    }
}
