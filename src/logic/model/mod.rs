//! Model Module - Regression Families & Fitted Models
//!
//! - `family` - family enum + fixed hyperparameter table
//! - `tree` / `forest` / `boosting` - the learners
//! - `regressor` - `TrainedModel` and the `Regressor` inference trait

pub mod family;
pub mod tree;
pub mod forest;
pub mod boosting;
pub mod regressor;

// Re-export common types
pub use family::{Hyperparameters, ModelFamily, TreeParams, UnknownFamily};
pub use regressor::{Regressor, TrainedModel};
