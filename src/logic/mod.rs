//! Logic Module - Business Logic & Engines
//!
//! - `dataset/` - CSV loading, cleaning, per-crop slices
//! - `model/` - model families and the tree / forest / boosting learners
//! - `trainer` - fit one family on one crop
//! - `registry/` - persisted artifacts keyed by (family, crop type)
//! - `prediction/` - inference with train-on-miss
//! - `batch/` - background train-all jobs with progress and cancellation

pub mod config;
pub mod error;

pub mod dataset;
pub mod model;
pub mod trainer;
pub mod registry;
pub mod prediction;
pub mod batch;

pub use error::{CoreError, CoreResult};
