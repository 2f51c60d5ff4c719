//! Crop Yield Core
//!
//! Per-crop yield model lifecycle: dataset store, model registry, trainer,
//! prediction with train-on-miss and background batch training.

pub mod api;
pub mod constants;
pub mod logic;
