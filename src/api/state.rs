//! Shared engine state behind the command layer.

use std::sync::Arc;

use crate::logic::batch::BatchCoordinator;
use crate::logic::config::AppConfig;
use crate::logic::dataset::Dataset;
use crate::logic::error::CoreResult;
use crate::logic::prediction::PredictionService;
use crate::logic::registry::ModelRegistry;

/// Everything the commands operate on. The dataset is loaded once.
pub struct AppState {
    pub config: AppConfig,
    pub dataset: Arc<Dataset>,
    pub registry: Arc<ModelRegistry>,
    pub predictor: PredictionService,
    pub coordinator: BatchCoordinator,
}

impl AppState {
    /// Load the configured dataset and wire up the services
    pub fn from_config(config: AppConfig) -> CoreResult<Self> {
        let dataset = Dataset::load(&config.dataset_path)?;
        Ok(Self::new(config, dataset))
    }

    /// Wire services around an already loaded dataset
    pub fn new(config: AppConfig, dataset: Dataset) -> Self {
        let dataset = Arc::new(dataset);
        let registry = Arc::new(ModelRegistry::new(config.model_dir.clone()));
        let predictor = PredictionService::new(Arc::clone(&dataset), Arc::clone(&registry));
        let coordinator = BatchCoordinator::new(Arc::clone(&registry));

        log::info!(
            "Engine ready: {} rows, {} crop types, models in {}",
            dataset.len(),
            dataset.crop_types().len(),
            registry.root().display()
        );

        Self {
            config,
            dataset,
            registry,
            predictor,
            coordinator,
        }
    }
}
