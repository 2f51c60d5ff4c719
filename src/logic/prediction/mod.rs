//! Prediction Module - Yield Inference with Train-on-Miss
//!
//! `predict` resolves a (family, crop type) model from the registry. On a
//! cache miss the crop's rows are sliced, trained, persisted and the fresh
//! model answers the request. The next call for the same key is a hit.


use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::logic::dataset::Dataset;
use crate::logic::error::{CoreError, CoreResult};
use crate::logic::model::{ModelFamily, Regressor, TrainedModel};
use crate::logic::registry::ModelRegistry;
use crate::logic::trainer::Trainer;

// ============================================================================
// TYPES
// ============================================================================

/// Where a prediction's model came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionSource {
    CacheHit,
    TrainedOnMiss,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub value: f64,
    pub source: PredictionSource,
    pub elapsed: Duration,
}

/// Snapshot of service counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PredictionStats {
    pub cache_hits: u64,
    pub trained_on_miss: u64,
    pub average_latency_ms: f64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    total_latency_us: AtomicU64,
}

// ============================================================================
// SERVICE
// ============================================================================

/// Cheap to clone; clones share the dataset, registry and counters
#[derive(Clone)]
pub struct PredictionService {
    dataset: Arc<Dataset>,
    registry: Arc<ModelRegistry>,
    trainer: Trainer,
    counters: Arc<Counters>,
}

impl PredictionService {
    pub fn new(dataset: Arc<Dataset>, registry: Arc<ModelRegistry>) -> Self {
        Self {
            dataset,
            registry,
            trainer: Trainer::new(),
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn dataset(&self) -> &Arc<Dataset> {
        &self.dataset
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// Predicted yield for one (rainfall, temperature, pH) input
    pub fn predict(
        &self,
        family: ModelFamily,
        crop_type: &str,
        rainfall: f64,
        temperature: f64,
        ph: f64,
    ) -> CoreResult<f64> {
        self.predict_detailed(family, crop_type, rainfall, temperature, ph)
            .map(|p| p.value)
    }

    pub fn predict_detailed(
        &self,
        family: ModelFamily,
        crop_type: &str,
        rainfall: f64,
        temperature: f64,
        ph: f64,
    ) -> CoreResult<Prediction> {
        let start = Instant::now();

        if !self.dataset.contains_crop(crop_type) {
            return Err(CoreError::UnknownCropType(crop_type.to_string()));
        }

        let (model, source) = self.resolve(family, crop_type)?;
        let value = model.predict_one([rainfall, temperature, ph]);
        let elapsed = start.elapsed();

        match source {
            PredictionSource::CacheHit => self.counters.hits.fetch_add(1, Ordering::Relaxed),
            PredictionSource::TrainedOnMiss => self.counters.misses.fetch_add(1, Ordering::Relaxed),
        };
        self.counters
            .total_latency_us
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);

        Ok(Prediction { value, source, elapsed })
    }

    /// Run `predict_detailed` on a worker thread
    pub fn spawn_predict(
        &self,
        family: ModelFamily,
        crop_type: &str,
        rainfall: f64,
        temperature: f64,
        ph: f64,
    ) -> PendingPrediction {
        let service = self.clone();
        let crop = crop_type.to_string();
        let handle = thread::Builder::new()
            .name(format!("predict-{}", family.as_str()))
            .spawn(move || service.predict_detailed(family, &crop, rainfall, temperature, ph));

        PendingPrediction { handle }
    }

    pub fn stats(&self) -> PredictionStats {
        let hits = self.counters.hits.load(Ordering::Relaxed);
        let misses = self.counters.misses.load(Ordering::Relaxed);
        let total_us = self.counters.total_latency_us.load(Ordering::Relaxed);
        let calls = hits + misses;

        PredictionStats {
            cache_hits: hits,
            trained_on_miss: misses,
            average_latency_ms: if calls == 0 {
                0.0
            } else {
                total_us as f64 / calls as f64 / 1000.0
            },
        }
    }

    fn resolve(&self, family: ModelFamily, crop_type: &str) -> CoreResult<(TrainedModel, PredictionSource)> {
        if self.registry.exists(family, crop_type) {
            match self.registry.load(family, crop_type) {
                Ok(model) => {
                    log::debug!("Cache hit: {} / '{}'", family, crop_type);
                    return Ok((model, PredictionSource::CacheHit));
                }
                // Removed between exists and load
                Err(e) if e.is_not_found() => {
                    log::warn!("Artifact {} / '{}' vanished before load, retraining", family, crop_type);
                }
                Err(e) => return Err(e),
            }
        }

        let slice = self.dataset.slice(crop_type);
        let model = self.trainer.train(family, &slice)?;
        self.registry.save(family, crop_type, &model, slice.len())?;
        Ok((model, PredictionSource::TrainedOnMiss))
    }
}

// ============================================================================
// ASYNC HANDLE
// ============================================================================

/// Result of `spawn_predict`
pub struct PendingPrediction {
    handle: std::io::Result<JoinHandle<CoreResult<Prediction>>>,
}

impl PendingPrediction {
    pub fn is_finished(&self) -> bool {
        match &self.handle {
            Ok(handle) => handle.is_finished(),
            Err(_) => true,
        }
    }

    /// Block until the worker returns
    pub fn wait(self) -> CoreResult<Prediction> {
        let handle = self
            .handle
            .map_err(|e| CoreError::Training(format!("Failed to spawn prediction worker: {}", e)))?;
        handle
            .join()
            .map_err(|_| CoreError::Training("Prediction worker panicked".to_string()))?
    }
}
