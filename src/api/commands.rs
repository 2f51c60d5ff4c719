//! Commands - API for the GUI / CLI shell
//!
//! Inputs arrive as raw user strings and errors leave as `String` messages,
//! the shape a desktop command bridge expects.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use super::engine_status::{DatasetStatus, EngineStatus, ModelStatus, TrainingStatus};
use super::state::AppState;
use crate::constants;
use crate::logic::batch::{BatchEvent, BatchHandle};
use crate::logic::config::AppConfig;
use crate::logic::model::ModelFamily;
use crate::logic::prediction::PredictionSource;
use crate::logic::registry::ArtifactInfo;

/// Engine state, set by `init`
static APP_STATE: RwLock<Option<Arc<AppState>>> = RwLock::new(None);

/// Handle of the most recently started training job
static TRAINING_HANDLE: Mutex<Option<BatchHandle>> = Mutex::new(None);

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Prediction form, fields as typed by the user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub model_type: String,
    pub crop_type: String,
    pub rainfall: String,
    pub temperature: String,
    pub ph: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictionResponse {
    pub model_type: String,
    pub crop_type: String,
    pub predicted_yield: f64,
    pub source: PredictionSource,
    pub elapsed_ms: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyInfo {
    pub id: String,
    pub display_name: String,
}

/// A batch event with its bridge event name
#[derive(Debug, Clone, Serialize)]
pub struct TrainingEvent {
    pub name: String,
    pub payload: BatchEvent,
}

// ============================================================================
// LIFECYCLE
// ============================================================================

/// Load the dataset and build the engine. Replaces any previous state.
pub fn init(config: AppConfig) -> Result<(), String> {
    let state = AppState::from_config(config).map_err(|e| e.to_string())?;
    init_with_state(state)
}

pub fn init_with_state(state: AppState) -> Result<(), String> {
    if let Some(current) = APP_STATE.read().as_ref() {
        if current.coordinator.is_running() {
            return Err("Cannot re-initialize while training is running".to_string());
        }
    }
    *APP_STATE.write() = Some(Arc::new(state));
    *TRAINING_HANDLE.lock() = None;
    Ok(())
}

fn state() -> Result<Arc<AppState>, String> {
    APP_STATE
        .read()
        .clone()
        .ok_or_else(|| "Engine not initialized".to_string())
}

// ============================================================================
// PREDICTION
// ============================================================================

/// Predict yield, training and caching the model on first use
pub fn predict_yield(request: PredictionRequest) -> Result<PredictionResponse, String> {
    let family = parse_family(&request.model_type)?;
    let rainfall = parse_number("Rainfall", &request.rainfall)?;
    let temperature = parse_number("Temperature", &request.temperature)?;
    let ph = parse_number("Ph", &request.ph)?;
    let crop_type = request.crop_type.trim();

    let state = state()?;
    let prediction = state
        .predictor
        .predict_detailed(family, crop_type, rainfall, temperature, ph)
        .map_err(|e| e.to_string())?;

    Ok(PredictionResponse {
        model_type: family.to_string(),
        crop_type: crop_type.to_string(),
        predicted_yield: prediction.value,
        source: prediction.source,
        elapsed_ms: prediction.elapsed.as_secs_f64() * 1000.0,
    })
}

fn parse_family(raw: &str) -> Result<ModelFamily, String> {
    raw.parse::<ModelFamily>().map_err(|e| e.to_string())
}

fn parse_number(field: &str, raw: &str) -> Result<f64, String> {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(format!("Invalid input: {} must be a number, got '{}'", field, raw.trim())),
    }
}

// ============================================================================
// TRAINING
// ============================================================================

/// Start training `model_type` for every crop type. Returns the job id.
pub fn start_training(model_type: &str) -> Result<String, String> {
    let family = parse_family(model_type)?;
    let state = state()?;

    let handle = state
        .coordinator
        .start(family, Arc::clone(&state.dataset))
        .map_err(|e| e.to_string())?;
    let job_id = handle.job_id.to_string();

    *TRAINING_HANDLE.lock() = Some(handle);
    Ok(job_id)
}

/// Request cancellation. Ok(false) if nothing is running.
pub fn cancel_training() -> Result<bool, String> {
    Ok(state()?.coordinator.cancel())
}

pub fn get_training_status() -> Result<TrainingStatus, String> {
    let state = state()?;
    Ok(TrainingStatus {
        state: state.coordinator.state(),
        last_report: state.coordinator.last_report(),
    })
}

/// Next event of the current job, blocking until one arrives.
/// Ok(None) once the job has finished and its events are drained.
pub fn next_training_event() -> Result<Option<TrainingEvent>, String> {
    let mut slot = TRAINING_HANDLE.lock();
    let Some(handle) = slot.as_mut() else {
        return Ok(None);
    };

    match handle.next_event() {
        Some(event) => Ok(Some(TrainingEvent {
            name: event.name().to_string(),
            payload: event,
        })),
        None => {
            // Channel closed: reap the worker
            if let Some(handle) = slot.take() {
                let final_state = handle.wait();
                log::debug!("Training worker exited in state {:?}", final_state);
            }
            Ok(None)
        }
    }
}

// ============================================================================
// CATALOG
// ============================================================================

pub fn list_crop_types() -> Result<Vec<String>, String> {
    Ok(state()?.dataset.crop_types().to_vec())
}

pub fn list_model_families() -> Vec<FamilyInfo> {
    ModelFamily::all()
        .iter()
        .map(|f| FamilyInfo {
            id: f.as_str().to_string(),
            display_name: f.display_name().to_string(),
        })
        .collect()
}

pub fn list_models() -> Result<Vec<ArtifactInfo>, String> {
    state()?.registry.list().map_err(|e| e.to_string())
}

/// Delete every stored model. Returns the number removed.
pub fn clear_models() -> Result<usize, String> {
    let state = state()?;
    if state.coordinator.is_running() {
        return Err("Cannot clear models while training is running".to_string());
    }
    state.registry.clear().map_err(|e| e.to_string())
}

// ============================================================================
// STATUS
// ============================================================================

pub fn get_engine_status() -> Result<EngineStatus, String> {
    let state = state()?;
    let artifacts = state.registry.list().map_err(|e| e.to_string())?;
    let total_bytes: u64 = artifacts.iter().map(|a| a.size_bytes).sum();
    let summary = state.dataset.summary();

    Ok(EngineStatus {
        version: constants::APP_VERSION.to_string(),
        dataset: DatasetStatus {
            path: state.config.dataset_path.display().to_string(),
            total_rows: summary.total_rows,
            crop_types: summary.crops.len(),
            crops: summary.crops,
        },
        models: ModelStatus {
            model_dir: state.registry.root().display().to_string(),
            artifact_count: artifacts.len(),
            total_size_kb: total_bytes as f64 / 1024.0,
        },
        training: TrainingStatus {
            state: state.coordinator.state(),
            last_report: state.coordinator.last_report(),
        },
        prediction: state.predictor.stats(),
    })
}

#[cfg(test)]
mod tests;
