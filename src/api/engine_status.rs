use serde::{Deserialize, Serialize};

use crate::logic::batch::{JobReport, JobState};
use crate::logic::prediction::PredictionStats;

#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub version: String,
    pub dataset: DatasetStatus,
    pub models: ModelStatus,
    pub training: TrainingStatus,
    pub prediction: PredictionStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetStatus {
    pub path: String,
    pub total_rows: usize,
    pub crop_types: usize,
    /// (crop type, row count), first-seen order
    pub crops: Vec<(String, usize)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelStatus {
    pub model_dir: String,
    pub artifact_count: usize,
    pub total_size_kb: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrainingStatus {
    pub state: JobState,
    pub last_report: Option<JobReport>,
}
