//! Dataset Module - Training Data Store
//!
//! Loads the crop production table once at startup, renames columns to
//! canonical feature names, removes duplicate rows and per-crop outliers.
//! The resulting `Dataset` is immutable and shared as `Arc<Dataset>`.

pub mod record;
pub mod loader;
pub mod clean;


use std::collections::HashMap;
use std::path::Path;

use ndarray::{Array1, Array2};
use serde::Serialize;

pub use record::{CropRecord, FEATURE_COUNT, FEATURE_NAMES, SOURCE_COLUMNS};
use crate::logic::error::{CoreError, CoreResult};

/// Cleaned, immutable training table
#[derive(Debug, Clone)]
pub struct Dataset {
    records: Vec<CropRecord>,
    /// Distinct crop types, first-seen order
    crop_types: Vec<String>,
}

/// Rows of one crop type, shaped for model fitting
#[derive(Debug, Clone)]
pub struct CropSlice {
    pub crop_type: String,
    /// n x FEATURE_COUNT, columns in `FEATURE_NAMES` order
    pub features: Array2<f64>,
    pub targets: Array1<f64>,
}

impl CropSlice {
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Per-crop row counts for status screens
#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub total_rows: usize,
    pub crops: Vec<(String, usize)>,
}

impl Dataset {
    /// Load and clean a dataset file
    pub fn load(source: &Path) -> CoreResult<Self> {
        let raw = loader::read_csv(source)?;
        log::info!("Read {} rows from {}", raw.len(), source.display());
        Self::from_records(raw)
    }

    /// Run the cleaning pipeline over in-memory rows
    pub fn from_records(raw: Vec<CropRecord>) -> CoreResult<Self> {
        if raw.is_empty() {
            return Err(CoreError::DataLoad("Dataset contains no rows".to_string()));
        }

        if let Some(pos) = raw
            .iter()
            .position(|r| !r.numeric_columns().iter().all(|v| v.is_finite()))
        {
            return Err(CoreError::DataLoad(format!(
                "Record {} ('{}') holds a non-finite value",
                pos, raw[pos].crop_type
            )));
        }

        let raw_count = raw.len();
        let deduped = clean::dedup(raw);
        let deduped_count = deduped.len();
        let records = clean::remove_outliers(deduped);

        log::info!(
            "Dataset cleaned: {} raw, {} after dedup, {} after outlier removal",
            raw_count, deduped_count, records.len()
        );

        Ok(Self::from_clean(records))
    }

    fn from_clean(records: Vec<CropRecord>) -> Self {
        let mut crop_types: Vec<String> = Vec::new();
        for record in &records {
            if !crop_types.iter().any(|c| c == &record.crop_type) {
                crop_types.push(record.crop_type.clone());
            }
        }
        Self { records, crop_types }
    }

    pub fn records(&self) -> &[CropRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct crop types in first-seen order
    pub fn crop_types(&self) -> &[String] {
        &self.crop_types
    }

    pub fn contains_crop(&self, crop_type: &str) -> bool {
        self.crop_types.iter().any(|c| c == crop_type)
    }

    /// Rows matching one crop type. Empty slice if the crop is absent.
    pub fn slice(&self, crop_type: &str) -> CropSlice {
        let rows: Vec<&CropRecord> = self
            .records
            .iter()
            .filter(|r| r.crop_type == crop_type)
            .collect();

        let mut features = Array2::<f64>::zeros((rows.len(), FEATURE_COUNT));
        for (i, row) in rows.iter().enumerate() {
            for (j, value) in row.features().iter().enumerate() {
                features[[i, j]] = *value;
            }
        }
        let targets = Array1::from_iter(rows.iter().map(|r| r.yield_value));

        CropSlice {
            crop_type: crop_type.to_string(),
            features,
            targets,
        }
    }

    pub fn summary(&self) -> DatasetSummary {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for record in &self.records {
            *counts.entry(record.crop_type.as_str()).or_insert(0) += 1;
        }

        DatasetSummary {
            total_rows: self.records.len(),
            crops: self
                .crop_types
                .iter()
                .map(|c| (c.clone(), counts.get(c.as_str()).copied().unwrap_or(0)))
                .collect(),
        }
    }
}
