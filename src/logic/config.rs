//! App Configuration
//!
//! Resolution order: compiled defaults -> optional JSON settings file ->
//! environment variables. The core treats the resulting paths as opaque
//! handles; nothing below reads a process-wide default at use time.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants;
use super::error::{CoreError, CoreResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// CSV with Rainfall, Temperature, Ph, Crop, Production columns
    pub dataset_path: PathBuf,
    /// Directory holding one artifact file per (family, crop) key
    pub model_dir: PathBuf,
    /// env_logger filter, e.g. "info" or "crop_yield_core=debug"
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from(constants::DEFAULT_DATASET_FILE),
            model_dir: constants::default_model_dir(),
            log_level: constants::DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl AppConfig {
    /// Load settings from `path` (missing file -> defaults), then apply
    /// environment overrides.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env();
        Ok(config)
    }

    /// Load using the default/env-selected settings path.
    pub fn load_default() -> CoreResult<Self> {
        Self::load(&constants::get_config_path())
    }

    /// Parse the settings file only. A missing file is not an error.
    pub fn from_file(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            log::debug!("No settings file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let data = fs::read(path)
            .map_err(|e| CoreError::Config(format!("{}: {}", path.display(), e)))?;
        serde_json::from_slice(&data)
            .map_err(|e| CoreError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Apply CROP_YIELD_* environment overrides
    pub fn apply_env(&mut self) {
        if let Some(dataset) = constants::get_dataset_override() {
            self.dataset_path = dataset;
        }
        if let Some(dir) = constants::get_model_dir_override() {
            self.model_dir = dir;
        }
        if let Some(level) = constants::get_log_override() {
            self.log_level = level;
        }
    }

    /// Persist settings (creates the parent directory)
    pub fn save(&self, path: &Path) -> CoreResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| CoreError::Config(format!("{}: {}", parent.display(), e)))?;
            }
        }

        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| CoreError::Config(e.to_string()))?;
        fs::write(path, json)
            .map_err(|e| CoreError::Config(format!("{}: {}", path.display(), e)))?;
        Ok(())
    }
}
