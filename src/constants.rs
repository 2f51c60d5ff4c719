//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.
//! Environment variables override these; see `logic::config` for the full
//! resolution order (defaults -> config file -> environment).

use std::path::PathBuf;

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name (also the folder under the platform data dir)
pub const APP_NAME: &str = "crop-yield";

/// Default dataset file, relative to the working directory
pub const DEFAULT_DATASET_FILE: &str = "product_regressiondb.csv";

/// Default settings file, relative to the working directory
pub const DEFAULT_CONFIG_FILE: &str = "AppData/config.json";

/// Folder name for persisted model artifacts
pub const MODELS_FOLDER: &str = "models";

/// Default log filter
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable names
pub const ENV_DATASET: &str = "CROP_YIELD_DATASET";
pub const ENV_MODEL_DIR: &str = "CROP_YIELD_MODEL_DIR";
pub const ENV_LOG: &str = "CROP_YIELD_LOG";
pub const ENV_CONFIG: &str = "CROP_YIELD_CONFIG";

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Default model directory: `<data_local_dir>/crop-yield/models`
pub fn default_model_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
        .join(MODELS_FOLDER)
}

/// Get config file path from environment or use default
pub fn get_config_path() -> PathBuf {
    std::env::var(ENV_CONFIG)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// Get dataset override from environment
pub fn get_dataset_override() -> Option<PathBuf> {
    std::env::var(ENV_DATASET)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
}

/// Get model directory override from environment
pub fn get_model_dir_override() -> Option<PathBuf> {
    std::env::var(ENV_MODEL_DIR)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
}

/// Get log level override from environment
pub fn get_log_override() -> Option<String> {
    std::env::var(ENV_LOG)
        .ok()
        .filter(|s| !s.trim().is_empty())
}
