use super::*;
use crate::logic::dataset::{CropRecord, Dataset};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

/// Commands share process-wide state
static TEST_LOCK: Mutex<()> = Mutex::new(());

fn config(dir: &Path) -> AppConfig {
    AppConfig {
        dataset_path: dir.join("product_regressiondb.csv"),
        model_dir: dir.join("models"),
        log_level: "debug".to_string(),
    }
}

fn install(dir: &Path) {
    let mut rows = Vec::new();
    for i in 0..15 {
        let f = i as f64;
        rows.push(CropRecord::new("Wheat", 90.0 + f * 2.0, 21.0 + f * 0.3, 6.4, 3.0 + f * 0.06));
        rows.push(CropRecord::new("Rice", 190.0 + f * 3.0, 27.0 + f * 0.2, 5.9, 4.0 + f * 0.09));
    }
    let state = AppState::new(config(dir), Dataset::from_records(rows).unwrap());
    init_with_state(state).unwrap();
}

fn request(model_type: &str, crop_type: &str, rainfall: &str) -> PredictionRequest {
    PredictionRequest {
        model_type: model_type.to_string(),
        crop_type: crop_type.to_string(),
        rainfall: rainfall.to_string(),
        temperature: "25.0".to_string(),
        ph: "6.5".to_string(),
    }
}

#[test]
fn test_commands_require_init() {
    let _guard = TEST_LOCK.lock();
    *APP_STATE.write() = None;

    assert_eq!(list_crop_types().unwrap_err(), "Engine not initialized");
    assert!(predict_yield(request("RandomForest", "Wheat", "100")).is_err());
    assert_eq!(list_model_families().len(), 5);
}

#[test]
fn test_init_from_config_loads_csv() {
    let _guard = TEST_LOCK.lock();
    let dir = tempdir().unwrap();
    let config = config(dir.path());
    fs::write(
        &config.dataset_path,
        "Crop,Rainfall,Temperature,Ph,Production\nWheat,100,25,6.5,3.2\nRice,200,28,5.8,4.1\n",
    )
    .unwrap();

    init(config).unwrap();
    assert_eq!(list_crop_types().unwrap(), vec!["Wheat", "Rice"]);
}

#[test]
fn test_init_with_missing_dataset_fails() {
    let _guard = TEST_LOCK.lock();
    let dir = tempdir().unwrap();

    let err = init(config(dir.path())).unwrap_err();
    assert!(err.starts_with("Data load error"), "{}", err);
}

#[test]
fn test_predict_yield_parses_raw_input() {
    let _guard = TEST_LOCK.lock();
    let dir = tempdir().unwrap();
    install(dir.path());

    let first = predict_yield(request("RandomForest", " Wheat ", " 100 ")).unwrap();
    assert_eq!(first.crop_type, "Wheat");
    assert_eq!(first.model_type, "RandomForest");
    assert_eq!(first.source, PredictionSource::TrainedOnMiss);
    assert!(first.predicted_yield.is_finite());

    let second = predict_yield(request("RandomForest", "Wheat", "100.0")).unwrap();
    assert_eq!(second.source, PredictionSource::CacheHit);
    assert_eq!(second.predicted_yield, first.predicted_yield);

    // Legacy family name resolves to the same family
    let boosted = predict_yield(request("XGBoost", "Rice", "210")).unwrap();
    assert_eq!(boosted.model_type, "GradientBoosted");
}

#[test]
fn test_predict_yield_rejects_bad_input() {
    let _guard = TEST_LOCK.lock();
    let dir = tempdir().unwrap();
    install(dir.path());

    let err = predict_yield(request("RandomForest", "Wheat", "lots")).unwrap_err();
    assert_eq!(err, "Invalid input: Rainfall must be a number, got 'lots'");

    let err = predict_yield(request("RandomForest", "Wheat", "NaN")).unwrap_err();
    assert!(err.contains("Rainfall"));

    let err = predict_yield(request("LinearRegression", "Wheat", "100")).unwrap_err();
    assert!(err.contains("Unknown model family"));

    let err = predict_yield(request("RandomForest", "Corn", "100")).unwrap_err();
    assert_eq!(err, "Unknown crop type: 'Corn'");
    assert!(list_models().unwrap().is_empty());
}

#[test]
fn test_training_flow_through_commands() {
    let _guard = TEST_LOCK.lock();
    let dir = tempdir().unwrap();
    install(dir.path());

    let job_id = start_training("DecisionTreeOptimized").unwrap();
    assert!(!job_id.is_empty());

    let mut names = Vec::new();
    while let Some(event) = next_training_event().unwrap() {
        names.push(event.name);
    }
    assert_eq!(names, vec!["training:progress", "training:progress", "training:completed"]);
    assert!(next_training_event().unwrap().is_none());

    let status = get_training_status().unwrap();
    assert_eq!(status.state, crate::logic::batch::JobState::Completed);
    assert_eq!(status.last_report.unwrap().trained, 2);

    assert_eq!(list_models().unwrap().len(), 2);
    assert!(!cancel_training().unwrap());

    let engine = get_engine_status().unwrap();
    assert_eq!(engine.dataset.crop_types, 2);
    assert_eq!(engine.models.artifact_count, 2);
    let json = serde_json::to_value(&engine).unwrap();
    assert_eq!(json["training"]["last_report"]["job_id"], job_id.as_str());

    assert_eq!(clear_models().unwrap(), 2);
    assert!(list_models().unwrap().is_empty());
}

#[test]
fn test_engine_status_counts_predictions() {
    let _guard = TEST_LOCK.lock();
    let dir = tempdir().unwrap();
    install(dir.path());

    predict_yield(request("DecisionTree", "Rice", "200")).unwrap();
    predict_yield(request("DecisionTree", "Rice", "205")).unwrap();

    let status = get_engine_status().unwrap();
    assert_eq!(status.prediction.trained_on_miss, 1);
    assert_eq!(status.prediction.cache_hits, 1);
    assert_eq!(status.dataset.total_rows, 30);
    assert_eq!(
        status.dataset.crops,
        vec![("Wheat".to_string(), 15), ("Rice".to_string(), 15)]
    );
    assert_eq!(status.version, constants::APP_VERSION);

    let json = serde_json::to_value(&status).unwrap();
    assert_eq!(json["training"]["state"], "Idle");
}
