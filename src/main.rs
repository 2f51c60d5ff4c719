//! Crop Yield - Headless shell over the command layer

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crop_yield_core::api::{self, commands::PredictionRequest};
use crop_yield_core::constants;
use crop_yield_core::logic::batch::BatchEvent;
use crop_yield_core::logic::config::AppConfig;

#[derive(Parser)]
#[command(name = "crop-yield")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Per-crop yield models: predict, train, manage")]
struct Cli {
    /// Settings file (default: AppData/config.json or $CROP_YIELD_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Dataset CSV, overrides the settings file
    #[arg(long, global = true)]
    dataset: Option<PathBuf>,

    /// Model storage directory, overrides the settings file
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict yield for one input, training the model on first use
    Predict {
        /// Model family (RandomForest, DecisionTree, DecisionTreeOptimized,
        /// GradientBoosted, GradientBoostedOptimized)
        #[arg(short, long, default_value = "RandomForest")]
        model: String,

        #[arg(short, long)]
        crop: String,

        #[arg(long)]
        rainfall: String,

        #[arg(long)]
        temperature: String,

        #[arg(long)]
        ph: String,
    },

    /// Train one family for every crop type
    TrainAll {
        #[arg(short, long, default_value = "RandomForest")]
        model: String,

        /// Request cancellation after N crop types (takes effect at the next crop boundary)
        #[arg(long)]
        stop_after: Option<usize>,
    },

    /// List stored models
    Models,

    /// Delete every stored model
    Clear,

    /// Print engine status as JSON
    Status,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => AppConfig::load(path),
        None => AppConfig::load_default(),
    };
    let mut config = match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(dataset) = cli.dataset.clone() {
        config.dataset_path = dataset;
    }
    if let Some(dir) = cli.model_dir.clone() {
        config.model_dir = dir;
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.log_level.as_str()))
        .init();

    log::info!("Starting {} v{}", constants::APP_NAME, constants::APP_VERSION);

    if let Err(e) = api::init(config) {
        log::error!("Startup failed: {}", e);
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<(), String> {
    match command {
        Commands::Predict { model, crop, rainfall, temperature, ph } => {
            let response = api::predict_yield(PredictionRequest {
                model_type: model,
                crop_type: crop,
                rainfall,
                temperature,
                ph,
            })?;
            println!(
                "Predicted yield for {} ({}): {}",
                response.crop_type, response.model_type, response.predicted_yield
            );
        }

        Commands::TrainAll { model, stop_after } => {
            let job_id = api::start_training(&model)?;
            println!("Training job {} started", job_id);

            let mut progressed = 0;
            while let Some(event) = api::next_training_event()? {
                match &event.payload {
                    BatchEvent::Progress { crop_type, outcome, .. } => {
                        progressed += 1;
                        println!(
                            "[{:>3}%] {} {:?}",
                            event.payload.percent().unwrap_or(0),
                            crop_type,
                            outcome
                        );
                        if stop_after == Some(progressed) {
                            api::cancel_training()?;
                        }
                    }
                    BatchEvent::Completed { trained, skipped } => {
                        println!("Completed: {} trained, {} skipped", trained, skipped);
                    }
                    BatchEvent::Cancelled { processed } => {
                        println!("Cancelled after {} crop types", processed);
                    }
                    BatchEvent::Failed { crop_type, message } => {
                        return Err(format!("Training failed on '{}': {}", crop_type, message));
                    }
                }
            }
        }

        Commands::Models => {
            let models = api::list_models()?;
            if models.is_empty() {
                println!("No stored models");
            }
            for info in models {
                println!("{:<26} {:<24} {:>8} B", info.family.as_str(), info.crop_type, info.size_bytes);
            }
        }

        Commands::Clear => {
            let removed = api::clear_models()?;
            println!("Removed {} models", removed);
        }

        Commands::Status => {
            let status = api::get_engine_status()?;
            let json = serde_json::to_string_pretty(&status).map_err(|e| e.to_string())?;
            println!("{}", json);
        }
    }
    Ok(())
}
