//! Train the exercise classifier on a synthetic dataset
//!
//! Generates labelled windows across the reference profiles, fits every
//! candidate model, and saves the most accurate one as the model artifact.
//!
//! # Usage
//! ```bash
//! ./train-model --windows 200 --seed 42
//! ./train-model --no-gyro --output models/acc_only.json
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

use smartcoach::classifier::save_artifact;
use smartcoach::classifier::training::ModelTrainer;
use smartcoach::config::CoachConfig;
use smartcoach::types::ExerciseId;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "train-model")]
#[command(about = "Train and save the SmartCoach exercise classifier")]
#[command(version)]
struct Args {
    /// Windows generated per exercise (overrides `training.windows_per_exercise`)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(2..=10_000))]
    windows: Option<u32>,

    /// Dataset and split seed (overrides `training.seed`)
    #[arg(long)]
    seed: Option<u64>,

    /// Comma-separated exercise ids to train on (default: configured set)
    #[arg(short, long, value_delimiter = ',')]
    exercises: Vec<String>,

    /// Train on accelerometer channels only
    #[arg(long)]
    no_gyro: bool,

    /// Artifact destination (overrides `classifier.model_path`)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Configuration file (TOML)
    #[arg(short, long, env = "SMARTCOACH_CONFIG")]
    config: Option<PathBuf>,
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => CoachConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => CoachConfig::load(),
    };

    let mut training = config.training.clone();
    if let Some(windows) = args.windows {
        training.windows_per_exercise = windows as usize;
    }
    if let Some(seed) = args.seed {
        training.seed = seed;
    }
    if !args.exercises.is_empty() {
        training.exercises = args
            .exercises
            .iter()
            .map(|raw| ExerciseId::resolve(raw.trim()))
            .collect::<Result<Vec<_>, _>>()?;
    }
    if args.no_gyro {
        training.include_gyro = false;
    }
    let output = args.output.unwrap_or_else(|| config.classifier.model_path.clone());

    info!(
        exercises = training.exercises.len(),
        windows_per_exercise = training.windows_per_exercise,
        seed = training.seed,
        include_gyro = training.include_gyro,
        "Training exercise classifier"
    );

    let started = Instant::now();
    let outcome = ModelTrainer::new(training)
        .train_synthetic(&config.synthesis)
        .context("Training failed")?;

    info!(
        train = outcome.train_size,
        test = outcome.test_size,
        elapsed_s = started.elapsed().as_secs_f64(),
        "Training complete"
    );
    for candidate in &outcome.candidates {
        info!(
            "  {:<22} accuracy {:.4}  weighted F1 {:.4}",
            candidate.model_name, candidate.accuracy, candidate.f1_weighted
        );
    }

    save_artifact(&outcome.artifact, &output)
        .with_context(|| format!("Failed to save model artifact to {}", output.display()))?;
    info!(
        model = %outcome.artifact.model_name,
        accuracy = outcome.artifact.accuracy,
        features = outcome.artifact.feature_names.len(),
        path = %output.display(),
        "Best model saved"
    );

    Ok(())
}
