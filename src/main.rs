//! SmartCoach - synthesize an exercise window, classify it and score it
//!
//! Usage:
//!   smartcoach --exercise squat --duration 10 --reps 10
//!   smartcoach --exercise plank --duration 30 --fitness advanced --compact
//!   smartcoach --exercise pushup --model models/best_model.json --no-gyro
//!
//! Configuration is read from `$SMARTCOACH_CONFIG`, then `./smartcoach.toml`,
//! unless `--config` names a file explicitly.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

use smartcoach::config::CoachConfig;
use smartcoach::synthesis::{SignalSynthesizer, SynthesisParams};
use smartcoach::{
    AnalysisResult, ClassificationResult, ClassifierService, ExerciseId, FitnessLevel, Gender,
    ModelInfo, MovementAnalyzer, UserProfile,
};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "smartcoach")]
#[command(about = "Synthesize, classify and score one exercise window")]
#[command(version)]
struct CliArgs {
    /// Exercise id or alias (e.g. squat, "bicep curl", bench_press)
    #[arg(short, long, default_value = "squat")]
    exercise: String,

    /// Window duration in seconds
    #[arg(short, long, default_value_t = 10.0)]
    duration: f64,

    /// Repetitions (derived from the exercise tempo when omitted)
    #[arg(short, long)]
    reps: Option<u32>,

    /// Fatigue level 0.0-1.0
    #[arg(long, default_value_t = 0.0)]
    fatigue: f64,

    /// Form quality 0.0-1.0
    #[arg(long, default_value_t = 1.0)]
    form: f64,

    /// Emit accelerometer channels only
    #[arg(long)]
    no_gyro: bool,

    /// Random seed for reproducible windows
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, value_enum, default_value_t = Fitness::Intermediate)]
    fitness: Fitness,

    #[arg(long, value_enum, default_value_t = Sex::Male)]
    gender: Sex,

    #[arg(long, default_value_t = 25, value_parser = clap::value_parser!(u32).range(10..=100))]
    age: u32,

    #[arg(long, default_value_t = 175.0)]
    height_cm: f64,

    #[arg(long, default_value_t = 70.0)]
    weight_kg: f64,

    /// Configuration file (TOML)
    #[arg(short, long, env = "SMARTCOACH_CONFIG")]
    config: Option<PathBuf>,

    /// Model artifact, overrides `classifier.model_path`
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Single-line JSON output
    #[arg(long)]
    compact: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Fitness {
    Beginner,
    Intermediate,
    Advanced,
}

impl From<Fitness> for FitnessLevel {
    fn from(value: Fitness) -> Self {
        match value {
            Fitness::Beginner => Self::Beginner,
            Fitness::Intermediate => Self::Intermediate,
            Fitness::Advanced => Self::Advanced,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Sex {
    Male,
    Female,
}

impl From<Sex> for Gender {
    fn from(value: Sex) -> Self {
        match value {
            Sex::Male => Self::Male,
            Sex::Female => Self::Female,
        }
    }
}

// ============================================================================
// Report
// ============================================================================

#[derive(Debug, Serialize)]
struct Report {
    exercise: ExerciseId,
    profile: UserProfile,
    samples: usize,
    channels: usize,
    sampling_rate: f64,
    classification: ClassificationResult,
    analysis: AnalysisResult,
    model: ModelInfo,
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
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();

    let mut config = match &args.config {
        Some(path) => CoachConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => CoachConfig::load(),
    };
    if let Some(model) = &args.model {
        config.classifier.model_path.clone_from(model);
    }

    let exercise = ExerciseId::resolve(&args.exercise)?;
    let profile = UserProfile::new(
        args.height_cm,
        args.weight_kg,
        args.fitness.into(),
        args.age,
        args.gender.into(),
    );

    let mut params = SynthesisParams::new(args.duration)
        .with_fatigue(args.fatigue)
        .with_form_quality(args.form);
    if let Some(reps) = args.reps {
        params = params.with_reps(reps);
    }
    if args.no_gyro {
        params = params.accelerometer_only();
    }

    let mut synthesizer = match args.seed {
        Some(seed) => SignalSynthesizer::with_seed(config.synthesis.clone(), seed),
        None => SignalSynthesizer::new(config.synthesis.clone()),
    };
    let signal = synthesizer
        .synthesize_exercise(exercise, &profile, &params)
        .with_context(|| format!("Failed to synthesize a {exercise} window"))?;
    info!(
        exercise = %exercise,
        samples = signal.len(),
        channels = signal.channel_count(),
        "Synthesized window"
    );

    let classifier = ClassifierService::from_config(&config.classifier);
    let classification = classifier
        .predict(&signal)
        .context("Classification failed")?;

    let analysis = MovementAnalyzer::new(config.analyzer.clone()).analyze(&signal, exercise);
    info!(
        predicted = %classification.label,
        confidence = classification.confidence,
        repetitions = analysis.repetitions,
        score = analysis.score,
        "Window processed"
    );

    let report = Report {
        exercise,
        profile,
        samples: signal.len(),
        channels: signal.channel_count(),
        sampling_rate: signal.sampling_rate(),
        classification,
        analysis,
        model: classifier.model_info(),
    };

    let json = if args.compact {
        serde_json::to_string(&report)
    } else {
        serde_json::to_string_pretty(&report)
    }
    .context("Failed to serialize report")?;
    println!("{json}");

    Ok(())
}
