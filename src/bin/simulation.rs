//! IMU Exercise Simulation
//!
//! Emits synthetic wrist-sensor data for testing SmartCoach:
//! - a single exercise window for a chosen profile, fatigue and form
//! - a labelled multi-exercise dataset across the reference profiles
//!
//! # Usage
//! ```bash
//! ./simulation --exercise squat --duration 12 --reps 10 --format csv > squat.csv
//! ./simulation --dataset 20 --seed 7 --format csv > dataset.csv
//! ```

use anyhow::{bail, Context, Result};
use clap::Parser;
use rand::prelude::*;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use smartcoach::config::CoachConfig;
use smartcoach::synthesis::{
    generate_dataset, DatasetSpec, LabeledWindow, SetCategory, SignalSynthesizer, SynthesisParams,
};
use smartcoach::types::{supported_ids, ChannelId, ExerciseId, RawSignal, UserProfile};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "imu-simulation")]
#[command(about = "Synthetic IMU exercise data for SmartCoach testing")]
#[command(version = "1.0")]
struct Args {
    /// Exercise id or alias
    #[arg(short, long, default_value = "squat")]
    exercise: String,

    /// Window duration in seconds
    #[arg(short, long, default_value = "10")]
    duration: f64,

    /// Repetitions (derived from the exercise tempo when omitted)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=200))]
    reps: Option<u32>,

    /// Fatigue level 0.0-1.0
    #[arg(long, default_value = "0")]
    fatigue: f64,

    /// Form quality 0.0-1.0
    #[arg(long, default_value = "1")]
    form: f64,

    /// Index into the reference profiles (0-4); random when omitted
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(0..5))]
    participant: Option<u32>,

    /// Accelerometer channels only
    #[arg(long)]
    no_gyro: bool,

    /// Generate a labelled dataset with this many windows per exercise
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=10_000))]
    dataset: Option<u32>,

    /// Output format: json or csv
    #[arg(short, long, default_value = "json")]
    format: String,

    /// Suppress the run summary on stderr (only output sensor data)
    #[arg(short, long)]
    quiet: bool,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Configuration file (TOML)
    #[arg(short, long, env = "SMARTCOACH_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Json,
    Csv,
}

impl OutputFormat {
    fn parse(raw: &str) -> Result<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => bail!("Unsupported output format '{other}' (expected json or csv)"),
        }
    }
}

// ============================================================================
// Output
// ============================================================================

fn log_summary(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("{message}");
    }
}

fn csv_header(channels: &[ChannelId]) -> String {
    let mut columns = vec!["t".to_string()];
    columns.extend(channels.iter().map(|c| c.as_str().to_string()));
    columns.join(",")
}

fn write_signal_rows(out: &mut impl Write, prefix: &str, signal: &RawSignal) -> io::Result<()> {
    let channels: Vec<&[f64]> = signal.channels().map(|(_, samples)| samples).collect();
    for (i, t) in signal.timestamps().iter().enumerate() {
        write!(out, "{prefix}{t:.4}")?;
        for samples in &channels {
            write!(out, ",{:.6}", samples[i])?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn write_window(out: &mut impl Write, signal: &RawSignal, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer(&mut *out, signal).context("Failed to serialize window")?;
            writeln!(out)?;
        }
        OutputFormat::Csv => {
            writeln!(out, "{}", csv_header(&signal.channel_ids()))?;
            write_signal_rows(out, "", signal)?;
        }
    }
    Ok(())
}

fn write_dataset(out: &mut impl Write, windows: &[LabeledWindow], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            // One labelled window per line
            for window in windows {
                serde_json::to_writer(&mut *out, window).context("Failed to serialize window")?;
                writeln!(out)?;
            }
        }
        OutputFormat::Csv => {
            let Some(first) = windows.first() else {
                return Ok(());
            };
            writeln!(
                out,
                "set,exercise,participant,category,{}",
                csv_header(&first.signal.channel_ids())
            )?;
            for window in windows {
                let category = match window.category {
                    SetCategory::Heavy => "heavy",
                    SetCategory::Medium => "medium",
                };
                let prefix = format!(
                    "{},{},{},{},",
                    window.set,
                    window.exercise,
                    window.participant,
                    category
                );
                write_signal_rows(out, &prefix, &window.signal)?;
            }
        }
    }
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> Result<()> {
    let args = Args::parse();
    let format = OutputFormat::parse(&args.format)?;

    let config = match &args.config {
        Some(path) => CoachConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => CoachConfig::default(),
    };

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    if let Some(per_exercise) = args.dataset {
        let spec = DatasetSpec {
            windows_per_exercise: per_exercise as usize,
            seed: args.seed.unwrap_or_else(|| thread_rng().gen()),
            include_gyro: !args.no_gyro,
            ..DatasetSpec::default()
        };
        log_summary(&"=".repeat(60), args.quiet);
        log_summary("SMARTCOACH DATASET SIMULATION", args.quiet);
        log_summary(&format!("  Exercises: {}", supported_ids().join(", ")), args.quiet);
        log_summary(&format!("  Windows per exercise: {per_exercise}"), args.quiet);
        log_summary(&format!("  Seed: {}", spec.seed), args.quiet);
        log_summary(&"=".repeat(60), args.quiet);

        let windows = generate_dataset(&config.synthesis, &spec)
            .context("Dataset generation failed")?;
        write_dataset(&mut out, &windows, format)?;
        out.flush()?;

        log_summary(&format!("Total windows: {}", windows.len()), args.quiet);
        return Ok(());
    }

    let exercise = ExerciseId::resolve(&args.exercise)?;
    let mut rng = match args.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    let profiles = UserProfile::reference_profiles();
    let participant = args
        .participant
        .map_or_else(|| rng.gen_range(0..profiles.len()), |p| p as usize);

    let mut params = SynthesisParams::new(args.duration)
        .with_fatigue(args.fatigue)
        .with_form_quality(args.form);
    if let Some(reps) = args.reps {
        params = params.with_reps(reps);
    }
    if args.no_gyro {
        params = params.accelerometer_only();
    }

    log_summary(&"=".repeat(60), args.quiet);
    log_summary("SMARTCOACH IMU SIMULATION", args.quiet);
    log_summary(&format!("  Exercise: {exercise}"), args.quiet);
    log_summary(&format!("  Participant: {participant}"), args.quiet);
    log_summary(&format!("  Duration: {:.1} s @ {} Hz", args.duration, config.synthesis.sampling_rate), args.quiet);
    log_summary(&format!("  Fatigue: {:.2}  Form: {:.2}", args.fatigue, args.form), args.quiet);
    log_summary(&"=".repeat(60), args.quiet);

    let mut synthesizer = SignalSynthesizer::with_seed(config.synthesis.clone(), rng.gen());
    let signal = synthesizer
        .synthesize_exercise(exercise, &profiles[participant], &params)
        .with_context(|| format!("Failed to synthesize a {exercise} window"))?;

    write_window(&mut out, &signal, format)?;
    out.flush()?;

    log_summary(
        &format!("Samples: {}  Channels: {}", signal.len(), signal.channel_count()),
        args.quiet,
    );
    Ok(())
}
