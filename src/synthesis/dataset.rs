//! Labelled training windows across reference user profiles.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{SignalSynthesizer, SynthesisError, SynthesisParams};
use crate::config::SynthesisConfig;
use crate::types::{ExerciseId, RawSignal, UserProfile};

/// Form quality above which a set is tagged `heavy`.
const HEAVY_FORM_THRESHOLD: f64 = 0.85;

/// What to generate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSpec {
    pub exercises: Vec<ExerciseId>,
    pub windows_per_exercise: usize,
    pub seed: u64,
    pub include_gyro: bool,
    /// Window duration range (s)
    pub duration_s: (f64, f64),
    /// Repetition range for dynamic exercises, upper bound exclusive
    pub reps: (u32, u32),
    pub fatigue: (f64, f64),
    pub form_quality: (f64, f64),
}

impl Default for DatasetSpec {
    fn default() -> Self {
        Self {
            exercises: ExerciseId::ALL.to_vec(),
            windows_per_exercise: 200,
            seed: 42,
            include_gyro: true,
            duration_s: (10.0, 20.0),
            reps: (5, 15),
            fatigue: (0.0, 0.5),
            form_quality: (0.7, 1.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetCategory {
    Heavy,
    Medium,
}

/// One synthesized set with its ground truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledWindow {
    /// Sequential set number, starting at 1
    pub set: usize,
    pub exercise: ExerciseId,
    /// Index into `UserProfile::reference_profiles()`
    pub participant: usize,
    pub category: SetCategory,
    pub params: SynthesisParams,
    pub signal: RawSignal,
}

/// Generate `windows_per_exercise` sets for every requested exercise.
///
/// Each set draws its own profile and parameters from a generator seeded
/// with `seed + set index`, so output is identical regardless of how rayon
/// schedules the work.
pub fn generate_dataset(
    config: &SynthesisConfig,
    spec: &DatasetSpec,
) -> Result<Vec<LabeledWindow>, SynthesisError> {
    let profiles = UserProfile::reference_profiles();
    let total = spec.exercises.len() * spec.windows_per_exercise;

    let windows = (0..total)
        .into_par_iter()
        .map(|index| {
            let exercise = spec.exercises[index / spec.windows_per_exercise];
            let mut rng = StdRng::seed_from_u64(spec.seed.wrapping_add(index as u64));

            let participant = rng.gen_range(0..profiles.len());
            let reps = if exercise.is_isometric() {
                1
            } else {
                rng.gen_range(spec.reps.0..spec.reps.1.max(spec.reps.0 + 1))
            };
            let params = SynthesisParams {
                duration_s: draw(&mut rng, spec.duration_s),
                reps: Some(reps),
                fatigue: draw(&mut rng, spec.fatigue),
                form_quality: draw(&mut rng, spec.form_quality),
                include_gyro: spec.include_gyro,
            };

            let mut synthesizer = SignalSynthesizer::with_seed(config.clone(), rng.gen());
            let signal =
                synthesizer.synthesize_exercise(exercise, &profiles[participant], &params)?;

            Ok(LabeledWindow {
                set: index + 1,
                exercise,
                participant,
                category: if params.form_quality > HEAVY_FORM_THRESHOLD {
                    SetCategory::Heavy
                } else {
                    SetCategory::Medium
                },
                params,
                signal,
            })
        })
        .collect::<Result<Vec<_>, SynthesisError>>()?;

    info!(
        windows = windows.len(),
        exercises = spec.exercises.len(),
        seed = spec.seed,
        "Generated synthetic dataset"
    );
    Ok(windows)
}

fn draw(rng: &mut StdRng, (lo, hi): (f64, f64)) -> f64 {
    if hi > lo {
        rng.gen_range(lo..hi)
    } else {
        lo
    }
}
