//! Exercise catalog: canonical ids, alias resolution and motion archetypes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Raised when a free-form exercise id cannot be resolved to the catalog.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unsupported exercise '{given}' (supported: {})", supported_ids().join(", "))]
pub struct UnsupportedExerciseError {
    pub given: String,
}

/// Closed set of supported exercises, in catalog order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseId {
    Squat,
    Pushup,
    Curl,
    JumpingJack,
    Plank,
    Bench,
    Deadlift,
}

impl ExerciseId {
    /// Every exercise, in catalog order.
    pub const ALL: [Self; 7] = [
        Self::Squat,
        Self::Pushup,
        Self::Curl,
        Self::JumpingJack,
        Self::Plank,
        Self::Bench,
        Self::Deadlift,
    ];

    /// Canonical snake_case id.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Squat => "squat",
            Self::Pushup => "pushup",
            Self::Curl => "curl",
            Self::JumpingJack => "jumping_jack",
            Self::Plank => "plank",
            Self::Bench => "bench",
            Self::Deadlift => "deadlift",
        }
    }

    /// Position in the catalog, used for deterministic tie-breaking.
    pub fn catalog_index(self) -> usize {
        Self::ALL.iter().position(|&e| e == self).unwrap_or(Self::ALL.len())
    }

    /// Resolve a canonical id or a known legacy alias.
    ///
    /// Matching ignores case and surrounding whitespace, and treats `-` and
    /// spaces as `_`, so `"Bicep Curl"` and `"bench-press"` both resolve.
    pub fn resolve(raw: &str) -> Result<Self, UnsupportedExerciseError> {
        let normalized: String = raw
            .trim()
            .chars()
            .map(|c| match c {
                '-' | ' ' => '_',
                other => other.to_ascii_lowercase(),
            })
            .collect();

        let id = match normalized.as_str() {
            "squat" | "squats" => Self::Squat,
            "pushup" | "push_up" | "pushups" | "push_ups" => Self::Pushup,
            "curl" | "bicep_curl" | "biceps_curl" | "curls" => Self::Curl,
            "jumping_jack" | "jumping_jacks" | "jumpingjack" => Self::JumpingJack,
            "plank" => Self::Plank,
            "bench" | "bench_press" => Self::Bench,
            "deadlift" | "deadlifts" => Self::Deadlift,
            _ => {
                return Err(UnsupportedExerciseError {
                    given: raw.to_string(),
                })
            }
        };
        Ok(id)
    }

    /// Static motion archetype for this exercise.
    pub fn archetype(self) -> &'static ExerciseArchetype {
        &CATALOG[self.catalog_index()]
    }

    pub fn is_isometric(self) -> bool {
        self.archetype().isometric
    }
}

impl fmt::Display for ExerciseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExerciseId {
    type Err = UnsupportedExerciseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::resolve(s)
    }
}

/// Canonical ids of every catalog entry.
pub fn supported_ids() -> Vec<&'static str> {
    ExerciseId::ALL.iter().map(|e| e.as_str()).collect()
}

/// Accelerometer axis in the body frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    /// x: side to side
    Lateral,
    /// y: gravity axis
    Vertical,
    /// z: sagittal
    Depth,
}

/// Channel the movement analyzer counts repetitions on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepChannel {
    Vertical,
    Depth,
    Magnitude,
}

/// Static description of how an exercise moves the sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseArchetype {
    pub id: ExerciseId,
    /// Oscillation frequency range (Hz)
    pub frequency_hz: (f64, f64),
    /// Peak dynamic acceleration ranges (m/s²) for x, y, z
    pub amplitude_x: (f64, f64),
    pub amplitude_y: (f64, f64),
    pub amplitude_z: (f64, f64),
    /// Nominal duration of a single repetition (s)
    pub rep_duration_s: (f64, f64),
    /// Static hold with no repetition structure
    pub isometric: bool,
    /// Axis carrying most of the motion energy
    pub dominant_axis: Axis,
    pub rep_channel: RepChannel,
    /// Per-axis gains applied on top of the sampled amplitude (x, y, z)
    pub axis_gain: [f64; 3],
    /// Lateral motion follows the main cycle instead of a half-cycle sway
    pub lateral_in_phase: bool,
    /// Angular-rate gain for synthesized gyroscope channels
    pub gyro_gain: f64,
}

impl ExerciseArchetype {
    pub fn amplitude_range(&self, axis: Axis) -> (f64, f64) {
        match axis {
            Axis::Lateral => self.amplitude_x,
            Axis::Vertical => self.amplitude_y,
            Axis::Depth => self.amplitude_z,
        }
    }

    /// Mean of the nominal repetition duration range.
    pub fn mean_rep_duration(&self) -> f64 {
        (self.rep_duration_s.0 + self.rep_duration_s.1) / 2.0
    }
}

/// Catalog entries, indexed by `ExerciseId::catalog_index`.
pub static CATALOG: [ExerciseArchetype; 7] = [
    ExerciseArchetype {
        id: ExerciseId::Squat,
        frequency_hz: (0.5, 1.2),
        amplitude_x: (-2.0, 2.0),
        amplitude_y: (-15.0, -5.0),
        amplitude_z: (-3.0, 3.0),
        rep_duration_s: (2.0, 4.0),
        isometric: false,
        dominant_axis: Axis::Vertical,
        rep_channel: RepChannel::Vertical,
        axis_gain: [1.0, 1.0, 1.0],
        lateral_in_phase: false,
        gyro_gain: 0.3,
    },
    ExerciseArchetype {
        id: ExerciseId::Pushup,
        frequency_hz: (0.4, 1.0),
        amplitude_x: (-1.0, 1.0),
        amplitude_y: (-8.0, -2.0),
        amplitude_z: (-10.0, -3.0),
        rep_duration_s: (2.5, 4.5),
        isometric: false,
        dominant_axis: Axis::Depth,
        rep_channel: RepChannel::Depth,
        axis_gain: [1.0, 1.0, 1.0],
        lateral_in_phase: false,
        gyro_gain: 0.3,
    },
    ExerciseArchetype {
        id: ExerciseId::Curl,
        frequency_hz: (0.6, 1.5),
        amplitude_x: (-3.0, 3.0),
        amplitude_y: (3.0, 6.0),
        amplitude_z: (-8.0, 8.0),
        rep_duration_s: (1.5, 3.0),
        isometric: false,
        dominant_axis: Axis::Vertical,
        rep_channel: RepChannel::Magnitude,
        axis_gain: [0.3, 1.0, 0.4],
        lateral_in_phase: false,
        gyro_gain: 0.3,
    },
    ExerciseArchetype {
        id: ExerciseId::JumpingJack,
        frequency_hz: (1.0, 2.0),
        amplitude_x: (6.0, 10.0),
        amplitude_y: (-8.0, -3.0),
        amplitude_z: (-4.0, 4.0),
        rep_duration_s: (0.8, 1.5),
        isometric: false,
        dominant_axis: Axis::Lateral,
        rep_channel: RepChannel::Vertical,
        axis_gain: [0.9, 1.0, 1.0],
        lateral_in_phase: true,
        gyro_gain: 0.3,
    },
    ExerciseArchetype {
        id: ExerciseId::Plank,
        frequency_hz: (0.1, 0.3),
        amplitude_x: (-0.5, 0.5),
        amplitude_y: (-1.0, 1.0),
        amplitude_z: (-0.5, 0.5),
        rep_duration_s: (5.0, 10.0),
        isometric: true,
        dominant_axis: Axis::Vertical,
        rep_channel: RepChannel::Vertical,
        axis_gain: [1.0, 1.0, 1.0],
        lateral_in_phase: false,
        gyro_gain: 0.05,
    },
    ExerciseArchetype {
        id: ExerciseId::Bench,
        frequency_hz: (0.4, 1.0),
        amplitude_x: (-2.0, 2.0),
        amplitude_y: (-12.0, -4.0),
        amplitude_z: (-5.0, 5.0),
        rep_duration_s: (2.0, 4.0),
        isometric: false,
        dominant_axis: Axis::Vertical,
        rep_channel: RepChannel::Vertical,
        axis_gain: [1.0, 1.0, 1.0],
        lateral_in_phase: false,
        gyro_gain: 0.3,
    },
    ExerciseArchetype {
        id: ExerciseId::Deadlift,
        frequency_hz: (0.3, 0.8),
        amplitude_x: (-3.0, 3.0),
        amplitude_y: (-18.0, -6.0),
        amplitude_z: (-4.0, 4.0),
        rep_duration_s: (3.0, 5.0),
        isometric: false,
        dominant_axis: Axis::Vertical,
        rep_channel: RepChannel::Vertical,
        axis_gain: [1.0, 1.0, 1.0],
        lateral_in_phase: false,
        gyro_gain: 0.3,
    },
];
