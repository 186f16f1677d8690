//! System-wide default constants.
//!
//! Centralises the numbers the config structs default to, grouped by
//! subsystem.

// ============================================================================
// Loading
// ============================================================================

/// Environment variable naming a TOML config file.
pub const CONFIG_ENV_VAR: &str = "SMARTCOACH_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "smartcoach.toml";

// ============================================================================
// Synthesis
// ============================================================================

pub const SAMPLING_RATE_HZ: f64 = 50.0;

/// Standard gravity (m/s²), applied on the vertical axis.
pub const GRAVITY: f64 = 9.81;

/// Gaussian sensor noise std for dynamic exercises (m/s²).
pub const NOISE_STD: f64 = 0.5;

/// Gaussian sensor noise std for isometric holds (m/s²).
pub const ISOMETRIC_NOISE_STD: f64 = 0.1;

/// Gyroscope noise relative to the accelerometer noise.
pub const GYRO_NOISE_RATIO: f64 = 0.2;

/// Half-width of the uniform quantization noise.
pub const QUANTIZATION_NOISE: f64 = 0.05;

/// Sensor bandwidth emulated by the low-pass (Hz).
pub const LOWPASS_CUTOFF_HZ: f64 = 20.0;

/// Effective form below which the dominant axis is perturbed.
pub const FORM_THRESHOLD: f64 = 0.8;

/// Form lost at full fatigue.
pub const FATIGUE_FORM_LOSS: f64 = 0.3;

/// Amplitude lost at full fatigue.
pub const FATIGUE_AMPLITUDE_LOSS: f64 = 0.2;

// ============================================================================
// Movement Analyzer
// ============================================================================

/// Minimum samples between repetition peaks (0.4 s at 50 Hz).
pub const MIN_PEAK_DISTANCE: usize = 20;

pub const MIN_PEAK_PROMINENCE: f64 = 0.5;

/// Centered moving-average width applied before peak detection. Sensor
/// noise left in a raw 50 Hz channel yields spurious peaks above the
/// prominence floor on slow repetitions.
pub const SMOOTHING_WINDOW: usize = 9;

/// Magnitude range that earns the full amplitude component (m/s²).
pub const AMPLITUDE_REFERENCE: f64 = 15.0;

pub const REGULARITY_WEIGHT: f64 = 0.6;
pub const AMPLITUDE_WEIGHT: f64 = 0.4;

/// Regularity points lost per m/s² of magnitude std during a hold.
pub const ISOMETRIC_STD_PENALTY: f64 = 10.0;

/// Regularity reported when fewer than two peaks are found.
pub const NEUTRAL_REGULARITY: f64 = 50.0;

// ============================================================================
// Classifier
// ============================================================================

pub const MODEL_PATH: &str = "models/best_model.json";

/// Artifact format version written and accepted by this build.
pub const ARTIFACT_VERSION: u32 = 1;

pub const FALLBACK_MIN_CONFIDENCE: f64 = 0.65;
pub const FALLBACK_MAX_CONFIDENCE: f64 = 0.90;

// ============================================================================
// Training
// ============================================================================

pub const TRAINING_SEED: u64 = 42;
pub const TRAINING_WINDOWS_PER_EXERCISE: usize = 200;
pub const TEST_FRACTION: f64 = 0.2;
pub const LEARNING_RATE: f64 = 0.05;
pub const EPOCHS: usize = 300;
pub const L2_PENALTY: f64 = 1e-4;

/// Fraction of the largest feature variance added to every Naive Bayes variance.
pub const VAR_SMOOTHING: f64 = 1e-9;
