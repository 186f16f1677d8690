//! Coach Configuration - every tunable constant of the motion pipeline as TOML
//!
//! Each struct implements `Default` with the values the pipeline was
//! calibrated with, so a missing config file changes nothing.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults;
use crate::classifier::{default_fallback_rules, FallbackRule};
use crate::types::ExerciseId;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration.
///
/// Load with `CoachConfig::load()` which searches:
/// 1. `$SMARTCOACH_CONFIG` env var
/// 2. `./smartcoach.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoachConfig {
    /// Signal synthesizer
    #[serde(default)]
    pub synthesis: SynthesisConfig,

    /// Movement analyzer scoring
    #[serde(default)]
    pub analyzer: AnalyzerConfig,

    /// Classifier artifact and heuristic fallback
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Local model training
    #[serde(default)]
    pub training: TrainingConfig,
}

impl CoachConfig {
    /// Load configuration using the standard search order:
    /// 1. `$SMARTCOACH_CONFIG` environment variable
    /// 2. `./smartcoach.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(defaults::CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded config from {}", defaults::CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", defaults::CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", defaults::CONFIG_ENV_VAR);
            }
        }

        let local = PathBuf::from(defaults::LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded config from ./{}", defaults::LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", defaults::LOCAL_CONFIG_FILE);
                }
            }
        }

        info!("No {} found, using built-in defaults", defaults::LOCAL_CONFIG_FILE);
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config = Self::from_toml_str(&contents)
            .map_err(|e| match e {
                ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
                other => other,
            })?;
        Ok(config)
    }

    /// Parse and validate TOML text. Unknown keys and suspicious values are
    /// logged as warnings; out-of-range values are errors.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;

        for w in super::validation::suspicious_values(&config) {
            warn!("{}", w);
        }
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Save config to a file.
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        info!(path = %path.display(), "Config saved");
        Ok(())
    }

    /// Validate every section, collecting all violations.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        let s = &self.synthesis;
        Self::check_positive(s.sampling_rate, "synthesis.sampling_rate", &mut errors);
        Self::check_positive(s.lowpass_cutoff_hz, "synthesis.lowpass_cutoff_hz", &mut errors);
        if !s.gravity.is_finite() {
            errors.push(format!("synthesis.gravity ({}) must be finite", s.gravity));
        }
        Self::check_non_negative(s.noise_std, "synthesis.noise_std", &mut errors);
        Self::check_non_negative(s.isometric_noise_std, "synthesis.isometric_noise_std", &mut errors);
        Self::check_non_negative(s.gyro_noise_ratio, "synthesis.gyro_noise_ratio", &mut errors);
        Self::check_non_negative(s.quantization_noise, "synthesis.quantization_noise", &mut errors);
        Self::check_unit(s.form_threshold, "synthesis.form_threshold", &mut errors);
        Self::check_unit(s.fatigue_form_loss, "synthesis.fatigue_form_loss", &mut errors);
        Self::check_unit(s.fatigue_amplitude_loss, "synthesis.fatigue_amplitude_loss", &mut errors);

        let a = &self.analyzer;
        if a.min_peak_distance == 0 {
            errors.push("analyzer.min_peak_distance must be >= 1".to_string());
        }
        if a.smoothing_window == 0 {
            errors.push("analyzer.smoothing_window must be >= 1".to_string());
        }
        Self::check_non_negative(a.min_prominence, "analyzer.min_prominence", &mut errors);
        Self::check_positive(a.amplitude_reference, "analyzer.amplitude_reference", &mut errors);
        Self::check_non_negative(a.regularity_weight, "analyzer.regularity_weight", &mut errors);
        Self::check_non_negative(a.amplitude_weight, "analyzer.amplitude_weight", &mut errors);
        let weight_sum = a.regularity_weight + a.amplitude_weight;
        if (weight_sum - 1.0).abs() > 0.01 {
            errors.push(format!(
                "analyzer weights must sum to 1.0 (got {weight_sum:.3})"
            ));
        }
        Self::check_non_negative(a.isometric_std_penalty, "analyzer.isometric_std_penalty", &mut errors);
        if !(0.0..=100.0).contains(&a.neutral_regularity) {
            errors.push(format!(
                "analyzer.neutral_regularity ({}) must be in [0, 100]",
                a.neutral_regularity
            ));
        }

        let f = &self.classifier.fallback;
        Self::check_unit(f.min_confidence, "classifier.fallback.min_confidence", &mut errors);
        Self::check_unit(f.max_confidence, "classifier.fallback.max_confidence", &mut errors);
        if f.min_confidence > f.max_confidence {
            errors.push(format!(
                "classifier.fallback.min_confidence ({:.2}) must be <= max_confidence ({:.2})",
                f.min_confidence, f.max_confidence
            ));
        }
        if f.labels.is_empty() {
            errors.push("classifier.fallback.labels must not be empty".to_string());
        }
        for (i, rule) in f.rules.iter().enumerate() {
            if !f.labels.contains(&rule.label) {
                errors.push(format!(
                    "classifier.fallback.rules[{i}] targets '{}', which is not in fallback.labels",
                    rule.label
                ));
            }
            if !rule.weight.is_finite() || rule.weight < 0.0 {
                errors.push(format!(
                    "classifier.fallback.rules[{i}].weight ({}) must be >= 0",
                    rule.weight
                ));
            }
        }

        let t = &self.training;
        if !(t.test_fraction > 0.0 && t.test_fraction < 1.0) {
            errors.push(format!(
                "training.test_fraction ({}) must be in (0, 1)",
                t.test_fraction
            ));
        }
        Self::check_positive(t.learning_rate, "training.learning_rate", &mut errors);
        Self::check_non_negative(t.l2_penalty, "training.l2_penalty", &mut errors);
        Self::check_non_negative(t.var_smoothing, "training.var_smoothing", &mut errors);
        if t.epochs == 0 {
            errors.push("training.epochs must be >= 1".to_string());
        }
        if t.windows_per_exercise < 2 {
            errors.push("training.windows_per_exercise must be >= 2".to_string());
        }
        if t.exercises.len() < 2 {
            errors.push("training.exercises needs at least two exercises".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_positive(value: f64, name: &str, errors: &mut Vec<String>) {
        if !value.is_finite() || value <= 0.0 {
            errors.push(format!("{name} ({value}) must be > 0"));
        }
    }

    fn check_non_negative(value: f64, name: &str, errors: &mut Vec<String>) {
        if !value.is_finite() || value < 0.0 {
            errors.push(format!("{name} ({value}) must be >= 0"));
        }
    }

    fn check_unit(value: f64, name: &str, errors: &mut Vec<String>) {
        if !(0.0..=1.0).contains(&value) {
            errors.push(format!("{name} ({value}) must be in [0, 1]"));
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Synthesis
// ============================================================================

/// Signal synthesizer constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Output sampling rate (Hz)
    #[serde(default = "default_sampling_rate")]
    pub sampling_rate: f64,

    /// Constant bias subtracted from the vertical axis (m/s²)
    #[serde(default = "default_gravity")]
    pub gravity: f64,

    #[serde(default = "default_noise_std")]
    pub noise_std: f64,

    #[serde(default = "default_isometric_noise_std")]
    pub isometric_noise_std: f64,

    #[serde(default = "default_gyro_noise_ratio")]
    pub gyro_noise_ratio: f64,

    #[serde(default = "default_quantization_noise")]
    pub quantization_noise: f64,

    /// Zero-phase low-pass cutoff (Hz); skipped at or above Nyquist
    #[serde(default = "default_lowpass_cutoff")]
    pub lowpass_cutoff_hz: f64,

    #[serde(default = "default_form_threshold")]
    pub form_threshold: f64,

    #[serde(default = "default_fatigue_form_loss")]
    pub fatigue_form_loss: f64,

    #[serde(default = "default_fatigue_amplitude_loss")]
    pub fatigue_amplitude_loss: f64,
}

fn default_sampling_rate() -> f64 { defaults::SAMPLING_RATE_HZ }
fn default_gravity() -> f64 { defaults::GRAVITY }
fn default_noise_std() -> f64 { defaults::NOISE_STD }
fn default_isometric_noise_std() -> f64 { defaults::ISOMETRIC_NOISE_STD }
fn default_gyro_noise_ratio() -> f64 { defaults::GYRO_NOISE_RATIO }
fn default_quantization_noise() -> f64 { defaults::QUANTIZATION_NOISE }
fn default_lowpass_cutoff() -> f64 { defaults::LOWPASS_CUTOFF_HZ }
fn default_form_threshold() -> f64 { defaults::FORM_THRESHOLD }
fn default_fatigue_form_loss() -> f64 { defaults::FATIGUE_FORM_LOSS }
fn default_fatigue_amplitude_loss() -> f64 { defaults::FATIGUE_AMPLITUDE_LOSS }

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            sampling_rate: default_sampling_rate(),
            gravity: default_gravity(),
            noise_std: default_noise_std(),
            isometric_noise_std: default_isometric_noise_std(),
            gyro_noise_ratio: default_gyro_noise_ratio(),
            quantization_noise: default_quantization_noise(),
            lowpass_cutoff_hz: default_lowpass_cutoff(),
            form_threshold: default_form_threshold(),
            fatigue_form_loss: default_fatigue_form_loss(),
            fatigue_amplitude_loss: default_fatigue_amplitude_loss(),
        }
    }
}

// ============================================================================
// Movement Analyzer
// ============================================================================

/// Repetition counting and scoring constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Minimum samples between repetition peaks
    #[serde(default = "default_min_peak_distance")]
    pub min_peak_distance: usize,

    #[serde(default = "default_min_prominence")]
    pub min_prominence: f64,

    /// Centered moving-average width before peak detection (1 disables)
    #[serde(default = "default_smoothing_window")]
    pub smoothing_window: usize,

    /// Magnitude range (m/s²) that earns the full amplitude component
    #[serde(default = "default_amplitude_reference")]
    pub amplitude_reference: f64,

    #[serde(default = "default_regularity_weight")]
    pub regularity_weight: f64,

    #[serde(default = "default_amplitude_weight")]
    pub amplitude_weight: f64,

    #[serde(default = "default_isometric_std_penalty")]
    pub isometric_std_penalty: f64,

    #[serde(default = "default_neutral_regularity")]
    pub neutral_regularity: f64,
}

fn default_min_peak_distance() -> usize { defaults::MIN_PEAK_DISTANCE }
fn default_min_prominence() -> f64 { defaults::MIN_PEAK_PROMINENCE }
fn default_smoothing_window() -> usize { defaults::SMOOTHING_WINDOW }
fn default_amplitude_reference() -> f64 { defaults::AMPLITUDE_REFERENCE }
fn default_regularity_weight() -> f64 { defaults::REGULARITY_WEIGHT }
fn default_amplitude_weight() -> f64 { defaults::AMPLITUDE_WEIGHT }
fn default_isometric_std_penalty() -> f64 { defaults::ISOMETRIC_STD_PENALTY }
fn default_neutral_regularity() -> f64 { defaults::NEUTRAL_REGULARITY }

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            min_peak_distance: default_min_peak_distance(),
            min_prominence: default_min_prominence(),
            smoothing_window: default_smoothing_window(),
            amplitude_reference: default_amplitude_reference(),
            regularity_weight: default_regularity_weight(),
            amplitude_weight: default_amplitude_weight(),
            isometric_std_penalty: default_isometric_std_penalty(),
            neutral_regularity: default_neutral_regularity(),
        }
    }
}

// ============================================================================
// Classifier
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Model artifact location
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    #[serde(default)]
    pub fallback: FallbackConfig,
}

fn default_model_path() -> PathBuf {
    PathBuf::from(defaults::MODEL_PATH)
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            fallback: FallbackConfig::default(),
        }
    }
}

/// Heuristic classification used when no trained model is usable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackConfig {
    #[serde(default = "default_fallback_min_confidence")]
    pub min_confidence: f64,

    #[serde(default = "default_fallback_max_confidence")]
    pub max_confidence: f64,

    /// Candidate labels; ties resolve to the earliest catalog entry
    #[serde(default = "default_fallback_labels")]
    pub labels: Vec<ExerciseId>,

    /// Additive scoring rules
    #[serde(default = "default_fallback_rules")]
    pub rules: Vec<FallbackRule>,
}

fn default_fallback_min_confidence() -> f64 { defaults::FALLBACK_MIN_CONFIDENCE }
fn default_fallback_max_confidence() -> f64 { defaults::FALLBACK_MAX_CONFIDENCE }
fn default_fallback_labels() -> Vec<ExerciseId> {
    vec![
        ExerciseId::Squat,
        ExerciseId::Pushup,
        ExerciseId::Curl,
        ExerciseId::Bench,
        ExerciseId::Deadlift,
    ]
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            min_confidence: default_fallback_min_confidence(),
            max_confidence: default_fallback_max_confidence(),
            labels: default_fallback_labels(),
            rules: default_fallback_rules(),
        }
    }
}

// ============================================================================
// Training
// ============================================================================

/// Synthetic dataset and model fitting parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    #[serde(default = "default_training_seed")]
    pub seed: u64,

    #[serde(default = "default_windows_per_exercise")]
    pub windows_per_exercise: usize,

    #[serde(default = "default_training_exercises")]
    pub exercises: Vec<ExerciseId>,

    /// Train on six-channel windows; three-channel otherwise
    #[serde(default = "default_include_gyro")]
    pub include_gyro: bool,

    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,

    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,

    #[serde(default = "default_epochs")]
    pub epochs: usize,

    #[serde(default = "default_l2_penalty")]
    pub l2_penalty: f64,

    #[serde(default = "default_var_smoothing")]
    pub var_smoothing: f64,
}

fn default_training_seed() -> u64 { defaults::TRAINING_SEED }
fn default_windows_per_exercise() -> usize { defaults::TRAINING_WINDOWS_PER_EXERCISE }
fn default_training_exercises() -> Vec<ExerciseId> { ExerciseId::ALL.to_vec() }
fn default_include_gyro() -> bool { true }
fn default_test_fraction() -> f64 { defaults::TEST_FRACTION }
fn default_learning_rate() -> f64 { defaults::LEARNING_RATE }
fn default_epochs() -> usize { defaults::EPOCHS }
fn default_l2_penalty() -> f64 { defaults::L2_PENALTY }
fn default_var_smoothing() -> f64 { defaults::VAR_SMOOTHING }

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            seed: default_training_seed(),
            windows_per_exercise: default_windows_per_exercise(),
            exercises: default_training_exercises(),
            include_gyro: default_include_gyro(),
            test_fraction: default_test_fraction(),
            learning_rate: default_learning_rate(),
            epochs: default_epochs(),
            l2_penalty: default_l2_penalty(),
            var_smoothing: default_var_smoothing(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        CoachConfig::default().validate().expect("defaults must be valid");
    }

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = CoachConfig::from_toml_str("").unwrap();
        assert_eq!(config, CoachConfig::default());
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config = CoachConfig::from_toml_str(
            r#"
[analyzer]
min_peak_distance = 30
"#,
        )
        .unwrap();
        assert_eq!(config.analyzer.min_peak_distance, 30);
        assert!((config.analyzer.min_prominence - 0.5).abs() < 1e-12);
        assert!((config.synthesis.sampling_rate - 50.0).abs() < 1e-12);
    }

    #[test]
    fn test_validation_collects_every_error() {
        let mut config = CoachConfig::default();
        config.synthesis.sampling_rate = 0.0;
        config.analyzer.regularity_weight = 0.9;
        config.classifier.fallback.min_confidence = 0.95;
        match config.validate() {
            Err(ConfigError::Validation(errors)) => {
                assert!(errors.iter().any(|e| e.contains("sampling_rate")));
                assert!(errors.iter().any(|e| e.contains("weights must sum")));
                assert!(errors.iter().any(|e| e.contains("min_confidence")));
            }
            other => panic!("expected validation errors, got {other:?}"),
        }
    }

    #[test]
    fn test_rule_label_outside_label_set_rejected() {
        let mut config = CoachConfig::default();
        config.classifier.fallback.labels = vec![ExerciseId::Squat];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("not in fallback.labels"));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = CoachConfig::default();
        let text = config.to_toml().unwrap();
        let back = CoachConfig::from_toml_str(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("smartcoach.toml");
        let mut config = CoachConfig::default();
        config.training.epochs = 12;
        config.save_to_file(&path).unwrap();

        let loaded = CoachConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.training.epochs, 12);
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[analyzer\nmin_peak_distance = ").unwrap();
        let err = CoachConfig::load_from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(ref p, _) if p == &path));
    }
}
