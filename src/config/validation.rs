//! Config validation: unknown-key detection with Levenshtein suggestions
//! and suspicious-value checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;

use super::CoachConfig;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for CoachConfig.
///
/// Kept in step with the struct hierarchy in coach_config.rs. Entries of
/// `classifier.fallback.rules` are array tables and are not walked.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [synthesis]
        "synthesis",
        "synthesis.sampling_rate",
        "synthesis.gravity",
        "synthesis.noise_std",
        "synthesis.isometric_noise_std",
        "synthesis.gyro_noise_ratio",
        "synthesis.quantization_noise",
        "synthesis.lowpass_cutoff_hz",
        "synthesis.form_threshold",
        "synthesis.fatigue_form_loss",
        "synthesis.fatigue_amplitude_loss",
        // [analyzer]
        "analyzer",
        "analyzer.min_peak_distance",
        "analyzer.min_prominence",
        "analyzer.smoothing_window",
        "analyzer.amplitude_reference",
        "analyzer.regularity_weight",
        "analyzer.amplitude_weight",
        "analyzer.isometric_std_penalty",
        "analyzer.neutral_regularity",
        // [classifier]
        "classifier",
        "classifier.model_path",
        // [classifier.fallback]
        "classifier.fallback",
        "classifier.fallback.min_confidence",
        "classifier.fallback.max_confidence",
        "classifier.fallback.labels",
        "classifier.fallback.rules",
        // [training]
        "training",
        "training.seed",
        "training.windows_per_exercise",
        "training.exercises",
        "training.include_gyro",
        "training.test_fraction",
        "training.learning_rate",
        "training.epochs",
        "training.l2_penalty",
        "training.var_smoothing",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
/// Equal distances resolve alphabetically.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|&k| (levenshtein(unknown, k), k))
        .filter(|(dist, _)| *dist <= 3)
        .min()
        .map(|(_, k)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// Unknown keys only warn; serde ignores them during the second pass.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are handled by serde later
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Suspicious Values
// ============================================================================

/// Values that validate but probably do not do what the operator intended.
pub fn suspicious_values(config: &CoachConfig) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    let mut warn = |field: &str, message: String| {
        warnings.push(ValidationWarning {
            field: field.to_string(),
            message,
            suggestion: None,
        });
    };

    let s = &config.synthesis;
    let nyquist = s.sampling_rate / 2.0;
    if s.lowpass_cutoff_hz >= nyquist {
        warn(
            "synthesis.lowpass_cutoff_hz",
            format!(
                "synthesis.lowpass_cutoff_hz = {:.1} is at or above Nyquist ({:.1} Hz); the sensor low-pass will be skipped",
                s.lowpass_cutoff_hz, nyquist
            ),
        );
    }

    let a = &config.analyzer;
    if a.smoothing_window % 2 == 0 {
        warn(
            "analyzer.smoothing_window",
            format!(
                "analyzer.smoothing_window = {} is even; the centered average leans one sample forward",
                a.smoothing_window
            ),
        );
    }
    if a.min_peak_distance as f64 > 2.0 * s.sampling_rate {
        warn(
            "analyzer.min_peak_distance",
            format!(
                "analyzer.min_peak_distance = {} samples exceeds 2 s at {:.0} Hz; fast sets will undercount",
                a.min_peak_distance, s.sampling_rate
            ),
        );
    }

    let f = &config.classifier.fallback;
    if f.rules.is_empty() {
        warn(
            "classifier.fallback.rules",
            "classifier.fallback.rules is empty; fallback will always predict the first label".to_string(),
        );
    }

    let t = &config.training;
    if t.windows_per_exercise < 10 {
        warn(
            "training.windows_per_exercise",
            format!(
                "training.windows_per_exercise = {} leaves very few test windows per class",
                t.windows_per_exercise
            ),
        );
    }

    warnings
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_identical() {
        assert_eq!(levenshtein("hello", "hello"), 0);
    }

    #[test]
    fn test_levenshtein_one_edit() {
        assert_eq!(levenshtein("prominance", "prominence"), 1);
    }

    #[test]
    fn test_levenshtein_empty() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
    }

    #[test]
    fn test_walk_toml_keys_flat() {
        let toml: toml::Value = r#"
            a = 1
            b = "hello"
        "#
        .parse()
        .unwrap();
        let keys = walk_toml_keys(&toml, "");
        assert!(keys.contains(&"a".to_string()));
        assert!(keys.contains(&"b".to_string()));
    }

    #[test]
    fn test_walk_toml_keys_nested() {
        let toml: toml::Value = r#"
            [classifier]
            [classifier.fallback]
            min_confidence = 0.6
        "#
        .parse()
        .unwrap();
        let keys = walk_toml_keys(&toml, "");
        assert!(keys.contains(&"classifier".to_string()));
        assert!(keys.contains(&"classifier.fallback".to_string()));
        assert!(keys.contains(&"classifier.fallback.min_confidence".to_string()));
    }

    #[test]
    fn test_typo_key_produces_warning_with_suggestion() {
        let toml_str = r#"
[analyzer]
min_prominance = 0.7
"#;
        let warnings = validate_unknown_keys(toml_str);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].field.contains("min_prominance"));
        assert_eq!(
            warnings[0].suggestion.as_deref(),
            Some("analyzer.min_prominence")
        );
    }

    #[test]
    fn test_all_valid_keys_produce_zero_warnings() {
        let toml_str = r#"
[synthesis]
sampling_rate = 100.0

[analyzer]
min_peak_distance = 25

[classifier]
model_path = "models/custom.json"

[[classifier.fallback.rules]]
label = "squat"
weight = 0.7
conditions = []

[training]
epochs = 50
"#;
        let warnings = validate_unknown_keys(toml_str);
        assert!(warnings.is_empty(), "Expected 0 warnings, got: {:?}", warnings);
    }

    #[test]
    fn test_unknown_section_produces_warning() {
        let warnings = validate_unknown_keys("[telemetry]\nenabled = true\n");
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().any(|w| w.field == "telemetry"));
    }

    #[test]
    fn test_suggest_correction_no_match_for_garbage() {
        let known = known_config_keys();
        assert!(suggest_correction("zzzzzzzzzzzzzzzz", &known).is_none());
    }

    #[test]
    fn test_warning_display_includes_suggestion() {
        let w = ValidationWarning {
            field: "analyzer.smothing_window".to_string(),
            message: "Unknown config key 'analyzer.smothing_window'".to_string(),
            suggestion: Some("analyzer.smoothing_window".to_string()),
        };
        assert!(w.to_string().ends_with("(did you mean 'analyzer.smoothing_window'?)"));
    }

    #[test]
    fn test_defaults_raise_no_suspicious_values() {
        assert!(suspicious_values(&CoachConfig::default()).is_empty());
    }

    #[test]
    fn test_cutoff_above_nyquist_is_suspicious() {
        let mut config = CoachConfig::default();
        config.synthesis.sampling_rate = 30.0;
        let warnings = suspicious_values(&config);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "synthesis.lowpass_cutoff_hz");
    }

    #[test]
    fn test_even_smoothing_window_is_suspicious() {
        let mut config = CoachConfig::default();
        config.analyzer.smoothing_window = 8;
        assert!(suspicious_values(&config)
            .iter()
            .any(|w| w.field == "analyzer.smoothing_window"));
    }
}
