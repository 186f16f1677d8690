//! Rule-based exercise classification.
//!
//! Scores each candidate label with additive weighted rules over per-axis
//! amplitude and variability, then normalizes the scores into a
//! distribution. Used whenever no trained model can answer.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{argmax, ClassifierError};
use crate::config::FallbackConfig;
use crate::processing::stats;
use crate::types::{ChannelId, ClassificationResult, ExerciseId, PredictionSource, RawSignal};

/// Quantities the rules can test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Peak-to-peak of acc_x
    AmpX,
    AmpY,
    AmpZ,
    /// Population std of acc_x
    StdX,
    StdY,
    StdZ,
    /// Std of the acceleration magnitude
    MagnitudeStd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Gt,
    Lt,
}

/// Right-hand side of a condition: a constant or another metric times a factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operand {
    Value(f64),
    Scaled { metric: Metric, factor: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub metric: Metric,
    pub op: Comparison,
    pub value: Operand,
}

impl Condition {
    pub fn gt(metric: Metric, value: Operand) -> Self {
        Self {
            metric,
            op: Comparison::Gt,
            value,
        }
    }

    pub fn lt(metric: Metric, value: Operand) -> Self {
        Self {
            metric,
            op: Comparison::Lt,
            value,
        }
    }

    /// NaN on either side never holds.
    pub fn holds(&self, metrics: &MotionMetrics) -> bool {
        let lhs = metrics.get(self.metric);
        let rhs = match self.value {
            Operand::Value(v) => v,
            Operand::Scaled { metric, factor } => metrics.get(metric) * factor,
        };
        match self.op {
            Comparison::Gt => lhs > rhs,
            Comparison::Lt => lhs < rhs,
        }
    }
}

/// Adds `weight` to `label` when every condition holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackRule {
    pub label: ExerciseId,
    pub weight: f64,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl FallbackRule {
    pub fn matches(&self, metrics: &MotionMetrics) -> bool {
        self.conditions.iter().all(|c| c.holds(metrics))
    }
}

/// Built-in rule table.
pub fn default_fallback_rules() -> Vec<FallbackRule> {
    use Metric::*;
    use Operand::{Scaled, Value};

    vec![
        FallbackRule {
            label: ExerciseId::Squat,
            weight: 0.7,
            conditions: vec![
                Condition::gt(AmpY, Value(3.0)),
                Condition::gt(AmpY, Scaled { metric: AmpX, factor: 1.5 }),
            ],
        },
        FallbackRule {
            label: ExerciseId::Pushup,
            weight: 0.6,
            conditions: vec![
                Condition::gt(AmpZ, Value(2.0)),
                Condition::gt(AmpZ, Scaled { metric: AmpX, factor: 1.0 }),
            ],
        },
        FallbackRule {
            label: ExerciseId::Curl,
            weight: 0.5,
            conditions: vec![
                Condition::gt(AmpY, Value(1.0)),
                Condition::lt(AmpY, Value(3.5)),
            ],
        },
        FallbackRule {
            label: ExerciseId::Bench,
            weight: 0.5,
            conditions: vec![
                Condition::gt(AmpY, Value(2.0)),
                Condition::lt(AmpX, Value(2.0)),
            ],
        },
        FallbackRule {
            label: ExerciseId::Deadlift,
            weight: 0.7,
            conditions: vec![Condition::gt(AmpY, Value(4.0))],
        },
    ]
}

/// Per-window inputs to the rules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionMetrics {
    pub amplitude: [f64; 3],
    pub std: [f64; 3],
    pub magnitude_std: f64,
}

impl MotionMetrics {
    pub fn from_signal(signal: &RawSignal) -> Result<Self, ClassifierError> {
        let mut axes: [&[f64]; 3] = [&[]; 3];
        for (slot, id) in axes.iter_mut().zip(ChannelId::ACCELEROMETER) {
            *slot = signal
                .channel(id)
                .ok_or(ClassifierError::MissingChannel(id))?;
        }

        let magnitude: Vec<f64> = (0..signal.len())
            .map(|i| (axes[0][i].powi(2) + axes[1][i].powi(2) + axes[2][i].powi(2)).sqrt())
            .collect();

        Ok(Self {
            amplitude: axes.map(stats::range),
            std: axes.map(stats::std_dev),
            magnitude_std: stats::std_dev(&magnitude),
        })
    }

    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::AmpX => self.amplitude[0],
            Metric::AmpY => self.amplitude[1],
            Metric::AmpZ => self.amplitude[2],
            Metric::StdX => self.std[0],
            Metric::StdY => self.std[1],
            Metric::StdZ => self.std[2],
            Metric::MagnitudeStd => self.magnitude_std,
        }
    }
}

/// Heuristic classifier over a configurable rule table.
#[derive(Debug, Clone)]
pub struct FallbackClassifier {
    labels: Vec<ExerciseId>,
    rules: Vec<FallbackRule>,
    min_confidence: f64,
    max_confidence: f64,
}

impl FallbackClassifier {
    pub fn new(config: &FallbackConfig) -> Self {
        let mut labels = config.labels.clone();
        labels.sort_by_key(|id| id.catalog_index());
        labels.dedup();

        Self {
            labels,
            rules: config.rules.clone(),
            min_confidence: config.min_confidence,
            max_confidence: config.max_confidence,
        }
    }

    /// Candidate labels in catalog order.
    pub fn labels(&self) -> &[ExerciseId] {
        &self.labels
    }

    /// Normalized rule scores per label; uniform when no rule fires.
    pub fn scores(&self, metrics: &MotionMetrics) -> Vec<f64> {
        let mut scores = vec![0.0; self.labels.len()];
        for rule in self.rules.iter().filter(|r| r.matches(metrics)) {
            if let Some(i) = self.labels.iter().position(|&l| l == rule.label) {
                scores[i] += rule.weight;
            }
        }

        let total: f64 = scores.iter().sum();
        if total > 0.0 && total.is_finite() {
            scores.iter().map(|s| s / total).collect()
        } else {
            vec![1.0 / self.labels.len().max(1) as f64; self.labels.len()]
        }
    }

    pub fn classify(
        &self,
        signal: &RawSignal,
        reason: &str,
    ) -> Result<ClassificationResult, ClassifierError> {
        let metrics = MotionMetrics::from_signal(signal)?;
        let probabilities = self.scores(&metrics);

        let best = argmax(&probabilities).unwrap_or(0);
        let label = self.labels.get(best).copied().unwrap_or(ExerciseId::Squat);
        let confidence = probabilities
            .get(best)
            .copied()
            .unwrap_or(0.0)
            .clamp(self.min_confidence, self.max_confidence);

        debug!(label = %label, confidence, reason, "Fallback classification");

        Ok(ClassificationResult {
            label: label.as_str().to_string(),
            confidence,
            probabilities: self
                .labels
                .iter()
                .map(|l| l.as_str().to_string())
                .zip(probabilities)
                .collect(),
            source: PredictionSource::Fallback {
                reason: reason.to_string(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(amp_x: f64, amp_y: f64, amp_z: f64) -> MotionMetrics {
        MotionMetrics {
            amplitude: [amp_x, amp_y, amp_z],
            std: [0.0; 3],
            magnitude_std: 0.0,
        }
    }

    fn classifier() -> FallbackClassifier {
        FallbackClassifier::new(&FallbackConfig::default())
    }

    fn accel(x: Vec<f64>, y: Vec<f64>, z: Vec<f64>) -> RawSignal {
        RawSignal::from_channels(
            50.0,
            vec![(ChannelId::AccX, x), (ChannelId::AccY, y), (ChannelId::AccZ, z)],
        )
        .unwrap()
    }

    #[test]
    fn test_default_labels_in_catalog_order() {
        assert_eq!(
            classifier().labels(),
            &[
                ExerciseId::Squat,
                ExerciseId::Pushup,
                ExerciseId::Curl,
                ExerciseId::Bench,
                ExerciseId::Deadlift
            ]
        );
    }

    #[test]
    fn test_squat_rule_scores() {
        // amp_y = 5, amp_x = 1: squat + bench + deadlift
        let scores = classifier().scores(&metrics(1.0, 5.0, 0.5));
        let total = 0.7 + 0.5 + 0.7;
        assert!((scores[0] - 0.7 / total).abs() < 1e-12);
        assert_eq!(scores[1], 0.0);
        assert_eq!(scores[2], 0.0);
        assert!((scores[3] - 0.5 / total).abs() < 1e-12);
        assert!((scores[4] - 0.7 / total).abs() < 1e-12);
    }

    #[test]
    fn test_no_rule_gives_uniform() {
        let scores = classifier().scores(&metrics(0.1, 0.1, 0.1));
        assert!(scores.iter().all(|&s| (s - 0.2).abs() < 1e-12));
    }

    #[test]
    fn test_uniform_tie_resolves_to_squat() {
        let flat = vec![0.0; 100];
        let result = classifier()
            .classify(&accel(flat.clone(), flat.clone(), flat), "no model")
            .unwrap();
        assert_eq!(result.label, "squat");
        assert!((result.confidence - 0.65).abs() < 1e-12);
        assert_eq!(result.probabilities.len(), 5);
        assert_eq!(
            result.source,
            PredictionSource::Fallback {
                reason: "no model".to_string()
            }
        );
    }

    #[test]
    fn test_squat_vs_deadlift_tie_goes_to_squat() {
        let c = classifier();
        let scores = c.scores(&metrics(1.0, 5.0, 0.5));
        assert_eq!(argmax(&scores), Some(0));
    }

    #[test]
    fn test_confidence_clamped_high() {
        // Only the pushup rule fires: probability 1.0
        let n = 100;
        let z: Vec<f64> = (0..n).map(|i| if i % 2 == 0 { 1.5 } else { -1.5 }).collect();
        let result = classifier()
            .classify(&accel(vec![0.0; n], vec![0.0; n], z), "test")
            .unwrap();
        assert_eq!(result.label, "pushup");
        assert!((result.confidence - 0.90).abs() < 1e-12);
        assert_eq!(result.probability_of("pushup"), Some(1.0));
    }

    #[test]
    fn test_missing_channel_is_an_error() {
        let signal = RawSignal::from_channels(
            50.0,
            vec![(ChannelId::AccX, vec![0.0; 4]), (ChannelId::AccY, vec![0.0; 4])],
        )
        .unwrap();
        assert_eq!(
            classifier().classify(&signal, "test"),
            Err(ClassifierError::MissingChannel(ChannelId::AccZ))
        );
    }

    #[test]
    fn test_nan_metrics_never_match() {
        let scores = classifier().scores(&metrics(f64::NAN, f64::NAN, f64::NAN));
        assert!(scores.iter().all(|&s| (s - 0.2).abs() < 1e-12));
    }

    #[test]
    fn test_rules_deserialize_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            rules: Vec<FallbackRule>,
        }
        let w: Wrapper = toml::from_str(
            r#"
[[rules]]
label = "squat"
weight = 0.7
conditions = [
    { metric = "amp_y", op = "gt", value = 3 },
    { metric = "amp_y", op = "gt", value = { metric = "amp_x", factor = 1.5 } },
]
"#,
        )
        .unwrap();
        assert_eq!(w.rules, default_fallback_rules()[..1].to_vec());
    }
}
