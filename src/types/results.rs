//! Output records handed to presentation, persistence and feedback layers.

use serde::{Deserialize, Serialize};

use super::ExerciseId;

/// Where a classification came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PredictionSource {
    /// Trained model inference
    Model { model_name: String },
    /// Rule-based heuristics
    Fallback { reason: String },
}

impl PredictionSource {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

/// Exercise label with a probability distribution over the active label set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub label: String,
    /// Confidence in [0, 1]
    pub confidence: f64,
    /// Ordered (label, probability) pairs over every label in the active set
    pub probabilities: Vec<(String, f64)>,
    pub source: PredictionSource,
}

impl ClassificationResult {
    pub fn probability_of(&self, label: &str) -> Option<f64> {
        self.probabilities
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, p)| *p)
    }
}

/// Movement quality metrics for one exercise window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub exercise: ExerciseId,
    pub repetitions: u32,
    /// Seconds
    pub duration: f64,
    /// 0-100
    pub regularity: f64,
    /// 0-100
    pub score: f64,
    /// Repetitions per minute
    pub speed: f64,
    /// Peak-to-peak acceleration magnitude (m/s²)
    pub amplitude: f64,
}

impl AnalysisResult {
    /// All-zero result for windows with no usable samples.
    pub fn empty(exercise: ExerciseId) -> Self {
        Self {
            exercise,
            repetitions: 0,
            duration: 0.0,
            regularity: 0.0,
            score: 0.0,
            speed: 0.0,
            amplitude: 0.0,
        }
    }
}
