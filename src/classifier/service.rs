//! Classifier service: trained model when available, heuristics otherwise.
//!
//! The service is an explicitly constructed value with a tagged state. A
//! load attempt happens at most once; a failed load leaves the service in
//! `Fallback` for its whole lifetime.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

use super::artifact::read_artifact;
use super::{argmax, ClassifierError, FallbackClassifier, ModelArtifact, ModelLoadError};
use crate::config::ClassifierConfig;
use crate::features::{FeatureExtractor, FeatureSchema, FeatureVector};
use crate::types::{ClassificationResult, PredictionSource, RawSignal};

/// A validated artifact ready for inference.
#[derive(Debug, Clone)]
pub struct LoadedModel {
    artifact: ModelArtifact,
    schema: FeatureSchema,
    labels: Vec<String>,
}

impl LoadedModel {
    fn new(artifact: ModelArtifact) -> Result<Self, ModelLoadError> {
        let schema = artifact.validate()?;
        Ok(Self::with_schema(artifact, schema))
    }

    /// Wrap an artifact whose validation already produced `schema`.
    fn with_schema(artifact: ModelArtifact, schema: FeatureSchema) -> Self {
        let labels = artifact.class_labels();
        Self {
            artifact,
            schema,
            labels,
        }
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Class names in trained order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    fn check_schema(&self, features: &FeatureVector) -> Result<(), ClassifierError> {
        if features.schema().fingerprint() == self.schema.fingerprint() {
            return Ok(());
        }
        Err(ClassifierError::FeatureMismatch {
            expected: self.schema.len(),
            expected_fingerprint: self.schema.fingerprint().to_string(),
            actual: features.len(),
            actual_fingerprint: features.schema().fingerprint().to_string(),
        })
    }

    /// Scale, infer, decode. `None` when the model produced unusable output.
    fn infer(&self, features: &FeatureVector) -> Option<ClassificationResult> {
        let scaled = self.artifact.scaler.transform(features.values());
        let probabilities = self.artifact.model.predict_proba(&scaled);

        if probabilities.len() != self.labels.len()
            || probabilities.iter().any(|p| !p.is_finite())
        {
            return None;
        }

        let best = argmax(&probabilities)?;
        Some(ClassificationResult {
            label: self.labels[best].clone(),
            confidence: probabilities[best].clamp(0.0, 1.0),
            probabilities: self.labels.iter().cloned().zip(probabilities).collect(),
            source: PredictionSource::Model {
                model_name: self.artifact.model_name.clone(),
            },
        })
    }
}

/// Lifecycle of the model behind a service.
#[derive(Debug, Clone)]
pub enum ClassifierState {
    /// No load attempted yet
    Unloaded,
    Ready(Box<LoadedModel>),
    /// Load failed; heuristics answer every request
    Fallback { reason: String },
}

impl ClassifierState {
    pub fn name(&self) -> &'static str {
        match self {
            ClassifierState::Unloaded => "unloaded",
            ClassifierState::Ready(_) => "ready",
            ClassifierState::Fallback { .. } => "fallback",
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ClassifierState::Ready(_))
    }
}

/// Snapshot of what the service would use to classify.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    pub available: bool,
    pub state: &'static str,
    pub model_name: String,
    pub model_kind: String,
    pub accuracy: Option<f64>,
    pub labels: Vec<String>,
    pub n_features: usize,
    pub trained_at: Option<DateTime<Utc>>,
    /// Failure reason while in fallback
    pub reason: Option<String>,
}

/// Exercise classifier with heuristic fallback.
#[derive(Debug, Clone)]
pub struct ClassifierService {
    state: ClassifierState,
    extractor: FeatureExtractor,
    fallback: FallbackClassifier,
}

impl ClassifierService {
    /// A service with no model; `predict` answers from heuristics until
    /// `load` succeeds.
    pub fn new(config: &ClassifierConfig) -> Self {
        Self {
            state: ClassifierState::Unloaded,
            extractor: FeatureExtractor::new(),
            fallback: FallbackClassifier::new(&config.fallback),
        }
    }

    /// Build and load from `config.model_path` in one step.
    pub fn from_config(config: &ClassifierConfig) -> Self {
        let mut service = Self::new(config);
        service.load(&config.model_path);
        service
    }

    /// Wrap an in-memory artifact, validated with the same rules as `load`.
    pub fn from_artifact(artifact: ModelArtifact, config: &ClassifierConfig) -> Self {
        let mut service = Self::new(config);
        service.state = Self::state_from(LoadedModel::new(artifact), None);
        service
    }

    /// Read the artifact once. Later calls leave the state untouched.
    pub fn load(&mut self, path: &Path) -> &ClassifierState {
        if matches!(self.state, ClassifierState::Unloaded) {
            let loaded = read_artifact(path)
                .map(|(artifact, schema)| LoadedModel::with_schema(artifact, schema));
            self.state = Self::state_from(loaded, Some(path));
        } else {
            debug!(state = self.state.name(), "Model load already attempted, ignoring");
        }
        &self.state
    }

    fn state_from(loaded: Result<LoadedModel, ModelLoadError>, path: Option<&Path>) -> ClassifierState {
        let source = path.map_or_else(|| "<memory>".to_string(), |p| p.display().to_string());
        match loaded {
            Ok(model) => {
                info!(
                    model = %model.artifact.model_name,
                    kind = model.artifact.model.kind(),
                    accuracy = model.artifact.accuracy,
                    features = model.schema.len(),
                    classes = model.labels.len(),
                    source = %source,
                    "Classifier model loaded"
                );
                ClassifierState::Ready(Box::new(model))
            }
            Err(e) => {
                warn!(source = %source, error = %e, "Classifier model unavailable, using heuristic fallback");
                ClassifierState::Fallback {
                    reason: e.to_string(),
                }
            }
        }
    }

    pub fn state(&self) -> &ClassifierState {
        &self.state
    }

    /// Classify one window.
    ///
    /// Only input errors (missing channels) are returned; every model-side
    /// problem degrades to the heuristic classifier.
    pub fn predict(&self, signal: &RawSignal) -> Result<ClassificationResult, ClassifierError> {
        match &self.state {
            ClassifierState::Ready(model) => {
                let features = self.extractor.extract(signal)?;
                if let Err(e) = model.check_schema(&features) {
                    warn!(error = %e, "Feature schema mismatch, falling back for this window");
                    return self.fallback.classify(signal, &e.to_string());
                }
                match model.infer(&features) {
                    Some(result) => Ok(result),
                    None => {
                        warn!(model = %model.artifact.model_name, "Model produced non-finite probabilities, falling back");
                        self.fallback.classify(signal, "model inference failed")
                    }
                }
            }
            ClassifierState::Unloaded => self.fallback.classify(signal, "model not loaded"),
            ClassifierState::Fallback { reason } => self.fallback.classify(signal, reason),
        }
    }

    pub fn model_info(&self) -> ModelInfo {
        match &self.state {
            ClassifierState::Ready(model) => ModelInfo {
                available: true,
                state: self.state.name(),
                model_name: model.artifact.model_name.clone(),
                model_kind: model.artifact.model.kind().to_string(),
                accuracy: Some(model.artifact.accuracy),
                labels: model.labels.clone(),
                n_features: model.schema.len(),
                trained_at: Some(model.artifact.trained_at),
                reason: None,
            },
            other => ModelInfo {
                available: false,
                state: other.name(),
                model_name: "heuristic".to_string(),
                model_kind: "rule_based".to_string(),
                accuracy: None,
                labels: self
                    .fallback
                    .labels()
                    .iter()
                    .map(|l| l.as_str().to_string())
                    .collect(),
                n_features: 0,
                trained_at: None,
                reason: match other {
                    ClassifierState::Fallback { reason } => Some(reason.clone()),
                    _ => None,
                },
            },
        }
    }
}
