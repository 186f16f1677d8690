//! Model artifact: scaler, label encoder and model parameters on disk.
//!
//! Written atomically (temp file + rename) and validated in full on load,
//! so a service never holds a half-usable model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;

use super::{ModelLoadError, ModelParams};
use crate::config::defaults::ARTIFACT_VERSION;
use crate::features::{fingerprint_of, FeatureSchema};

/// Per-feature standardization `(x - mean) / scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Fit on row-major samples. Zero-variance features get scale 1.
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        let n_features = rows.first().map_or(0, Vec::len);
        let n = rows.len().max(1) as f64;

        let mut mean = vec![0.0; n_features];
        for row in rows {
            for (m, x) in mean.iter_mut().zip(row) {
                *m += x / n;
            }
        }

        let mut var = vec![0.0; n_features];
        for row in rows {
            for ((v, x), m) in var.iter_mut().zip(row).zip(&mean) {
                *v += (x - m).powi(2) / n;
            }
        }

        let scale = var
            .into_iter()
            .map(|v| {
                let s = v.sqrt();
                if s > f64::EPSILON && s.is_finite() {
                    s
                } else {
                    1.0
                }
            })
            .collect();

        Self { mean, scale }
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn transform(&self, x: &[f64]) -> Vec<f64> {
        x.iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (m, s))| (x - m) / s)
            .collect()
    }
}

/// Sorted class names; the index of a name is its encoded label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    pub classes: Vec<String>,
}

impl LabelEncoder {
    pub fn fit<S: AsRef<str>>(labels: &[S]) -> Self {
        let mut classes: Vec<String> = labels.iter().map(|s| s.as_ref().to_string()).collect();
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    pub fn encode(&self, label: &str) -> Option<usize> {
        self.classes.binary_search_by(|c| c.as_str().cmp(label)).ok()
    }

    pub fn decode(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Everything needed to classify a window, as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Format version for forward compatibility.
    pub version: u32,
    pub model_name: String,
    /// Hold-out accuracy measured at training time.
    pub accuracy: f64,
    pub feature_names: Vec<String>,
    pub schema_fingerprint: String,
    pub scaler: StandardScaler,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_encoder: Option<LabelEncoder>,
    pub model: ModelParams,
    pub trained_at: DateTime<Utc>,
}

impl ModelArtifact {
    /// Build an artifact for `schema`, stamping version, fingerprint and time.
    pub fn new(
        model_name: impl Into<String>,
        accuracy: f64,
        schema: &FeatureSchema,
        scaler: StandardScaler,
        label_encoder: Option<LabelEncoder>,
        model: ModelParams,
    ) -> Self {
        Self {
            version: ARTIFACT_VERSION,
            model_name: model_name.into(),
            accuracy,
            feature_names: schema.names().to_vec(),
            schema_fingerprint: schema.fingerprint().to_string(),
            scaler,
            label_encoder,
            model,
            trained_at: Utc::now(),
        }
    }

    /// Reject anything the service could not use safely.
    ///
    /// Returns the extraction schema the artifact was trained on.
    pub fn validate(&self) -> Result<FeatureSchema, ModelLoadError> {
        if self.version != ARTIFACT_VERSION {
            return Err(ModelLoadError::UnsupportedVersion {
                found: self.version,
                supported: ARTIFACT_VERSION,
            });
        }

        let computed = fingerprint_of(&self.feature_names);
        if computed != self.schema_fingerprint {
            return Err(ModelLoadError::FingerprintMismatch {
                declared: self.schema_fingerprint.clone(),
                computed,
            });
        }

        let schema = FeatureSchema::known_layouts()
            .into_iter()
            .find(|s| s.names() == self.feature_names.as_slice())
            .ok_or(ModelLoadError::UnknownSchema {
                count: self.feature_names.len(),
            })?;

        let n_features = schema.len();
        if self.scaler.mean.len() != n_features || self.scaler.scale.len() != n_features {
            return Err(ModelLoadError::Dimensions(format!(
                "scaler has {} means and {} scales for {n_features} features",
                self.scaler.mean.len(),
                self.scaler.scale.len()
            )));
        }
        if self.scaler.scale.iter().any(|&s| s == 0.0 || !s.is_finite()) {
            return Err(ModelLoadError::Dimensions(
                "scaler contains a zero or non-finite scale".to_string(),
            ));
        }

        self.model
            .check_dimensions(n_features)
            .map_err(ModelLoadError::Dimensions)?;

        if let Some(encoder) = &self.label_encoder {
            if encoder.len() != self.model.n_classes() {
                return Err(ModelLoadError::LabelCount {
                    labels: encoder.len(),
                    classes: self.model.n_classes(),
                });
            }
        }

        Ok(schema)
    }

    /// Class names in trained order; raw indices when no encoder was stored.
    pub fn class_labels(&self) -> Vec<String> {
        match &self.label_encoder {
            Some(encoder) => encoder.classes.clone(),
            None => (0..self.model.n_classes()).map(|i| i.to_string()).collect(),
        }
    }
}

/// Save an artifact to disk atomically (write temp file, then rename).
pub fn save_artifact(artifact: &ModelArtifact, path: &Path) -> io::Result<()> {
    let json = serde_json::to_vec_pretty(artifact)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    let tmp_path = path.with_extension("json.tmp");
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&tmp_path, &json)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Read, parse and validate an artifact.
pub fn load_artifact(path: &Path) -> Result<ModelArtifact, ModelLoadError> {
    read_artifact(path).map(|(artifact, _)| artifact)
}

/// `load_artifact` that also hands back the schema validation resolved.
pub(crate) fn read_artifact(path: &Path) -> Result<(ModelArtifact, FeatureSchema), ModelLoadError> {
    let data = std::fs::read(path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            ModelLoadError::NotFound(path.to_path_buf())
        } else {
            ModelLoadError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;
    let artifact: ModelArtifact = serde_json::from_slice(&data)?;
    let schema = artifact.validate()?;
    Ok((artifact, schema))
}
