//! Exercise classification
//!
//! - `ClassifierService`: trained-model inference with a heuristic fallback
//! - `ModelArtifact`: the JSON artifact (scaler, label encoder, model parameters)
//! - `training`: local fitting of Gaussian Naive Bayes and logistic regression
//!
//! The service never panics on a bad artifact: load failures are logged once
//! and the service answers every request from the rule table instead.

mod artifact;
mod fallback;
mod model;
mod service;
pub mod training;

pub use artifact::*;
pub use fallback::*;
pub use model::*;
pub use service::*;

use std::path::PathBuf;
use thiserror::Error;

use crate::features::FeatureError;
use crate::types::ChannelId;

/// Errors surfaced by `ClassifierService::predict`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassifierError {
    #[error("Missing channel '{0}'")]
    MissingChannel(ChannelId),

    /// Extracted schema differs from the model's; handled inside `predict`
    #[error("Feature schema mismatch: model expects {expected} features ({expected_fingerprint}), window produced {actual} ({actual_fingerprint})")]
    FeatureMismatch {
        expected: usize,
        expected_fingerprint: String,
        actual: usize,
        actual_fingerprint: String,
    },
}

impl From<FeatureError> for ClassifierError {
    fn from(e: FeatureError) -> Self {
        match e {
            FeatureError::MissingChannel(id) => ClassifierError::MissingChannel(id),
        }
    }
}

/// Reasons a model artifact is rejected at load time.
#[derive(Error, Debug)]
pub enum ModelLoadError {
    #[error("Model artifact not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read model artifact {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed model artifact: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported artifact version {found} (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("Schema fingerprint mismatch: artifact declares {declared}, feature names hash to {computed}")]
    FingerprintMismatch { declared: String, computed: String },

    #[error("Feature names ({count}) match neither the 6-channel nor the 3-channel extraction schema")]
    UnknownSchema { count: usize },

    #[error("Inconsistent model dimensions: {0}")]
    Dimensions(String),

    #[error("Label encoder has {labels} classes but the model has {classes}")]
    LabelCount { labels: usize, classes: usize },
}
