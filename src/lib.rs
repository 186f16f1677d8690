//! SmartCoach Motion Core
//!
//! Synthetic IMU exercise signals, feature extraction, exercise classification
//! and movement scoring for a wrist-worn sensor.
//!
//! ## Architecture
//!
//! - **Signal Synthesizer**: physically plausible accelerometer/gyroscope windows
//!   per exercise archetype, user profile, fatigue and form quality
//! - **Feature Extractor**: fixed, named time/frequency/correlation features
//!   (147 with gyroscope, 75 accelerometer-only)
//! - **Classifier Service**: trained model artifact with a rule-based fallback
//!   that never leaves the caller without an answer
//! - **Movement Analyzer**: repetition count, regularity, amplitude and a
//!   composite 0-100 score

// Pipeline modules
pub mod analyzer;
pub mod classifier;
pub mod config;
pub mod features;
pub mod processing;
pub mod synthesis;
pub mod types;

// Re-export configuration
pub use config::{CoachConfig, ConfigError};

// Re-export commonly used types
pub use types::{
    AnalysisResult, ChannelId, ClassificationResult, ExerciseId, FitnessLevel, Gender,
    PredictionSource, RawSignal, UnsupportedExerciseError, UserProfile,
};

// Re-export pipeline components
pub use analyzer::MovementAnalyzer;
pub use classifier::{ClassifierService, ClassifierState, ModelInfo};
pub use features::{FeatureExtractor, FeatureSchema, FeatureVector};
pub use synthesis::{SignalSynthesizer, SynthesisParams};

// Re-export training
pub use classifier::training::{ModelTrainer, TrainingOutcome};
