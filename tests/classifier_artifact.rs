//! Classifier Artifact Tests
//!
//! Train a small model on synthetic data, persist it, and exercise the
//! service states a deployment can end up in: ready, corrupt artifact,
//! missing artifact, and per-window schema mismatch.

use smartcoach::classifier::training::{ModelTrainer, TrainingOutcome};
use smartcoach::classifier::{load_artifact, save_artifact, ClassifierState};
use smartcoach::config::{ClassifierConfig, SynthesisConfig, TrainingConfig};
use smartcoach::features::FeatureExtractor;
use smartcoach::synthesis::{SignalSynthesizer, SynthesisParams};
use smartcoach::types::{ExerciseId, PredictionSource, UserProfile};
use smartcoach::ClassifierService;
use std::path::Path;

fn train_accelerometer_model() -> TrainingOutcome {
    let config = TrainingConfig {
        exercises: vec![ExerciseId::Squat, ExerciseId::Plank, ExerciseId::Curl],
        windows_per_exercise: 10,
        include_gyro: false,
        epochs: 80,
        ..TrainingConfig::default()
    };
    ModelTrainer::new(config)
        .train_synthetic(&SynthesisConfig::default())
        .expect("training")
}

fn config_for(path: &Path) -> ClassifierConfig {
    ClassifierConfig {
        model_path: path.to_path_buf(),
        ..ClassifierConfig::default()
    }
}

#[test]
fn trained_artifact_round_trips_and_predicts() {
    let outcome = train_accelerometer_model();
    let dir = tempfile::tempdir().expect("tmpdir");
    let path = dir.path().join("models").join("best_model.json");

    save_artifact(&outcome.artifact, &path).expect("save");
    let loaded = load_artifact(&path).expect("load");
    assert_eq!(loaded.model_name, outcome.artifact.model_name);
    assert_eq!(loaded.feature_names, outcome.artifact.feature_names);
    assert_eq!(loaded.label_encoder, outcome.artifact.label_encoder);
    assert_eq!(loaded.model.kind(), outcome.artifact.model.kind());

    let service = ClassifierService::from_config(&config_for(&path));
    assert!(service.state().is_ready());

    let mut synth = SignalSynthesizer::with_seed(SynthesisConfig::default(), 77);
    for exercise in ["squat", "plank", "curl"] {
        let signal = synth
            .synthesize(
                exercise,
                &UserProfile::default(),
                &SynthesisParams::new(12.0).accelerometer_only(),
            )
            .expect("synthesize");
        let result = service.predict(&signal).expect("predict");

        assert!(matches!(result.source, PredictionSource::Model { .. }));
        assert_eq!(result.probabilities.len(), 3);
        let total: f64 = result.probabilities.iter().map(|(_, p)| p).sum();
        assert!((total - 1.0).abs() < 1e-9, "probabilities sum to {total}");
        assert!(["curl", "plank", "squat"].contains(&result.label.as_str()));
        assert_eq!(result.probability_of(&result.label), Some(result.confidence));
    }

    let info = service.model_info();
    assert!(info.available);
    assert_eq!(info.n_features, 75);
    assert_eq!(info.labels, vec!["curl", "plank", "squat"]);
}

#[test]
fn scaler_matches_extracted_feature_count() {
    let outcome = train_accelerometer_model();
    let signal = SignalSynthesizer::with_seed(SynthesisConfig::default(), 8)
        .synthesize(
            "squat",
            &UserProfile::default(),
            &SynthesisParams::new(10.0).accelerometer_only(),
        )
        .expect("synthesize");
    let features = FeatureExtractor::new().extract(&signal).expect("extract");

    let scaled = outcome.artifact.scaler.transform(features.values());
    assert_eq!(scaled.len(), outcome.artifact.feature_names.len());
}

#[test]
fn six_channel_window_against_accelerometer_model_falls_back_once() {
    let outcome = train_accelerometer_model();
    let service = ClassifierService::from_artifact(outcome.artifact, &ClassifierConfig::default());

    let signal = SignalSynthesizer::with_seed(SynthesisConfig::default(), 21)
        .synthesize("squat", &UserProfile::default(), &SynthesisParams::new(10.0))
        .expect("synthesize");
    let result = service.predict(&signal).expect("predict");

    assert!(result.source.is_fallback());
    assert!(service.state().is_ready(), "mismatch must not unload the model");
}

#[test]
fn corrupt_artifact_leaves_service_in_fallback() {
    let dir = tempfile::tempdir().expect("tmpdir");
    let path = dir.path().join("best_model.json");
    std::fs::write(&path, b"{ not json").expect("write");

    let mut service = ClassifierService::from_config(&config_for(&path));
    assert!(matches!(service.state(), ClassifierState::Fallback { .. }));

    // A valid file appearing later is not picked up
    let outcome = train_accelerometer_model();
    save_artifact(&outcome.artifact, &path).expect("save");
    assert!(matches!(service.load(&path), ClassifierState::Fallback { .. }));

    let info = service.model_info();
    assert!(!info.available);
    assert_eq!(info.model_kind, "rule_based");
    assert!(info.reason.is_some());
}

#[test]
fn missing_artifact_falls_back_with_reason() {
    let dir = tempfile::tempdir().expect("tmpdir");
    let service = ClassifierService::from_config(&config_for(&dir.path().join("absent.json")));

    let signal = SignalSynthesizer::with_seed(SynthesisConfig::default(), 1)
        .synthesize("pushup", &UserProfile::default(), &SynthesisParams::new(10.0))
        .expect("synthesize");
    let result = service.predict(&signal).expect("predict");

    match result.source {
        PredictionSource::Fallback { reason } => assert!(reason.contains("absent.json"), "{reason}"),
        other => panic!("expected fallback, got {other:?}"),
    }
}
