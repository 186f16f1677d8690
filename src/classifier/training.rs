//! Local model training on synthetic windows.
//!
//! Features are standardized, the data split stratified by class, and two
//! candidates fitted: Gaussian Naive Bayes and multinomial logistic
//! regression (full-batch Adam with L2). The candidate with the best
//! hold-out accuracy becomes the artifact.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use super::{
    argmax, GaussianNb, LabelEncoder, LogisticRegression, ModelArtifact, ModelParams,
    StandardScaler,
};
use crate::config::{SynthesisConfig, TrainingConfig};
use crate::features::{FeatureError, FeatureExtractor, FeatureSchema};
use crate::synthesis::{generate_dataset, DatasetSpec, LabeledWindow, SynthesisError};

/// Max gradient norm for global gradient clipping.
const MAX_GRAD_NORM: f64 = 5.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrainingError {
    #[error("Training dataset is empty")]
    EmptyDataset,

    #[error("Training needs at least two classes, found only '{0}'")]
    SingleClass(String),

    #[error("Feature extraction failed: {0}")]
    Features(#[from] FeatureError),

    #[error("Windows produced mixed feature schemas ({first} and {other} features)")]
    MixedSchemas { first: usize, other: usize },

    #[error("Dataset generation failed: {0}")]
    Synthesis(#[from] SynthesisError),

    #[error("Cannot fit model: {0}")]
    InvalidInput(String),
}

/// Feature rows with their class names.
#[derive(Debug, Clone)]
pub struct TrainingSet {
    pub schema: FeatureSchema,
    pub rows: Vec<Vec<f64>>,
    pub labels: Vec<String>,
}

impl TrainingSet {
    /// Extract every window (in parallel) into one consistent set.
    pub fn from_windows(windows: &[LabeledWindow]) -> Result<Self, TrainingError> {
        let extractor = FeatureExtractor::new();
        let signals: Vec<_> = windows.iter().map(|w| w.signal.clone()).collect();
        let vectors = extractor
            .extract_batch(&signals)
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;

        let first = vectors.first().ok_or(TrainingError::EmptyDataset)?;
        let schema = first.schema().clone();
        if let Some(other) = vectors.iter().find(|v| v.schema() != &schema) {
            return Err(TrainingError::MixedSchemas {
                first: schema.len(),
                other: other.len(),
            });
        }

        Ok(Self {
            schema,
            rows: vectors.into_iter().map(|v| v.into_values()).collect(),
            labels: windows
                .iter()
                .map(|w| w.exercise.as_str().to_string())
                .collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Hold-out metrics of one candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateReport {
    pub model_name: String,
    pub accuracy: f64,
    pub f1_weighted: f64,
}

#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub candidates: Vec<CandidateReport>,
    pub train_size: usize,
    pub test_size: usize,
    /// Artifact of the most accurate candidate
    pub artifact: ModelArtifact,
}

/// Fits candidates and packages the best one.
#[derive(Debug, Clone)]
pub struct ModelTrainer {
    config: TrainingConfig,
}

impl ModelTrainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    /// Generate the synthetic dataset described by the training config, then train.
    pub fn train_synthetic(
        &self,
        synthesis: &SynthesisConfig,
    ) -> Result<TrainingOutcome, TrainingError> {
        let spec = DatasetSpec {
            exercises: self.config.exercises.clone(),
            windows_per_exercise: self.config.windows_per_exercise,
            seed: self.config.seed,
            include_gyro: self.config.include_gyro,
            ..DatasetSpec::default()
        };
        let windows = generate_dataset(synthesis, &spec)?;
        let set = TrainingSet::from_windows(&windows)?;
        self.train(&set)
    }

    pub fn train(&self, set: &TrainingSet) -> Result<TrainingOutcome, TrainingError> {
        if set.is_empty() {
            return Err(TrainingError::EmptyDataset);
        }
        let encoder = LabelEncoder::fit(&set.labels);
        if encoder.len() < 2 {
            return Err(TrainingError::SingleClass(
                encoder.classes.first().cloned().unwrap_or_default(),
            ));
        }
        let y: Vec<usize> = set
            .labels
            .iter()
            .map(|l| encoder.encode(l).unwrap_or(0))
            .collect();

        let (train_idx, test_idx) =
            stratified_split(&y, encoder.len(), self.config.test_fraction, self.config.seed);
        let pick = |idx: &[usize]| -> (Vec<Vec<f64>>, Vec<usize>) {
            (
                idx.iter().map(|&i| set.rows[i].clone()).collect(),
                idx.iter().map(|&i| y[i]).collect(),
            )
        };
        let (x_train_raw, y_train) = pick(&train_idx);
        let (x_test_raw, y_test) = pick(&test_idx);

        let scaler = StandardScaler::fit(&x_train_raw);
        let x_train: Vec<Vec<f64>> = x_train_raw.iter().map(|r| scaler.transform(r)).collect();
        let x_test: Vec<Vec<f64>> = x_test_raw.iter().map(|r| scaler.transform(r)).collect();

        info!(
            samples = set.len(),
            train = x_train.len(),
            test = x_test.len(),
            classes = encoder.len(),
            features = set.schema.len(),
            "Training candidate models"
        );

        let candidates = vec![
            ModelParams::GaussianNb(fit_gaussian_nb(
                &x_train,
                &y_train,
                encoder.len(),
                self.config.var_smoothing,
            )?),
            ModelParams::LogisticRegression(fit_logistic_regression(
                &x_train,
                &y_train,
                encoder.len(),
                &self.config,
            )?),
        ];

        // An empty test split (tiny datasets) scores on the training rows
        let (x_eval, y_eval) = if x_test.is_empty() {
            (&x_train, &y_train)
        } else {
            (&x_test, &y_test)
        };

        let mut reports = Vec::with_capacity(candidates.len());
        let mut best: Option<(usize, f64)> = None;
        for (i, model) in candidates.iter().enumerate() {
            let predicted: Vec<usize> = x_eval
                .iter()
                .map(|x| argmax(&model.predict_proba(x)).unwrap_or(0))
                .collect();
            let accuracy = accuracy(y_eval, &predicted);
            let f1 = f1_weighted(y_eval, &predicted, encoder.len());
            info!(model = model.kind(), accuracy, f1_weighted = f1, "Candidate evaluated");

            reports.push(CandidateReport {
                model_name: model.kind().to_string(),
                accuracy,
                f1_weighted: f1,
            });
            if best.map_or(true, |(_, a)| accuracy > a) {
                best = Some((i, accuracy));
            }
        }

        let (best_idx, best_accuracy) = best.unwrap_or((0, 0.0));
        let model = candidates
            .into_iter()
            .nth(best_idx)
            .ok_or(TrainingError::EmptyDataset)?;
        info!(model = model.kind(), accuracy = best_accuracy, "Selected best model");

        let artifact = ModelArtifact::new(
            model.kind(),
            best_accuracy,
            &set.schema,
            scaler,
            Some(encoder),
            model,
        );

        Ok(TrainingOutcome {
            candidates: reports,
            train_size: x_train.len(),
            test_size: x_test.len(),
            artifact,
        })
    }
}

/// Per-class shuffled split. Every class with two or more samples keeps at
/// least one sample on each side.
pub fn stratified_split(
    y: &[usize],
    n_classes: usize,
    test_fraction: f64,
    seed: u64,
) -> (Vec<usize>, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();

    for class in 0..n_classes {
        let mut members: Vec<usize> = (0..y.len()).filter(|&i| y[i] == class).collect();
        members.shuffle(&mut rng);

        let n = members.len();
        let mut n_test = (n as f64 * test_fraction).round() as usize;
        if n >= 2 {
            n_test = n_test.clamp(1, n - 1);
        } else {
            n_test = 0;
        }
        test.extend_from_slice(&members[..n_test]);
        train.extend_from_slice(&members[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    (train, test)
}

/// Feature width of `x` after checking that rows, labels and class count
/// describe a fittable problem.
fn fit_dimensions(x: &[Vec<f64>], y: &[usize], n_classes: usize) -> Result<usize, TrainingError> {
    if x.is_empty() {
        return Err(TrainingError::EmptyDataset);
    }
    if n_classes == 0 {
        return Err(TrainingError::InvalidInput("no classes".to_string()));
    }
    if x.len() != y.len() {
        return Err(TrainingError::InvalidInput(format!(
            "{} rows but {} labels",
            x.len(),
            y.len()
        )));
    }
    let n_features = x[0].len();
    if n_features == 0 {
        return Err(TrainingError::InvalidInput("rows have no features".to_string()));
    }
    if let Some(row) = x.iter().find(|r| r.len() != n_features) {
        return Err(TrainingError::InvalidInput(format!(
            "ragged rows ({} and {} features)",
            n_features,
            row.len()
        )));
    }
    if let Some(&label) = y.iter().find(|&&l| l >= n_classes) {
        return Err(TrainingError::InvalidInput(format!(
            "label index {label} outside {n_classes} classes"
        )));
    }
    Ok(n_features)
}

/// Fit per-class means and variances. `var_smoothing` is a fraction of the
/// largest feature variance added to every variance.
pub fn fit_gaussian_nb(
    x: &[Vec<f64>],
    y: &[usize],
    n_classes: usize,
    var_smoothing: f64,
) -> Result<GaussianNb, TrainingError> {
    let n_features = fit_dimensions(x, y, n_classes)?;
    let max_var = StandardScaler::fit(x)
        .scale
        .iter()
        .map(|s| s * s)
        .fold(0.0_f64, f64::max);
    let epsilon = (var_smoothing * max_var).max(1e-12);

    let mut class_prior = vec![0.0; n_classes];
    let mut theta = vec![vec![0.0; n_features]; n_classes];
    let mut var = vec![vec![0.0; n_features]; n_classes];

    for c in 0..n_classes {
        let rows: Vec<&Vec<f64>> = x.iter().zip(y).filter(|(_, &l)| l == c).map(|(r, _)| r).collect();
        let count = rows.len();
        if count == 0 {
            // Unseen class: uninformative Gaussian, negligible prior
            class_prior[c] = f64::MIN_POSITIVE;
            var[c] = vec![1.0; n_features];
            continue;
        }
        class_prior[c] = count as f64 / x.len() as f64;
        for row in &rows {
            for (m, v) in theta[c].iter_mut().zip(row.iter()) {
                *m += v / count as f64;
            }
        }
        for row in &rows {
            for ((s, v), m) in var[c].iter_mut().zip(row.iter()).zip(&theta[c]) {
                *s += (v - m).powi(2) / count as f64;
            }
        }
        for s in var[c].iter_mut() {
            *s += epsilon;
        }
    }

    debug!(classes = n_classes, features = n_features, epsilon, "Fitted Gaussian NB");
    Ok(GaussianNb {
        class_prior,
        theta,
        var,
    })
}

/// Adam optimizer with decaying base learning rate.
#[derive(Debug, Clone)]
pub struct AdamOptimizer {
    /// Base learning rate (decays over time).
    pub lr: f64,
    /// LR decay factor per step.
    pub decay: f64,
    /// Minimum learning rate floor.
    pub lr_floor: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub eps: f64,
    /// Total steps taken.
    pub steps: u64,
    m: Vec<f64>,
    v: Vec<f64>,
}

impl AdamOptimizer {
    pub fn new(num_params: usize, lr: f64) -> Self {
        Self {
            lr,
            decay: 0.995,
            lr_floor: lr * 0.1,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
            steps: 0,
            m: vec![0.0; num_params],
            v: vec![0.0; num_params],
        }
    }

    /// One bias-corrected update of `params` along `grads`.
    pub fn apply(&mut self, params: &mut [f64], grads: &[f64]) {
        self.steps += 1;
        let t = self.steps as f64;
        let lr_t = self.lr * (1.0 - self.beta2.powf(t)).sqrt() / (1.0 - self.beta1.powf(t));

        for ((p, g), (m, v)) in params
            .iter_mut()
            .zip(grads)
            .zip(self.m.iter_mut().zip(self.v.iter_mut()))
        {
            *m = self.beta1 * *m + (1.0 - self.beta1) * g;
            *v = self.beta2 * *v + (1.0 - self.beta2) * g * g;
            *p -= lr_t * *m / (v.sqrt() + self.eps);
        }

        self.lr = (self.lr * self.decay).max(self.lr_floor);
    }
}

/// Softmax regression trained on the full batch. Parameters are laid out
/// flat as `[W (classes × features) | b (classes)]`.
pub fn fit_logistic_regression(
    x: &[Vec<f64>],
    y: &[usize],
    n_classes: usize,
    config: &TrainingConfig,
) -> Result<LogisticRegression, TrainingError> {
    let n_features = fit_dimensions(x, y, n_classes)?;
    let n_weights = n_classes * n_features;
    let mut params = vec![0.0; n_weights + n_classes];
    let mut optimizer = AdamOptimizer::new(params.len(), config.learning_rate);
    let n = x.len() as f64;

    let unflatten = |params: &[f64]| LogisticRegression {
        coefficients: params[..n_weights]
            .chunks(n_features)
            .take(n_classes)
            .map(<[f64]>::to_vec)
            .collect(),
        intercepts: params[n_weights..].to_vec(),
    };

    for epoch in 0..config.epochs {
        let model = unflatten(&params);
        let mut grads = vec![0.0; params.len()];
        let mut loss = 0.0;

        for (row, &label) in x.iter().zip(y) {
            let p = model.predict_proba(row);
            loss -= p[label].max(1e-15).ln() / n;
            for c in 0..n_classes {
                let err = (p[c] - if c == label { 1.0 } else { 0.0 }) / n;
                let offset = c * n_features;
                for (g, xi) in grads[offset..offset + n_features].iter_mut().zip(row) {
                    *g += err * xi;
                }
                grads[n_weights + c] += err;
            }
        }

        for (g, w) in grads[..n_weights].iter_mut().zip(&params[..n_weights]) {
            *g += config.l2_penalty * w;
        }
        loss += 0.5 * config.l2_penalty * params[..n_weights].iter().map(|w| w * w).sum::<f64>();

        let norm = grads.iter().map(|g| g * g).sum::<f64>().sqrt();
        if norm > MAX_GRAD_NORM {
            let scale = MAX_GRAD_NORM / norm;
            grads.iter_mut().for_each(|g| *g *= scale);
        }

        optimizer.apply(&mut params, &grads);

        if epoch % 50 == 0 {
            debug!(epoch, loss, lr = optimizer.lr, "Logistic regression epoch");
        }
    }

    Ok(unflatten(&params))
}

pub fn accuracy(truth: &[usize], predicted: &[usize]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let correct = truth.iter().zip(predicted).filter(|(a, b)| a == b).count();
    correct as f64 / truth.len() as f64
}

/// Support-weighted mean of per-class F1 scores.
pub fn f1_weighted(truth: &[usize], predicted: &[usize], n_classes: usize) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let mut total = 0.0;
    for c in 0..n_classes {
        let tp = truth.iter().zip(predicted).filter(|(&t, &p)| t == c && p == c).count() as f64;
        let fp = truth.iter().zip(predicted).filter(|(&t, &p)| t != c && p == c).count() as f64;
        let support = truth.iter().filter(|&&t| t == c).count() as f64;
        let fn_ = support - tp;
        let f1 = if tp == 0.0 {
            0.0
        } else {
            2.0 * tp / (2.0 * tp + fp + fn_)
        };
        total += f1 * support;
    }
    total / truth.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ExerciseId;
    use rand::Rng;
    use rand_distr::StandardNormal;

    /// Two well-separated Gaussian blobs in 4 dimensions.
    fn blobs(per_class: usize) -> (Vec<Vec<f64>>, Vec<usize>) {
        let mut rng = StdRng::seed_from_u64(7);
        let mut x = Vec::new();
        let mut y = Vec::new();
        for (class, center) in [(0usize, -3.0), (1usize, 3.0)] {
            for _ in 0..per_class {
                x.push(
                    (0..4)
                        .map(|_| center + rng.sample::<f64, _>(StandardNormal))
                        .collect(),
                );
                y.push(class);
            }
        }
        (x, y)
    }

    fn quick_config() -> TrainingConfig {
        TrainingConfig {
            epochs: 150,
            ..TrainingConfig::default()
        }
    }

    #[test]
    fn test_stratified_split_keeps_every_class() {
        let y: Vec<usize> = (0..30).map(|i| i % 3).collect();
        let (train, test) = stratified_split(&y, 3, 0.2, 42);
        assert_eq!(train.len() + test.len(), 30);
        assert_eq!(test.len(), 6);
        for c in 0..3 {
            assert_eq!(test.iter().filter(|&&i| y[i] == c).count(), 2);
        }
        assert_eq!(stratified_split(&y, 3, 0.2, 42), (train, test));
    }

    #[test]
    fn test_gaussian_nb_separates_blobs() {
        let (x, y) = blobs(40);
        let model = fit_gaussian_nb(&x, &y, 2, 1e-9).unwrap();
        assert!((model.class_prior[0] - 0.5).abs() < 1e-12);
        let predicted: Vec<usize> = x
            .iter()
            .map(|r| argmax(&model.predict_proba(r)).unwrap())
            .collect();
        assert!(accuracy(&y, &predicted) > 0.99);
    }

    #[test]
    fn test_logistic_regression_separates_blobs() {
        let (x, y) = blobs(40);
        let model = fit_logistic_regression(&x, &y, 2, &quick_config()).unwrap();
        let predicted: Vec<usize> = x
            .iter()
            .map(|r| argmax(&model.predict_proba(r)).unwrap())
            .collect();
        assert!(accuracy(&y, &predicted) > 0.99);
    }

    #[test]
    fn test_degenerate_inputs_are_rejected() {
        let config = quick_config();
        let (x, y) = blobs(5);

        assert!(matches!(
            fit_logistic_regression(&x, &y, 0, &config),
            Err(TrainingError::InvalidInput(_))
        ));
        assert!(matches!(
            fit_logistic_regression(&[], &[], 2, &config),
            Err(TrainingError::EmptyDataset)
        ));
        let featureless = vec![Vec::new(); 4];
        assert!(matches!(
            fit_logistic_regression(&featureless, &[0, 1, 0, 1], 2, &config),
            Err(TrainingError::InvalidInput(_))
        ));
        assert!(matches!(
            fit_logistic_regression(&x, &vec![3; x.len()], 2, &config),
            Err(TrainingError::InvalidInput(_))
        ));
        assert!(matches!(
            fit_gaussian_nb(&featureless, &[0, 1, 0, 1], 2, 1e-9),
            Err(TrainingError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_adam_moves_toward_minimum() {
        // minimize (p - 3)^2
        let mut p = vec![0.0];
        let mut opt = AdamOptimizer::new(1, 0.1);
        for _ in 0..500 {
            let g = vec![2.0 * (p[0] - 3.0)];
            opt.apply(&mut p, &g);
        }
        assert!((p[0] - 3.0).abs() < 0.1, "p = {}", p[0]);
        assert!(opt.lr >= opt.lr_floor);
    }

    #[test]
    fn test_f1_weighted() {
        let truth = [0, 0, 1, 1];
        assert!((f1_weighted(&truth, &truth, 2) - 1.0).abs() < 1e-12);
        // class 0: tp 2, fp 1 -> f1 0.8; class 1: tp 1, fn 1 -> f1 2/3
        let predicted = [0, 0, 0, 1];
        let expected = (0.8 * 2.0 + (2.0 / 3.0) * 2.0) / 4.0;
        assert!((f1_weighted(&truth, &predicted, 2) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_single_class_rejected() {
        let set = TrainingSet {
            schema: FeatureSchema::from_names(vec!["a".to_string()]),
            rows: vec![vec![1.0], vec![2.0]],
            labels: vec!["squat".to_string(), "squat".to_string()],
        };
        assert_eq!(
            ModelTrainer::new(quick_config()).train(&set).unwrap_err(),
            TrainingError::SingleClass("squat".to_string())
        );
    }

    #[test]
    fn test_empty_windows_rejected() {
        assert_eq!(
            TrainingSet::from_windows(&[]).unwrap_err(),
            TrainingError::EmptyDataset
        );
    }

    #[test]
    fn test_synthetic_training_produces_valid_artifact() {
        let config = TrainingConfig {
            exercises: vec![ExerciseId::Squat, ExerciseId::Plank, ExerciseId::JumpingJack],
            windows_per_exercise: 8,
            include_gyro: false,
            epochs: 60,
            ..TrainingConfig::default()
        };
        let outcome = ModelTrainer::new(config)
            .train_synthetic(&SynthesisConfig::default())
            .unwrap();

        assert_eq!(outcome.candidates.len(), 2);
        assert_eq!(outcome.train_size + outcome.test_size, 24);
        let schema = outcome.artifact.validate().unwrap();
        assert_eq!(schema.len(), 75);
        assert_eq!(
            outcome.artifact.label_encoder.as_ref().unwrap().classes,
            vec!["jumping_jack", "plank", "squat"]
        );
        let best = outcome
            .candidates
            .iter()
            .map(|c| c.accuracy)
            .fold(0.0, f64::max);
        assert_eq!(outcome.artifact.accuracy, best);
    }
}
