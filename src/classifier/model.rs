//! Model parameters and inference.
//!
//! Both models emit a probability distribution over class indices in the
//! order they were trained. Callers decode indices via the label encoder.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Serialized model parameters, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelParams {
    GaussianNb(GaussianNb),
    LogisticRegression(LogisticRegression),
}

impl ModelParams {
    pub fn kind(&self) -> &'static str {
        match self {
            ModelParams::GaussianNb(_) => "gaussian_nb",
            ModelParams::LogisticRegression(_) => "logistic_regression",
        }
    }

    pub fn n_classes(&self) -> usize {
        match self {
            ModelParams::GaussianNb(m) => m.class_prior.len(),
            ModelParams::LogisticRegression(m) => m.intercepts.len(),
        }
    }

    /// Check every parameter block against the feature count.
    pub fn check_dimensions(&self, n_features: usize) -> Result<(), String> {
        match self {
            ModelParams::GaussianNb(m) => m.check_dimensions(n_features),
            ModelParams::LogisticRegression(m) => m.check_dimensions(n_features),
        }
    }

    /// Class probabilities for one scaled feature row.
    pub fn predict_proba(&self, x: &[f64]) -> Vec<f64> {
        match self {
            ModelParams::GaussianNb(m) => m.predict_proba(x),
            ModelParams::LogisticRegression(m) => m.predict_proba(x),
        }
    }
}

/// Gaussian Naive Bayes with per-class feature means and variances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianNb {
    pub class_prior: Vec<f64>,
    /// Per-class feature means, `[class][feature]`
    pub theta: Vec<Vec<f64>>,
    /// Per-class feature variances, `[class][feature]`
    pub var: Vec<Vec<f64>>,
}

impl GaussianNb {
    fn check_dimensions(&self, n_features: usize) -> Result<(), String> {
        let classes = self.class_prior.len();
        if classes == 0 {
            return Err("gaussian_nb has no classes".to_string());
        }
        if self.theta.len() != classes || self.var.len() != classes {
            return Err(format!(
                "gaussian_nb has {} priors but {} theta rows and {} var rows",
                classes,
                self.theta.len(),
                self.var.len()
            ));
        }
        for (c, (t, v)) in self.theta.iter().zip(&self.var).enumerate() {
            if t.len() != n_features || v.len() != n_features {
                return Err(format!(
                    "gaussian_nb class {c} has {} means and {} variances for {n_features} features",
                    t.len(),
                    v.len()
                ));
            }
            if v.iter().any(|&s| s.is_nan() || s <= 0.0) {
                return Err(format!("gaussian_nb class {c} has a non-positive variance"));
            }
        }
        Ok(())
    }

    /// Joint log-likelihood per class.
    pub fn joint_log_likelihood(&self, x: &[f64]) -> Vec<f64> {
        self.class_prior
            .iter()
            .zip(self.theta.iter().zip(&self.var))
            .map(|(&prior, (theta, var))| {
                let log_norm: f64 = var.iter().map(|v| (2.0 * PI * v).ln()).sum();
                let mahalanobis: f64 = x
                    .iter()
                    .zip(theta.iter().zip(var))
                    .map(|(xi, (m, v))| (xi - m).powi(2) / v)
                    .sum();
                prior.ln() - 0.5 * log_norm - 0.5 * mahalanobis
            })
            .collect()
    }

    pub fn predict_proba(&self, x: &[f64]) -> Vec<f64> {
        softmax(&self.joint_log_likelihood(x))
    }
}

/// Multinomial logistic regression, `softmax(W x + b)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// `[class][feature]`
    pub coefficients: Vec<Vec<f64>>,
    pub intercepts: Vec<f64>,
}

impl LogisticRegression {
    fn check_dimensions(&self, n_features: usize) -> Result<(), String> {
        let classes = self.intercepts.len();
        if classes == 0 {
            return Err("logistic_regression has no classes".to_string());
        }
        if self.coefficients.len() != classes {
            return Err(format!(
                "logistic_regression has {} intercepts but {} coefficient rows",
                classes,
                self.coefficients.len()
            ));
        }
        if let Some((c, row)) = self
            .coefficients
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != n_features)
        {
            return Err(format!(
                "logistic_regression class {c} has {} coefficients for {n_features} features",
                row.len()
            ));
        }
        Ok(())
    }

    pub fn decision_function(&self, x: &[f64]) -> Vec<f64> {
        self.coefficients
            .iter()
            .zip(&self.intercepts)
            .map(|(w, b)| b + w.iter().zip(x).map(|(wi, xi)| wi * xi).sum::<f64>())
            .collect()
    }

    pub fn predict_proba(&self, x: &[f64]) -> Vec<f64> {
        softmax(&self.decision_function(x))
    }
}

/// Numerically stable softmax (log-sum-exp shift).
pub fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|z| (z - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Index of the largest value; ties resolve to the first.
pub fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}
