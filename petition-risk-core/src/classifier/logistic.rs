use super::tfidf::SparseVector;
use crate::error::{RiskError, RiskResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainParams {
    /// Inverse L2 regularisation strength
    pub c: f64,
    pub learning_rate: f64,
    pub max_iter: usize,
    pub tolerance: f64,
}

/// Outcome of a fit: how many iterations ran and whether the gradient tolerance was reached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitSummary {
    pub iterations: usize,
    pub converged: bool,
    pub final_loss: f64,
}

/// Multinomial (softmax) logistic regression over sparse rows.
///
/// Classes are stored sorted; on equal scores the lower class index wins, so
/// prediction is fully deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    classes: Vec<String>,
    /// `weights[class][feature]`
    weights: Vec<Vec<f64>>,
    intercepts: Vec<f64>,
    n_features: usize,
}

impl LogisticRegression {
    /// Fit by full-batch gradient descent on
    /// `mean cross-entropy + ||W||² / (2·C·n)` (intercepts unpenalised).
    pub fn fit(
        rows: &[SparseVector],
        labels: &[String],
        n_features: usize,
        params: TrainParams,
    ) -> RiskResult<(Self, FitSummary)> {
        if rows.is_empty() || rows.len() != labels.len() {
            return Err(RiskError::TrainingDataInvalid(format!(
                "need matching, non-empty rows and labels (got {} rows, {} labels)",
                rows.len(),
                labels.len()
            )));
        }
        if let Some(index) = labels.iter().position(|label| label.trim().is_empty()) {
            return Err(RiskError::TrainingDataInvalid(format!(
                "label #{index} is blank; every row needs a criterion"
            )));
        }
        if !(params.c > 0.0) || !(params.learning_rate > 0.0) {
            return Err(RiskError::TrainingDataInvalid(
                "c and learning_rate must be positive".to_string(),
            ));
        }

        let mut classes: Vec<String> = labels.to_vec();
        classes.sort();
        classes.dedup();

        let targets: Vec<usize> = labels
            .iter()
            .map(|label| classes.binary_search(label).unwrap_or(0))
            .collect();

        let n_classes = classes.len();
        let n_samples = rows.len() as f64;
        let penalty = 1.0 / (params.c * n_samples);

        let mut model = Self {
            classes,
            weights: vec![vec![0.0; n_features]; n_classes],
            intercepts: vec![0.0; n_classes],
            n_features,
        };

        let mut summary = FitSummary {
            iterations: 0,
            converged: false,
            final_loss: f64::NAN,
        };

        for iteration in 0..params.max_iter {
            let mut grad_w = vec![vec![0.0; n_features]; n_classes];
            let mut grad_b = vec![0.0; n_classes];
            let mut loss = 0.0;

            for (row, &target) in rows.iter().zip(targets.iter()) {
                let probabilities = softmax(&model.decision_function(row));
                loss -= probabilities[target].max(f64::MIN_POSITIVE).ln();

                for (class, probability) in probabilities.iter().enumerate() {
                    let error = probability - if class == target { 1.0 } else { 0.0 };
                    grad_b[class] += error / n_samples;
                    for &(feature, value) in row {
                        grad_w[class][feature] += error * value / n_samples;
                    }
                }
            }

            let mut squared_norm = 0.0;
            for (class_grad, class_weights) in grad_w.iter_mut().zip(model.weights.iter()) {
                for (g, w) in class_grad.iter_mut().zip(class_weights.iter()) {
                    *g += penalty * w;
                    squared_norm += w * w;
                }
            }
            summary.final_loss = loss / n_samples + 0.5 * penalty * squared_norm;
            summary.iterations = iteration;

            let largest = grad_w
                .iter()
                .flatten()
                .chain(grad_b.iter())
                .fold(0.0_f64, |acc, g| acc.max(g.abs()));
            if largest < params.tolerance {
                summary.converged = true;
                break;
            }

            for (class_weights, class_grad) in model.weights.iter_mut().zip(grad_w.iter()) {
                for (w, g) in class_weights.iter_mut().zip(class_grad.iter()) {
                    *w -= params.learning_rate * g;
                }
            }
            for (b, g) in model.intercepts.iter_mut().zip(grad_b.iter()) {
                *b -= params.learning_rate * g;
            }
            summary.iterations = iteration + 1;
        }

        Ok((model, summary))
    }

    /// Raw per-class scores `W·x + b`.
    pub fn decision_function(&self, row: &SparseVector) -> Vec<f64> {
        self.weights
            .iter()
            .zip(self.intercepts.iter())
            .map(|(class_weights, intercept)| {
                intercept
                    + row
                        .iter()
                        .filter(|(feature, _)| *feature < self.n_features)
                        .map(|&(feature, value)| class_weights[feature] * value)
                        .sum::<f64>()
            })
            .collect()
    }

    pub fn predict_proba(&self, row: &SparseVector) -> Vec<f64> {
        softmax(&self.decision_function(row))
    }

    /// Index of the winning class.
    pub fn predict_index(&self, row: &SparseVector) -> usize {
        let scores = self.decision_function(row);
        let mut best = 0;
        for (index, score) in scores.iter().enumerate().skip(1) {
            if *score > scores[best] {
                best = index;
            }
        }
        best
    }

    pub fn predict(&self, row: &SparseVector) -> &str {
        &self.classes[self.predict_index(row)]
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Internal consistency check used when loading a persisted model.
    pub(crate) fn is_consistent(&self) -> bool {
        !self.classes.is_empty()
            && self.classes.iter().all(|class| !class.trim().is_empty())
            && self.weights.len() == self.classes.len()
            && self.intercepts.len() == self.classes.len()
            && self.weights.iter().all(|w| w.len() == self.n_features)
            && self
                .weights
                .iter()
                .flatten()
                .chain(self.intercepts.iter())
                .all(|v| v.is_finite())
    }
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}
