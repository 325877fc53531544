use super::artifact::{compute_artifact_id, ClassifierModel};
use super::logistic::{FitSummary, LogisticRegression, TrainParams};
use super::tfidf::TfidfVectorizer;
use crate::config::ClassifierConfig;
use crate::error::{RiskError, RiskResult};
use crate::types::TrainingExample;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

/// Read a `text,label` CSV corpus. Blank text or label cells are rejected.
pub fn load_training_csv(path: impl AsRef<Path>) -> RiskResult<Vec<TrainingExample>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path).map_err(|e| {
        RiskError::TrainingDataInvalid(format!("cannot open {}: {e}", path.display()))
    })?;

    let mut examples = Vec::new();
    for (index, row) in reader.deserialize::<TrainingExample>().enumerate() {
        // +2: header line and 1-based numbering
        let line = index + 2;
        let example = row.map_err(|e| {
            RiskError::TrainingDataInvalid(format!("{} line {line}: {e}", path.display()))
        })?;
        if example.text.trim().is_empty() || example.label.trim().is_empty() {
            return Err(RiskError::TrainingDataInvalid(format!(
                "{} line {line}: text and label must be non-empty",
                path.display()
            )));
        }
        examples.push(example);
    }

    tracing::info!("📚 Loaded {} training examples from {}", examples.len(), path.display());
    Ok(examples)
}

/// Seeded shuffle split. The test share is `ceil(test_size · n)` rows; the
/// same corpus, fraction and seed always yield the same split.
pub fn train_test_split(
    examples: &[TrainingExample],
    test_size: f64,
    seed: u64,
) -> RiskResult<(Vec<TrainingExample>, Vec<TrainingExample>)> {
    if !(0.0..1.0).contains(&test_size) {
        return Err(RiskError::TrainingDataInvalid(format!(
            "test_size must be in [0, 1), got {test_size}"
        )));
    }

    let n = examples.len();
    let n_test = (test_size * n as f64).ceil() as usize;
    if n == 0 || n_test >= n {
        return Err(RiskError::TrainingDataInvalid(format!(
            "{n} examples leave no training rows at test_size {test_size}"
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let pick = |slice: &[usize]| slice.iter().map(|&i| examples[i].clone()).collect::<Vec<_>>();
    let test = pick(&indices[..n_test]);
    let train = pick(&indices[n_test..]);
    Ok((train, test))
}

/// Everything a training run produces.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model: ClassifierModel,
    /// `None` when the held-out split is empty
    pub report: Option<ClassificationReport>,
    pub fit: FitSummary,
    pub train_size: usize,
    pub test_size: usize,
}

/// Offline training job: split, fit the transform on the training rows, fit
/// the linear model, evaluate on the held-out rows.
pub fn train_classifier(
    examples: &[TrainingExample],
    config: &ClassifierConfig,
) -> RiskResult<TrainingOutcome> {
    if let Some(index) = examples.iter().position(|e| e.label.trim().is_empty()) {
        return Err(RiskError::TrainingDataInvalid(format!(
            "example #{index} has a blank label"
        )));
    }

    let (train, test) = train_test_split(examples, config.test_size, config.seed)?;
    tracing::info!("🔀 Split corpus: {} train / {} test", train.len(), test.len());

    let texts: Vec<&str> = train.iter().map(|e| e.text.as_str()).collect();
    let labels: Vec<String> = train.iter().map(|e| e.label.clone()).collect();

    let vectorizer = TfidfVectorizer::fit(&texts, config.ngram_min, config.ngram_max, config.max_features)?;
    let rows: Vec<_> = texts.iter().map(|t| vectorizer.transform(t)).collect();

    let params = TrainParams {
        c: config.c,
        learning_rate: config.learning_rate,
        max_iter: config.max_iter,
        tolerance: config.tolerance,
    };
    let (linear, fit) = LogisticRegression::fit(&rows, &labels, vectorizer.n_features(), params)?;
    if !fit.converged {
        tracing::warn!(
            "⚠️  Classifier stopped after {} iterations without reaching tolerance {}",
            fit.iterations,
            config.tolerance
        );
    }

    let artifact_id = compute_artifact_id(examples, config)?;
    let model = ClassifierModel::new(vectorizer, linear, artifact_id)?;

    let report = if test.is_empty() {
        None
    } else {
        let truth: Vec<&str> = test.iter().map(|e| e.label.as_str()).collect();
        let predicted: Vec<&str> = test.iter().map(|e| model.predict(&e.text)).collect();
        Some(ClassificationReport::from_predictions(&truth, &predicted))
    };

    Ok(TrainingOutcome {
        model,
        report,
        fit,
        train_size: train.len(),
        test_size: test.len(),
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-label precision / recall / F1 plus accuracy and averages.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    pub labels: Vec<LabelMetrics>,
    pub accuracy: f64,
    pub macro_avg: LabelMetrics,
    pub weighted_avg: LabelMetrics,
}

impl ClassificationReport {
    pub fn from_predictions(truth: &[&str], predicted: &[&str]) -> Self {
        let label_set: BTreeSet<&str> = truth.iter().chain(predicted.iter()).copied().collect();
        let total = truth.len();

        let labels: Vec<LabelMetrics> = label_set
            .into_iter()
            .map(|label| {
                let true_positive = truth
                    .iter()
                    .zip(predicted.iter())
                    .filter(|(t, p)| **t == label && **p == label)
                    .count();
                let predicted_count = predicted.iter().filter(|p| **p == label).count();
                let support = truth.iter().filter(|t| **t == label).count();

                let precision = ratio(true_positive, predicted_count);
                let recall = ratio(true_positive, support);
                LabelMetrics {
                    label: label.to_string(),
                    precision,
                    recall,
                    f1: harmonic_mean(precision, recall),
                    support,
                }
            })
            .collect();

        let correct = truth.iter().zip(predicted.iter()).filter(|(t, p)| t == p).count();
        let n_labels = labels.len().max(1) as f64;
        let macro_avg = LabelMetrics {
            label: "macro avg".to_string(),
            precision: labels.iter().map(|m| m.precision).sum::<f64>() / n_labels,
            recall: labels.iter().map(|m| m.recall).sum::<f64>() / n_labels,
            f1: labels.iter().map(|m| m.f1).sum::<f64>() / n_labels,
            support: total,
        };
        let weight = |metric: fn(&LabelMetrics) -> f64| {
            if total == 0 {
                0.0
            } else {
                labels.iter().map(|m| metric(m) * m.support as f64).sum::<f64>() / total as f64
            }
        };
        let weighted_avg = LabelMetrics {
            label: "weighted avg".to_string(),
            precision: weight(|m| m.precision),
            recall: weight(|m| m.recall),
            f1: weight(|m| m.f1),
            support: total,
        };

        Self {
            accuracy: ratio(correct, total),
            labels,
            macro_avg,
            weighted_avg,
        }
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn harmonic_mean(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .labels
            .iter()
            .map(|m| m.label.len())
            .chain(std::iter::once("weighted avg".len()))
            .max()
            .unwrap_or(12);

        writeln!(f, "{:>width$} {:>9} {:>9} {:>9} {:>9}", "", "precision", "recall", "f1-score", "support")?;
        writeln!(f)?;
        for m in &self.labels {
            write_row(f, m, width)?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        )?;
        write_row(f, &self.macro_avg, width)?;
        write_row(f, &self.weighted_avg, width)
    }
}

fn write_row(f: &mut fmt::Formatter<'_>, m: &LabelMetrics, width: usize) -> fmt::Result {
    writeln!(
        f,
        "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
        m.label, m.precision, m.recall, m.f1, m.support
    )
}
