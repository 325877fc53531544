//! Criterion Classifier
//!
//! Statistical fallback that labels red-flag matches the rule table left
//! without a criterion.
//!
//! ## Architecture
//!
//! ```text
//! labeled corpus (text, label)
//!     ↓  train_classifier (offline, seeded split)
//! TfidfVectorizer + LogisticRegression
//!     ↓  ClassifierModel::save
//! model/tfidf_vectorizer.bin + model/classifier_model.bin
//!     ↓  ClassifierModel::load (fails with ModelUnavailable)
//! predict(text) -> criterion
//! ```

pub mod artifact;
pub mod logistic;
pub mod tfidf;
pub mod training;

pub use artifact::{ArtifactHeader, ClassifierModel, MODEL_FILE, VECTORIZER_FILE};
pub use logistic::{FitSummary, LogisticRegression, TrainParams};
pub use tfidf::{SparseVector, TfidfVectorizer};
pub use training::{
    load_training_csv, train_classifier, train_test_split, ClassificationReport, LabelMetrics,
    TrainingOutcome,
};

/// Anything that can assign a criterion label to a phrase.
///
/// Implementations must be deterministic: the same text always yields the same label.
pub trait CriterionPredictor: Send + Sync {
    fn predict_criterion(&self, text: &str) -> String;
}

impl CriterionPredictor for ClassifierModel {
    fn predict_criterion(&self, text: &str) -> String {
        self.predict(text).to_string()
    }
}
