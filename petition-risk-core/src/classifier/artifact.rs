use super::logistic::LogisticRegression;
use super::tfidf::TfidfVectorizer;
use crate::config::ClassifierConfig;
use crate::error::{RiskError, RiskResult};
use crate::types::TrainingExample;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Version constants for artifact compatibility
pub mod versions {
    /// Bump when the persisted layout of either blob changes.
    pub const ARTIFACT_FORMAT_VERSION: u32 = 1;
    pub const CRATE_VERSION: &str = env!("CARGO_PKG_VERSION");
}

pub const VECTORIZER_FILE: &str = "tfidf_vectorizer.bin";
pub const MODEL_FILE: &str = "classifier_model.bin";

const VECTORIZER_KIND: &str = "tfidf_vectorizer";
const MODEL_KIND: &str = "logistic_regression";

/// Self-describing prefix written ahead of each blob's payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactHeader {
    pub format_version: u32,
    pub kind: String,
    /// Shared by the two blobs of one training run
    pub artifact_id: String,
    pub crate_version: String,
    pub trained_at: DateTime<Utc>,
}

impl ArtifactHeader {
    fn new(kind: &str, artifact_id: &str, trained_at: DateTime<Utc>) -> Self {
        Self {
            format_version: versions::ARTIFACT_FORMAT_VERSION,
            kind: kind.to_string(),
            artifact_id: artifact_id.to_string(),
            crate_version: versions::CRATE_VERSION.to_string(),
            trained_at,
        }
    }
}

/// Identity of a training run: hash of the corpus (in order) and the training parameters.
pub fn compute_artifact_id(examples: &[TrainingExample], config: &ClassifierConfig) -> RiskResult<String> {
    let config_json = serde_json::to_string(config)
        .map_err(|e| RiskError::TrainingDataInvalid(format!("failed to hash config: {e}")))?;

    let mut hasher = Sha256::new();
    hasher.update(config_json.as_bytes());
    for example in examples {
        hasher.update((example.text.len() as u64).to_le_bytes());
        hasher.update(example.text.as_bytes());
        hasher.update((example.label.len() as u64).to_le_bytes());
        hasher.update(example.label.as_bytes());
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Trained feature transform + linear model, loaded read-only for inference.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierModel {
    vectorizer: TfidfVectorizer,
    model: LogisticRegression,
    artifact_id: String,
    trained_at: DateTime<Utc>,
}

impl ClassifierModel {
    pub fn new(
        vectorizer: TfidfVectorizer,
        model: LogisticRegression,
        artifact_id: String,
    ) -> RiskResult<Self> {
        let classifier = Self {
            vectorizer,
            model,
            artifact_id,
            trained_at: Utc::now(),
        };
        classifier.validate()?;
        Ok(classifier)
    }

    pub fn vectorizer_path(dir: impl AsRef<Path>) -> PathBuf {
        dir.as_ref().join(VECTORIZER_FILE)
    }

    pub fn model_path(dir: impl AsRef<Path>) -> PathBuf {
        dir.as_ref().join(MODEL_FILE)
    }

    /// Load both blobs from `dir`. Anything missing, corrupt, from another
    /// format version, or from two different training runs is `ModelUnavailable`.
    pub fn load(dir: impl AsRef<Path>) -> RiskResult<Self> {
        let dir = dir.as_ref();
        let (vectorizer_header, vectorizer): (_, TfidfVectorizer) =
            read_blob(&Self::vectorizer_path(dir), VECTORIZER_KIND)?;
        let (model_header, model): (_, LogisticRegression) =
            read_blob(&Self::model_path(dir), MODEL_KIND)?;

        if vectorizer_header.artifact_id != model_header.artifact_id {
            return Err(RiskError::ModelUnavailable(format!(
                "vectorizer ({}) and model ({}) come from different training runs",
                vectorizer_header.artifact_id, model_header.artifact_id
            )));
        }

        let classifier = Self {
            vectorizer,
            model,
            artifact_id: model_header.artifact_id,
            trained_at: model_header.trained_at,
        };
        classifier.validate()?;

        tracing::info!(
            "🧠 Loaded classifier {} ({} classes, {} features) from {}",
            short_id(&classifier.artifact_id),
            classifier.classes().len(),
            classifier.vectorizer.n_features(),
            dir.display()
        );
        Ok(classifier)
    }

    /// Write both blobs into `dir`, each through a temporary file and rename.
    pub fn save(&self, dir: impl AsRef<Path>) -> RiskResult<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let vectorizer_header = ArtifactHeader::new(VECTORIZER_KIND, &self.artifact_id, self.trained_at);
        let model_header = ArtifactHeader::new(MODEL_KIND, &self.artifact_id, self.trained_at);
        write_blob(&Self::vectorizer_path(dir), &vectorizer_header, &self.vectorizer)?;
        write_blob(&Self::model_path(dir), &model_header, &self.model)?;

        tracing::info!(
            "💾 Saved classifier {} to {}",
            short_id(&self.artifact_id),
            dir.display()
        );
        Ok(())
    }

    fn validate(&self) -> RiskResult<()> {
        if !self.vectorizer.is_consistent() {
            return Err(RiskError::ModelUnavailable(
                "feature transform is internally inconsistent".to_string(),
            ));
        }
        if !self.model.is_consistent() {
            return Err(RiskError::ModelUnavailable(
                "linear model is internally inconsistent".to_string(),
            ));
        }
        if self.model.n_features() != self.vectorizer.n_features() {
            return Err(RiskError::ModelUnavailable(format!(
                "feature space mismatch: model expects {} features, transform produces {}",
                self.model.n_features(),
                self.vectorizer.n_features()
            )));
        }
        Ok(())
    }

    /// Predicted criterion for `text`. Deterministic for a fixed artifact.
    pub fn predict(&self, text: &str) -> &str {
        self.model.predict(&self.vectorizer.transform(text))
    }

    /// Predicted criterion with its softmax probability.
    pub fn predict_with_confidence(&self, text: &str) -> (&str, f64) {
        let row = self.vectorizer.transform(text);
        let index = self.model.predict_index(&row);
        let probability = self.model.predict_proba(&row)[index];
        (&self.model.classes()[index], probability)
    }

    pub fn classes(&self) -> &[String] {
        self.model.classes()
    }

    pub fn artifact_id(&self) -> &str {
        &self.artifact_id
    }

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }

    pub fn vectorizer(&self) -> &TfidfVectorizer {
        &self.vectorizer
    }
}

fn short_id(artifact_id: &str) -> &str {
    artifact_id.get(..12).unwrap_or(artifact_id)
}

fn read_blob<T: DeserializeOwned>(path: &Path, expected_kind: &str) -> RiskResult<(ArtifactHeader, T)> {
    let unavailable =
        |reason: String| RiskError::ModelUnavailable(format!("{}: {reason}", path.display()));

    let file = fs::File::open(path).map_err(|e| unavailable(e.to_string()))?;
    let mut reader = BufReader::new(file);

    let header: ArtifactHeader = bincode::deserialize_from(&mut reader)
        .map_err(|e| unavailable(format!("unreadable header: {e}")))?;
    if header.format_version != versions::ARTIFACT_FORMAT_VERSION {
        return Err(unavailable(format!(
            "format version {} is not supported (expected {})",
            header.format_version,
            versions::ARTIFACT_FORMAT_VERSION
        )));
    }
    if header.kind != expected_kind {
        return Err(unavailable(format!(
            "expected a {expected_kind} blob, found {}",
            header.kind
        )));
    }

    let payload: T = bincode::deserialize_from(&mut reader)
        .map_err(|e| unavailable(format!("corrupt payload: {e}")))?;
    Ok((header, payload))
}

fn write_blob<T: Serialize>(path: &Path, header: &ArtifactHeader, payload: &T) -> RiskResult<()> {
    let tmp_path = path.with_extension("bin.tmp");
    {
        let file = fs::File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        bincode::serialize_into(&mut writer, header).map_err(|e| {
            RiskError::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
        })?;
        bincode::serialize_into(&mut writer, payload).map_err(|e| {
            RiskError::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
        })?;
        writer.flush()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::logistic::TrainParams;
    use tempfile::TempDir;

    fn tiny_model(artifact_id: &str) -> ClassifierModel {
        let texts = ["no award evidence", "no press coverage"];
        let labels = vec!["award".to_string(), "media".to_string()];
        let vectorizer = TfidfVectorizer::fit(&texts, 1, 2, 100).unwrap();
        let rows: Vec<_> = texts.iter().map(|t| vectorizer.transform(t)).collect();
        let params = TrainParams {
            c: 10.0,
            learning_rate: 1.0,
            max_iter: 200,
            tolerance: 1e-6,
        };
        let (model, _) =
            LogisticRegression::fit(&rows, &labels, vectorizer.n_features(), params).unwrap();
        ClassifierModel::new(vectorizer, model, artifact_id.to_string()).unwrap()
    }

    #[test]
    fn save_then_load_predicts_identically() {
        let dir = TempDir::new().unwrap();
        let model = tiny_model("abc123");
        model.save(dir.path()).unwrap();

        let loaded = ClassifierModel::load(dir.path()).unwrap();
        assert_eq!(loaded.artifact_id(), "abc123");
        for phrase in ["award evidence missing", "press coverage", "unrelated"] {
            assert_eq!(loaded.predict(phrase), model.predict(phrase));
        }
    }

    #[test]
    fn missing_directory_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let err = ClassifierModel::load(dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, RiskError::ModelUnavailable(_)));
    }

    #[test]
    fn corrupt_blob_is_unavailable() {
        let dir = TempDir::new().unwrap();
        tiny_model("abc123").save(dir.path()).unwrap();
        fs::write(ClassifierModel::model_path(dir.path()), b"garbage").unwrap();

        let err = ClassifierModel::load(dir.path()).unwrap_err();
        assert!(matches!(err, RiskError::ModelUnavailable(_)));
    }

    #[test]
    fn blobs_from_different_runs_are_rejected() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        tiny_model("run-one").save(first.path()).unwrap();
        tiny_model("run-two").save(second.path()).unwrap();
        fs::copy(
            ClassifierModel::model_path(second.path()),
            ClassifierModel::model_path(first.path()),
        )
        .unwrap();

        let err = ClassifierModel::load(first.path()).unwrap_err();
        assert!(matches!(err, RiskError::ModelUnavailable(msg) if msg.contains("different training runs")));
    }

    /// Same field layout as `LogisticRegression`, so arbitrary payloads can be written.
    #[derive(Serialize)]
    struct RawModel {
        classes: Vec<String>,
        weights: Vec<Vec<f64>>,
        intercepts: Vec<f64>,
        n_features: usize,
    }

    fn overwrite_model_blob(dir: &Path, artifact_id: &str, payload: &RawModel) {
        let header = ArtifactHeader::new(MODEL_KIND, artifact_id, Utc::now());
        write_blob(&ClassifierModel::model_path(dir), &header, payload).unwrap();
    }

    fn expect_unavailable(dir: &Path, needle: &str) {
        match ClassifierModel::load(dir) {
            Err(RiskError::ModelUnavailable(msg)) => assert!(msg.contains(needle), "{msg}"),
            other => panic!("expected ModelUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn newer_format_version_is_rejected() {
        let dir = TempDir::new().unwrap();
        let model = tiny_model("abc123");
        model.save(dir.path()).unwrap();

        let mut header = ArtifactHeader::new(MODEL_KIND, "abc123", model.trained_at());
        header.format_version = versions::ARTIFACT_FORMAT_VERSION + 1;
        write_blob(&ClassifierModel::model_path(dir.path()), &header, &model.model).unwrap();

        expect_unavailable(dir.path(), "format version");
    }

    #[test]
    fn swapped_blobs_are_rejected() {
        let dir = TempDir::new().unwrap();
        tiny_model("abc123").save(dir.path()).unwrap();

        let vectorizer = ClassifierModel::vectorizer_path(dir.path());
        let model = ClassifierModel::model_path(dir.path());
        let parked = dir.path().join("parked.bin");
        fs::rename(&vectorizer, &parked).unwrap();
        fs::rename(&model, &vectorizer).unwrap();
        fs::rename(&parked, &model).unwrap();

        expect_unavailable(dir.path(), "expected a tfidf_vectorizer blob");
    }

    #[test]
    fn feature_space_mismatch_is_rejected_by_new() {
        let base = tiny_model("abc123");
        let n_features = base.vectorizer.n_features();
        let rows = vec![vec![(0, 1.0)], vec![(n_features, 1.0)]];
        let labels = vec!["award".to_string(), "media".to_string()];
        let params = TrainParams {
            c: 1.0,
            learning_rate: 1.0,
            max_iter: 10,
            tolerance: 1e-6,
        };
        let (wider, _) = LogisticRegression::fit(&rows, &labels, n_features + 1, params).unwrap();

        match ClassifierModel::new(base.vectorizer.clone(), wider, "abc123".to_string()) {
            Err(RiskError::ModelUnavailable(msg)) => {
                assert!(msg.contains("feature space mismatch"), "{msg}")
            }
            other => panic!("expected ModelUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn feature_space_mismatch_is_rejected_on_load() {
        let dir = TempDir::new().unwrap();
        let model = tiny_model("abc123");
        model.save(dir.path()).unwrap();

        let n_features = model.vectorizer.n_features() + 3;
        overwrite_model_blob(
            dir.path(),
            "abc123",
            &RawModel {
                classes: vec!["award".to_string(), "media".to_string()],
                weights: vec![vec![0.0; n_features]; 2],
                intercepts: vec![0.0, 0.0],
                n_features,
            },
        );

        expect_unavailable(dir.path(), "feature space mismatch");
    }

    #[test]
    fn blank_class_names_are_rejected_on_load() {
        let dir = TempDir::new().unwrap();
        let model = tiny_model("abc123");
        model.save(dir.path()).unwrap();

        let n_features = model.vectorizer.n_features();
        overwrite_model_blob(
            dir.path(),
            "abc123",
            &RawModel {
                classes: vec!["".to_string(), "media".to_string()],
                weights: vec![vec![0.0; n_features]; 2],
                intercepts: vec![0.0, 0.0],
                n_features,
            },
        );

        expect_unavailable(dir.path(), "inconsistent");
    }

    #[test]
    fn artifact_id_depends_on_corpus_and_config() {
        let config = ClassifierConfig::default();
        let a = vec![TrainingExample::new("no evidence", "award")];
        let b = vec![TrainingExample::new("no evidence", "media")];
        assert_eq!(
            compute_artifact_id(&a, &config).unwrap(),
            compute_artifact_id(&a, &config).unwrap()
        );
        assert_ne!(
            compute_artifact_id(&a, &config).unwrap(),
            compute_artifact_id(&b, &config).unwrap()
        );
        let other_seed = ClassifierConfig { seed: 7, ..ClassifierConfig::default() };
        assert_ne!(
            compute_artifact_id(&a, &config).unwrap(),
            compute_artifact_id(&a, &other_seed).unwrap()
        );
    }
}
