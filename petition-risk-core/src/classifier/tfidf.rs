use crate::error::{RiskError, RiskResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

/// Tokens are runs of two or more word characters.
const TOKEN_PATTERN: &str = r"(?u)\b\w\w+\b";

fn token_regex() -> &'static Regex {
    static TOKEN_REGEX: OnceLock<Regex> = OnceLock::new();
    TOKEN_REGEX.get_or_init(|| Regex::new(TOKEN_PATTERN).expect("token pattern is a valid regex"))
}

/// Sparse row: `(feature index, weight)` sorted by index.
pub type SparseVector = Vec<(usize, f64)>;

/// Word n-gram TF-IDF transform.
///
/// Fitted once on the training corpus and persisted with the model; inference
/// always reuses the fitted vocabulary and idf weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    ngram_min: usize,
    ngram_max: usize,
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
}

impl TfidfVectorizer {
    /// Fit vocabulary and idf weights.
    ///
    /// When the corpus yields more than `max_features` distinct terms, the most
    /// frequent terms (summed over the corpus) are kept, ties broken alphabetically.
    /// Feature indices follow alphabetical term order.
    pub fn fit<S: AsRef<str>>(
        documents: &[S],
        ngram_min: usize,
        ngram_max: usize,
        max_features: usize,
    ) -> RiskResult<Self> {
        if ngram_min == 0 || ngram_min > ngram_max {
            return Err(RiskError::TrainingDataInvalid(format!(
                "invalid n-gram range ({ngram_min}, {ngram_max})"
            )));
        }
        if max_features == 0 {
            return Err(RiskError::TrainingDataInvalid(
                "max_features must be positive".to_string(),
            ));
        }

        let mut term_frequency: HashMap<String, usize> = HashMap::new();
        let mut document_frequency: HashMap<String, usize> = HashMap::new();

        for document in documents {
            let counts = count_terms(document.as_ref(), ngram_min, ngram_max);
            for (term, count) in counts {
                *term_frequency.entry(term.clone()).or_insert(0) += count;
                *document_frequency.entry(term).or_insert(0) += 1;
            }
        }

        if term_frequency.is_empty() {
            return Err(RiskError::TrainingDataInvalid(
                "empty vocabulary; training texts contain no tokens".to_string(),
            ));
        }

        let mut ranked: Vec<(String, usize)> = term_frequency.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(max_features);

        let mut terms: Vec<String> = ranked.into_iter().map(|(term, _)| term).collect();
        terms.sort();

        let n_documents = documents.len() as f64;
        let idf = terms
            .iter()
            .map(|term| {
                let df = document_frequency.get(term).copied().unwrap_or(0) as f64;
                ((1.0 + n_documents) / (1.0 + df)).ln() + 1.0
            })
            .collect();

        let vocabulary = terms
            .into_iter()
            .enumerate()
            .map(|(index, term)| (term, index))
            .collect();

        Ok(Self {
            ngram_min,
            ngram_max,
            vocabulary,
            idf,
        })
    }

    /// L2-normalised TF-IDF row for `text`. Unknown terms are ignored; text with
    /// no known terms yields an empty row.
    pub fn transform(&self, text: &str) -> SparseVector {
        let mut row: SparseVector = count_terms(text, self.ngram_min, self.ngram_max)
            .into_iter()
            .filter_map(|(term, count)| {
                self.vocabulary
                    .get(&term)
                    .map(|&index| (index, count as f64 * self.idf[index]))
            })
            .collect();
        row.sort_by_key(|(index, _)| *index);

        let norm = row.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, weight) in row.iter_mut() {
                *weight /= norm;
            }
        }
        row
    }

    pub fn n_features(&self) -> usize {
        self.idf.len()
    }

    pub fn ngram_range(&self) -> (usize, usize) {
        (self.ngram_min, self.ngram_max)
    }

    pub fn feature_index(&self, term: &str) -> Option<usize> {
        self.vocabulary.get(term).copied()
    }

    /// Internal consistency check used when loading a persisted transform.
    pub(crate) fn is_consistent(&self) -> bool {
        self.ngram_min >= 1
            && self.ngram_min <= self.ngram_max
            && self.vocabulary.len() == self.idf.len()
            && self.vocabulary.values().all(|&index| index < self.idf.len())
            && self.idf.iter().all(|w| w.is_finite())
    }
}

/// Lower-cased word tokens of `text`.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    token_regex()
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

fn count_terms(text: &str, ngram_min: usize, ngram_max: usize) -> HashMap<String, usize> {
    let tokens = tokenize(text);
    let mut counts = HashMap::new();
    for n in ngram_min..=ngram_max {
        for window in tokens.windows(n) {
            *counts.entry(window.join(" ")).or_insert(0) += 1;
        }
    }
    counts
}
