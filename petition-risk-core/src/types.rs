use crate::error::{RiskError, RiskResult};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Default tag for text that precedes (or sits outside) any recognised header.
pub const INTRODUCTION: &str = "introduction";

// ===== SEGMENTATION =====

/// A contiguous run of document lines filed under one topic tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub raw_text: String,
}

// ===== MATCHING =====

/// One red-flag hit: a rule pattern found in (or containing) a sentence.
///
/// `criterion` is `None` when the rule table had no label for the pattern;
/// the classifier back-fill pass fills it later and never changes it again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedFlagMatch {
    #[serde(default, deserialize_with = "deserialize_criterion")]
    pub criterion: Option<String>,
    pub pattern: String,
    pub sentence: String,
    /// Not persisted per entry: the section is the key the entry is stored under.
    #[serde(skip)]
    pub section: String,
}

impl RedFlagMatch {
    pub fn is_labeled(&self) -> bool {
        self.criterion.is_some()
    }
}

/// Missing, `null` and blank criteria all read back as absent.
fn deserialize_criterion<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|criterion| !criterion.trim().is_empty()))
}

// ===== ANALYSIS RESULT =====

/// The persisted unit of work handed from analysis to back-fill and reporting.
///
/// Sections keep document order and only sections with at least one match are stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub filename: String,
    #[serde(default)]
    pub sections: IndexMap<String, Vec<RedFlagMatch>>,
}

impl AnalysisResult {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            sections: IndexMap::new(),
        }
    }

    /// Append matches under `section`. Empty batches leave the result untouched.
    pub fn add_matches(&mut self, section: &str, matches: Vec<RedFlagMatch>) {
        if matches.is_empty() {
            return;
        }
        self.sections
            .entry(section.to_string())
            .or_default()
            .extend(matches);
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn total_matches(&self) -> usize {
        self.sections.values().map(Vec::len).sum()
    }

    pub fn unlabeled_count(&self) -> usize {
        self.matches().filter(|m| !m.is_labeled()).count()
    }

    pub fn matches(&self) -> impl Iterator<Item = &RedFlagMatch> {
        self.sections.values().flatten()
    }

    pub fn to_json_pretty(&self) -> RiskResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| RiskError::ResultMalformed(format!("failed to serialize result: {e}")))
    }

    /// Parse a persisted result and restore each entry's section name from its key.
    pub fn from_json(json: &str) -> RiskResult<Self> {
        let mut result: AnalysisResult = serde_json::from_str(json)
            .map_err(|e| RiskError::ResultMalformed(e.to_string()))?;
        for (section, matches) in result.sections.iter_mut() {
            for item in matches.iter_mut() {
                item.section = section.clone();
            }
        }
        Ok(result)
    }
}

// ===== SEVERITY =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }

    /// Capitalised form used in rendered reports.
    pub fn label(&self) -> &'static str {
        match self {
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ===== TRAINING =====

/// One labeled row of the classifier training corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub text: String,
    pub label: String,
}

impl TrainingExample {
    pub fn new(text: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            label: label.into(),
        }
    }
}
