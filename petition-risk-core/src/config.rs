use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

// Default value functions for serde
fn default_rules_file() -> String {
    "red_flag_rules.json".to_string()
}

fn default_analysis_dir() -> String {
    "petition_analysis".to_string()
}

fn default_report_dir() -> String {
    "reports".to_string()
}

fn default_model_dir() -> String {
    "model".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Conventional file locations used by the CLI
    #[serde(default)]
    pub paths: PathsConfig,
    /// Ordered header keyword table for the section segmenter
    #[serde(default)]
    pub sections: SectionDetectionConfig,
    /// Severity keyword tiers and remediation suggestions
    #[serde(default)]
    pub severity: SeverityConfig,
    /// Classifier training hyperparameters
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_rules_file")]
    pub rules_file: String,
    #[serde(default = "default_analysis_dir")]
    pub analysis_dir: String,
    #[serde(default = "default_report_dir")]
    pub report_dir: String,
    #[serde(default = "default_model_dir")]
    pub model_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            rules_file: default_rules_file(),
            analysis_dir: default_analysis_dir(),
            report_dir: default_report_dir(),
            model_dir: default_model_dir(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionHeader {
    pub tag: String,
    pub keywords: Vec<String>,
}

impl SectionHeader {
    fn new(tag: &str, keywords: &[&str]) -> Self {
        Self {
            tag: tag.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionDetectionConfig {
    /// Header table in precedence order - the first tag with a keyword hit wins
    #[serde(default = "default_section_headers")]
    pub headers: Vec<SectionHeader>,
}

impl Default for SectionDetectionConfig {
    fn default() -> Self {
        Self {
            headers: default_section_headers(),
        }
    }
}

pub fn default_section_headers() -> Vec<SectionHeader> {
    vec![
        SectionHeader::new("personal_background", &["personal background", "biographical sketch"]),
        SectionHeader::new("award", &["award", "prize"]),
        SectionHeader::new("membership", &["membership", "organization"]),
        SectionHeader::new("published", &["publication", "authorship"]),
        SectionHeader::new("judge", &["judge", "panel", "reviewer"]),
        SectionHeader::new("contributions", &["contribution", "innovation"]),
        SectionHeader::new("media", &["media", "press", "newspaper", "coverage"]),
        SectionHeader::new("leading_role", &["leading", "critical role"]),
        SectionHeader::new("salary", &["salary", "remuneration"]),
        SectionHeader::new("commercial_success", &["box office", "commercial success", "sales"]),
        SectionHeader::new("exhibitions", &["exhibition", "showcase", "display"]),
        SectionHeader::new(
            "recommendation",
            &["recommendation letter", "expert letter", "endorsement"],
        ),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionRule {
    pub keyword: String,
    pub suggestion: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeverityConfig {
    /// Absence / failure / insufficiency vocabulary - checked first
    #[serde(default = "default_high_keywords")]
    pub high_keywords: Vec<String>,
    /// Vagueness / ambiguity vocabulary
    #[serde(default = "default_medium_keywords")]
    pub medium_keywords: Vec<String>,
    /// Ordered trigger table - first keyword found in the pattern wins
    #[serde(default = "default_suggestions")]
    pub suggestions: Vec<SuggestionRule>,
    #[serde(default = "default_fallback_suggestion")]
    pub fallback_suggestion: String,
    #[serde(default = "default_reviewer_note")]
    pub reviewer_note: String,
}

impl Default for SeverityConfig {
    fn default() -> Self {
        Self {
            high_keywords: default_high_keywords(),
            medium_keywords: default_medium_keywords(),
            suggestions: default_suggestions(),
            fallback_suggestion: default_fallback_suggestion(),
            reviewer_note: default_reviewer_note(),
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn default_high_keywords() -> Vec<String> {
    to_strings(crate::severity::HIGH_KEYWORDS)
}

pub fn default_medium_keywords() -> Vec<String> {
    to_strings(crate::severity::MEDIUM_KEYWORDS)
}

pub fn default_suggestions() -> Vec<SuggestionRule> {
    crate::severity::SUGGESTIONS
        .iter()
        .map(|(keyword, suggestion)| SuggestionRule {
            keyword: keyword.to_string(),
            suggestion: suggestion.to_string(),
        })
        .collect()
}

pub fn default_fallback_suggestion() -> String {
    crate::severity::FALLBACK_SUGGESTION.to_string()
}

pub fn default_reviewer_note() -> String {
    crate::severity::REVIEWER_NOTE.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Vocabulary cap for the TF-IDF transform
    pub max_features: usize,
    /// Smallest n-gram length (in tokens)
    pub ngram_min: usize,
    /// Largest n-gram length (in tokens)
    pub ngram_max: usize,
    /// Fraction of the corpus held out for evaluation (0.0-1.0)
    pub test_size: f64,
    /// Seed for the train/test shuffle
    pub seed: u64,
    /// Gradient descent iteration cap
    pub max_iter: usize,
    /// Inverse L2 regularisation strength
    pub c: f64,
    /// Gradient descent step size
    pub learning_rate: f64,
    /// Stop once the largest gradient component falls below this
    pub tolerance: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            max_features: 5000,
            ngram_min: 1,
            ngram_max: 2,
            test_size: 0.2,
            seed: 42,
            max_iter: 1000,
            c: 1.0,
            learning_rate: 1.0,
            tolerance: 1e-6,
        }
    }
}

impl RiskConfig {
    /// Load config from file path
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: RiskConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Load config with fallback to default
    pub fn load_with_fallback(path: Option<&str>) -> Self {
        match path {
            Some(p) => Self::load_from_file(p).unwrap_or_else(|e| {
                tracing::warn!("⚠️  Failed to load config from {p}: {e:#}, using defaults");
                Self::default()
            }),
            None => Self::default(),
        }
    }
}
