//! Severity tiers and remediation suggestions for matched patterns.
//!
//! Both lookups read only the pattern text. High-tier vocabulary is checked
//! before medium-tier vocabulary, and suggestions are resolved by walking an
//! ordered `(keyword, suggestion)` list, so ties always resolve the same way.

use crate::config::SeverityConfig;
use crate::types::Severity;

pub const HIGH_KEYWORDS: &[&str] = &[
    "no evidence",
    "not provided",
    "failed to",
    "insufficient",
    "does not",
    "lack",
    "unable",
    "third-party",
];

pub const MEDIUM_KEYWORDS: &[&str] = &["limited", "unclear", "vague", "generic"];

pub const SUGGESTIONS: &[(&str, &str)] = &[
    ("no evidence", "Add third-party documentation or supporting materials."),
    ("not provided", "Include the missing data or supporting letter."),
    ("insufficient", "Provide more detailed and verifiable documentation."),
    ("vague", "Clarify claims with specific examples and data."),
    ("lack", "Submit corroborating evidence from independent sources."),
    ("generic", "Use field-specific metrics or endorsements to boost credibility."),
    ("failed to", "Re-evaluate this section with the USCIS criteria checklist."),
];

pub const FALLBACK_SUGGESTION: &str =
    "Consider strengthening this section with clearer and more credible evidence.";

pub const REVIEWER_NOTE: &str = "This issue reflects a common reason USCIS may deny a case. Additional evidence or clarification is strongly advised.";

/// Severity under the built-in keyword tiers.
pub fn severity(pattern: &str) -> Severity {
    let pattern = pattern.to_lowercase();
    tier_for(&pattern, HIGH_KEYWORDS, MEDIUM_KEYWORDS)
}

/// Suggestion under the built-in trigger table.
pub fn suggestion(pattern: &str) -> &'static str {
    let pattern = pattern.to_lowercase();
    SUGGESTIONS
        .iter()
        .find(|(keyword, _)| pattern.contains(keyword))
        .map(|(_, suggestion)| *suggestion)
        .unwrap_or(FALLBACK_SUGGESTION)
}

fn tier_for<S: AsRef<str>>(lowered: &str, high: &[S], medium: &[S]) -> Severity {
    if high.iter().any(|k| lowered.contains(k.as_ref())) {
        Severity::High
    } else if medium.iter().any(|k| lowered.contains(k.as_ref())) {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Configurable variant of [`severity`] / [`suggestion`].
///
/// Keywords are lower-cased once at construction; lookups stay pure.
#[derive(Debug, Clone)]
pub struct SeverityEngine {
    high_keywords: Vec<String>,
    medium_keywords: Vec<String>,
    suggestions: Vec<(String, String)>,
    fallback_suggestion: String,
    reviewer_note: String,
}

impl Default for SeverityEngine {
    fn default() -> Self {
        Self::from_config(&SeverityConfig::default())
    }
}

impl SeverityEngine {
    pub fn from_config(config: &SeverityConfig) -> Self {
        let lower = |items: &[String]| -> Vec<String> {
            items
                .iter()
                .map(|k| k.to_lowercase())
                .filter(|k| !k.is_empty())
                .collect()
        };

        Self {
            high_keywords: lower(&config.high_keywords),
            medium_keywords: lower(&config.medium_keywords),
            suggestions: config
                .suggestions
                .iter()
                .filter(|rule| !rule.keyword.is_empty())
                .map(|rule| (rule.keyword.to_lowercase(), rule.suggestion.clone()))
                .collect(),
            fallback_suggestion: config.fallback_suggestion.clone(),
            reviewer_note: config.reviewer_note.clone(),
        }
    }

    pub fn severity(&self, pattern: &str) -> Severity {
        tier_for(&pattern.to_lowercase(), &self.high_keywords, &self.medium_keywords)
    }

    pub fn suggestion(&self, pattern: &str) -> &str {
        let pattern = pattern.to_lowercase();
        self.suggestions
            .iter()
            .find(|(keyword, _)| pattern.contains(keyword.as_str()))
            .map(|(_, suggestion)| suggestion.as_str())
            .unwrap_or(&self.fallback_suggestion)
    }

    pub fn reviewer_note(&self) -> &str {
        &self.reviewer_note
    }
}
