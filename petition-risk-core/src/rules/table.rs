use crate::error::{RiskError, RiskResult};
use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

/// Criterion key whose patterns produce matches without a criterion label.
/// Those matches are labeled later by the classifier back-fill pass.
pub const UNLABELED_CRITERION: &str = "_unlabeled";

/// All phrase patterns filed under one criterion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedFlagRule {
    pub criterion: String,
    pub patterns: Vec<String>,
    lowered: Vec<String>,
}

impl RedFlagRule {
    /// The label carried by this rule's matches, `None` for the unlabeled bucket.
    pub fn label(&self) -> Option<&str> {
        if self.criterion == UNLABELED_CRITERION {
            None
        } else {
            Some(&self.criterion)
        }
    }

    /// `(original, lower-cased)` pattern pairs in table order.
    pub fn patterns_with_lowered(&self) -> impl Iterator<Item = (&str, &str)> {
        self.patterns
            .iter()
            .map(String::as_str)
            .zip(self.lowered.iter().map(String::as_str))
    }
}

/// Immutable criterion → patterns table, loaded once and shared by reference.
///
/// Criterion order follows the source file; it decides the order of matches
/// produced for a sentence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleTable {
    rules: Vec<RedFlagRule>,
}

impl RuleTable {
    /// Load a JSON rule table. Any malformed entry fails the whole load.
    pub fn load(path: impl AsRef<Path>) -> RiskResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            RiskError::RuleTableMalformed(format!("cannot read {}: {e}", path.display()))
        })?;
        let table = Self::from_json_str(&content)?;
        tracing::info!(
            "📋 Loaded {} red-flag rules ({} patterns) from {}",
            table.len(),
            table.pattern_count(),
            path.display()
        );
        Ok(table)
    }

    pub fn from_json_str(json: &str) -> RiskResult<Self> {
        let entries: OrderedEntries = serde_json::from_str(json)
            .map_err(|e| RiskError::RuleTableMalformed(e.to_string()))?;

        let mut rules = Vec::with_capacity(entries.0.len());
        for (criterion, value) in entries.0 {
            let array = value.as_array().ok_or_else(|| {
                RiskError::RuleTableMalformed(format!(
                    "criterion '{criterion}' must map to an array of patterns"
                ))
            })?;
            let mut patterns = Vec::with_capacity(array.len());
            for (index, item) in array.iter().enumerate() {
                let pattern = item.as_str().ok_or_else(|| {
                    RiskError::RuleTableMalformed(format!(
                        "criterion '{criterion}' pattern #{index} is not a string"
                    ))
                })?;
                patterns.push(pattern.to_string());
            }
            rules.push((criterion, patterns));
        }

        Self::from_rules(rules)
    }

    /// Build a table from `(criterion, patterns)` pairs, validating every entry.
    pub fn from_rules<C, P>(rules: impl IntoIterator<Item = (C, Vec<P>)>) -> RiskResult<Self>
    where
        C: Into<String>,
        P: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut validated = Vec::new();

        for (criterion, patterns) in rules {
            let criterion: String = criterion.into();
            if criterion.trim().is_empty() {
                return Err(RiskError::RuleTableMalformed(
                    "criterion names must be non-empty".to_string(),
                ));
            }
            if !seen.insert(criterion.clone()) {
                return Err(RiskError::RuleTableMalformed(format!(
                    "duplicate criterion '{criterion}'"
                )));
            }

            let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();
            if let Some(index) = patterns.iter().position(|p| p.trim().is_empty()) {
                return Err(RiskError::RuleTableMalformed(format!(
                    "criterion '{criterion}' pattern #{index} is empty"
                )));
            }

            let lowered = patterns.iter().map(|p| p.to_lowercase()).collect();
            validated.push(RedFlagRule {
                criterion,
                patterns,
                lowered,
            });
        }

        Ok(Self { rules: validated })
    }

    pub fn rules(&self) -> &[RedFlagRule] {
        &self.rules
    }

    pub fn get(&self, criterion: &str) -> Option<&RedFlagRule> {
        self.rules.iter().find(|rule| rule.criterion == criterion)
    }

    pub fn criteria(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|rule| rule.criterion.as_str())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn pattern_count(&self) -> usize {
        self.rules.iter().map(|rule| rule.patterns.len()).sum()
    }
}

/// JSON object entries in file order, duplicates included.
struct OrderedEntries(Vec<(String, serde_json::Value)>);

impl<'de> Deserialize<'de> for OrderedEntries {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(OrderedEntriesVisitor)
    }
}

struct OrderedEntriesVisitor;

impl<'de> Visitor<'de> for OrderedEntriesVisitor {
    type Value = OrderedEntries;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an object mapping criterion names to pattern lists")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((key, value)) = map.next_entry::<String, serde_json::Value>()? {
            entries.push((key, value));
        }
        Ok(OrderedEntries(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_malformed(json: &str) {
        match RuleTable::from_json_str(json) {
            Err(RiskError::RuleTableMalformed(_)) => {}
            other => panic!("expected RuleTableMalformed for {json}, got {other:?}"),
        }
    }

    #[test]
    fn keeps_file_order() {
        let table = RuleTable::from_json_str(
            r#"{"media": ["no articles"], "award": ["no evidence", "unknown prize"]}"#,
        )
        .unwrap();
        let criteria: Vec<&str> = table.criteria().collect();
        assert_eq!(criteria, vec!["media", "award"]);
        assert_eq!(table.pattern_count(), 3);
        assert_eq!(
            table.get("award").unwrap().patterns,
            vec!["no evidence", "unknown prize"]
        );
    }

    #[test]
    fn rejects_malformed_tables() {
        assert_malformed(r#"["award"]"#);
        assert_malformed(r#"{"award": "no evidence"}"#);
        assert_malformed(r#"{"award": ["no evidence", 3]}"#);
        assert_malformed(r#"{"award": [""]}"#);
        assert_malformed(r#"{"award": ["   "]}"#);
        assert_malformed(r#"{"": ["no evidence"]}"#);
        assert_malformed(r#"{"award": ["a"], "award": ["b"]}"#);
        assert_malformed("{not json");
    }

    #[test]
    fn empty_object_is_an_empty_table() {
        let table = RuleTable::from_json_str("{}").unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn unlabeled_bucket_has_no_label() {
        let table = RuleTable::from_rules(vec![
            ("award", vec!["no evidence"]),
            (UNLABELED_CRITERION, vec!["self-reported"]),
        ])
        .unwrap();
        assert_eq!(table.get("award").unwrap().label(), Some("award"));
        assert_eq!(table.get(UNLABELED_CRITERION).unwrap().label(), None);
    }

    #[test]
    fn missing_file_is_malformed() {
        let err = RuleTable::load("/no/such/rules.json").unwrap_err();
        assert!(matches!(err, RiskError::RuleTableMalformed(_)));
    }
}
