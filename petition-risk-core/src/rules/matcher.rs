use super::table::RuleTable;
use crate::types::RedFlagMatch;

/// Bidirectional, case-insensitive containment over already lower-cased text.
///
/// A pattern matches when it occurs inside the sentence, or when the whole
/// sentence occurs inside the pattern (short sentences against long canonical
/// phrases). Patterns are literal: no tokenisation, no stemming.
pub fn is_containment_match(sentence_lower: &str, pattern_lower: &str) -> bool {
    sentence_lower.contains(pattern_lower) || pattern_lower.contains(sentence_lower)
}

// RedFlagMatcher - finds every (criterion, pattern) pair hitting a sentence
pub struct RedFlagMatcher<'a> {
    table: &'a RuleTable,
}

impl<'a> RedFlagMatcher<'a> {
    pub fn new(table: &'a RuleTable) -> Self {
        Self { table }
    }

    /// All matches for `sentence`, in rule-table order. No deduplication: one
    /// sentence may hit several patterns of the same or different criteria.
    pub fn match_sentence(&self, sentence: &str, section: &str) -> Vec<RedFlagMatch> {
        let sentence = sentence.trim();
        let lowered = sentence.to_lowercase();
        let mut matches = Vec::new();

        for rule in self.table.rules() {
            for (pattern, pattern_lower) in rule.patterns_with_lowered() {
                if is_containment_match(&lowered, pattern_lower) {
                    tracing::debug!(
                        criterion = rule.criterion.as_str(),
                        pattern,
                        section,
                        "🚩 Red flag matched"
                    );
                    matches.push(RedFlagMatch {
                        criterion: rule.label().map(str::to_string),
                        pattern: pattern.to_string(),
                        sentence: sentence.to_string(),
                        section: section.to_string(),
                    });
                }
            }
        }

        matches
    }
}

/// Convenience form of [`RedFlagMatcher::match_sentence`].
pub fn match_sentence(sentence: &str, section: &str, table: &RuleTable) -> Vec<RedFlagMatch> {
    RedFlagMatcher::new(table).match_sentence(sentence, section)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::table::UNLABELED_CRITERION;

    fn table(rules: Vec<(&str, Vec<&str>)>) -> RuleTable {
        RuleTable::from_rules(rules).unwrap()
    }

    #[test]
    fn pattern_inside_sentence_matches() {
        let rules = table(vec![("award", vec!["no evidence"])]);
        let matches = match_sentence("No evidence was provided for this award", "award", &rules);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].pattern, "no evidence");
        assert_eq!(matches[0].criterion.as_deref(), Some("award"));
        assert_eq!(matches[0].section, "award");
    }

    #[test]
    fn sentence_inside_pattern_matches() {
        let rules = table(vec![("award", vec!["award winner of distinction"])]);
        let matches = match_sentence("award", "introduction", &rules);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].pattern, "award winner of distinction");
    }

    #[test]
    fn no_deduplication_across_or_within_criteria() {
        let rules = table(vec![
            ("award", vec!["no evidence", "evidence"]),
            ("media", vec!["no evidence"]),
        ]);
        let matches = match_sentence("There is no evidence here.", "media", &rules);
        let pairs: Vec<(Option<&str>, &str)> = matches
            .iter()
            .map(|m| (m.criterion.as_deref(), m.pattern.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                (Some("award"), "no evidence"),
                (Some("award"), "evidence"),
                (Some("media"), "no evidence"),
            ]
        );
    }

    #[test]
    fn matching_is_case_insensitive_and_keeps_original_text() {
        let rules = table(vec![("media", vec!["Limited Coverage"])]);
        let matches = match_sentence("  LIMITED coverage in trade press.  ", "media", &rules);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].pattern, "Limited Coverage");
        assert_eq!(matches[0].sentence, "LIMITED coverage in trade press.");
    }

    #[test]
    fn unrelated_sentence_has_no_matches() {
        let rules = table(vec![("award", vec!["no evidence"])]);
        assert!(match_sentence("The applicant won gold.", "award", &rules).is_empty());
    }

    #[test]
    fn unlabeled_bucket_yields_matches_without_criterion() {
        let rules = table(vec![(UNLABELED_CRITERION, vec!["self-reported"])]);
        let matches = match_sentence("Figures are self-reported.", "salary", &rules);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].criterion, None);
    }
}
