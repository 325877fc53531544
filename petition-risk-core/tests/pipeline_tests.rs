//! Pipeline tests over the fixtures in `test_fixtures/`.
//!
//! - Segmentation and matching: deterministic, containment in both directions
//! - Back-fill: only absent criteria are filled, second pass is a no-op
//! - Persistence and reporting: what analysis writes is what reporting reads

use petition_risk_core::classifier::{train_classifier, ClassifierModel, CriterionPredictor};
use petition_risk_core::config::{ClassifierConfig, RiskConfig};
use petition_risk_core::rules::{RuleTable, SectionSegmenter};
use petition_risk_core::storage::{FileStorage, ResultStorage};
use petition_risk_core::{
    analyze, fill_missing_criteria, severity, AnalysisResult, RiskReport, Severity,
    SeverityEngine,
};
use std::path::PathBuf;
use tempfile::TempDir;

// ============================================================================
// Fixture helpers
// ============================================================================

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_fixtures")
}

fn load_rules() -> RuleTable {
    RuleTable::load(fixtures_dir().join("red_flag_rules.json")).expect("Invalid red_flag_rules.json")
}

fn load_petition() -> String {
    std::fs::read_to_string(fixtures_dir().join("sample_petition.txt"))
        .expect("Missing sample_petition.txt")
}

fn analyze_sample() -> AnalysisResult {
    analyze(&load_petition(), "sample_petition.txt", &load_rules())
}

fn criteria(result: &AnalysisResult, section: &str) -> Vec<Option<String>> {
    result.sections[section]
        .iter()
        .map(|m| m.criterion.clone())
        .collect()
}

/// Labels everything with one criterion and counts how often it was asked.
struct CountingPredictor {
    label: &'static str,
    calls: std::sync::atomic::AtomicUsize,
}

impl CountingPredictor {
    fn new(label: &'static str) -> Self {
        Self {
            label,
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

impl CriterionPredictor for CountingPredictor {
    fn predict_criterion(&self, _text: &str) -> String {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.label.to_string()
    }
}

// ============================================================================
// Segmentation
// ============================================================================

mod segmentation {
    use super::*;

    #[test]
    fn sample_sections_in_document_order() {
        let document = SectionSegmenter::default().segment(&load_petition());
        let names: Vec<&str> = document.names().collect();
        assert_eq!(
            names,
            vec!["introduction", "award", "membership", "media", "salary"]
        );
    }

    #[test]
    fn segmentation_is_deterministic() {
        let text = load_petition();
        let segmenter = SectionSegmenter::default();
        assert_eq!(segmenter.segment(&text), segmenter.segment(&text));
    }

    #[test]
    fn header_line_opens_its_own_section() {
        let document = SectionSegmenter::default().segment(&load_petition());
        let award = document.get("award").unwrap();
        assert!(award.starts_with("Awards and Prizes"));
        assert!(award.contains("local award in 2019"));
    }
}

// ============================================================================
// Matching
// ============================================================================

mod matching {
    use super::*;

    #[test]
    fn sample_matches_per_section() {
        let result = analyze_sample();

        let sections: Vec<&str> = result.sections.keys().map(String::as_str).collect();
        assert_eq!(sections, vec!["award", "membership", "media", "salary"]);

        let award: Vec<&str> = result.sections["award"]
            .iter()
            .map(|m| m.pattern.as_str())
            .collect();
        assert_eq!(award, vec!["local award", "no evidence"]);

        let media: Vec<&str> = result.sections["media"]
            .iter()
            .map(|m| m.pattern.as_str())
            .collect();
        assert_eq!(media, vec!["self-published", "press release", "vague"]);

        assert_eq!(result.total_matches(), 8);
        assert_eq!(result.unlabeled_count(), 1);
    }

    #[test]
    fn sentence_contained_in_pattern_matches() {
        let table = RuleTable::from_rules(vec![("award", vec!["no national award was shown"])]).unwrap();

        let result = analyze("Awards\nnational award", "p.txt", &table);
        assert_eq!(result.sections["award"].len(), 1);
        assert_eq!(result.sections["award"][0].sentence, "national award");

        // Containment is literal: the trailing period breaks it.
        let result = analyze("Awards\nNational award.", "p.txt", &table);
        assert!(result.is_empty());
    }

    #[test]
    fn zero_match_sections_never_appear() {
        let result = analyze_sample();
        assert!(!result.sections.contains_key("introduction"));
        assert!(result.sections.values().all(|matches| !matches.is_empty()));
    }

    #[test]
    fn document_without_red_flags_is_empty() {
        let result = analyze("Awards\nA national prize.", "clean.txt", &load_rules());
        assert!(result.is_empty());
    }
}

// ============================================================================
// End to end
// ============================================================================

mod end_to_end {
    use super::*;

    #[test]
    fn awards_and_membership_both_high() {
        let table = RuleTable::from_json_str(
            r#"{"award": ["no evidence"], "membership": ["third-party validation"]}"#,
        )
        .unwrap();
        let text = "Awards\nNo evidence of peer recognition.\nMembership\nNo third-party validation exists.";

        let result = analyze(text, "petition.txt", &table);

        let sections: Vec<&str> = result.sections.keys().map(String::as_str).collect();
        assert_eq!(sections, vec!["award", "membership"]);
        assert_eq!(result.sections["award"].len(), 1);
        assert_eq!(result.sections["membership"].len(), 1);
        for item in result.matches() {
            assert_eq!(severity(&item.pattern), Severity::High, "{}", item.pattern);
        }
    }

    #[test]
    fn severity_prefers_high_tier() {
        assert_eq!(severity("no evidence and also vague"), Severity::High);
    }

    #[test]
    fn analyze_store_backfill_report() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path().join("petition_analysis")).unwrap();

        let path = storage.store_result(&analyze_sample()).unwrap();
        assert!(path.ends_with("sample_petition_analysis.json"));

        let mut stored = storage.load_result(&path).unwrap();
        assert_eq!(stored.sections["media"][2].section, "media");
        let filled = fill_missing_criteria(&mut stored, &CountingPredictor::new("media"));
        assert_eq!(filled, 1);
        storage.replace_result(&path, &stored).unwrap();

        let reloaded = storage.load_result(&path).unwrap();
        assert_eq!(reloaded.unlabeled_count(), 0);

        let report = RiskReport::build(&reloaded, &SeverityEngine::default());
        assert_eq!(report.entry_count(), 8);
        assert_eq!(
            report.table_of_contents,
            vec!["Award", "Membership", "Media", "Salary"]
        );
        assert!(report.render_markdown().contains("### Section: Membership"));
    }
}

// ============================================================================
// Back-fill
// ============================================================================

mod backfill {
    use super::*;

    #[test]
    fn never_overrides_present_criteria() {
        let mut result = analyze_sample();
        let before = result.clone();

        let predictor = CountingPredictor::new("salary");
        fill_missing_criteria(&mut result, &predictor);
        assert_eq!(predictor.calls(), 1);

        for (section, matches) in &before.sections {
            for (old, new) in matches.iter().zip(&result.sections[section]) {
                match &old.criterion {
                    Some(criterion) => assert_eq!(new.criterion.as_ref(), Some(criterion)),
                    None => assert_eq!(new.criterion.as_deref(), Some("salary")),
                }
            }
        }
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let mut result = analyze_sample();
        fill_missing_criteria(&mut result, &CountingPredictor::new("media"));
        let once = result.clone();

        let predictor = CountingPredictor::new("award");
        assert_eq!(fill_missing_criteria(&mut result, &predictor), 0);
        assert_eq!(predictor.calls(), 0);
        assert_eq!(result, once);
    }

    #[test]
    fn null_and_blank_criteria_are_filled() {
        let json = r#"{
            "filename": "legacy.txt",
            "sections": {
                "award": [
                    {"criterion": null, "pattern": "vague", "sentence": "Vague."},
                    {"criterion": "", "pattern": "limited recognition", "sentence": "Limited recognition."},
                    {"pattern": "no evidence", "sentence": "No evidence."},
                    {"criterion": "award", "pattern": "local award", "sentence": "A local award."}
                ]
            }
        }"#;
        let mut result = AnalysisResult::from_json(json).unwrap();
        assert_eq!(result.unlabeled_count(), 3);

        assert_eq!(fill_missing_criteria(&mut result, &CountingPredictor::new("award")), 3);
        assert_eq!(
            criteria(&result, "award"),
            vec![Some("award".to_string()); 4]
        );
    }

    #[test]
    fn trained_model_fills_with_known_labels() {
        let dir = TempDir::new().unwrap();
        let examples = petition_risk_core::classifier::load_training_csv(
            fixtures_dir().join("training_data.csv"),
        )
        .unwrap();
        let outcome = train_classifier(&examples, &ClassifierConfig::default()).unwrap();
        outcome.model.save(dir.path()).unwrap();

        let model = ClassifierModel::load(dir.path()).unwrap();
        let mut result = analyze_sample();
        assert_eq!(fill_missing_criteria(&mut result, &model), 1);

        let filled = result.sections["media"][2].criterion.clone().unwrap();
        assert!(model.classes().contains(&filled), "{filled}");
    }
}

// ============================================================================
// Configuration
// ============================================================================

mod configuration {
    use super::*;

    #[test]
    fn yaml_overrides_section_headers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "sections:\n  headers:\n    - tag: award\n      keywords: [honors]\n",
        )
        .unwrap();

        let config = RiskConfig::load_from_file(&path).unwrap();
        let segmenter = SectionSegmenter::new(&config.sections.headers);
        assert_eq!(segmenter.classify_line("Honors received"), "award");
        assert_eq!(segmenter.classify_line("Awards"), "introduction");
        assert_eq!(config.paths.analysis_dir, "petition_analysis");
    }
}
