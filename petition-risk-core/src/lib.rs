// Petition Risk Core Library
//
// Flags evidentiary weaknesses in petition drafts: section segmentation,
// red-flag matching, classifier back-fill of missing criteria and severity-rated reports.

pub mod types;
pub mod error;
pub mod config;
pub mod preprocessors;
pub mod sentences;
pub mod rules;
pub mod classifier;
pub mod severity;
pub mod processor;
pub mod storage;
pub mod report;

// Re-export main types and functions for easy use
pub use types::*;
pub use error::{RiskError, RiskResult};
pub use config::RiskConfig;
pub use preprocessors::{extract_text, PlainTextExtractor, TextExtractor};
pub use rules::{RuleTable, SectionSegmenter};
pub use classifier::{ClassifierModel, CriterionPredictor};
pub use severity::{severity, suggestion, SeverityEngine};
pub use processor::{analyze, fill_missing_criteria, PetitionAnalyzer, StepProfiler};
pub use storage::{FileStorage, ResultStorage};
pub use report::RiskReport;
