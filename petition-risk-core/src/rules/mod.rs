// Rules module - the deterministic half of the pipeline
// - table.rs: RuleTable loading and validation
// - section_detection.rs: keyword-driven section segmentation
// - matcher.rs: bidirectional containment red-flag matching

pub mod matcher;
pub mod section_detection;
pub mod table;

pub use matcher::{is_containment_match, match_sentence, RedFlagMatcher};
pub use section_detection::{SectionSegmenter, SegmentedDocument};
pub use table::{RedFlagRule, RuleTable, UNLABELED_CRITERION};
