//! Sentence boundary detection.
//!
//! The pipeline consumes sentence splitting as a capability through
//! [`SentenceSplitter`]; the default implementation follows the Unicode
//! sentence boundary rules (UAX #29), which also break after line separators.

use unicode_segmentation::UnicodeSegmentation;

pub trait SentenceSplitter: Send + Sync {
    /// Split `text` into trimmed, non-empty sentences in document order.
    fn split<'t>(&self, text: &'t str) -> Vec<&'t str>;

    fn name(&self) -> &str;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeSentenceSplitter;

impl SentenceSplitter for UnicodeSentenceSplitter {
    fn split<'t>(&self, text: &'t str) -> Vec<&'t str> {
        text.split_sentence_bounds()
            .map(str::trim)
            .filter(|sentence| !sentence.is_empty())
            .collect()
    }

    fn name(&self) -> &str {
        "unicode-uax29"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_terminal_punctuation() {
        let sentences = UnicodeSentenceSplitter.split("No evidence was shown. The award is local! Why?");
        assert_eq!(
            sentences,
            vec!["No evidence was shown.", "The award is local!", "Why?"]
        );
    }

    #[test]
    fn line_breaks_end_sentences() {
        let sentences = UnicodeSentenceSplitter.split("Awards\nNo evidence of peer recognition.");
        assert_eq!(sentences, vec!["Awards", "No evidence of peer recognition."]);
    }

    #[test]
    fn blank_input_has_no_sentences() {
        assert!(UnicodeSentenceSplitter.split("   \n\n  ").is_empty());
    }
}
