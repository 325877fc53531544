//! Document text extraction
//!
//! The boundary between raw input files and the analysis pipeline. Everything
//! after this point works on plain text and is format-agnostic.
//!
//! ## Available extractors
//!
//! - `PlainTextExtractor` - `.txt` files (lossy UTF-8)
//!
//! Word-processor and PDF inputs are reported as `UnsupportedInputFormat`.

use crate::error::{RiskError, RiskResult};
use std::path::Path;

/// Converts an input document into plain text.
pub trait TextExtractor {
    /// Check if the extractor handles the given file type
    fn supports(&self, path: &Path) -> bool;

    fn extract(&self, path: &Path) -> RiskResult<String>;

    /// Extractor name for logging
    fn name(&self) -> &str;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn supports(&self, path: &Path) -> bool {
        extension(path).as_deref() == Some("txt")
    }

    fn extract(&self, path: &Path) -> RiskResult<String> {
        let bytes = std::fs::read(path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn name(&self) -> &str {
        "plain-text"
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Extract text with the first extractor that supports `path`.
pub fn extract_text(path: &Path) -> RiskResult<String> {
    let extractors: [&dyn TextExtractor; 1] = [&PlainTextExtractor];

    let extractor = extractors
        .iter()
        .find(|extractor| extractor.supports(path))
        .ok_or_else(|| {
            RiskError::UnsupportedInputFormat(format!(
                "{} (extension '{}')",
                path.display(),
                extension(path).unwrap_or_default()
            ))
        })?;

    tracing::debug!("📄 Extracting {} with {}", path.display(), extractor.name());
    extractor.extract(path)
}
