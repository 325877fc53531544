use crate::config::{default_section_headers, SectionHeader};
use crate::types::{Section, INTRODUCTION};

/// Splits document text into labeled sections using an ordered header keyword table.
///
/// Any line containing a header keyword (case-insensitive substring) opens a new
/// section unless it names the section already in progress. The header line itself
/// becomes the first line of the section it opens.
#[derive(Debug, Clone)]
pub struct SectionSegmenter {
    /// (tag, lower-cased keywords) in precedence order
    headers: Vec<(String, Vec<String>)>,
}

impl Default for SectionSegmenter {
    fn default() -> Self {
        Self::new(&default_section_headers())
    }
}

impl SectionSegmenter {
    pub fn new(headers: &[SectionHeader]) -> Self {
        Self {
            headers: headers
                .iter()
                .map(|header| {
                    let keywords = header
                        .keywords
                        .iter()
                        .map(|k| k.to_lowercase())
                        .filter(|k| !k.is_empty())
                        .collect();
                    (header.tag.clone(), keywords)
                })
                .collect(),
        }
    }

    /// First tag (in table order) with a keyword found in `line`, else `introduction`.
    pub fn classify_line(&self, line: &str) -> &str {
        let lowered = line.to_lowercase();
        self.headers
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k.as_str())))
            .map(|(tag, _)| tag.as_str())
            .unwrap_or(INTRODUCTION)
    }

    pub fn segment(&self, text: &str) -> SegmentedDocument {
        let mut context = SegmentContext::new();

        for line in split_lines(text) {
            let detected = self.classify_line(line);
            if detected != context.current && detected != INTRODUCTION {
                context.flush();
                context.current = detected.to_string();
            }
            context.buffer.push(line);
        }
        context.flush();

        tracing::debug!(
            "📑 Segmented {} lines into {} sections",
            split_lines(text).count(),
            context.document.len()
        );
        context.document
    }
}

/// Line separators: LF, CR, CRLF, vertical tab, form feed, the ASCII record
/// separators, NEL, and the Unicode line and paragraph separators.
fn is_line_break(ch: char) -> bool {
    matches!(
        ch,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// Lines of `text` without their terminators. `\r\n` counts as one break and a
/// trailing break does not produce an empty final line.
pub fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = text;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        match rest.char_indices().find(|(_, ch)| is_line_break(*ch)) {
            Some((index, ch)) => {
                let line = &rest[..index];
                let mut next = index + ch.len_utf8();
                if ch == '\r' && rest[next..].starts_with('\n') {
                    next += 1;
                }
                rest = &rest[next..];
                Some(line)
            }
            None => {
                let line = rest;
                rest = "";
                Some(line)
            }
        }
    })
}

// SegmentContext tracks the section in progress and its pending lines
struct SegmentContext<'t> {
    current: String,
    buffer: Vec<&'t str>,
    document: SegmentedDocument,
}

impl<'t> SegmentContext<'t> {
    fn new() -> Self {
        Self {
            current: INTRODUCTION.to_string(),
            buffer: Vec::new(),
            document: SegmentedDocument::default(),
        }
    }

    fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let text = self.buffer.join("\n");
        self.document.append(&self.current, &text);
        self.buffer.clear();
    }
}

/// Ordered section name → text mapping produced by [`SectionSegmenter::segment`].
///
/// A tag that recurs non-contiguously keeps its first position and accumulates text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentedDocument {
    sections: Vec<Section>,
}

impl SegmentedDocument {
    fn append(&mut self, name: &str, text: &str) {
        match self.sections.iter_mut().find(|s| s.name == name) {
            Some(section) => {
                section.raw_text.push('\n');
                section.raw_text.push_str(text);
            }
            None => self.sections.push(Section {
                name: name.to_string(),
                raw_text: text.to_string(),
            }),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.sections
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.raw_text.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.name.as_str())
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

impl IntoIterator for SegmentedDocument {
    type Item = Section;
    type IntoIter = std::vec::IntoIter<Section>;

    fn into_iter(self) -> Self::IntoIter {
        self.sections.into_iter()
    }
}
