//! QA risk report built from a persisted [`AnalysisResult`].
//!
//! Severity and suggestion are derived from each match's pattern at build
//! time, never stored in the analysis result.

use crate::severity::SeverityEngine;
use crate::types::{AnalysisResult, Severity};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt::Write as _;

pub const REPORT_TITLE: &str = "EB-1A Petition RFE Risk Assessment";
pub const REPORT_SUBTITLE: &str = "Generated QA Memo for Pre-Submission Review";
pub const EXECUTIVE_SUMMARY: &str = "This report summarizes red flags detected in the petition draft, classified under EB-1A criteria. It includes excerpt patterns, severity ratings, improvement suggestions, and simulated reviewer notes.";
pub const UNLABELED: &str = "unlabeled";
pub const REPORT_SUFFIX: &str = "_qa_report";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEntry {
    pub criterion: String,
    pub pattern: String,
    pub sentence: String,
    pub severity: Severity,
    pub suggestion: String,
    pub reviewer_note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSection {
    pub name: String,
    pub title: String,
    pub entries: Vec<ReportEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskReport {
    pub title: String,
    pub filename: String,
    pub generated_at: DateTime<Utc>,
    pub executive_summary: String,
    pub table_of_contents: Vec<String>,
    pub sections: Vec<ReportSection>,
    pub severity_counts: IndexMap<Severity, usize>,
}

impl RiskReport {
    pub fn build(result: &AnalysisResult, engine: &SeverityEngine) -> Self {
        Self::build_at(result, engine, Utc::now())
    }

    /// Build with a fixed timestamp.
    pub fn build_at(
        result: &AnalysisResult,
        engine: &SeverityEngine,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let mut severity_counts: IndexMap<Severity, usize> =
            [Severity::High, Severity::Medium, Severity::Low]
                .into_iter()
                .map(|s| (s, 0))
                .collect();

        let sections: Vec<ReportSection> = result
            .sections
            .iter()
            .filter(|(_, matches)| !matches.is_empty())
            .map(|(name, matches)| {
                let entries = matches
                    .iter()
                    .map(|item| {
                        let severity = engine.severity(&item.pattern);
                        *severity_counts.entry(severity).or_default() += 1;
                        ReportEntry {
                            criterion: item
                                .criterion
                                .clone()
                                .unwrap_or_else(|| UNLABELED.to_string()),
                            pattern: item.pattern.clone(),
                            sentence: item.sentence.clone(),
                            severity,
                            suggestion: engine.suggestion(&item.pattern).to_string(),
                            reviewer_note: engine.reviewer_note().to_string(),
                        }
                    })
                    .collect();
                ReportSection {
                    name: name.clone(),
                    title: title_case(name),
                    entries,
                }
            })
            .collect();

        Self {
            title: REPORT_TITLE.to_string(),
            filename: result.filename.clone(),
            generated_at,
            executive_summary: EXECUTIVE_SUMMARY.to_string(),
            table_of_contents: sections.iter().map(|s| s.title.clone()).collect(),
            sections,
            severity_counts,
        }
    }

    pub fn entry_count(&self) -> usize {
        self.sections.iter().map(|s| s.entries.len()).sum()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.severity_counts.get(&severity).copied().unwrap_or(0)
    }

    pub fn render_markdown(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_markdown(&mut out);
        out
    }

    fn write_markdown(&self, out: &mut String) -> std::fmt::Result {
        writeln!(out, "# {}", self.title)?;
        writeln!(out)?;
        writeln!(out, "Filename: {}", self.filename)?;
        writeln!(out)?;
        writeln!(out, "{}", REPORT_SUBTITLE)?;
        writeln!(out)?;
        writeln!(
            out,
            "_Generated {}_",
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        )?;
        writeln!(out)?;

        writeln!(out, "## Executive Summary")?;
        writeln!(out)?;
        writeln!(out, "{}", self.executive_summary)?;
        writeln!(out)?;
        let counts: Vec<String> = self
            .severity_counts
            .iter()
            .map(|(severity, count)| format!("{}: {}", severity.label(), count))
            .collect();
        writeln!(out, "Red flags: {} ({})", self.entry_count(), counts.join(", "))?;
        writeln!(out)?;

        writeln!(out, "## Table of Contents")?;
        writeln!(out)?;
        for title in &self.table_of_contents {
            writeln!(out, "- {}", title)?;
        }
        writeln!(out)?;

        writeln!(out, "## Risk Matrix")?;
        for section in &self.sections {
            writeln!(out)?;
            writeln!(out, "### Section: {}", section.title)?;
            writeln!(out)?;
            for entry in &section.entries {
                writeln!(out, "- ❗ {} → '{}'", entry.criterion, entry.pattern)?;
                writeln!(out, "  - Found in: {}", entry.sentence)?;
                writeln!(out, "  - Severity: {}", entry.severity.label())?;
                writeln!(out, "  - Suggestion: {}", entry.suggestion)?;
                writeln!(out, "  - 🧠 Reviewer Note: {}", entry.reviewer_note)?;
            }
        }
        Ok(())
    }
}

/// Capitalise the first letter of every alphabetic run and lower-case the rest.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            if in_word {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(ch);
            in_word = false;
        }
    }
    out
}
