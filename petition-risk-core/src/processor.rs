use crate::classifier::CriterionPredictor;
use crate::config::RiskConfig;
use crate::rules::{RedFlagMatcher, RuleTable, SectionSegmenter};
use crate::sentences::{SentenceSplitter, UnicodeSentenceSplitter};
use crate::types::AnalysisResult;
use indexmap::IndexMap;
use std::time::{Duration, Instant};

/// Wall-clock time spent in one pipeline stage across a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageTiming {
    pub total: Duration,
    pub calls: usize,
}

/// Accumulates per-stage timings over every document of a run.
///
/// Disabled profilers run the timed closures and record nothing.
pub struct StepProfiler {
    enabled: bool,
    stages: IndexMap<String, StageTiming>,
    documents: usize,
    current_document: Duration,
}

impl StepProfiler {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            stages: IndexMap::new(),
            documents: 0,
            current_document: Duration::ZERO,
        }
    }

    pub fn time_step<F, R>(&mut self, stage: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        if !self.enabled {
            return f();
        }

        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        let timing = self.stages.entry(stage.to_string()).or_default();
        timing.total += elapsed;
        timing.calls += 1;
        self.current_document += elapsed;
        tracing::debug!("⏱️  {}: {}µs", stage, elapsed.as_micros());

        result
    }

    /// Close the timing window of one document.
    pub fn finish_document(&mut self, filename: &str, red_flags: usize) {
        if !self.enabled {
            return;
        }
        self.documents += 1;
        println!(
            "⏱️  {}: {} red flags in {}ms",
            filename,
            red_flags,
            self.current_document.as_millis()
        );
        self.current_document = Duration::ZERO;
    }

    pub fn documents(&self) -> usize {
        self.documents
    }

    pub fn stage(&self, name: &str) -> Option<StageTiming> {
        self.stages.get(name).copied()
    }

    pub fn stages(&self) -> impl Iterator<Item = (&str, StageTiming)> {
        self.stages.iter().map(|(name, timing)| (name.as_str(), *timing))
    }

    pub fn print_summary(&self) {
        if !self.enabled || self.stages.is_empty() {
            return;
        }

        let total: Duration = self.stages.values().map(|t| t.total).sum();
        let per_document = self.documents.max(1) as f64;

        println!("\n📊 Stage timings over {} document(s):", self.documents);
        for (stage, timing) in &self.stages {
            let share = if total.is_zero() {
                0.0
            } else {
                timing.total.as_secs_f64() / total.as_secs_f64() * 100.0
            };
            println!(
                "   {:.<28} {:>6}ms total {:>8.2}ms/doc ({:.1}%)",
                stage,
                timing.total.as_millis(),
                timing.total.as_secs_f64() * 1000.0 / per_document,
                share
            );
        }
        println!("   {:.<28} {:>6}ms", "all stages", total.as_millis());
    }
}

/// Runs segmentation and red-flag matching over one document at a time.
///
/// Holds no per-document state, so one analyzer serves any number of documents.
pub struct PetitionAnalyzer {
    segmenter: SectionSegmenter,
    splitter: Box<dyn SentenceSplitter>,
}

impl Default for PetitionAnalyzer {
    fn default() -> Self {
        Self::new(SectionSegmenter::default(), Box::new(UnicodeSentenceSplitter))
    }
}

impl PetitionAnalyzer {
    /// Create an analyzer with explicit collaborators
    pub fn new(segmenter: SectionSegmenter, splitter: Box<dyn SentenceSplitter>) -> Self {
        Self {
            segmenter,
            splitter,
        }
    }

    pub fn from_config(config: &RiskConfig) -> Self {
        Self::new(
            SectionSegmenter::new(&config.sections.headers),
            Box::new(UnicodeSentenceSplitter),
        )
    }

    pub fn analyze(&self, text: &str, filename: &str, table: &RuleTable) -> AnalysisResult {
        self.analyze_profiled(text, filename, table, &mut StepProfiler::new(false))
    }

    /// Same as [`analyze`](Self::analyze), recording stage timings in `profiler`.
    pub fn analyze_profiled(
        &self,
        text: &str,
        filename: &str,
        table: &RuleTable,
        profiler: &mut StepProfiler,
    ) -> AnalysisResult {
        let document = profiler.time_step("segment", || self.segmenter.segment(text));

        let matcher = RedFlagMatcher::new(table);
        let mut result = AnalysisResult::new(filename);
        let mut sentence_count = 0usize;

        profiler.time_step("match", || {
            for section in document.sections() {
                for sentence in self.splitter.split(&section.raw_text) {
                    // An empty sentence is contained in every pattern.
                    if sentence.trim().is_empty() {
                        continue;
                    }
                    sentence_count += 1;
                    let matches = matcher.match_sentence(sentence, &section.name);
                    result.add_matches(&section.name, matches);
                }
            }
        });

        tracing::info!(
            "🔍 {}: {} sections, {} sentences, {} red flags ({} unlabeled) via {}",
            filename,
            document.len(),
            sentence_count,
            result.total_matches(),
            result.unlabeled_count(),
            self.splitter.name()
        );
        profiler.finish_document(filename, result.total_matches());

        result
    }
}

/// Analyze a document with the default segmenter and sentence splitter.
pub fn analyze(text: &str, filename: &str, table: &RuleTable) -> AnalysisResult {
    PetitionAnalyzer::default().analyze(text, filename, table)
}

/// Fill every absent criterion by predicting on the match's pattern.
///
/// Present criteria are never touched, so a second pass fills nothing.
/// Returns the number of matches filled.
pub fn fill_missing_criteria<P>(result: &mut AnalysisResult, predictor: &P) -> usize
where
    P: CriterionPredictor + ?Sized,
{
    let mut filled = 0;
    for item in result.sections.values_mut().flatten() {
        if item.is_labeled() {
            continue;
        }
        let criterion = predictor.predict_criterion(&item.pattern);
        tracing::debug!("🏷️  '{}' -> {}", item.pattern, criterion);
        item.criterion = Some(criterion);
        filled += 1;
    }

    if filled > 0 {
        tracing::info!("🏷️  {}: filled {} missing criteria", result.filename, filled);
    }
    filled
}
