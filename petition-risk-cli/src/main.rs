use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

// Import from petition-risk-core
use petition_risk_core::classifier::{load_training_csv, train_classifier};
use petition_risk_core::report::REPORT_SUFFIX;
use petition_risk_core::storage::write_atomic;
use petition_risk_core::{
    extract_text, fill_missing_criteria, ClassifierModel, FileStorage, PetitionAnalyzer,
    ResultStorage, RiskConfig, RiskReport, RuleTable, SeverityEngine, StepProfiler,
};

use petition_risk_cli::init_tracing;

#[derive(Parser)]
#[command(name = "petition-risk")]
#[command(about = "Screen petition drafts for red-flag language and produce risk reports")]
struct Args {
    /// Path to custom config file (YAML format)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable debug logging (overridden by RUST_LOG / LOG_LEVEL)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Segment and match documents, writing one analysis file per input
    Analyze {
        /// Plain-text petition drafts
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Red-flag rule table (JSON)
        #[arg(long)]
        rules: Option<PathBuf>,

        /// Directory for `<stem>_analysis.json` files
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Enable detailed profiling of all pipeline steps
        #[arg(long)]
        profile: bool,
    },

    /// Train the criterion classifier from a `text,label` CSV
    Train {
        csv: PathBuf,

        #[arg(long)]
        model_dir: Option<PathBuf>,
    },

    /// Print the predicted criterion for each phrase
    Predict {
        #[arg(long)]
        model_dir: Option<PathBuf>,

        #[arg(required = true)]
        phrases: Vec<String>,
    },

    /// Fill missing criteria in stored analysis files
    Backfill {
        #[arg(long)]
        model_dir: Option<PathBuf>,

        #[arg(long)]
        analysis_dir: Option<PathBuf>,
    },

    /// Render a QA risk report for every stored analysis file
    Report {
        #[arg(long)]
        analysis_dir: Option<PathBuf>,

        #[arg(long)]
        report_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(if args.verbose { "debug" } else { "info" });

    println!("⚖️  Petition Risk Analyzer");

    let config = RiskConfig::load_with_fallback(args.config.as_deref());
    if let Some(config_path) = &args.config {
        println!("📋 Loaded config from: {}", config_path);
    } else {
        println!("📋 Using default config");
    }

    let failures = match args.command {
        Command::Analyze {
            inputs,
            rules,
            output_dir,
            profile,
        } => {
            let rules = rules.unwrap_or_else(|| PathBuf::from(&config.paths.rules_file));
            let output_dir =
                output_dir.unwrap_or_else(|| PathBuf::from(&config.paths.analysis_dir));
            run_analyze(&config, &inputs, &rules, &output_dir, profile)?
        }
        Command::Train { csv, model_dir } => {
            let model_dir = model_dir.unwrap_or_else(|| PathBuf::from(&config.paths.model_dir));
            run_train(&config, &csv, &model_dir)?;
            0
        }
        Command::Predict { model_dir, phrases } => {
            let model_dir = model_dir.unwrap_or_else(|| PathBuf::from(&config.paths.model_dir));
            run_predict(&model_dir, &phrases)?;
            0
        }
        Command::Backfill {
            model_dir,
            analysis_dir,
        } => {
            let model_dir = model_dir.unwrap_or_else(|| PathBuf::from(&config.paths.model_dir));
            let analysis_dir =
                analysis_dir.unwrap_or_else(|| PathBuf::from(&config.paths.analysis_dir));
            run_backfill(&model_dir, &analysis_dir)?
        }
        Command::Report {
            analysis_dir,
            report_dir,
        } => {
            let analysis_dir =
                analysis_dir.unwrap_or_else(|| PathBuf::from(&config.paths.analysis_dir));
            let report_dir = report_dir.unwrap_or_else(|| PathBuf::from(&config.paths.report_dir));
            run_report(&config, &analysis_dir, &report_dir)?
        }
    };

    if failures > 0 {
        eprintln!("❌ {} file(s) failed", failures);
        std::process::exit(1);
    }

    Ok(())
}

/// Returns the number of inputs that could not be processed.
fn run_analyze(
    config: &RiskConfig,
    inputs: &[PathBuf],
    rules: &Path,
    output_dir: &Path,
    profile: bool,
) -> Result<usize> {
    // A bad rule table aborts the whole run.
    let table = RuleTable::load(rules)
        .with_context(|| format!("Cannot load rule table {}", rules.display()))?;
    println!(
        "📜 Rule table: {} criteria, {} patterns",
        table.len(),
        table.pattern_count()
    );

    let analyzer = PetitionAnalyzer::from_config(config);
    let storage = FileStorage::new(output_dir)?;
    let mut profiler = StepProfiler::new(profile);
    let mut failures = 0;
    // result file -> input that produced it during this run
    let mut written: HashMap<PathBuf, &Path> = HashMap::new();

    for input in inputs {
        println!("📄 Processing: {}", input.display());

        let text = match profiler.time_step("extract", || extract_text(input)) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("❌ {}: {e}", input.display());
                failures += 1;
                continue;
            }
        };

        let filename = input
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document");

        let target = storage.result_path(filename);
        if let Some(previous) = written.get(&target) {
            tracing::error!(
                "❌ {}: result {} was already written for {} in this run",
                input.display(),
                target.display(),
                previous.display()
            );
            failures += 1;
            continue;
        }

        let result = analyzer.analyze_profiled(&text, filename, &table, &mut profiler);

        match storage.store_result(&result) {
            Ok(path) => {
                println!(
                    "💾 {} red flags in {} sections saved to: {}",
                    result.total_matches(),
                    result.sections.len(),
                    path.display()
                );
                written.insert(path, input.as_path());
            }
            Err(e) => {
                tracing::error!("❌ {}: {e:#}", input.display());
                failures += 1;
            }
        }
    }

    profiler.print_summary();
    Ok(failures)
}

fn run_train(config: &RiskConfig, csv: &Path, model_dir: &Path) -> Result<()> {
    let examples = load_training_csv(csv)?;
    println!("📚 Training on {} examples", examples.len());

    let outcome = train_classifier(&examples, &config.classifier)?;
    println!(
        "✅ Trained on {} rows ({} held out) in {} iterations",
        outcome.train_size, outcome.test_size, outcome.fit.iterations
    );

    match &outcome.report {
        Some(report) => println!("\n📊 Evaluation:\n{}", report),
        None => println!("⚠️  No held-out rows; skipping evaluation"),
    }

    outcome
        .model
        .save(model_dir)
        .with_context(|| format!("Cannot write model to {}", model_dir.display()))?;
    println!(
        "💾 Model {} saved to: {}",
        outcome.model.artifact_id(),
        model_dir.display()
    );
    Ok(())
}

fn run_predict(model_dir: &Path, phrases: &[String]) -> Result<()> {
    let model = ClassifierModel::load(model_dir)?;
    for phrase in phrases {
        let (label, confidence) = model.predict_with_confidence(phrase);
        println!("🏷️  {} → {} ({:.2})", phrase, label, confidence);
    }
    Ok(())
}

/// Returns the number of analysis files that could not be back-filled.
fn run_backfill(model_dir: &Path, analysis_dir: &Path) -> Result<usize> {
    // Without a model there is nothing to do; fail before touching any file.
    let model = ClassifierModel::load(model_dir)?;
    println!("🧠 Loaded model {}", model.artifact_id());

    let storage = FileStorage::new(analysis_dir)?;
    let mut failures = 0;
    let mut updated = 0;

    for path in storage.list_results()? {
        let mut result = match storage.load_result(&path) {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("❌ {e:#}");
                failures += 1;
                continue;
            }
        };

        let filled = fill_missing_criteria(&mut result, &model);
        if filled == 0 {
            println!("✔️  {}: nothing to fill", path.display());
            continue;
        }

        match storage.replace_result(&path, &result) {
            Ok(()) => {
                updated += 1;
                println!("💾 {}: filled {} criteria", path.display(), filled);
            }
            Err(e) => {
                tracing::error!("❌ {e:#}");
                failures += 1;
            }
        }
    }

    println!("✅ Back-fill complete: {} file(s) updated", updated);
    Ok(failures)
}

/// Returns the number of analysis files that could not be reported.
fn run_report(config: &RiskConfig, analysis_dir: &Path, report_dir: &Path) -> Result<usize> {
    let storage = FileStorage::new(analysis_dir)?;
    let engine = SeverityEngine::from_config(&config.severity);
    std::fs::create_dir_all(report_dir)
        .with_context(|| format!("Failed to create report directory {}", report_dir.display()))?;

    let mut failures = 0;
    for path in storage.list_results()? {
        match write_report(&storage, &engine, &path, report_dir) {
            Ok(markdown_path) => println!("✅ Report generated: {}", markdown_path.display()),
            Err(e) => {
                tracing::error!("❌ {e:#}");
                failures += 1;
            }
        }
    }
    Ok(failures)
}

fn write_report(
    storage: &FileStorage,
    engine: &SeverityEngine,
    path: &Path,
    report_dir: &Path,
) -> Result<PathBuf> {
    let result = storage.load_result(path)?;
    let report = RiskReport::build(&result, engine);

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("analysis");
    let markdown_path = report_dir.join(format!("{stem}{REPORT_SUFFIX}.md"));
    let json_path = report_dir.join(format!("{stem}{REPORT_SUFFIX}.json"));

    write_atomic(&markdown_path, &report.render_markdown())?;
    write_atomic(&json_path, &serde_json::to_string_pretty(&report)?)?;
    Ok(markdown_path)
}
