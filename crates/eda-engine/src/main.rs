//! CLI entry point for the dataset analysis engine.

use anyhow::{Result, anyhow};
use clap::{Parser, ValueEnum};
use dotenv::dotenv;
use eda_engine::ai::Recommendations;
use eda_engine::loader::load_csv_path;
use eda_engine::reporting::report_base_name;
use eda_engine::{
    AnalysisReport, CleaningOutcome, CleaningRequest, ColumnOutcome, CorrelationMethod, DataCleaner,
    Dataset, EngineConfig, NormalityTest, OutlierDetail, OutlierMethod, OutlierResult,
    ReportGenerator, StatisticsBundle, StatisticsEngine, to_transport,
};
use std::path::Path;
use tracing::{info, warn};

#[cfg(feature = "ai")]
use eda_engine::ai::{GeminiConfig, GeminiProvider, RecommendationService};
#[cfg(feature = "ai")]
use std::env;
#[cfg(feature = "ai")]
use std::sync::Arc;

/// Correlations at or above this magnitude are listed in the summary.
const STRONG_CORRELATION: f64 = 0.7;

/// CLI-compatible outlier method enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliOutlierMethod {
    /// Flag values outside Q1 - k*IQR .. Q3 + k*IQR
    Iqr,
    /// Flag values whose z-score exceeds the threshold
    Zscore,
}

impl From<CliOutlierMethod> for OutlierMethod {
    fn from(cli: CliOutlierMethod) -> Self {
        match cli {
            CliOutlierMethod::Iqr => OutlierMethod::Iqr,
            CliOutlierMethod::Zscore => OutlierMethod::ZScore,
        }
    }
}

/// CLI-compatible normality test enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliNormalityTest {
    /// Shapiro-Wilk on up to 5000 values
    Shapiro,
    /// Kolmogorov-Smirnov against a fitted normal
    Ks,
}

impl From<CliNormalityTest> for NormalityTest {
    fn from(cli: CliNormalityTest) -> Self {
        match cli {
            CliNormalityTest::Shapiro => NormalityTest::ShapiroWilk,
            CliNormalityTest::Ks => NormalityTest::KolmogorovSmirnov,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Profile, analyze and clean tabular datasets",
    long_about = "Loads a CSV file, applies optional cleaning actions, and reports \
                  column profiles, descriptive statistics, outliers, normality and \
                  correlations.\n\n\
                  CLEANING ACTIONS:\n  \
                  drop_missing, fill_missing_mean, fill_missing_median,\n  \
                  fill_missing_mode, drop_duplicates, remove_outliers\n  \
                  Append ':col_a,col_b' to restrict an action to some columns.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  GEMINI_API_KEY    API key for Gemini (required for --recommend)\n  \
                  GEMINI_MODEL      Model override (default: gemini-1.5-flash)\n\n\
                  EXAMPLES:\n  \
                  # Analyze a file\n  \
                  eda-engine -i data.csv\n\n  \
                  # Clean, then write a JSON report to results/\n  \
                  eda-engine -i data.csv --clean drop_duplicates --clean fill_missing_median:age -r -o results/\n\n  \
                  # Machine-readable output\n  \
                  eda-engine -i data.csv --json | jq .summary"
)]
struct Args {
    /// Path to the CSV file to analyze
    #[arg(short, long)]
    input: String,

    /// Output directory for reports
    #[arg(short, long, default_value = "output")]
    output: String,

    /// Cleaning action to apply before analysis, in order (repeatable)
    ///
    /// Format: `action` or `action:col_a,col_b`
    #[arg(long = "clean", value_name = "ACTION[:COLUMNS]")]
    cleanings: Vec<CleaningRequest>,

    /// Outlier detection method
    #[arg(long, value_enum, default_value = "iqr")]
    outlier_method: CliOutlierMethod,

    /// IQR fence multiplier
    #[arg(long, default_value = "1.5")]
    iqr_multiplier: f64,

    /// Z-score threshold
    #[arg(long, default_value = "3.0")]
    zscore_threshold: f64,

    /// Test that decides the "Normal" classification
    #[arg(long, value_enum, default_value = "shapiro")]
    normality_test: CliNormalityTest,

    /// Significance level for normality tests
    #[arg(long, default_value = "0.05")]
    alpha: f64,

    /// Include the row and value of every flagged outlier
    #[arg(long)]
    detailed_outliers: bool,

    /// Request cleaning recommendations from the language model
    #[arg(long)]
    recommend: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,

    /// Output the JSON report to stdout instead of a human-readable summary
    ///
    /// Disables all progress logs.
    #[arg(long)]
    json: bool,

    /// Write a JSON report to the output directory
    ///
    /// The report will be saved as <input_name>_report.json
    #[arg(short = 'r', long)]
    emit_report: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn build_config(args: &Args) -> Result<EngineConfig> {
    let detail = if args.detailed_outliers {
        OutlierDetail::Detailed
    } else {
        OutlierDetail::Summary
    };

    Ok(EngineConfig::builder()
        .outlier_method(args.outlier_method.into())
        .iqr_multiplier(args.iqr_multiplier)
        .zscore_threshold(args.zscore_threshold)
        .outlier_detail(detail)
        .normality_test(args.normality_test.into())
        .significance_level(args.alpha)
        .output_dir(&args.output)
        .build()?)
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    // Load environment variables from .env file
    dotenv().ok();

    if !Path::new(&args.input).exists() {
        return Err(anyhow!("Input file not found: {}", args.input));
    }

    let config = build_config(&args)?;

    info!("Loading dataset from: {}", args.input);
    let mut dataset = load_csv_path(&args.input)?;

    let history = apply_cleanings(&mut dataset, &args.cleanings, &config)?;

    let engine = StatisticsEngine::new(config);
    let bundle = engine.analyze(&dataset)?;

    let mut report = ReportGenerator::build(&bundle, &args.input);
    report.cleaning_history = history;
    if args.recommend {
        report.recommendations = request_recommendations(&bundle);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&to_transport(&report)?)?);
        return Ok(());
    }

    if args.emit_report {
        let generator = ReportGenerator::from_config(engine.config());
        let report_path =
            generator.write_report_to_file(&report, &report_base_name(&args.input))?;
        info!("Report written to: {}", report_path.display());
    }

    print_human_readable_summary(&report);

    Ok(())
}

fn apply_cleanings(
    dataset: &mut Dataset,
    requests: &[CleaningRequest],
    config: &EngineConfig,
) -> Result<Vec<CleaningOutcome>> {
    let mut history = Vec::with_capacity(requests.len());
    for request in requests {
        let outcome = DataCleaner::apply(dataset, request, config)?;
        if !outcome.skipped_columns.is_empty() {
            warn!(
                "{}: skipped columns {:?}",
                outcome.action, outcome.skipped_columns
            );
        }
        history.push(outcome);
    }
    Ok(history)
}

/// Ask Gemini for recommendations. Failures are logged and leave the report
/// without recommendations.
#[cfg(feature = "ai")]
fn request_recommendations(bundle: &StatisticsBundle) -> Option<Recommendations> {
    let api_key = match env::var("GEMINI_API_KEY") {
        Ok(key) if !key.trim().is_empty() => key,
        _ => {
            warn!("GEMINI_API_KEY not set. Skipping recommendations.");
            return None;
        }
    };

    let mut gemini_config = GeminiConfig::builder();
    if let Ok(model) = env::var("GEMINI_MODEL") {
        gemini_config = gemini_config.model(model);
    }

    let provider = match GeminiProvider::with_config(api_key, gemini_config.build()) {
        Ok(provider) => provider,
        Err(e) => {
            warn!("Could not create Gemini client: {}", e);
            return None;
        }
    };

    match RecommendationService::new(Arc::new(provider)).recommend(bundle) {
        Ok(recommendations) => Some(recommendations),
        Err(e) => {
            warn!("Recommendations unavailable: {}", e);
            None
        }
    }
}

#[cfg(not(feature = "ai"))]
fn request_recommendations(_bundle: &StatisticsBundle) -> Option<Recommendations> {
    warn!("Recommendation support not compiled in.");
    warn!("Compile with --features ai to enable it.");
    None
}

/// Truncate a string to max length with ellipsis
fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

/// Strings without their JSON quotes, anything else as JSON.
fn plain_text(value: &serde_json::Value) -> String {
    value
        .as_str()
        .map_or_else(|| value.to_string(), str::to_owned)
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.3}", v))
}

/// Print the analysis summary to stdout.
///
/// Uses `println!` rather than logging so the summary shows regardless of
/// the log level.
fn print_human_readable_summary(report: &AnalysisReport) {
    let bundle = &report.statistics;
    let summary = &report.summary;

    println!("\n{}", "=".repeat(80));
    println!("DATASET ANALYSIS");
    println!("{}\n", "=".repeat(80));

    println!("OVERVIEW");
    println!("{}", "-".repeat(40));
    println!("  File: {}", report.input_file);
    println!("  Rows: {}", summary.rows);
    println!("  Columns: {}", summary.columns);
    println!(
        "  Duplicate rows: {} ({}%)",
        summary.duplicate_rows, summary.duplicate_percentage
    );
    println!(
        "  Memory usage: {:.1} KB",
        bundle.profile.memory_usage_bytes as f64 / 1024.0
    );
    println!();

    if !report.cleaning_history.is_empty() {
        println!("CLEANING APPLIED");
        println!("{}", "-".repeat(40));
        for outcome in &report.cleaning_history {
            println!(
                "  - {}: {} rows removed, {} values filled, shape {:?}",
                outcome.action, outcome.rows_removed, outcome.values_filled, outcome.shape
            );
        }
        println!();
    }

    println!("COLUMN PROFILES");
    println!("{}", "-".repeat(40));
    println!(
        "{:<20} {:<12} {:<10} {:<10}",
        "Column", "Type", "Missing %", "Unique"
    );
    println!("{}", "-".repeat(56));
    for col in &bundle.profile.column_profiles {
        println!(
            "{:<20} {:<12} {:<10.1} {:<10}",
            truncate_str(&col.name, 19),
            col.type_tag.to_string(),
            col.null_percentage,
            col.unique_count
        );
    }
    println!();

    if !bundle.numeric_stats.is_empty() {
        println!("NUMERIC COLUMNS");
        println!("{}", "-".repeat(40));
        println!(
            "{:<20} {:>10} {:>10} {:>10} {:>10} {:<22}",
            "Column", "Mean", "Std", "Median", "Outliers", "Distribution"
        );
        println!("{}", "-".repeat(86));
        for (name, outcome) in &bundle.numeric_stats {
            let ColumnOutcome::Available(stats) = outcome else {
                println!("{:<20} unavailable", truncate_str(name, 19));
                continue;
            };
            let outliers = match bundle.outliers.get(name).and_then(ColumnOutcome::available) {
                Some(OutlierResult::Detected(s)) => s.count.to_string(),
                Some(OutlierResult::InsufficientData { .. }) => "n/a".to_string(),
                None => "-".to_string(),
            };
            let distribution = bundle
                .normality
                .get(name)
                .and_then(ColumnOutcome::available)
                .and_then(|r| serde_json::to_value(r.classification).ok())
                .and_then(|v| v.as_str().map(str::to_owned))
                .unwrap_or_else(|| "-".to_string());
            println!(
                "{:<20} {:>10.3} {:>10} {:>10.3} {:>10} {:<22}",
                truncate_str(name, 19),
                stats.mean,
                fmt_opt(stats.std),
                stats.median,
                outliers,
                distribution
            );
        }
        println!();
    }

    let strong: Vec<_> = bundle
        .correlations
        .get(&CorrelationMethod::Pearson)
        .map(|m| m.strong_pairs(STRONG_CORRELATION))
        .unwrap_or_default();
    if !strong.is_empty() {
        println!("STRONG CORRELATIONS (Pearson)");
        println!("{}", "-".repeat(40));
        for (a, b, r) in &strong {
            println!("  {} ~ {}: {:.3}", a, b, r);
        }
        println!();
    }

    if let Some(ref recommendations) = report.recommendations {
        println!("RECOMMENDATIONS");
        println!("{}", "-".repeat(40));
        println!("  {}", plain_text(&recommendations.summary));
        println!(
            "  Data quality score: {}",
            plain_text(&recommendations.data_quality_score)
        );
        println!();
    }

    println!("{}", "=".repeat(80));
}
