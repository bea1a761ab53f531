//! Tabular Dataset Profiling and Statistics Engine
//!
//! Built on Polars. Given an in-memory dataset the engine computes
//! structural metadata, descriptive statistics, outlier flags, normality
//! assessments and correlation matrices, applies cleaning actions, and
//! produces a serializable [`StatisticsBundle`].
//!
//! # Overview
//!
//! - **Profiling**: column type tags, null/unique counts, duplicates, samples
//! - **Statistics**: numeric summaries and categorical frequencies
//! - **Outliers**: IQR or Z-score, with an explicit "insufficient data" result
//! - **Normality**: Shapiro-Wilk and Kolmogorov-Smirnov plus a shape heuristic
//! - **Correlation**: Pearson and Spearman over pairwise-complete rows
//! - **Cleaning**: drop/fill missing values, drop duplicates, remove outliers
//! - **Recommendations**: optional LLM advice validated against a fixed schema
//!
//! A single bad column never fails an analysis pass: its entry becomes
//! [`ColumnOutcome::Unavailable`] with the reason.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use eda_engine::{CleaningAction, CleaningRequest, DataCleaner, EngineConfig, StatisticsEngine};
//! use eda_engine::loader::load_csv_path;
//!
//! let mut dataset = load_csv_path("data.csv")?;
//! let engine = StatisticsEngine::new(EngineConfig::default());
//!
//! let bundle = engine.analyze(&dataset)?;
//! println!("{}", serde_json::to_string_pretty(&bundle.to_json()?)?);
//!
//! DataCleaner::apply(
//!     &mut dataset,
//!     &CleaningRequest::new(CleaningAction::FillMissingMedian),
//!     engine.config(),
//! )?;
//! assert!(!bundle.is_current_for(&dataset));
//! ```
//!
//! # Configuration
//!
//! ```rust,ignore
//! use eda_engine::config::*;
//!
//! let config = EngineConfig::builder()
//!     .outlier_method(OutlierMethod::ZScore)
//!     .zscore_threshold(2.5)
//!     .normality_test(NormalityTest::KolmogorovSmirnov)
//!     .significance_level(0.01)
//!     .build()?;
//! ```
//!
//! # Sessions
//!
//! [`SessionStore`] keeps one dataset per [`SessionId`] and caches its bundle
//! until the next cleaning action.

pub mod ai;
pub mod bundle;
pub mod cleaner;
pub mod config;
pub mod correlation;
pub mod dataset;
pub mod error;
pub mod loader;
pub mod normality;
pub mod normalize;
pub mod outliers;
pub mod profiler;
pub mod reporting;
pub mod session;
pub mod statistics;
pub mod stats;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use bundle::{StatisticsBundle, StatisticsEngine};
pub use cleaner::{CleaningAction, CleaningOutcome, CleaningRequest, DataCleaner};
pub use config::{
    ConfigValidationError, CorrelationMethod, EngineConfig, EngineConfigBuilder, NormalityTest,
    OutlierDetail, OutlierMethod,
};
pub use correlation::{CorrelationEngine, CorrelationMatrix};
pub use dataset::{DataPreview, Dataset};
pub use error::{EngineError, Result as EngineResult, ResultExt};
pub use normality::{NormalityClass, NormalityReport, NormalityTester, TestResult};
pub use normalize::{normalize_value, to_transport};
pub use outliers::{OutlierDetector, OutlierResult, OutlierSummary};
pub use profiler::DatasetProfiler;
pub use reporting::{AnalysisReport, ReportGenerator, ReportSummary};
pub use session::{SessionId, SessionStore};
pub use statistics::{CategoricalStats, ColumnStatistics, ColumnStats, ValueCount};
pub use types::{ColumnOutcome, ColumnProfile, ColumnReport, DatasetProfile, TypeTag};
