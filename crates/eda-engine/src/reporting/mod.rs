//! Report generation.
//!
//! [`ReportGenerator::build`] turns a [`crate::StatisticsBundle`] into an
//! [`AnalysisReport`]: a timestamped document with a headline summary that
//! renderers (HTML templates, the CLI's `--report` flag) consume as-is.
//!
//! ```rust,ignore
//! use eda_engine::reporting::{ReportGenerator, report_base_name};
//!
//! let report = ReportGenerator::build(&bundle, "data/train.csv");
//! let generator = ReportGenerator::new("output");
//! generator.write_report_to_file(&report, &report_base_name("data/train.csv"))?;
//! ```

mod generator;

pub use generator::{AnalysisReport, ReportGenerator, ReportSummary, report_base_name};
