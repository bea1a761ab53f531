use crate::ai::Recommendations;
use crate::bundle::StatisticsBundle;
use crate::cleaner::CleaningOutcome;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::normalize::to_transport;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

// ============================================================================
// Report Types
// ============================================================================

/// Document handed to report renderers: a timestamp, a short headline
/// summary and the full statistics bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Local time, `%Y-%m-%d %H:%M:%S`.
    pub generated_at: String,
    pub input_file: String,
    pub summary: ReportSummary,
    /// Cleaning actions applied before the bundle was computed, in order.
    pub cleaning_history: Vec<CleaningOutcome>,
    pub statistics: StatisticsBundle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<Recommendations>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub rows: usize,
    pub columns: usize,
    pub duplicate_rows: usize,
    /// Formatted with one decimal.
    pub duplicate_percentage: String,
    /// Column count per type tag.
    pub type_counts: BTreeMap<String, usize>,
    pub columns_with_missing: Vec<String>,
    pub outlier_columns: Vec<String>,
    pub non_normal_columns: Vec<String>,
}

impl ReportSummary {
    fn from_bundle(bundle: &StatisticsBundle) -> Self {
        let profile = &bundle.profile;
        let mut type_counts: BTreeMap<String, usize> = BTreeMap::new();
        for col in &profile.column_profiles {
            *type_counts.entry(col.type_tag.to_string()).or_insert(0) += 1;
        }

        Self {
            rows: profile.shape.0,
            columns: profile.shape.1,
            duplicate_rows: profile.duplicate_count,
            duplicate_percentage: format!("{:.1}", profile.duplicate_percentage),
            type_counts,
            columns_with_missing: profile.columns_with_missing(),
            outlier_columns: bundle.columns_with_outliers(),
            non_normal_columns: bundle.non_normal_columns(),
        }
    }
}

// ============================================================================
// Generator
// ============================================================================

pub struct ReportGenerator {
    output_dir: PathBuf,
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl ReportGenerator {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Generator writing into the configured `output_dir`.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(&config.output_dir)
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Build a report for one bundle.
    pub fn build(bundle: &StatisticsBundle, input_file: &str) -> AnalysisReport {
        AnalysisReport {
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            input_file: input_file.to_string(),
            summary: ReportSummary::from_bundle(bundle),
            cleaning_history: Vec::new(),
            statistics: bundle.clone(),
            recommendations: None,
        }
    }

    /// Write a report as pretty JSON.
    ///
    /// With `report_base_name` "train" the file is `<output_dir>/train_report.json`.
    pub fn write_report_to_file(
        &self,
        report: &AnalysisReport,
        report_base_name: &str,
    ) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;

        let report_path = self
            .output_dir
            .join(format!("{}_report.json", report_base_name));
        let mut file = File::create(&report_path)?;
        file.write_all(serde_json::to_string_pretty(&to_transport(report)?)?.as_bytes())?;

        info!("Report saved: {}", report_path.display());

        Ok(report_path)
    }
}

/// File stem of an input path, used as the report base name.
pub fn report_base_name(input_file: &str) -> String {
    Path::new(input_file)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dataset".to_string())
}
