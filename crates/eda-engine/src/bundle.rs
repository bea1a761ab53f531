//! One full analysis pass over a dataset snapshot.

use crate::config::{CorrelationMethod, EngineConfig};
use crate::correlation::{CorrelationEngine, CorrelationMatrix};
use crate::dataset::Dataset;
use crate::error::Result;
use crate::normality::{NormalityClass, NormalityReport, NormalityTester};
use crate::normalize::to_transport;
use crate::outliers::{OutlierDetector, OutlierResult};
use crate::profiler::DatasetProfiler;
use crate::statistics::{CategoricalStats, ColumnStatistics, ColumnStats};
use crate::types::{ColumnReport, DatasetProfile};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::info;

/// Everything computed for one dataset revision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsBundle {
    /// RFC 3339 timestamp.
    pub generated_at: String,
    pub dataset_revision: u64,
    pub profile: DatasetProfile,
    pub numeric_stats: ColumnReport<ColumnStats>,
    pub categorical_stats: ColumnReport<CategoricalStats>,
    pub outliers: ColumnReport<OutlierResult>,
    pub normality: ColumnReport<NormalityReport>,
    pub correlations: BTreeMap<CorrelationMethod, CorrelationMatrix>,
}

impl StatisticsBundle {
    /// Whether the bundle still describes `dataset`.
    pub fn is_current_for(&self, dataset: &Dataset) -> bool {
        self.dataset_revision == dataset.revision()
    }

    /// Transport-safe JSON of the whole bundle.
    pub fn to_json(&self) -> Result<Value> {
        to_transport(self)
    }

    /// The statistics handed to the recommendation service.
    pub fn recommendation_payload(&self) -> Result<Value> {
        let profile = &self.profile;
        let payload = json!({
            "data_info": {
                "shape": profile.shape,
                "columns": profile.columns,
                "dtypes": profile.dtypes(),
                "memory_usage": profile.memory_usage_bytes,
                "null_counts": profile.null_counts(),
                "null_percentages": profile.null_percentages(),
                "duplicate_rows": profile.duplicate_count,
                "numerical_columns": profile.numeric_columns,
                "categorical_columns": profile.categorical_columns,
                "boolean_columns": profile.boolean_columns,
                "datetime_columns": profile.datetime_columns,
            },
            "descriptive_stats": to_transport(&self.numeric_stats)?,
            "categorical_stats": to_transport(&self.categorical_stats)?,
            "outliers": to_transport(&self.outliers)?,
            "normality_tests": to_transport(&self.normality)?,
            "correlations": to_transport(&self.correlations)?,
            "missing_values": profile.null_counts(),
            "data_types": profile.dtypes(),
            "shape": profile.shape,
            "memory_usage": profile.memory_usage_bytes,
        });
        to_transport(&payload)
    }

    /// Numeric columns with at least one flagged outlier.
    pub fn columns_with_outliers(&self) -> Vec<String> {
        self.outliers
            .iter()
            .filter(|(_, outcome)| {
                outcome
                    .available()
                    .and_then(OutlierResult::count)
                    .is_some_and(|count| count > 0)
            })
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Numeric columns classified as Non-Normal.
    pub fn non_normal_columns(&self) -> Vec<String> {
        self.normality
            .iter()
            .filter(|(_, outcome)| {
                outcome
                    .available()
                    .is_some_and(|r| r.classification == NormalityClass::NonNormal)
            })
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// Runs every analyzer with one configuration.
#[derive(Debug, Clone, Default)]
pub struct StatisticsEngine {
    config: EngineConfig,
}

impl StatisticsEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Analyze a dataset.
    ///
    /// Column-level failures end up as unavailable entries; only problems
    /// with the frame itself return an error.
    pub fn analyze(&self, dataset: &Dataset) -> Result<StatisticsBundle> {
        let start = Instant::now();
        let config = &self.config;

        let profile = DatasetProfiler::profile(dataset, config)?;
        let numeric_stats = ColumnStatistics::numeric_report(dataset);
        let categorical_stats = ColumnStatistics::categorical_report(dataset);
        let outliers = OutlierDetector::new(config).report(dataset);
        let normality = NormalityTester::new(config).report(dataset);
        let correlations = CorrelationEngine::compute_all(dataset, &config.correlation_methods)?;

        info!(
            "Analyzed {} rows x {} columns (revision {}) in {:?}",
            dataset.height(),
            dataset.width(),
            dataset.revision(),
            start.elapsed()
        );

        Ok(StatisticsBundle {
            generated_at: Utc::now().to_rfc3339(),
            dataset_revision: dataset.revision(),
            profile,
            numeric_stats,
            categorical_stats,
            outliers,
            normality,
            correlations,
        })
    }
}
