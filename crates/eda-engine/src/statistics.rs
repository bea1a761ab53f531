//! Descriptive statistics per column.
//!
//! Numeric columns get the usual summary (count, mean, std, quartiles,
//! extremes, skewness, excess kurtosis). Categorical and Boolean columns get
//! frequency statistics. A column that cannot be summarized is reported as
//! unavailable; it never aborts the pass.

use crate::dataset::Dataset;
use crate::error::{EngineError, Result};
use crate::profiler::percentage;
use crate::stats;
use crate::types::{ColumnOutcome, ColumnReport, TypeTag};
use crate::utils::sorted_value_counts;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const TOP_VALUES: usize = 5;
const MAX_UNIQUE_VALUES: usize = 20;

/// Summary of a numeric column's non-null values.
///
/// `std` needs two values, `skewness` three and `kurtosis` four; below that,
/// or for a constant column, they are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub count: usize,
    pub mean: f64,
    pub std: Option<f64>,
    pub min: f64,
    #[serde(rename = "25%")]
    pub q1: f64,
    #[serde(rename = "50%")]
    pub median: f64,
    #[serde(rename = "75%")]
    pub q3: f64,
    pub max: f64,
    pub skewness: Option<f64>,
    pub kurtosis: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

/// Frequency summary of a categorical or boolean column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalStats {
    pub count: usize,
    pub missing_count: usize,
    pub missing_percentage: f64,
    pub unique_count: usize,
    pub mode: Option<String>,
    /// Up to five most frequent values, most frequent first.
    pub most_common: Vec<ValueCount>,
    /// Up to five least frequent values, least frequent last.
    pub least_common: Vec<ValueCount>,
    /// The first twenty distinct values in frequency order.
    pub unique_values: Vec<String>,
}

pub struct ColumnStatistics;

impl ColumnStatistics {
    /// Summarize a slice of finite values.
    pub fn describe(values: &[f64]) -> Option<ColumnStats> {
        let sorted = stats::sorted(values);
        let count = sorted.len();
        if count == 0 {
            return None;
        }
        Some(ColumnStats {
            count,
            mean: stats::mean(&sorted)?,
            std: stats::std_dev(&sorted),
            min: sorted[0],
            q1: stats::quantile_sorted(&sorted, 0.25)?,
            median: stats::quantile_sorted(&sorted, 0.5)?,
            q3: stats::quantile_sorted(&sorted, 0.75)?,
            max: sorted[count - 1],
            skewness: stats::skewness(&sorted),
            kurtosis: stats::excess_kurtosis(&sorted),
        })
    }

    /// Descriptive statistics for one Numeric column.
    pub fn numeric_column(dataset: &Dataset, name: &str) -> Result<ColumnStats> {
        let values = dataset.numeric_values(name)?;
        Self::describe(&values).ok_or_else(|| EngineError::column(name, "no non-null values"))
    }

    /// Descriptive statistics for every Numeric column.
    pub fn numeric_report(dataset: &Dataset) -> ColumnReport<ColumnStats> {
        dataset
            .columns_with_tag(TypeTag::Numeric)
            .into_iter()
            .map(|name| {
                let outcome = ColumnOutcome::from(Self::numeric_column(dataset, &name));
                if let ColumnOutcome::Unavailable { reason } = &outcome {
                    warn!("Statistics unavailable for '{}': {}", name, reason);
                }
                (name, outcome)
            })
            .collect()
    }

    /// Frequency statistics for one Categorical or Boolean column.
    pub fn categorical_column(dataset: &Dataset, name: &str) -> Result<CategoricalStats> {
        let series = dataset.series(name)?;
        let total = series.len();
        let missing_count = series.null_count();
        let counts = sorted_value_counts(series)?;

        let most_common: Vec<ValueCount> = counts
            .iter()
            .take(TOP_VALUES)
            .map(|(value, count)| ValueCount {
                value: value.clone(),
                count: *count,
            })
            .collect();
        let least_common: Vec<ValueCount> = counts
            .iter()
            .skip(counts.len().saturating_sub(TOP_VALUES))
            .map(|(value, count)| ValueCount {
                value: value.clone(),
                count: *count,
            })
            .collect();

        debug!("Column '{}': {} distinct values", name, counts.len());
        Ok(CategoricalStats {
            count: total - missing_count,
            missing_count,
            missing_percentage: percentage(missing_count, total),
            unique_count: counts.len(),
            mode: counts.first().map(|(value, _)| value.clone()),
            most_common,
            least_common,
            unique_values: counts
                .iter()
                .take(MAX_UNIQUE_VALUES)
                .map(|(value, _)| value.clone())
                .collect(),
        })
    }

    /// Frequency statistics for every Categorical and Boolean column.
    pub fn categorical_report(dataset: &Dataset) -> ColumnReport<CategoricalStats> {
        dataset
            .tagged_columns()
            .filter(|(_, tag)| matches!(tag, TypeTag::Categorical | TypeTag::Boolean))
            .map(|(name, _)| {
                let outcome = ColumnOutcome::from(Self::categorical_column(dataset, &name));
                if let ColumnOutcome::Unavailable { reason } = &outcome {
                    warn!("Frequency statistics unavailable for '{}': {}", name, reason);
                }
                (name, outcome)
            })
            .collect()
    }
}
