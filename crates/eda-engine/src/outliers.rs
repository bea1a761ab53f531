//! Outlier detection for numeric columns.
//!
//! Two interchangeable methods, both over a column's finite non-null values:
//!
//! - **IQR**: flags values outside `[Q1 - k*IQR, Q3 + k*IQR]` (k = 1.5)
//! - **Z-score**: flags values with `|z| > t` (t = 3) under the sample
//!   mean and standard deviation
//!
//! Columns with fewer than `min_outlier_samples` values get an explicit
//! [`OutlierResult::InsufficientData`] instead of a zero count.

use crate::config::{EngineConfig, OutlierDetail, OutlierMethod};
use crate::dataset::Dataset;
use crate::error::{EngineError, Result};
use crate::profiler::percentage;
use crate::stats;
use crate::types::{ColumnOutcome, ColumnReport, TypeTag};
use crate::utils::indexed_finite_values;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Quartiles and fences of one column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IqrBounds {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower: f64,
    pub upper: f64,
}

impl IqrBounds {
    /// Compute fences for `values`; `None` when there are no values.
    pub fn compute(values: &[f64], multiplier: f64) -> Option<Self> {
        let sorted = stats::sorted(values);
        let q1 = stats::quantile_sorted(&sorted, 0.25)?;
        let q3 = stats::quantile_sorted(&sorted, 0.75)?;
        let iqr = q3 - q1;
        Some(Self {
            q1,
            q3,
            iqr,
            lower: q1 - multiplier * iqr,
            upper: q3 + multiplier * iqr,
        })
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// One flagged value and the row it sits in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlaggedValue {
    pub row: usize,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierSummary {
    pub method: OutlierMethod,
    pub lower_bound: f64,
    pub upper_bound: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q1: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q3: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iqr: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub std: Option<f64>,
    pub count: usize,
    /// Share of the column's non-null values that were flagged.
    pub percentage: f64,
    pub non_null_count: usize,
    /// Only filled in detailed mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flagged: Option<Vec<FlaggedValue>>,
}

/// Outlier result of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutlierResult {
    InsufficientData {
        non_null_count: usize,
        required: usize,
    },
    Detected(OutlierSummary),
}

impl OutlierResult {
    /// Flagged count, `None` for insufficient data.
    pub fn count(&self) -> Option<usize> {
        match self {
            OutlierResult::Detected(summary) => Some(summary.count),
            OutlierResult::InsufficientData { .. } => None,
        }
    }
}

fn collect_flagged(
    values: &[(usize, f64)],
    is_outlier: impl Fn(f64) -> bool,
) -> Vec<FlaggedValue> {
    values
        .iter()
        .filter(|(_, v)| is_outlier(*v))
        .map(|&(row, value)| FlaggedValue { row, value })
        .collect()
}

/// IQR detection over `(row, value)` pairs.
pub fn detect_iqr(
    values: &[(usize, f64)],
    multiplier: f64,
    detail: OutlierDetail,
) -> Option<OutlierSummary> {
    let plain: Vec<f64> = values.iter().map(|(_, v)| *v).collect();
    let bounds = IqrBounds::compute(&plain, multiplier)?;
    let flagged = collect_flagged(values, |v| !bounds.contains(v));

    Some(OutlierSummary {
        method: OutlierMethod::Iqr,
        lower_bound: bounds.lower,
        upper_bound: bounds.upper,
        q1: Some(bounds.q1),
        q3: Some(bounds.q3),
        iqr: Some(bounds.iqr),
        mean: None,
        std: None,
        count: flagged.len(),
        percentage: percentage(flagged.len(), values.len()),
        non_null_count: values.len(),
        flagged: (detail == OutlierDetail::Detailed).then_some(flagged),
    })
}

/// Z-score detection over `(row, value)` pairs.
///
/// A zero standard deviation means no value can be an outlier; the bounds
/// collapse onto the mean.
pub fn detect_zscore(
    values: &[(usize, f64)],
    threshold: f64,
    detail: OutlierDetail,
) -> Option<OutlierSummary> {
    let plain: Vec<f64> = values.iter().map(|(_, v)| *v).collect();
    let mean = stats::mean(&plain)?;
    let std = stats::std_dev(&plain).unwrap_or(0.0);

    let flagged = if std < 1e-15 {
        Vec::new()
    } else {
        collect_flagged(values, |v| ((v - mean) / std).abs() > threshold)
    };

    Some(OutlierSummary {
        method: OutlierMethod::ZScore,
        lower_bound: mean - threshold * std,
        upper_bound: mean + threshold * std,
        q1: None,
        q3: None,
        iqr: None,
        mean: Some(mean),
        std: Some(std),
        count: flagged.len(),
        percentage: percentage(flagged.len(), values.len()),
        non_null_count: values.len(),
        flagged: (detail == OutlierDetail::Detailed).then_some(flagged),
    })
}

/// Runs the configured outlier method over numeric columns.
pub struct OutlierDetector<'a> {
    config: &'a EngineConfig,
}

impl<'a> OutlierDetector<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Detect outliers in one column with the configured method.
    pub fn detect_column(&self, dataset: &Dataset, name: &str) -> Result<OutlierResult> {
        self.detect_column_with(dataset, name, self.config.outlier_method)
    }

    /// Detect outliers in one column with an explicit method.
    pub fn detect_column_with(
        &self,
        dataset: &Dataset,
        name: &str,
        method: OutlierMethod,
    ) -> Result<OutlierResult> {
        match dataset.type_tag(name) {
            None => return Err(EngineError::ColumnNotFound(name.to_string())),
            Some(TypeTag::Numeric) => {}
            Some(tag) => {
                return Err(EngineError::column(
                    name,
                    format!("outliers need a numeric column, found {tag}"),
                ));
            }
        }

        let values = indexed_finite_values(dataset.series(name)?)?;
        let required = self.config.min_outlier_samples;
        if values.len() < required {
            debug!(
                "Column '{}' has {} values, {} needed for outliers",
                name,
                values.len(),
                required
            );
            return Ok(OutlierResult::InsufficientData {
                non_null_count: values.len(),
                required,
            });
        }

        let detail = self.config.outlier_detail;
        let summary = match method {
            OutlierMethod::Iqr => detect_iqr(&values, self.config.iqr_multiplier, detail),
            OutlierMethod::ZScore => detect_zscore(&values, self.config.zscore_threshold, detail),
        };
        summary
            .map(OutlierResult::Detected)
            .ok_or_else(|| EngineError::column(name, "could not compute outlier bounds"))
    }

    /// Outlier results for every Numeric column.
    pub fn report(&self, dataset: &Dataset) -> ColumnReport<OutlierResult> {
        dataset
            .columns_with_tag(TypeTag::Numeric)
            .into_iter()
            .map(|name| {
                let outcome = ColumnOutcome::from(self.detect_column(dataset, &name));
                if let ColumnOutcome::Unavailable { reason } = &outcome {
                    warn!("Outlier detection unavailable for '{}': {}", name, reason);
                }
                (name, outcome)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn indexed(values: &[f64]) -> Vec<(usize, f64)> {
        values.iter().copied().enumerate().collect()
    }

    // ==================== IQR ====================

    #[test]
    fn test_iqr_reference_case() {
        let summary =
            detect_iqr(&indexed(&[1.0, 2.0, 3.0, 4.0, 5.0, 100.0]), 1.5, OutlierDetail::Detailed)
                .unwrap();
        assert_eq!(summary.q1, Some(2.25));
        assert_eq!(summary.q3, Some(4.75));
        assert_eq!(summary.iqr, Some(2.5));
        assert_eq!(summary.lower_bound, -1.5);
        assert_eq!(summary.upper_bound, 8.5);
        assert_eq!(summary.count, 1);
        assert_eq!(
            summary.flagged,
            Some(vec![FlaggedValue { row: 5, value: 100.0 }])
        );
    }

    #[test]
    fn test_iqr_bounds_order() {
        let bounds = IqrBounds::compute(&[3.0, 9.0, 1.0, 4.0, 4.0, 7.0], 1.5).unwrap();
        assert!(bounds.lower <= bounds.q1);
        assert!(bounds.q1 <= bounds.q3);
        assert!(bounds.q3 <= bounds.upper);
        assert!(bounds.iqr >= 0.0);
    }

    #[test]
    fn test_summary_mode_omits_flagged_rows() {
        let summary =
            detect_iqr(&indexed(&[1.0, 2.0, 3.0, 4.0, 50.0]), 1.5, OutlierDetail::Summary).unwrap();
        assert_eq!(summary.count, 1);
        assert!(summary.flagged.is_none());
        let json = serde_json::to_value(&summary).unwrap();
        assert!(json.get("flagged").is_none());
        assert_eq!(json["method"], "IQR");
    }

    // ==================== Z-score ====================

    #[test]
    fn test_zscore_flags_far_value() {
        let mut values: Vec<f64> = (0..30).map(|i| (i % 5) as f64).collect();
        values.push(1000.0);
        let summary = detect_zscore(&indexed(&values), 3.0, OutlierDetail::Detailed).unwrap();
        assert_eq!(summary.count, 1);
        assert_eq!(summary.flagged.unwrap()[0].row, 30);
    }

    #[test]
    fn test_zscore_zero_std_has_no_outliers() {
        let summary = detect_zscore(&indexed(&[5.0; 6]), 3.0, OutlierDetail::Summary).unwrap();
        assert_eq!(summary.count, 0);
        assert_eq!(summary.lower_bound, 5.0);
        assert_eq!(summary.upper_bound, 5.0);
        assert_eq!(summary.percentage, 0.0);
    }

    // ==================== OutlierDetector ====================

    #[test]
    fn test_insufficient_data_is_distinct_from_zero() {
        let ds = Dataset::new(
            df!(
                "few" => &[Some(1.0f64), Some(2.0), None, Some(3.0), None, None],
                "many" => &[1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0]
            )
            .unwrap(),
        )
        .unwrap();
        let config = EngineConfig::default();
        let detector = OutlierDetector::new(&config);
        let report = detector.report(&ds);

        assert_eq!(
            report["few"].available(),
            Some(&OutlierResult::InsufficientData {
                non_null_count: 3,
                required: 4
            })
        );
        assert_eq!(report["many"].available().unwrap().count(), Some(0));
    }

    #[test]
    fn test_detected_rows_refer_to_original_positions() {
        let ds = Dataset::new(
            df!("v" => &[None, Some(1.0f64), Some(2.0), Some(3.0), Some(4.0), Some(5.0), Some(100.0)])
                .unwrap(),
        )
        .unwrap();
        let config = EngineConfig::builder()
            .outlier_detail(OutlierDetail::Detailed)
            .build()
            .unwrap();
        let result = OutlierDetector::new(&config).detect_column(&ds, "v").unwrap();
        match result {
            OutlierResult::Detected(summary) => {
                assert_eq!(summary.flagged.unwrap(), vec![FlaggedValue { row: 6, value: 100.0 }]);
                assert_eq!(summary.non_null_count, 6);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_non_numeric_column_is_column_error() {
        let ds = Dataset::new(df!("c" => &["a", "b", "c", "d"]).unwrap()).unwrap();
        let config = EngineConfig::default();
        let err = OutlierDetector::new(&config)
            .detect_column(&ds, "c")
            .unwrap_err();
        assert!(err.is_column_local());
    }
}
