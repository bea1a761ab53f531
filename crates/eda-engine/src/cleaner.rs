//! Cleaning actions that mutate a dataset.
//!
//! Every action takes an optional column subset; an empty subset means every
//! eligible column. Columns that do not exist, or whose tag does not fit the
//! action, are skipped and reported in [`CleaningOutcome::skipped_columns`].
//!
//! `remove_outliers` over several columns is a cumulative cascade: bounds for
//! each column are computed on the rows left after the previous columns were
//! filtered, in the order the columns were given.

use crate::config::EngineConfig;
use crate::dataset::Dataset;
use crate::error::{EngineError, Result};
use crate::outliers::IqrBounds;
use crate::profiler::drop_duplicate_rows;
use crate::stats;
use crate::types::TypeTag;
use crate::utils::{fill_numeric_nulls, fill_string_nulls, finite_values, string_mode};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleaningAction {
    DropMissing,
    FillMissingMean,
    FillMissingMedian,
    FillMissingMode,
    DropDuplicates,
    RemoveOutliers,
}

impl CleaningAction {
    pub const ALL: [CleaningAction; 6] = [
        CleaningAction::DropMissing,
        CleaningAction::FillMissingMean,
        CleaningAction::FillMissingMedian,
        CleaningAction::FillMissingMode,
        CleaningAction::DropDuplicates,
        CleaningAction::RemoveOutliers,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CleaningAction::DropMissing => "drop_missing",
            CleaningAction::FillMissingMean => "fill_missing_mean",
            CleaningAction::FillMissingMedian => "fill_missing_median",
            CleaningAction::FillMissingMode => "fill_missing_mode",
            CleaningAction::DropDuplicates => "drop_duplicates",
            CleaningAction::RemoveOutliers => "remove_outliers",
        }
    }

    /// Whether a column with this tag can be a target of the action.
    fn accepts(&self, tag: TypeTag) -> bool {
        match self {
            CleaningAction::DropMissing | CleaningAction::DropDuplicates => true,
            CleaningAction::FillMissingMean
            | CleaningAction::FillMissingMedian
            | CleaningAction::RemoveOutliers => tag == TypeTag::Numeric,
            CleaningAction::FillMissingMode => tag == TypeTag::Categorical,
        }
    }
}

impl fmt::Display for CleaningAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CleaningAction {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == wanted)
            .ok_or_else(|| {
                EngineError::InvalidConfig(format!(
                    "unknown cleaning action '{}', expected one of: {}",
                    s,
                    Self::ALL.map(|a| a.as_str()).join(", ")
                ))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningRequest {
    pub action: CleaningAction,
    #[serde(default)]
    pub columns: Vec<String>,
}

impl CleaningRequest {
    pub fn new(action: CleaningAction) -> Self {
        Self {
            action,
            columns: Vec::new(),
        }
    }

    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }
}

/// Parses `action` or `action:col_a,col_b`.
impl FromStr for CleaningRequest {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        let (action, columns) = match s.split_once(':') {
            Some((action, cols)) => (action, cols),
            None => (s, ""),
        };
        Ok(CleaningRequest::new(action.parse()?).with_columns(
            columns
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty()),
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningOutcome {
    pub action: CleaningAction,
    /// `(rows, columns)` after the action.
    pub shape: (usize, usize),
    pub rows_removed: usize,
    pub values_filled: usize,
    pub applied_columns: Vec<String>,
    pub skipped_columns: Vec<String>,
}

/// Split the requested columns into usable targets and skipped names.
fn resolve_targets(dataset: &Dataset, request: &CleaningRequest) -> (Vec<String>, Vec<String>) {
    let action = request.action;
    if request.columns.is_empty() {
        let targets = dataset
            .tagged_columns()
            .filter(|(_, tag)| action.accepts(*tag))
            .map(|(name, _)| name)
            .collect();
        return (targets, Vec::new());
    }

    let mut targets = Vec::new();
    let mut skipped = Vec::new();
    for name in &request.columns {
        match dataset.type_tag(name) {
            Some(tag) if action.accepts(tag) && !targets.contains(name) => {
                targets.push(name.clone())
            }
            Some(tag) if action.accepts(tag) => {}
            _ => {
                debug!("Skipping column '{}' for {}", name, action);
                skipped.push(name.clone());
            }
        }
    }
    (targets, skipped)
}

fn keep_rows(frame: &DataFrame, keep: &[bool]) -> PolarsResult<DataFrame> {
    let mask = BooleanChunked::from_slice("keep".into(), keep);
    frame.filter(&mask)
}

pub struct DataCleaner;

impl DataCleaner {
    /// Apply one cleaning action in place.
    ///
    /// The dataset revision is bumped on success, which makes every bundle
    /// computed before the call stale.
    pub fn apply(
        dataset: &mut Dataset,
        request: &CleaningRequest,
        config: &EngineConfig,
    ) -> Result<CleaningOutcome> {
        let (targets, skipped_columns) = resolve_targets(dataset, request);
        let rows_before = dataset.height();

        let (frame, applied_columns, values_filled) = match request.action {
            CleaningAction::DropMissing => {
                let frame = Self::drop_missing(dataset.frame(), &targets)?;
                (frame, targets, 0)
            }
            CleaningAction::FillMissingMean | CleaningAction::FillMissingMedian => {
                Self::fill_numeric(dataset, &targets, request.action)?
            }
            CleaningAction::FillMissingMode => {
                Self::fill_mode(dataset, &targets, &config.mode_fallback_label)?
            }
            CleaningAction::DropDuplicates => {
                let frame = drop_duplicate_rows(dataset.frame())?;
                (frame, dataset.column_names(), 0)
            }
            CleaningAction::RemoveOutliers => Self::remove_outliers(dataset, &targets, config)?,
        };

        dataset.replace_frame(frame)?;
        let outcome = CleaningOutcome {
            action: request.action,
            shape: dataset.shape(),
            rows_removed: rows_before - dataset.height(),
            values_filled,
            applied_columns,
            skipped_columns,
        };

        info!(
            "Applied {}: {} rows removed, {} values filled, shape {:?}",
            outcome.action, outcome.rows_removed, outcome.values_filled, outcome.shape
        );
        Ok(outcome)
    }

    fn drop_missing(frame: &DataFrame, targets: &[String]) -> Result<DataFrame> {
        let mut keep = vec![true; frame.height()];
        for name in targets {
            let present = frame.column(name)?.as_materialized_series().is_not_null();
            for (slot, present) in keep.iter_mut().zip(present.into_iter()) {
                *slot &= present.unwrap_or(false);
            }
        }
        Ok(keep_rows(frame, &keep)?)
    }

    fn fill_numeric(
        dataset: &Dataset,
        targets: &[String],
        action: CleaningAction,
    ) -> Result<(DataFrame, Vec<String>, usize)> {
        let mut frame = dataset.frame().clone();
        let mut applied = Vec::new();
        let mut filled = 0;

        for name in targets {
            let values = dataset.numeric_values(name)?;
            let fill = match action {
                CleaningAction::FillMissingMean => stats::mean(&values),
                _ => stats::median(&values),
            };
            let Some(fill) = fill else {
                debug!("Column '{}' has no values to compute a fill from", name);
                continue;
            };

            let series = dataset.series(name)?;
            filled += series.null_count();
            frame.replace(name, fill_numeric_nulls(series, fill)?)?;
            applied.push(name.clone());
        }
        Ok((frame, applied, filled))
    }

    fn fill_mode(
        dataset: &Dataset,
        targets: &[String],
        fallback: &str,
    ) -> Result<(DataFrame, Vec<String>, usize)> {
        let mut frame = dataset.frame().clone();
        let mut filled = 0;

        for name in targets {
            let series = dataset.series(name)?;
            let mode = string_mode(series)?.unwrap_or_else(|| fallback.to_string());
            filled += series.null_count();
            frame.replace(name, fill_string_nulls(series, &mode)?)?;
        }
        Ok((frame, targets.to_vec(), filled))
    }

    /// Drop rows outside the IQR fences, column after column.
    ///
    /// Only rows with a value outside the fences go. A missing cell is not an
    /// outlier, so its row stays; `drop_missing` is the action that removes it.
    fn remove_outliers(
        dataset: &Dataset,
        targets: &[String],
        config: &EngineConfig,
    ) -> Result<(DataFrame, Vec<String>, usize)> {
        let mut frame = dataset.frame().clone();
        let mut applied = Vec::new();

        for name in targets {
            let series = frame.column(name)?.as_materialized_series().clone();
            let values = finite_values(&series)?;
            if values.len() < config.min_outlier_samples {
                debug!(
                    "Column '{}' has {} values, not removing outliers",
                    name,
                    values.len()
                );
                continue;
            }
            let Some(bounds) = IqrBounds::compute(&values, config.iqr_multiplier) else {
                continue;
            };

            let cast = series.cast(&DataType::Float64)?;
            let keep: Vec<bool> = cast
                .f64()?
                .into_iter()
                .map(|v| match v {
                    Some(x) if x.is_finite() => bounds.contains(x),
                    _ => true,
                })
                .collect();

            let before = frame.height();
            frame = keep_rows(&frame, &keep)?;
            debug!(
                "Column '{}': removed {} rows outside [{}, {}]",
                name,
                before - frame.height(),
                bounds.lower,
                bounds.upper
            );
            applied.push(name.clone());
        }
        Ok((frame, applied, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn apply(ds: &mut Dataset, request: CleaningRequest) -> CleaningOutcome {
        DataCleaner::apply(ds, &request, &EngineConfig::default()).unwrap()
    }

    // ==================== parsing ====================

    #[test]
    fn test_action_names() {
        for action in CleaningAction::ALL {
            assert_eq!(action.as_str().parse::<CleaningAction>().unwrap(), action);
        }
        assert_eq!(
            serde_json::to_value(CleaningAction::FillMissingMode).unwrap(),
            serde_json::json!("fill_missing_mode")
        );
    }

    #[test]
    fn test_unknown_action_is_invalid_config() {
        let err = "drop_everything".parse::<CleaningAction>().unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
    }

    #[test]
    fn test_request_with_columns() {
        let request: CleaningRequest = "remove_outliers: a, b".parse().unwrap();
        assert_eq!(request.action, CleaningAction::RemoveOutliers);
        assert_eq!(request.columns, vec!["a", "b"]);

        let request: CleaningRequest = "drop_duplicates".parse().unwrap();
        assert!(request.columns.is_empty());
    }

    // ==================== actions ====================

    #[test]
    fn test_drop_duplicates() {
        let mut ds = Dataset::new(df!("a" => &[1i64, 1, 2]).unwrap()).unwrap();
        let outcome = apply(&mut ds, CleaningRequest::new(CleaningAction::DropDuplicates));
        assert_eq!(outcome.shape, (2, 1));
        assert_eq!(outcome.rows_removed, 1);
        assert_eq!(ds.numeric_values("a").unwrap(), vec![1.0, 2.0]);
        assert_eq!(ds.revision(), 1);
    }

    #[test]
    fn test_drop_duplicates_compares_cells_not_joined_text() {
        let mut ds = Dataset::new(
            df!(
                "a" => &["x\u{1F}sy", "x"],
                "b" => &["z", "y\u{1F}sz"]
            )
            .unwrap(),
        )
        .unwrap();
        let outcome = apply(&mut ds, CleaningRequest::new(CleaningAction::DropDuplicates));
        assert_eq!(outcome.rows_removed, 0);
        assert_eq!(ds.height(), 2);
    }

    #[test]
    fn test_drop_missing_on_subset() {
        let mut ds = Dataset::new(
            df!(
                "a" => &[Some(1i64), None, Some(3)],
                "b" => &[None, Some("x"), Some("y")]
            )
            .unwrap(),
        )
        .unwrap();
        let outcome = apply(
            &mut ds,
            CleaningRequest::new(CleaningAction::DropMissing).with_columns(["a"]),
        );
        assert_eq!(outcome.rows_removed, 1);
        assert_eq!(outcome.shape, (2, 2));
        assert_eq!(ds.series("b").unwrap().null_count(), 1);
    }

    #[test]
    fn test_fill_mean_and_median() {
        let frame = df!("v" => &[Some(1i64), None, Some(2), Some(9)]).unwrap();

        let mut ds = Dataset::new(frame.clone()).unwrap();
        let outcome = apply(&mut ds, CleaningRequest::new(CleaningAction::FillMissingMean));
        assert_eq!(outcome.values_filled, 1);
        assert_eq!(ds.series("v").unwrap().dtype(), &DataType::Float64);
        assert_eq!(ds.numeric_values("v").unwrap(), vec![1.0, 4.0, 2.0, 9.0]);

        let mut ds = Dataset::new(frame).unwrap();
        apply(&mut ds, CleaningRequest::new(CleaningAction::FillMissingMedian));
        assert_eq!(ds.numeric_values("v").unwrap(), vec![1.0, 2.0, 2.0, 9.0]);
    }

    #[test]
    fn test_fill_mode() {
        let mut ds = Dataset::new(df!("c" => &[Some("a"), Some("a"), None]).unwrap()).unwrap();
        let outcome = apply(&mut ds, CleaningRequest::new(CleaningAction::FillMissingMode));
        assert_eq!(outcome.values_filled, 1);
        assert_eq!(ds.series("c").unwrap().str().unwrap().get(2), Some("a"));
    }

    #[test]
    fn test_fill_mode_all_null_uses_fallback_label() {
        let mut ds = Dataset::new(df!("c" => &[None::<&str>, None]).unwrap()).unwrap();
        apply(&mut ds, CleaningRequest::new(CleaningAction::FillMissingMode));
        let filled = ds.series("c").unwrap().str().unwrap().clone();
        assert_eq!(filled.get(0), Some("Unknown"));
        assert_eq!(filled.get(1), Some("Unknown"));
    }

    #[test]
    fn test_wrong_tag_and_unknown_columns_are_skipped() {
        let mut ds = Dataset::new(
            df!(
                "n" => &[Some(1.0f64), None],
                "c" => &[Some("x"), None]
            )
            .unwrap(),
        )
        .unwrap();
        let outcome = apply(
            &mut ds,
            CleaningRequest::new(CleaningAction::FillMissingMean).with_columns(["c", "nope", "n"]),
        );
        assert_eq!(outcome.applied_columns, vec!["n"]);
        assert_eq!(outcome.skipped_columns, vec!["c", "nope"]);
        assert_eq!(ds.series("c").unwrap().null_count(), 1);
    }

    #[test]
    fn test_remove_outliers_keeps_nulls() {
        let mut ds = Dataset::new(
            df!("v" => &[Some(1.0f64), Some(2.0), Some(3.0), Some(4.0), Some(5.0), Some(100.0), None])
                .unwrap(),
        )
        .unwrap();
        let outcome = apply(&mut ds, CleaningRequest::new(CleaningAction::RemoveOutliers));
        assert_eq!(outcome.rows_removed, 1);
        assert_eq!(ds.height(), 6);
        assert_eq!(ds.series("v").unwrap().null_count(), 1);
    }

    #[test]
    fn test_remove_outliers_cascades() {
        // After 'a' drops its outlier row, 'b' loses its own outlier too: on
        // the original rows b = 50 would sit inside the fences.
        let mut ds = Dataset::new(
            df!(
                "a" => &[1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0, 500.0],
                "b" => &[10.0f64, 11.0, 12.0, 13.0, 14.0, 50.0, 5000.0]
            )
            .unwrap(),
        )
        .unwrap();
        let outcome = apply(
            &mut ds,
            CleaningRequest::new(CleaningAction::RemoveOutliers).with_columns(["a", "b"]),
        );
        assert_eq!(outcome.applied_columns, vec!["a", "b"]);
        assert_eq!(ds.numeric_values("b").unwrap(), vec![10.0, 11.0, 12.0, 13.0, 14.0]);
        assert_eq!(outcome.rows_removed, 2);
    }

    #[test]
    fn test_remove_outliers_skips_small_columns() {
        let mut ds = Dataset::new(df!("v" => &[1.0f64, 2.0, 900.0]).unwrap()).unwrap();
        let outcome = apply(&mut ds, CleaningRequest::new(CleaningAction::RemoveOutliers));
        assert!(outcome.applied_columns.is_empty());
        assert_eq!(ds.height(), 3);
        assert_eq!(ds.revision(), 1);
    }
}
