//! The dataset handle every analyzer reads from.
//!
//! A [`Dataset`] owns a polars `DataFrame` plus one [`TypeTag`] per column.
//! Tags are computed once, at construction; text columns whose values are
//! all plain numbers are converted to Float64 at the same time so that every
//! Numeric column can be read as `f64`. NaN and infinite floats become nulls,
//! so they count as missing everywhere. Only the cleaner mutates a dataset,
//! and each mutation bumps [`Dataset::revision`].

use crate::error::{EngineError, Result, ResultExt};
use crate::normalize::series_to_values;
use crate::profiler::type_inference::{coerce_numeric_text, infer_type_tag};
use crate::types::TypeTag;
use crate::utils::finite_values;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Dataset {
    frame: DataFrame,
    tags: Vec<TypeTag>,
    revision: u64,
}

/// First and last rows of a dataset, column by column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPreview {
    pub head: BTreeMap<String, Vec<Value>>,
    pub tail: BTreeMap<String, Vec<Value>>,
}

impl Dataset {
    /// Build a dataset, classifying every column.
    pub fn new(mut frame: DataFrame) -> Result<Self> {
        let names: Vec<String> = frame
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        let mut tags = Vec::with_capacity(names.len());
        for name in &names {
            let series = frame.column(name)?.as_materialized_series().clone();
            let tag = if let Some(numeric) = coerce_numeric_text(&series)? {
                debug!("Column '{}' holds numeric text, converting to Float64", name);
                frame
                    .replace(name, numeric)
                    .context(format!("converting column '{name}'"))?;
                TypeTag::Numeric
            } else {
                if let Some(finite) = null_non_finite(&series)? {
                    debug!("Column '{}' holds NaN or infinite values, marking them missing", name);
                    frame
                        .replace(name, finite)
                        .context(format!("clearing non-finite values in '{name}'"))?;
                }
                infer_type_tag(frame.column(name)?.as_materialized_series())?
            };
            tags.push(tag);
        }

        Ok(Self {
            frame,
            tags,
            revision: 0,
        })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn width(&self) -> usize {
        self.frame.width()
    }

    /// `(rows, columns)`
    pub fn shape(&self) -> (usize, usize) {
        (self.frame.height(), self.frame.width())
    }

    /// Number of mutations applied since the dataset was built.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    /// Column names paired with their tags, in column order.
    pub fn tagged_columns(&self) -> impl Iterator<Item = (String, TypeTag)> + '_ {
        self.frame
            .get_column_names()
            .into_iter()
            .map(|s| s.to_string())
            .zip(self.tags.iter().copied())
    }

    pub fn type_tag(&self, name: &str) -> Option<TypeTag> {
        self.frame
            .get_column_index(name)
            .and_then(|idx| self.tags.get(idx).copied())
    }

    /// Names of every column with the given tag, in column order.
    pub fn columns_with_tag(&self, tag: TypeTag) -> Vec<String> {
        self.tagged_columns()
            .filter(|(_, t)| *t == tag)
            .map(|(name, _)| name)
            .collect()
    }

    pub fn series(&self, name: &str) -> Result<&Series> {
        self.frame
            .column(name)
            .map(|c| c.as_materialized_series())
            .map_err(|_| EngineError::ColumnNotFound(name.to_string()))
    }

    /// Finite non-null values of a Numeric column.
    pub fn numeric_values(&self, name: &str) -> Result<Vec<f64>> {
        match self.type_tag(name) {
            None => Err(EngineError::ColumnNotFound(name.to_string())),
            Some(TypeTag::Numeric) => Ok(finite_values(self.series(name)?)?),
            Some(tag) => Err(EngineError::column(
                name,
                format!("expected a numeric column, found {tag}"),
            )),
        }
    }

    /// Raw values of one column as transport-safe JSON, in row order.
    ///
    /// This is what chart rendering consumes; it does not depend on any
    /// computed statistics.
    pub fn column_values(&self, name: &str) -> Result<Vec<Value>> {
        Ok(series_to_values(self.series(name)?))
    }

    /// First and last `n` rows of every column.
    pub fn preview(&self, n: usize) -> DataPreview {
        let head = self.frame.head(Some(n));
        let tail = self.frame.tail(Some(n));
        let by_column = |df: &DataFrame| {
            df.get_columns()
                .iter()
                .map(|c| {
                    let series = c.as_materialized_series();
                    (series.name().to_string(), series_to_values(series))
                })
                .collect()
        };
        DataPreview {
            head: by_column(&head),
            tail: by_column(&tail),
        }
    }

    /// Estimated in-memory size of the data in bytes.
    pub fn memory_usage(&self) -> usize {
        self.frame.estimated_size()
    }

    /// Swap in a transformed frame with the same columns.
    pub(crate) fn replace_frame(&mut self, frame: DataFrame) -> Result<()> {
        if frame.get_column_names() != self.frame.get_column_names() {
            return Err(EngineError::InvalidConfig(
                "transformed frame must keep the original columns".to_string(),
            ));
        }
        self.frame = frame;
        self.revision += 1;
        Ok(())
    }
}

/// Float column with NaN and infinities replaced by nulls, `None` when the
/// column is not a float column or has nothing to replace.
fn null_non_finite(series: &Series) -> PolarsResult<Option<Series>> {
    if !series.dtype().is_float() {
        return Ok(None);
    }
    let floats = series.cast(&DataType::Float64)?;
    let values = floats.f64()?;
    if values.into_iter().flatten().all(f64::is_finite) {
        return Ok(None);
    }
    let cleaned: Vec<Option<f64>> = values
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite()))
        .collect();
    Ok(Some(Series::new(series.name().clone(), cleaned)))
}

impl TryFrom<DataFrame> for Dataset {
    type Error = EngineError;

    fn try_from(frame: DataFrame) -> Result<Self> {
        Dataset::new(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Dataset {
        let df = df!(
            "age" => &[Some(30i64), Some(40), None],
            "price" => &[Some("1.5"), Some("2"), Some("3.25")],
            "city" => &["Paris", "Lyon", "Paris"],
            "active" => &[true, false, true]
        )
        .unwrap();
        Dataset::new(df).unwrap()
    }

    #[test]
    fn test_tags_are_assigned_once() {
        let ds = sample();
        assert_eq!(ds.type_tag("age"), Some(TypeTag::Numeric));
        assert_eq!(ds.type_tag("price"), Some(TypeTag::Numeric));
        assert_eq!(ds.type_tag("city"), Some(TypeTag::Categorical));
        assert_eq!(ds.type_tag("active"), Some(TypeTag::Boolean));
        assert_eq!(ds.type_tag("missing"), None);
        assert_eq!(ds.revision(), 0);
    }

    #[test]
    fn test_non_finite_floats_become_missing() {
        let ds = Dataset::new(
            df!(
                "v" => &[1.0f64, f64::NAN, 3.0, f64::INFINITY, 5.0],
                "w" => &[1.0f64, 2.0, 3.0, 4.0, 5.0]
            )
            .unwrap(),
        )
        .unwrap();
        assert_eq!(ds.series("v").unwrap().null_count(), 2);
        assert_eq!(ds.series("w").unwrap().null_count(), 0);
        assert_eq!(ds.type_tag("v"), Some(TypeTag::Numeric));
        assert_eq!(ds.numeric_values("v").unwrap(), vec![1.0, 3.0, 5.0]);
    }

    #[test]
    fn test_numeric_text_is_converted() {
        let ds = sample();
        assert_eq!(ds.series("price").unwrap().dtype(), &DataType::Float64);
        assert_eq!(ds.numeric_values("price").unwrap(), vec![1.5, 2.0, 3.25]);
    }

    #[test]
    fn test_columns_with_tag_keeps_order() {
        let ds = sample();
        assert_eq!(ds.columns_with_tag(TypeTag::Numeric), vec!["age", "price"]);
    }

    #[test]
    fn test_numeric_values_rejects_other_tags() {
        let ds = sample();
        let err = ds.numeric_values("city").unwrap_err();
        assert!(err.is_column_local());
        assert!(matches!(
            ds.numeric_values("nope"),
            Err(EngineError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn test_column_values_for_charts() {
        let ds = sample();
        assert_eq!(ds.column_values("age").unwrap(), vec![json!(30), json!(40), Value::Null]);
    }

    #[test]
    fn test_preview() {
        let ds = sample();
        let preview = ds.preview(2);
        assert_eq!(preview.head["city"], vec![json!("Paris"), json!("Lyon")]);
        assert_eq!(preview.tail["city"], vec![json!("Lyon"), json!("Paris")]);
    }

    #[test]
    fn test_replace_frame_bumps_revision() {
        let mut ds = sample();
        let trimmed = ds.frame().head(Some(1));
        ds.replace_frame(trimmed).unwrap();
        assert_eq!(ds.revision(), 1);
        assert_eq!(ds.shape(), (1, 4));
    }
}
