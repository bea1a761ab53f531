use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Semantic type of a column, decided once when the dataset is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    Numeric,
    Categorical,
    Boolean,
    Datetime,
}

impl std::fmt::Display for TypeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TypeTag::Numeric => "numeric",
            TypeTag::Categorical => "categorical",
            TypeTag::Boolean => "boolean",
            TypeTag::Datetime => "datetime",
        };
        f.write_str(name)
    }
}

/// Result of one computation for one column.
///
/// Serialized as `{"status": "available", "value": ...}` or
/// `{"status": "unavailable", "value": {"reason": ...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum ColumnOutcome<T> {
    Available(T),
    Unavailable { reason: String },
}

impl<T> ColumnOutcome<T> {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        ColumnOutcome::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, ColumnOutcome::Available(_))
    }

    pub fn available(&self) -> Option<&T> {
        match self {
            ColumnOutcome::Available(value) => Some(value),
            ColumnOutcome::Unavailable { .. } => None,
        }
    }
}

impl<T> From<crate::error::Result<T>> for ColumnOutcome<T> {
    fn from(result: crate::error::Result<T>) -> Self {
        match result {
            Ok(value) => ColumnOutcome::Available(value),
            Err(e) => ColumnOutcome::unavailable(e.to_string()),
        }
    }
}

/// Per-column outcomes keyed by column name.
pub type ColumnReport<T> = BTreeMap<String, ColumnOutcome<T>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    pub dtype: String,
    pub type_tag: TypeTag,
    pub unique_count: usize,
    pub null_count: usize,
    pub null_percentage: f64,
    pub sample_values: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetProfile {
    pub shape: (usize, usize),
    pub columns: Vec<String>,
    pub column_profiles: Vec<ColumnProfile>,
    pub duplicate_count: usize,
    pub duplicate_percentage: f64,
    /// Estimated in-memory size of the data in bytes.
    pub memory_usage_bytes: usize,
    pub numeric_columns: Vec<String>,
    pub categorical_columns: Vec<String>,
    pub boolean_columns: Vec<String>,
    pub datetime_columns: Vec<String>,
}

impl DatasetProfile {
    /// Null count per column.
    pub fn null_counts(&self) -> BTreeMap<String, usize> {
        self.column_profiles
            .iter()
            .map(|c| (c.name.clone(), c.null_count))
            .collect()
    }

    /// Null percentage per column.
    pub fn null_percentages(&self) -> BTreeMap<String, f64> {
        self.column_profiles
            .iter()
            .map(|c| (c.name.clone(), c.null_percentage))
            .collect()
    }

    /// Storage dtype per column.
    pub fn dtypes(&self) -> BTreeMap<String, String> {
        self.column_profiles
            .iter()
            .map(|c| (c.name.clone(), c.dtype.clone()))
            .collect()
    }

    /// Columns with at least one missing value.
    pub fn columns_with_missing(&self) -> Vec<String> {
        self.column_profiles
            .iter()
            .filter(|c| c.null_count > 0)
            .map(|c| c.name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    #[test]
    fn test_column_outcome_serialization() {
        let ok: ColumnOutcome<f64> = ColumnOutcome::Available(1.5);
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["status"], "available");
        assert_eq!(json["value"], 1.5);

        let missing: ColumnOutcome<f64> = ColumnOutcome::unavailable("no values");
        let json = serde_json::to_value(&missing).unwrap();
        assert_eq!(json["status"], "unavailable");
        assert_eq!(json["value"]["reason"], "no values");
    }

    #[test]
    fn test_column_outcome_from_result() {
        let err: crate::error::Result<f64> = Err(EngineError::column("x", "zero variance"));
        let outcome = ColumnOutcome::from(err);
        assert!(!outcome.is_available());
        match outcome {
            ColumnOutcome::Unavailable { reason } => assert!(reason.contains("zero variance")),
            ColumnOutcome::Available(_) => panic!("expected unavailable"),
        }
    }

    #[test]
    fn test_type_tag_names() {
        assert_eq!(TypeTag::Numeric.to_string(), "numeric");
        assert_eq!(
            serde_json::to_value(TypeTag::Datetime).unwrap(),
            serde_json::json!("datetime")
        );
    }
}
