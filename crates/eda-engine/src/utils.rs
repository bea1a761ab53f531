//! Shared helpers for working with polars columns.

use polars::prelude::*;
use std::collections::HashMap;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType is a date, datetime or time.
#[inline]
pub fn is_datetime_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Datetime(_, _) | DataType::Date | DataType::Time
    )
}

// =============================================================================
// String Parsing Utilities
// =============================================================================

/// Parse a string as a finite number.
///
/// Only plain numeric literals count: surrounding whitespace is allowed,
/// formatting characters and words like `inf` or `NaN` are not.
pub fn parse_strict_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() || !trimmed.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Words accepted as boolean values in text columns.
pub const BOOLEAN_TRUE_VALUES: [&str; 2] = ["true", "yes"];
pub const BOOLEAN_FALSE_VALUES: [&str; 2] = ["false", "no"];

/// Check if a string is a boolean word (case-insensitive).
pub fn is_boolean_word(s: &str) -> bool {
    let lower = s.trim().to_ascii_lowercase();
    BOOLEAN_TRUE_VALUES
        .iter()
        .chain(BOOLEAN_FALSE_VALUES.iter())
        .any(|&v| v == lower)
}

// =============================================================================
// Series Utilities
// =============================================================================

/// Finite non-null values of a numeric Series as `f64`.
pub fn finite_values(series: &Series) -> PolarsResult<Vec<f64>> {
    let cast = series.cast(&DataType::Float64)?;
    Ok(cast
        .f64()?
        .into_iter()
        .flatten()
        .filter(|v| v.is_finite())
        .collect())
}

/// `(row index, value)` pairs of the finite non-null values.
pub fn indexed_finite_values(series: &Series) -> PolarsResult<Vec<(usize, f64)>> {
    let cast = series.cast(&DataType::Float64)?;
    Ok(cast
        .f64()?
        .into_iter()
        .enumerate()
        .filter_map(|(i, v)| v.filter(|x| x.is_finite()).map(|x| (i, x)))
        .collect())
}

/// Frequency of every non-null value, rendered as text.
pub fn value_counts(series: &Series) -> PolarsResult<HashMap<String, usize>> {
    let non_null = series.drop_nulls();
    let as_text = non_null.cast(&DataType::String)?;
    let mut counts: HashMap<String, usize> = HashMap::new();
    for val in as_text.str()?.into_iter().flatten() {
        *counts.entry(val.to_string()).or_insert(0) += 1;
    }
    Ok(counts)
}

/// Value counts ordered by descending count, ties by ascending value.
pub fn sorted_value_counts(series: &Series) -> PolarsResult<Vec<(String, usize)>> {
    let mut counts: Vec<(String, usize)> = value_counts(series)?.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    Ok(counts)
}

/// Most frequent value of a Series; ties go to the lexicographically
/// smallest value. `None` when the Series has no values.
pub fn string_mode(series: &Series) -> PolarsResult<Option<String>> {
    Ok(sorted_value_counts(series)?
        .into_iter()
        .next()
        .map(|(val, _)| val))
}

/// Fill null values in a numeric Series, producing Float64.
pub fn fill_numeric_nulls(series: &Series, fill_value: f64) -> PolarsResult<Series> {
    let cast = series.cast(&DataType::Float64)?;
    let filled: Vec<Option<f64>> = cast
        .f64()?
        .into_iter()
        .map(|v| Some(v.unwrap_or(fill_value)))
        .collect();
    Ok(Series::new(series.name().clone(), filled))
}

/// Fill null values in a text Series with a specific value.
pub fn fill_string_nulls(series: &Series, fill_value: &str) -> PolarsResult<Series> {
    let cast = series.cast(&DataType::String)?;
    let filled: Vec<Option<String>> = cast
        .str()?
        .into_iter()
        .map(|v| Some(v.unwrap_or(fill_value).to_string()))
        .collect();
    Ok(Series::new(series.name().clone(), filled))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_numeric_dtype() {
        assert!(is_numeric_dtype(&DataType::Int64));
        assert!(is_numeric_dtype(&DataType::Float32));
        assert!(!is_numeric_dtype(&DataType::String));
        assert!(!is_numeric_dtype(&DataType::Boolean));
    }

    #[test]
    fn test_is_datetime_dtype() {
        assert!(is_datetime_dtype(&DataType::Date));
        assert!(is_datetime_dtype(&DataType::Datetime(
            TimeUnit::Milliseconds,
            None
        )));
        assert!(!is_datetime_dtype(&DataType::String));
    }

    #[test]
    fn test_parse_strict_number() {
        assert_eq!(parse_strict_number("42"), Some(42.0));
        assert_eq!(parse_strict_number(" -3.5 "), Some(-3.5));
        assert_eq!(parse_strict_number("1e3"), Some(1000.0));
        assert_eq!(parse_strict_number("$1,234"), None);
        assert_eq!(parse_strict_number("inf"), None);
        assert_eq!(parse_strict_number("NaN"), None);
        assert_eq!(parse_strict_number(""), None);
        assert_eq!(parse_strict_number("12abc"), None);
    }

    #[test]
    fn test_is_boolean_word() {
        assert!(is_boolean_word("TRUE"));
        assert!(is_boolean_word(" no "));
        assert!(!is_boolean_word("1"));
        assert!(!is_boolean_word("maybe"));
    }

    #[test]
    fn test_finite_values_skips_nulls() {
        let series = Series::new("v".into(), &[Some(1i64), None, Some(3)]);
        assert_eq!(finite_values(&series).unwrap(), vec![1.0, 3.0]);
    }

    #[test]
    fn test_indexed_finite_values_keeps_row_positions() {
        let series = Series::new("v".into(), &[None, Some(2.0f64), Some(f64::NAN), Some(4.0)]);
        assert_eq!(
            indexed_finite_values(&series).unwrap(),
            vec![(1, 2.0), (3, 4.0)]
        );
    }

    #[test]
    fn test_string_mode_tie_breaks_lexicographically() {
        let series = Series::new("s".into(), &["b", "a", "b", "a", "c"]);
        assert_eq!(string_mode(&series).unwrap(), Some("a".to_string()));
    }

    #[test]
    fn test_string_mode_all_null() {
        let series = Series::new("s".into(), &[None::<&str>, None]);
        assert_eq!(string_mode(&series).unwrap(), None);
    }

    #[test]
    fn test_fill_numeric_nulls() {
        let series = Series::new("test".into(), &[Some(1i32), None, Some(3)]);
        let filled = fill_numeric_nulls(&series, 2.0).unwrap();
        assert_eq!(filled.dtype(), &DataType::Float64);
        assert_eq!(filled.null_count(), 0);
        assert_eq!(filled.get(1).unwrap().try_extract::<f64>().unwrap(), 2.0);
    }

    #[test]
    fn test_fill_string_nulls() {
        let series = Series::new("test".into(), &[Some("a"), None]);
        let filled = fill_string_nulls(&series, "Unknown").unwrap();
        assert_eq!(filled.str().unwrap().get(1), Some("Unknown"));
    }
}
