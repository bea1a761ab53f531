//! Column type classification.

use crate::types::TypeTag;
use crate::utils::{is_boolean_word, is_datetime_dtype, is_numeric_dtype, parse_strict_number};
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;

// Date pattern regexes - compiled once at startup
static DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"^\d{4}[-/]\d{1,2}[-/]\d{1,2}$").expect("Invalid regex: YYYY-MM-DD"),
        Regex::new(r"^\d{1,2}[-/]\d{1,2}[-/]\d{4}$").expect("Invalid regex: MM-DD-YYYY"),
        Regex::new(r"^\d{4}-\d{2}-\d{2}[ T]\d{2}:\d{2}(:\d{2}(\.\d+)?)?(Z|[+-]\d{2}:?\d{2})?$")
            .expect("Invalid regex: datetime"),
    ]
});

/// Check if a string looks like a date or timestamp.
pub(crate) fn is_date_string(s: &str) -> bool {
    let trimmed = s.trim();
    DATE_PATTERNS.iter().any(|re| re.is_match(trimmed))
}

/// Classify a column.
///
/// Text columns are Numeric only when every value parses as a plain number,
/// Boolean when every value is a boolean word, Datetime when every value
/// matches a date pattern. Anything mixed or ambiguous is Categorical.
pub(crate) fn infer_type_tag(series: &Series) -> PolarsResult<TypeTag> {
    let dtype = series.dtype();
    if is_numeric_dtype(dtype) {
        return Ok(TypeTag::Numeric);
    }
    if matches!(dtype, DataType::Boolean) {
        return Ok(TypeTag::Boolean);
    }
    if is_datetime_dtype(dtype) {
        return Ok(TypeTag::Datetime);
    }
    if !matches!(dtype, DataType::String) {
        return Ok(TypeTag::Categorical);
    }

    let values: Vec<&str> = series.str()?.into_iter().flatten().collect();
    if values.is_empty() {
        return Ok(TypeTag::Categorical);
    }

    let tag = if values.iter().all(|v| parse_strict_number(v).is_some()) {
        TypeTag::Numeric
    } else if values.iter().all(|v| is_boolean_word(v)) {
        TypeTag::Boolean
    } else if values.iter().all(|v| is_date_string(v)) {
        TypeTag::Datetime
    } else {
        TypeTag::Categorical
    };
    Ok(tag)
}

/// Convert a text column whose values are all plain numbers into Float64.
///
/// Returns `None` for anything that is not such a column.
pub(crate) fn coerce_numeric_text(series: &Series) -> PolarsResult<Option<Series>> {
    if !matches!(series.dtype(), DataType::String) {
        return Ok(None);
    }
    let text = series.str()?;
    if text.null_count() == text.len() {
        return Ok(None);
    }

    let mut parsed: Vec<Option<f64>> = Vec::with_capacity(text.len());
    for val in text.into_iter() {
        match val {
            None => parsed.push(None),
            Some(s) => match parse_strict_number(s) {
                Some(v) => parsed.push(Some(v)),
                None => return Ok(None),
            },
        }
    }
    Ok(Some(Series::new(series.name().clone(), parsed)))
}
