//! Conversion of engine values into transport-safe JSON.
//!
//! Every structure leaving the engine goes through here so that consumers
//! only ever see plain JSON primitives: integers, finite floats, booleans,
//! strings, arrays, objects and `null`. Non-finite floats become `null`;
//! dates, durations and nested polars values become their display string.
//!
//! Normalization is idempotent: running [`normalize_value`] on its own
//! output returns an identical value.

use crate::error::Result;
use polars::prelude::*;
use serde::Serialize;
use serde_json::{Map, Number, Value};

/// Convert a single polars cell into JSON.
pub fn any_value_to_json(value: AnyValue) -> Value {
    match value {
        AnyValue::Null => Value::Null,

        AnyValue::Boolean(b) => Value::Bool(b),

        AnyValue::Int8(i) => Value::Number(i.into()),
        AnyValue::Int16(i) => Value::Number(i.into()),
        AnyValue::Int32(i) => Value::Number(i.into()),
        AnyValue::Int64(i) => Value::Number(i.into()),

        AnyValue::UInt8(u) => Value::Number(u.into()),
        AnyValue::UInt16(u) => Value::Number(u.into()),
        AnyValue::UInt32(u) => Value::Number(u.into()),
        AnyValue::UInt64(u) => Value::Number(u.into()),

        AnyValue::Float32(f) => float_to_json(f as f64),
        AnyValue::Float64(f) => float_to_json(f),

        AnyValue::String(s) => Value::String(s.to_string()),
        AnyValue::StringOwned(s) => Value::String(s.to_string()),

        // dates, datetimes, durations, lists, structs
        other => Value::String(format!("{}", other)),
    }
}

/// Finite floats become numbers, NaN and infinities become `null`.
pub fn float_to_json(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

/// Optional float, `None` becomes `null`.
pub fn opt_float_to_json(f: Option<f64>) -> Value {
    f.map(float_to_json).unwrap_or(Value::Null)
}

/// All cells of a Series, in row order.
pub fn series_to_values(series: &Series) -> Vec<Value> {
    (0..series.len())
        .map(|i| series.get(i).map(any_value_to_json).unwrap_or(Value::Null))
        .collect()
}

/// A DataFrame as `{column: [values...]}`.
pub fn frame_to_json(df: &DataFrame) -> Value {
    let mut out = Map::new();
    for column in df.get_columns() {
        let series = column.as_materialized_series();
        out.insert(
            series.name().to_string(),
            Value::Array(series_to_values(series)),
        );
    }
    Value::Object(out)
}

/// Recursively rebuild a JSON value, replacing any number that does not
/// map back to a finite float with `null`.
pub fn normalize_value(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_value).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, normalize_value(v)))
                .collect(),
        ),
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                Value::Number(n)
            } else {
                n.as_f64().map(float_to_json).unwrap_or(Value::Null)
            }
        }
        other => other,
    }
}

/// Serialize any engine structure and normalize the result.
pub fn to_transport<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
    Ok(normalize_value(serde_json::to_value(value)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_any_value_scalars() {
        assert_eq!(any_value_to_json(AnyValue::Int32(-4)), json!(-4));
        assert_eq!(any_value_to_json(AnyValue::UInt64(7)), json!(7));
        assert_eq!(any_value_to_json(AnyValue::Boolean(true)), json!(true));
        assert_eq!(any_value_to_json(AnyValue::Float64(2.5)), json!(2.5));
        assert_eq!(any_value_to_json(AnyValue::String("x")), json!("x"));
        assert_eq!(any_value_to_json(AnyValue::Null), Value::Null);
    }

    #[test]
    fn test_non_finite_floats_become_null() {
        assert_eq!(any_value_to_json(AnyValue::Float64(f64::NAN)), Value::Null);
        assert_eq!(
            any_value_to_json(AnyValue::Float32(f32::INFINITY)),
            Value::Null
        );
        assert_eq!(float_to_json(f64::NEG_INFINITY), Value::Null);
        assert_eq!(opt_float_to_json(None), Value::Null);
    }

    #[test]
    fn test_series_and_frame() {
        let df = df!(
            "a" => &[Some(1i64), None],
            "b" => &[Some(0.5f64), Some(f64::NAN)]
        )
        .unwrap();
        assert_eq!(
            frame_to_json(&df),
            json!({ "a": [1, null], "b": [0.5, null] })
        );
    }

    #[test]
    fn test_normalize_is_idempotent() {
        #[derive(Serialize)]
        struct Nested {
            values: Vec<f64>,
            missing: Option<f64>,
            label: &'static str,
            count: usize,
        }
        let input = Nested {
            values: vec![1.0, f64::NAN, f64::INFINITY, -2.25],
            missing: None,
            label: "x",
            count: 3,
        };
        let once = to_transport(&input).unwrap();
        let twice = normalize_value(once.clone());
        assert_eq!(once, twice);
        assert_eq!(once["values"], json!([1.0, null, null, -2.25]));
        assert_eq!(once["count"], json!(3));
    }
}
