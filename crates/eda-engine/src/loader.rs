//! CSV ingestion.
//!
//! Input is decoded as UTF-8 and, when that fails, as Latin-1 (every byte is
//! one character, so this never fails). Parsing uses the first row as header
//! and infers column types from the first 100 rows. Any failure is a
//! [`EngineError::DataLoad`]; no partial dataset is ever returned.

use crate::dataset::Dataset;
use crate::error::{EngineError, Result};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info, warn};

const SCHEMA_INFERENCE_ROWS: usize = 100;
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

fn load_error(message: impl Into<String>) -> EngineError {
    EngineError::DataLoad(message.into())
}

/// Decode raw bytes, falling back to Latin-1 for non-UTF-8 input.
fn decode(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_owned(),
        Err(e) => {
            warn!("Input is not valid UTF-8 ({}), decoding as Latin-1", e);
            bytes.iter().map(|&b| b as char).collect()
        }
    }
}

fn parse_csv(text: String) -> PolarsResult<DataFrame> {
    CsvReadOptions::default()
        .with_infer_schema_length(Some(SCHEMA_INFERENCE_ROWS))
        .with_has_header(true)
        .into_reader_with_file_handle(Cursor::new(text.into_bytes()))
        .finish()
}

/// Drop blank lines, which trip up the header/row width check.
fn strip_blank_lines(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Load a dataset from CSV bytes.
pub fn load_csv_bytes(bytes: &[u8]) -> Result<Dataset> {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(load_error("input is empty"));
    }

    let text = decode(bytes);
    let frame = match parse_csv(text.clone()) {
        Ok(df) => df,
        Err(e) => {
            debug!("CSV parsing failed: {}, retrying without blank lines", e);
            parse_csv(strip_blank_lines(&text))
                .map_err(|e| load_error(format!("could not parse CSV: {e}")))?
        }
    };

    if frame.width() == 0 {
        return Err(load_error("no columns found"));
    }
    info!("Loaded {} rows x {} columns", frame.height(), frame.width());

    Dataset::new(frame).map_err(|e| load_error(e.to_string()))
}

/// Load a dataset from a CSV file.
pub fn load_csv_path(path: impl AsRef<Path>) -> Result<Dataset> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)
        .map_err(|e| load_error(format!("could not read {}: {e}", path.display())))?;
    load_csv_bytes(&bytes)
}
