//! Error types for the analysis engine.
//!
//! A single `thiserror` hierarchy covers every failure the engine can
//! report. Only [`EngineError::DataLoad`] and [`EngineError::MissingDataset`]
//! fail a whole call; per-column failures are captured as
//! [`EngineError::ColumnComputation`] and turned into unavailable markers by
//! the analyzers.
//!
//! Errors serialize as `{ "code": ..., "message": ... }` so they can be sent
//! to callers over any JSON transport.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Input bytes could not be decoded or parsed into a dataset.
    #[error("Failed to load dataset: {0}")]
    DataLoad(String),

    /// No dataset is active for the requested session.
    #[error("No dataset loaded for session '{0}'")]
    MissingDataset(String),

    /// One statistic or test could not be computed for one column.
    #[error("Computation failed for column '{column}': {reason}")]
    ColumnComputation { column: String, reason: String },

    /// The recommendation collaborator failed or returned an invalid response.
    #[error("Recommendation service error: {0}")]
    RecommendationService(String),

    /// Column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// Invalid configuration or request provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error (only with the "ai" feature).
    #[cfg(feature = "ai")]
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<EngineError>,
    },
}

impl EngineError {
    /// Shorthand for a [`EngineError::ColumnComputation`].
    pub fn column(column: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::ColumnComputation {
            column: column.into(),
            reason: reason.into(),
        }
    }

    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        EngineError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable error code for callers.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::DataLoad(_) => "DATA_LOAD_ERROR",
            Self::MissingDataset(_) => "MISSING_DATASET",
            Self::ColumnComputation { .. } => "COLUMN_COMPUTATION_ERROR",
            Self::RecommendationService(_) => "RECOMMENDATION_SERVICE_ERROR",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            #[cfg(feature = "ai")]
            Self::HttpRequest(_) => "HTTP_REQUEST_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Whether the failure is local to a single column.
    pub fn is_column_local(&self) -> bool {
        match self {
            Self::ColumnComputation { .. } => true,
            Self::WithContext { source, .. } => source.is_column_local(),
            _ => false,
        }
    }
}

impl Serialize for EngineError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("EngineError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| EngineError::Polars(e).with_context(context))
    }
}
