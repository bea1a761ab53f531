//! Configuration types for the analysis engine.
//!
//! Every threshold the analyzers use lives here, with the defaults the
//! engine ships with. Use [`EngineConfig::builder()`] for a validated
//! configuration, or deserialize one from JSON.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Algorithm used to flag outliers in numeric columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OutlierMethod {
    /// Values outside `[Q1 - k*IQR, Q3 + k*IQR]`
    #[default]
    #[serde(rename = "IQR")]
    Iqr,
    /// Values with `|z| > t` under the sample mean/std
    #[serde(rename = "Z-Score")]
    ZScore,
}

/// How much detail an outlier report carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutlierDetail {
    /// Bounds, count and percentage only
    #[default]
    Summary,
    /// Also lists every flagged row index and value
    Detailed,
}

/// Goodness-of-fit test used to classify normality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum NormalityTest {
    /// Shapiro-Wilk (falls back to KS above `shapiro_max_samples`)
    #[default]
    #[serde(rename = "shapiro_wilk")]
    ShapiroWilk,
    /// Kolmogorov-Smirnov against the sample-fitted normal
    #[serde(rename = "kolmogorov_smirnov")]
    KolmogorovSmirnov,
}

/// Correlation coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationMethod {
    Pearson,
    Spearman,
}

impl std::fmt::Display for CorrelationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CorrelationMethod::Pearson => write!(f, "pearson"),
            CorrelationMethod::Spearman => write!(f, "spearman"),
        }
    }
}

/// Quartile fences need at least four values.
pub const MIN_OUTLIER_SAMPLES: usize = 4;

/// Configuration for the analysis engine.
///
/// # Example
///
/// ```rust,ignore
/// use eda_engine::config::{EngineConfig, OutlierMethod};
///
/// let config = EngineConfig::builder()
///     .outlier_method(OutlierMethod::ZScore)
///     .zscore_threshold(2.5)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Outlier algorithm used by the analysis pass.
    /// Default: IQR
    pub outlier_method: OutlierMethod,

    /// IQR fence multiplier `k`.
    /// Default: 1.5
    pub iqr_multiplier: f64,

    /// Absolute z-score above which a value is an outlier.
    /// Default: 3.0
    pub zscore_threshold: f64,

    /// Minimum non-null values before outliers are computed.
    /// Default: 4, also the lowest accepted value
    pub min_outlier_samples: usize,

    /// Summary or detailed outlier reports.
    /// Default: Summary
    pub outlier_detail: OutlierDetail,

    /// Minimum non-null values before normality is assessed.
    /// Default: 3
    pub min_normality_samples: usize,

    /// Preferred normality test.
    /// Default: Shapiro-Wilk
    pub normality_test: NormalityTest,

    /// Largest sample Shapiro-Wilk is run on.
    /// Default: 5000
    pub shapiro_max_samples: usize,

    /// Significance level for normality tests (0.0 - 1.0, exclusive).
    /// Default: 0.05
    pub significance_level: f64,

    /// Correlation matrices computed per analysis pass.
    /// Default: Pearson and Spearman
    pub correlation_methods: Vec<CorrelationMethod>,

    /// Label used by `fill_missing_mode` when a column has no values at all.
    /// Default: "Unknown"
    pub mode_fallback_label: String,

    /// Number of sample values kept per column in the profile.
    /// Default: 10
    pub sample_size: usize,

    /// Seed for sample value selection.
    /// Default: 42
    pub sample_seed: u64,

    /// Output directory for written reports.
    /// Default: "output"
    pub output_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            outlier_method: OutlierMethod::default(),
            iqr_multiplier: 1.5,
            zscore_threshold: 3.0,
            min_outlier_samples: 4,
            outlier_detail: OutlierDetail::default(),
            min_normality_samples: 3,
            normality_test: NormalityTest::default(),
            shapiro_max_samples: 5000,
            significance_level: 0.05,
            correlation_methods: vec![CorrelationMethod::Pearson, CorrelationMethod::Spearman],
            mode_fallback_label: "Unknown".to_string(),
            sample_size: 10,
            sample_seed: 42,
            output_dir: PathBuf::from("output"),
        }
    }
}

impl EngineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(self.iqr_multiplier.is_finite() && self.iqr_multiplier > 0.0) {
            return Err(ConfigValidationError::NonPositive {
                field: "iqr_multiplier".to_string(),
                value: self.iqr_multiplier,
            });
        }

        if !(self.zscore_threshold.is_finite() && self.zscore_threshold > 0.0) {
            return Err(ConfigValidationError::NonPositive {
                field: "zscore_threshold".to_string(),
                value: self.zscore_threshold,
            });
        }

        if !(self.significance_level > 0.0 && self.significance_level < 1.0) {
            return Err(ConfigValidationError::InvalidSignificance(
                self.significance_level,
            ));
        }

        if self.min_normality_samples < 3 {
            return Err(ConfigValidationError::TooFewSamples {
                field: "min_normality_samples".to_string(),
                value: self.min_normality_samples,
                minimum: 3,
            });
        }

        if self.min_outlier_samples < MIN_OUTLIER_SAMPLES {
            return Err(ConfigValidationError::TooFewSamples {
                field: "min_outlier_samples".to_string(),
                value: self.min_outlier_samples,
                minimum: MIN_OUTLIER_SAMPLES,
            });
        }

        if self.shapiro_max_samples < self.min_normality_samples {
            return Err(ConfigValidationError::TooFewSamples {
                field: "shapiro_max_samples".to_string(),
                value: self.shapiro_max_samples,
                minimum: self.min_normality_samples,
            });
        }

        if self.mode_fallback_label.is_empty() {
            return Err(ConfigValidationError::EmptyLabel);
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid value for '{field}': {value} (must be a positive finite number)")]
    NonPositive { field: String, value: f64 },

    #[error("Invalid significance level: {0} (must be strictly between 0.0 and 1.0)")]
    InvalidSignificance(f64),

    #[error("Invalid value for '{field}': {value} (must be at least {minimum})")]
    TooFewSamples {
        field: String,
        value: usize,
        minimum: usize,
    },

    #[error("Mode fallback label must not be empty")]
    EmptyLabel,
}

impl From<ConfigValidationError> for crate::error::EngineError {
    fn from(err: ConfigValidationError) -> Self {
        crate::error::EngineError::InvalidConfig(err.to_string())
    }
}

/// Builder for [`EngineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    outlier_method: Option<OutlierMethod>,
    iqr_multiplier: Option<f64>,
    zscore_threshold: Option<f64>,
    min_outlier_samples: Option<usize>,
    outlier_detail: Option<OutlierDetail>,
    min_normality_samples: Option<usize>,
    normality_test: Option<NormalityTest>,
    shapiro_max_samples: Option<usize>,
    significance_level: Option<f64>,
    correlation_methods: Option<Vec<CorrelationMethod>>,
    mode_fallback_label: Option<String>,
    sample_size: Option<usize>,
    sample_seed: Option<u64>,
    output_dir: Option<PathBuf>,
}

impl EngineConfigBuilder {
    /// Set the outlier algorithm used by the analysis pass.
    pub fn outlier_method(mut self, method: OutlierMethod) -> Self {
        self.outlier_method = Some(method);
        self
    }

    /// Set the IQR fence multiplier.
    pub fn iqr_multiplier(mut self, k: f64) -> Self {
        self.iqr_multiplier = Some(k);
        self
    }

    /// Set the z-score threshold.
    pub fn zscore_threshold(mut self, t: f64) -> Self {
        self.zscore_threshold = Some(t);
        self
    }

    pub fn min_outlier_samples(mut self, n: usize) -> Self {
        self.min_outlier_samples = Some(n);
        self
    }

    /// Choose between summary and detailed outlier reports.
    pub fn outlier_detail(mut self, detail: OutlierDetail) -> Self {
        self.outlier_detail = Some(detail);
        self
    }

    pub fn min_normality_samples(mut self, n: usize) -> Self {
        self.min_normality_samples = Some(n);
        self
    }

    /// Set the preferred normality test.
    pub fn normality_test(mut self, test: NormalityTest) -> Self {
        self.normality_test = Some(test);
        self
    }

    pub fn shapiro_max_samples(mut self, n: usize) -> Self {
        self.shapiro_max_samples = Some(n);
        self
    }

    /// Set the significance level used to accept normality.
    pub fn significance_level(mut self, alpha: f64) -> Self {
        self.significance_level = Some(alpha);
        self
    }

    /// Set which correlation matrices are computed.
    pub fn correlation_methods(mut self, methods: Vec<CorrelationMethod>) -> Self {
        self.correlation_methods = Some(methods);
        self
    }

    /// Set the label used when a mode fill finds no values at all.
    pub fn mode_fallback_label(mut self, label: impl Into<String>) -> Self {
        self.mode_fallback_label = Some(label.into());
        self
    }

    pub fn sample_size(mut self, n: usize) -> Self {
        self.sample_size = Some(n);
        self
    }

    pub fn sample_seed(mut self, seed: u64) -> Self {
        self.sample_seed = Some(seed);
        self
    }

    /// Set the output directory for written reports.
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `EngineConfig` or an error if validation fails.
    pub fn build(self) -> Result<EngineConfig, ConfigValidationError> {
        let defaults = EngineConfig::default();
        let config = EngineConfig {
            outlier_method: self.outlier_method.unwrap_or_default(),
            iqr_multiplier: self.iqr_multiplier.unwrap_or(defaults.iqr_multiplier),
            zscore_threshold: self.zscore_threshold.unwrap_or(defaults.zscore_threshold),
            min_outlier_samples: self
                .min_outlier_samples
                .unwrap_or(defaults.min_outlier_samples),
            outlier_detail: self.outlier_detail.unwrap_or_default(),
            min_normality_samples: self
                .min_normality_samples
                .unwrap_or(defaults.min_normality_samples),
            normality_test: self.normality_test.unwrap_or_default(),
            shapiro_max_samples: self
                .shapiro_max_samples
                .unwrap_or(defaults.shapiro_max_samples),
            significance_level: self
                .significance_level
                .unwrap_or(defaults.significance_level),
            correlation_methods: self
                .correlation_methods
                .unwrap_or(defaults.correlation_methods),
            mode_fallback_label: self
                .mode_fallback_label
                .unwrap_or(defaults.mode_fallback_label),
            sample_size: self.sample_size.unwrap_or(defaults.sample_size),
            sample_seed: self.sample_seed.unwrap_or(defaults.sample_seed),
            output_dir: self.output_dir.unwrap_or(defaults.output_dir),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.outlier_method, OutlierMethod::Iqr);
        assert_eq!(config.iqr_multiplier, 1.5);
        assert_eq!(config.zscore_threshold, 3.0);
        assert_eq!(config.min_outlier_samples, 4);
        assert_eq!(config.significance_level, 0.05);
        assert_eq!(config.mode_fallback_label, "Unknown");
        assert_eq!(config.correlation_methods.len(), 2);
    }

    #[test]
    fn test_builder_defaults() {
        let config = EngineConfig::builder().build().unwrap();
        assert_eq!(config.shapiro_max_samples, 5000);
        assert_eq!(config.normality_test, NormalityTest::ShapiroWilk);
    }

    #[test]
    fn test_builder_custom_values() {
        let config = EngineConfig::builder()
            .outlier_method(OutlierMethod::ZScore)
            .zscore_threshold(2.5)
            .outlier_detail(OutlierDetail::Detailed)
            .correlation_methods(vec![CorrelationMethod::Spearman])
            .mode_fallback_label("missing")
            .build()
            .unwrap();

        assert_eq!(config.outlier_method, OutlierMethod::ZScore);
        assert_eq!(config.zscore_threshold, 2.5);
        assert_eq!(config.outlier_detail, OutlierDetail::Detailed);
        assert_eq!(config.correlation_methods, vec![CorrelationMethod::Spearman]);
        assert_eq!(config.mode_fallback_label, "missing");
    }

    #[test]
    fn test_validation_rejects_bad_multiplier() {
        let result = EngineConfig::builder().iqr_multiplier(0.0).build();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("iqr_multiplier"));
    }

    #[test]
    fn test_validation_rejects_bad_significance() {
        assert!(EngineConfig::builder().significance_level(1.0).build().is_err());
        assert!(EngineConfig::builder().significance_level(0.0).build().is_err());
        assert!(EngineConfig::builder().significance_level(0.01).build().is_ok());
    }

    #[test]
    fn test_validation_rejects_small_normality_minimum() {
        let result = EngineConfig::builder().min_normality_samples(2).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_rejects_small_outlier_minimum() {
        let result = EngineConfig::builder().min_outlier_samples(3).build();
        assert!(matches!(
            result,
            Err(ConfigValidationError::TooFewSamples { minimum: 4, value: 3, .. })
        ));
        assert!(EngineConfig::builder().min_outlier_samples(4).build().is_ok());
    }

    #[test]
    fn test_validation_rejects_empty_label() {
        let result = EngineConfig::builder().mode_fallback_label("").build();
        assert!(matches!(result, Err(ConfigValidationError::EmptyLabel)));
    }

    #[test]
    fn test_config_deserialization_with_defaults() {
        let json = r#"{ "outlier_method": "Z-Score", "correlation_methods": ["pearson"] }"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.outlier_method, OutlierMethod::ZScore);
        assert_eq!(config.correlation_methods, vec![CorrelationMethod::Pearson]);
        assert_eq!(config.iqr_multiplier, 1.5);
    }
}
