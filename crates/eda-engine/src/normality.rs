//! Normality assessment of numeric columns.
//!
//! For every Numeric column with enough values the tester reports skewness,
//! excess kurtosis, Shapiro-Wilk and Kolmogorov-Smirnov (Lilliefors) results,
//! and a qualitative [`NormalityClass`]. The configured test decides `Normal`;
//! when it cannot be run the skewness/kurtosis heuristic decides alone.

use crate::config::{EngineConfig, NormalityTest};
use crate::dataset::Dataset;
use crate::error::{EngineError, Result};
use crate::stats;
use crate::types::{ColumnOutcome, ColumnReport, TypeTag};
use normality::{lilliefors, shapiro_wilk};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalityClass {
    #[serde(rename = "Normal")]
    Normal,
    #[serde(rename = "Approximately Normal")]
    ApproximatelyNormal,
    #[serde(rename = "Moderately Skewed")]
    ModeratelySkewed,
    #[serde(rename = "Non-Normal")]
    NonNormal,
    #[serde(rename = "Insufficient Data")]
    InsufficientData,
}

/// Classify a distribution from its shape and an optional test p-value.
///
/// `p > alpha` means Normal. Otherwise `|skew| > 1` or `|kurtosis| > 2` is
/// Non-Normal, `|skew| > 0.5` or `|kurtosis| > 1` is Moderately Skewed, and
/// anything else is Approximately Normal. Undefined moments never trigger a
/// threshold.
pub fn classify(
    skewness: Option<f64>,
    kurtosis: Option<f64>,
    p_value: Option<f64>,
    alpha: f64,
) -> NormalityClass {
    if p_value.is_some_and(|p| p > alpha) {
        return NormalityClass::Normal;
    }
    let skew = skewness.map(f64::abs).unwrap_or(0.0);
    let kurt = kurtosis.map(f64::abs).unwrap_or(0.0);
    if skew > 1.0 || kurt > 2.0 {
        NormalityClass::NonNormal
    } else if skew > 0.5 || kurt > 1.0 {
        NormalityClass::ModeratelySkewed
    } else {
        NormalityClass::ApproximatelyNormal
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub statistic: f64,
    pub p_value: f64,
    pub is_normal: bool,
}

impl TestResult {
    /// Keep a `(statistic, p_value)` pair only when both numbers are finite.
    fn from_pair(test: &str, computed: Option<(f64, f64)>, alpha: f64) -> Option<Self> {
        match computed {
            Some((statistic, p_value)) if statistic.is_finite() && p_value.is_finite() => {
                Some(Self {
                    statistic,
                    p_value,
                    is_normal: p_value > alpha,
                })
            }
            Some((statistic, p_value)) => {
                debug!("{} gave non-finite result ({}, p={})", test, statistic, p_value);
                None
            }
            None => {
                debug!("{} not available for this sample", test);
                None
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalityReport {
    pub sample_size: usize,
    pub skewness: Option<f64>,
    pub kurtosis: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shapiro_wilk: Option<TestResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kolmogorov_smirnov: Option<TestResult>,
    /// Test whose p-value was used for the classification.
    pub decided_by: Option<NormalityTest>,
    pub classification: NormalityClass,
}

pub struct NormalityTester<'a> {
    config: &'a EngineConfig,
}

impl<'a> NormalityTester<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Assess a slice of finite values.
    ///
    /// Fails only when the sample variance is zero or overflows, where neither
    /// the moments nor the tests are defined.
    pub fn assess(&self, values: &[f64]) -> std::result::Result<NormalityReport, String> {
        let n = values.len();
        if n < self.config.min_normality_samples {
            return Ok(NormalityReport {
                sample_size: n,
                skewness: None,
                kurtosis: None,
                shapiro_wilk: None,
                kolmogorov_smirnov: None,
                decided_by: None,
                classification: NormalityClass::InsufficientData,
            });
        }

        if stats::variance(values).is_none_or(|v| v <= 0.0) {
            return Err("zero or non-finite variance".to_string());
        }

        let alpha = self.config.significance_level;
        let skewness = stats::skewness(values);
        let kurtosis = stats::excess_kurtosis(values);

        let shapiro = if n <= self.config.shapiro_max_samples {
            TestResult::from_pair(
                "Shapiro-Wilk",
                shapiro_wilk(values.to_vec()).ok().map(|r| (r.statistic, r.p_value)),
                alpha,
            )
        } else {
            None
        };
        let ks = TestResult::from_pair(
            "Kolmogorov-Smirnov",
            lilliefors(values.to_vec()).ok().map(|r| (r.statistic, r.p_value)),
            alpha,
        );

        let (decided_by, p_value) = match (self.config.normality_test, shapiro, ks) {
            (NormalityTest::ShapiroWilk, Some(sw), _) => {
                (Some(NormalityTest::ShapiroWilk), Some(sw.p_value))
            }
            (_, _, Some(k)) => (Some(NormalityTest::KolmogorovSmirnov), Some(k.p_value)),
            (NormalityTest::KolmogorovSmirnov, Some(sw), None) => {
                (Some(NormalityTest::ShapiroWilk), Some(sw.p_value))
            }
            _ => (None, None),
        };

        Ok(NormalityReport {
            sample_size: n,
            skewness,
            kurtosis,
            shapiro_wilk: shapiro,
            kolmogorov_smirnov: ks,
            decided_by,
            classification: classify(skewness, kurtosis, p_value, alpha),
        })
    }

    /// Assess one Numeric column.
    pub fn test_column(&self, dataset: &Dataset, name: &str) -> Result<NormalityReport> {
        let values = dataset.numeric_values(name)?;
        self.assess(&values)
            .map_err(|reason| EngineError::column(name, reason))
    }

    /// Normality reports for every Numeric column.
    pub fn report(&self, dataset: &Dataset) -> ColumnReport<NormalityReport> {
        dataset
            .columns_with_tag(TypeTag::Numeric)
            .into_iter()
            .map(|name| {
                let outcome = ColumnOutcome::from(self.test_column(dataset, &name));
                if let ColumnOutcome::Unavailable { reason } = &outcome {
                    warn!("Normality unavailable for '{}': {}", name, reason);
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
    use statrs::distribution::{ContinuousCDF, Normal};

    /// Evenly spaced standard normal quantiles.
    fn normal_quantiles(n: usize) -> Vec<f64> {
        let dist = Normal::new(0.0, 1.0).unwrap();
        (0..n)
            .map(|i| dist.inverse_cdf((i as f64 + 0.5) / n as f64))
            .collect()
    }

    // ==================== classify ====================

    #[test]
    fn test_classify_p_value_wins() {
        assert_eq!(
            classify(Some(3.0), Some(9.0), Some(0.2), 0.05),
            NormalityClass::Normal
        );
    }

    #[test]
    fn test_classify_heuristic_thresholds() {
        assert_eq!(
            classify(Some(1.2), Some(0.0), Some(0.01), 0.05),
            NormalityClass::NonNormal
        );
        assert_eq!(
            classify(Some(0.1), Some(2.5), None, 0.05),
            NormalityClass::NonNormal
        );
        assert_eq!(
            classify(Some(0.7), Some(0.3), None, 0.05),
            NormalityClass::ModeratelySkewed
        );
        assert_eq!(
            classify(Some(-0.2), Some(1.5), None, 0.05),
            NormalityClass::ModeratelySkewed
        );
        assert_eq!(
            classify(Some(0.2), None, None, 0.05),
            NormalityClass::ApproximatelyNormal
        );
    }

    #[test]
    fn test_classify_is_deterministic() {
        let a = classify(Some(0.6), Some(0.4), Some(0.03), 0.05);
        let b = classify(Some(0.6), Some(0.4), Some(0.03), 0.05);
        assert_eq!(a, b);
    }

    #[test]
    fn test_class_names() {
        assert_eq!(
            serde_json::to_value(NormalityClass::ModeratelySkewed).unwrap(),
            serde_json::json!("Moderately Skewed")
        );
    }

    // ==================== NormalityTester ====================

    #[test]
    fn test_too_few_values() {
        let config = EngineConfig::default();
        let report = NormalityTester::new(&config).assess(&[1.0, 2.0]).unwrap();
        assert_eq!(report.classification, NormalityClass::InsufficientData);
        assert!(report.shapiro_wilk.is_none());
        assert!(report.skewness.is_none());
    }

    #[test]
    fn test_constant_values_are_unavailable() {
        let config = EngineConfig::default();
        assert!(NormalityTester::new(&config).assess(&[4.0; 10]).is_err());
    }

    #[test]
    fn test_near_normal_column() {
        let values: Vec<f64> = normal_quantiles(100)
            .into_iter()
            .map(|z| z * 2.0 + 10.0)
            .collect();
        let config = EngineConfig::default();
        let report = NormalityTester::new(&config).assess(&values).unwrap();
        assert_eq!(report.classification, NormalityClass::Normal);
        assert_eq!(report.decided_by, Some(NormalityTest::ShapiroWilk));
        assert!(report.kolmogorov_smirnov.is_some());
    }

    #[test]
    fn test_skewed_column_falls_back_to_shape() {
        let values: Vec<f64> = (0..60)
            .map(|i| -(1.0 - (i as f64 + 0.5) / 60.0).ln())
            .collect();
        let config = EngineConfig::default();
        let report = NormalityTester::new(&config).assess(&values).unwrap();
        assert!(!report.shapiro_wilk.unwrap().is_normal);
        assert_eq!(report.classification, NormalityClass::NonNormal);
    }

    #[test]
    fn test_ks_preference() {
        let values = normal_quantiles(40);
        let config = EngineConfig::builder()
            .normality_test(NormalityTest::KolmogorovSmirnov)
            .build()
            .unwrap();
        let report = NormalityTester::new(&config).assess(&values).unwrap();
        assert_eq!(report.decided_by, Some(NormalityTest::KolmogorovSmirnov));
    }

    #[test]
    fn test_overflowing_values_are_never_normal() {
        let values: Vec<f64> = (0..30)
            .map(|i| if i % 2 == 0 { 1.7e308 } else { -1.7e308 + i as f64 })
            .collect();
        let config = EngineConfig::default();
        let result = NormalityTester::new(&config).assess(&values);
        assert!(!matches!(result, Ok(ref r) if r.classification == NormalityClass::Normal));
        if let Ok(report) = result {
            assert!(report.shapiro_wilk.is_none_or(|t| t.p_value.is_finite()));
        }
    }

    #[test]
    fn test_one_bad_column_does_not_block_others() {
        let ds = Dataset::new(
            df!(
                "flat" => &[2.0f64, 2.0, 2.0, 2.0],
                "ok" => &[1.0f64, 2.0, 4.0, 3.0]
            )
            .unwrap(),
        )
        .unwrap();
        let config = EngineConfig::default();
        let report = NormalityTester::new(&config).report(&ds);
        assert!(!report["flat"].is_available());
        assert!(report["ok"].is_available());
    }
}
