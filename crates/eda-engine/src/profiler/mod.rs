//! Structural profiling of a dataset.
//!
//! Produces the [`DatasetProfile`]: shape, per-column dtype/tag/null/unique
//! metadata with a few sample values, duplicate rows and a memory estimate.
//! Column classification itself happens once in [`Dataset::new`] through
//! [`type_inference`].

pub(crate) mod duplicates;
pub(crate) mod type_inference;

use crate::config::EngineConfig;
use crate::dataset::Dataset;
use crate::error::{Result, ResultExt};
use crate::types::{ColumnProfile, DatasetProfile, TypeTag};
use polars::prelude::*;
use rand::prelude::*;
use tracing::debug;

pub(crate) use duplicates::{count_duplicate_rows, drop_duplicate_rows};

/// `part / whole * 100`, or 0 when `whole` is 0.
pub(crate) fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Data profiler for analyzing dataset structure.
pub struct DatasetProfiler;

impl DatasetProfiler {
    /// Profile an entire dataset.
    ///
    /// Columns with no values at all are still reported, with 100% nulls.
    pub fn profile(dataset: &Dataset, config: &EngineConfig) -> Result<DatasetProfile> {
        let df = dataset.frame();
        let mut column_profiles = Vec::with_capacity(df.width());

        for (name, tag) in dataset.tagged_columns() {
            let series = dataset.series(&name)?;
            column_profiles.push(Self::profile_column(series, tag, df.height(), config)?);
        }

        let duplicate_count = count_duplicate_rows(df).context("counting duplicate rows")?;
        let duplicate_percentage = percentage(duplicate_count, df.height());
        debug!(
            "Profiled {} columns, {} duplicate rows",
            column_profiles.len(),
            duplicate_count
        );

        Ok(DatasetProfile {
            shape: dataset.shape(),
            columns: dataset.column_names(),
            column_profiles,
            duplicate_count,
            duplicate_percentage,
            memory_usage_bytes: dataset.memory_usage(),
            numeric_columns: dataset.columns_with_tag(TypeTag::Numeric),
            categorical_columns: dataset.columns_with_tag(TypeTag::Categorical),
            boolean_columns: dataset.columns_with_tag(TypeTag::Boolean),
            datetime_columns: dataset.columns_with_tag(TypeTag::Datetime),
        })
    }

    fn profile_column(
        series: &Series,
        type_tag: TypeTag,
        total_rows: usize,
        config: &EngineConfig,
    ) -> Result<ColumnProfile> {
        let null_count = series.null_count();
        let non_null_series = series.drop_nulls();
        let unique_count = if non_null_series.is_empty() {
            0
        } else {
            non_null_series.n_unique()?
        };

        let mut sample_values = Vec::new();
        if !non_null_series.is_empty() {
            let sample_size = std::cmp::min(config.sample_size, non_null_series.len());
            let mut rng = StdRng::seed_from_u64(config.sample_seed);
            let indices: Vec<usize> = (0..non_null_series.len()).collect();
            let sampled_indices: Vec<usize> = indices
                .choose_multiple(&mut rng, sample_size)
                .copied()
                .collect();

            for idx in sampled_indices {
                if let Ok(val) = non_null_series.get(idx) {
                    sample_values.push(match val {
                        AnyValue::String(s) => s.to_string(),
                        other => format!("{}", other),
                    });
                }
            }
        }

        Ok(ColumnProfile {
            name: series.name().to_string(),
            dtype: format!("{:?}", series.dtype()),
            type_tag,
            unique_count,
            null_count,
            null_percentage: percentage(null_count, total_rows),
            sample_values,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile_of(df: DataFrame) -> DatasetProfile {
        let ds = Dataset::new(df).unwrap();
        DatasetProfiler::profile(&ds, &EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_profile_basic_shape_and_nulls() {
        let profile = profile_of(
            df!(
                "a" => &[Some(1i64), None, Some(3), Some(3)],
                "b" => &[Some("x"), Some("y"), None, None]
            )
            .unwrap(),
        );
        assert_eq!(profile.shape, (4, 2));
        assert_eq!(profile.column_profiles[0].null_count, 1);
        assert_eq!(profile.column_profiles[0].null_percentage, 25.0);
        assert_eq!(profile.column_profiles[0].unique_count, 2);
        assert_eq!(profile.column_profiles[1].null_percentage, 50.0);
        assert_eq!(profile.numeric_columns, vec!["a"]);
        assert_eq!(profile.categorical_columns, vec!["b"]);
    }

    #[test]
    fn test_all_null_column_is_reported() {
        let profile = profile_of(
            df!(
                "empty" => &[None::<f64>, None, None],
                "id" => &[1i64, 2, 3]
            )
            .unwrap(),
        );
        let empty = &profile.column_profiles[0];
        assert_eq!(empty.type_tag, TypeTag::Numeric);
        assert_eq!(empty.null_percentage, 100.0);
        assert_eq!(empty.unique_count, 0);
        assert!(empty.sample_values.is_empty());
    }

    #[test]
    fn test_zero_rows_has_zero_percentages() {
        let profile = profile_of(df!("a" => Vec::<f64>::new()).unwrap());
        assert_eq!(profile.shape, (0, 1));
        assert_eq!(profile.column_profiles[0].null_percentage, 0.0);
        assert_eq!(profile.duplicate_percentage, 0.0);
    }

    #[test]
    fn test_duplicates_and_samples() {
        let profile = profile_of(
            df!(
                "a" => &[1i64, 1, 2],
                "b" => &["p", "p", "q"]
            )
            .unwrap(),
        );
        assert_eq!(profile.duplicate_count, 1);
        assert!((profile.duplicate_percentage - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(profile.column_profiles[1].sample_values.len(), 3);
    }

    #[test]
    fn test_tag_lists_partition_columns() {
        let profile = profile_of(
            df!(
                "n" => &[1.0f64, 2.0],
                "c" => &["a", "b"],
                "f" => &[true, false],
                "d" => &["2024-01-01", "2024-01-02"]
            )
            .unwrap(),
        );
        let total = profile.numeric_columns.len()
            + profile.categorical_columns.len()
            + profile.boolean_columns.len()
            + profile.datetime_columns.len();
        assert_eq!(total, profile.shape.1);
        assert_eq!(profile.datetime_columns, vec!["d"]);
    }
}
