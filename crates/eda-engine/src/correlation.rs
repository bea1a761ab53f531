//! Pairwise correlation matrices over numeric columns.
//!
//! Each pair only uses rows where both columns have a value. A pair with
//! fewer than three such rows, or with a constant side, is `None` rather
//! than a made-up 0. With fewer than two numeric columns the matrix is
//! empty.

use crate::config::CorrelationMethod;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::stats;
use crate::types::TypeTag;
use anofox_statistics::correlation::{pearson, spearman};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub method: CorrelationMethod,
    /// Column order of the matrix.
    pub columns: Vec<String>,
    pub values: BTreeMap<String, BTreeMap<String, Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn empty(method: CorrelationMethod) -> Self {
        Self {
            method,
            columns: Vec::new(),
            values: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Coefficient between two columns, `None` if undefined or unknown.
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        self.values.get(a).and_then(|row| row.get(b)).copied().flatten()
    }

    /// Row-major grid in column order, for heatmaps.
    pub fn to_grid(&self) -> Vec<Vec<Option<f64>>> {
        self.columns
            .iter()
            .map(|a| self.columns.iter().map(|b| self.get(a, b)).collect())
            .collect()
    }

    /// Pairs whose absolute coefficient is at least `threshold`,
    /// strongest first.
    pub fn strong_pairs(&self, threshold: f64) -> Vec<(String, String, f64)> {
        let mut pairs = Vec::new();
        for (i, a) in self.columns.iter().enumerate() {
            for b in &self.columns[i + 1..] {
                if let Some(r) = self.get(a, b)
                    && r.abs() >= threshold
                {
                    pairs.push((a.clone(), b.clone(), r));
                }
            }
        }
        pairs.sort_by(|x, y| y.2.abs().total_cmp(&x.2.abs()));
        pairs
    }
}

const MIN_COMPLETE_PAIRS: usize = 3;

fn has_spread(values: &[f64]) -> bool {
    stats::variance(values).is_some_and(|v| v > 0.0)
}

fn coefficient(method: CorrelationMethod, x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() < MIN_COMPLETE_PAIRS || !has_spread(x) || !has_spread(y) {
        return None;
    }
    let estimate = match method {
        CorrelationMethod::Pearson => pearson(x, y, Some(0.95)).ok()?.estimate,
        CorrelationMethod::Spearman => spearman(x, y, Some(0.95)).ok()?.estimate,
    };
    estimate.is_finite().then(|| estimate.clamp(-1.0, 1.0))
}

/// Finite values of a column with nulls kept in place.
fn aligned_values(series: &Series) -> PolarsResult<Vec<Option<f64>>> {
    let cast = series.cast(&DataType::Float64)?;
    Ok(cast
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite()))
        .collect())
}

fn complete_pairs(a: &[Option<f64>], b: &[Option<f64>]) -> (Vec<f64>, Vec<f64>) {
    a.iter()
        .zip(b)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .unzip()
}

pub struct CorrelationEngine;

impl CorrelationEngine {
    /// Correlation matrix of every Numeric column.
    pub fn compute(dataset: &Dataset, method: CorrelationMethod) -> Result<CorrelationMatrix> {
        let columns = dataset.columns_with_tag(TypeTag::Numeric);
        if columns.len() < 2 {
            debug!("Fewer than two numeric columns, skipping {} correlation", method);
            return Ok(CorrelationMatrix::empty(method));
        }

        let data: Vec<Vec<Option<f64>>> = columns
            .iter()
            .map(|name| Ok(aligned_values(dataset.series(name)?)?))
            .collect::<Result<_>>()?;

        let mut values: BTreeMap<String, BTreeMap<String, Option<f64>>> = columns
            .iter()
            .map(|name| (name.clone(), BTreeMap::new()))
            .collect();

        for i in 0..columns.len() {
            let own: Vec<f64> = data[i].iter().flatten().copied().collect();
            let diagonal = has_spread(&own).then_some(1.0);
            if let Some(row) = values.get_mut(&columns[i]) {
                row.insert(columns[i].clone(), diagonal);
            }

            for j in (i + 1)..columns.len() {
                let (x, y) = complete_pairs(&data[i], &data[j]);
                let r = coefficient(method, &x, &y);
                if let Some(row) = values.get_mut(&columns[i]) {
                    row.insert(columns[j].clone(), r);
                }
                if let Some(row) = values.get_mut(&columns[j]) {
                    row.insert(columns[i].clone(), r);
                }
            }
        }

        Ok(CorrelationMatrix {
            method,
            columns,
            values,
        })
    }

    /// One matrix per requested method.
    pub fn compute_all(
        dataset: &Dataset,
        methods: &[CorrelationMethod],
    ) -> Result<BTreeMap<CorrelationMethod, CorrelationMatrix>> {
        methods
            .iter()
            .map(|&method| Ok((method, Self::compute(dataset, method)?)))
            .collect()
    }
}
