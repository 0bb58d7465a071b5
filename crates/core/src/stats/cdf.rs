//! Empirical cumulative distributions and per-cell CDF tables

use crate::core_types::error::{CycloneError, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Sorted (value, cumulative probability) pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmpiricalCdf {
    values: Vec<f64>,
    probs: Vec<f64>,
}

impl EmpiricalCdf {
    /// Step CDF of a sample; `None` if no finite values
    #[must_use]
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        let mut values: Vec<f64> = samples.iter().copied().filter(|v| v.is_finite()).collect();
        if values.is_empty() {
            return None;
        }
        values.sort_by(f64::total_cmp);
        let n = values.len() as f64;
        let probs = (1..=values.len()).map(|k| k as f64 / n).collect();
        Some(Self { values, probs })
    }

    /// Build from explicit pairs; both sequences must be non-decreasing
    pub fn from_pairs(values: Vec<f64>, probs: Vec<f64>) -> Result<Self> {
        let sorted = |v: &[f64]| v.windows(2).all(|w| w[1] >= w[0]);
        if values.is_empty() || values.len() != probs.len() || !sorted(&values) || !sorted(&probs) {
            return Err(CycloneError::InvalidConfig(format!(
                "malformed CDF with {} values and {} probabilities",
                values.len(),
                probs.len()
            )));
        }
        Ok(Self { values, probs })
    }

    /// Log-normal size distribution sampled at 1 km steps up to `max_radius`.
    ///
    /// `mean` is the median radius (km) and `std_dev` the standard deviation
    /// of the log radius.
    #[must_use]
    pub fn lognormal_size(mean: f64, std_dev: f64, max_radius: f64) -> Self {
        let mu = mean.ln();
        let n = max_radius.floor().max(1.0) as usize;
        let values: Vec<f64> = (1..=n).map(|r| r as f64).collect();
        let pdf: Vec<f64> = values
            .iter()
            .map(|&r| {
                let z = (r.ln() - mu) / std_dev;
                (-0.5 * z * z).exp() / (r * std_dev * (2.0 * PI).sqrt())
            })
            .collect();
        let total: f64 = pdf.iter().sum();
        let mut acc = 0.0;
        let probs = pdf
            .iter()
            .map(|p| {
                acc += p;
                acc / total
            })
            .collect();
        Self { values, probs }
    }

    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[must_use]
    pub fn probs(&self) -> &[f64] {
        &self.probs
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Inverse CDF: the first value whose cumulative probability is at
    /// least `q`, clamped to the last value.
    #[must_use]
    pub fn ppf(&self, q: f64) -> f64 {
        let i = self.probs.partition_point(|&p| p < q);
        self.values[i.min(self.values.len() - 1)]
    }

    /// Cumulative probability just below the first value ≥ `x`.
    ///
    /// At the lower edge this is the first probability, so sampling
    /// `ppf(u · upper_prob_below(x))` stays below `x` wherever the data
    /// allows it.
    #[must_use]
    pub fn upper_prob_below(&self, x: f64) -> f64 {
        let ix = self.values.partition_point(|&v| v < x);
        if ix == 0 {
            self.probs[0]
        } else {
            self.probs[ix - 1]
        }
    }
}

/// Per-cell CDFs with a domain-wide fallback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CdfTable {
    pub cells: FxHashMap<usize, EmpiricalCdf>,
    pub domain: EmpiricalCdf,
}

impl CdfTable {
    /// CDF of `cell`, or the domain CDF when the cell has none
    #[must_use]
    pub fn get(&self, cell: usize) -> &EmpiricalCdf {
        self.cells.get(&cell).unwrap_or(&self.domain)
    }

    /// Build from (cell, value) samples; `None` if there are no samples
    pub fn from_samples<I>(samples: I) -> Option<Self>
    where
        I: IntoIterator<Item = (usize, f64)>,
    {
        let mut by_cell: FxHashMap<usize, Vec<f64>> = FxHashMap::default();
        let mut all = Vec::new();
        for (cell, v) in samples {
            by_cell.entry(cell).or_default().push(v);
            all.push(v);
        }
        let domain = EmpiricalCdf::from_samples(&all)?;
        let cells = by_cell
            .into_iter()
            .filter_map(|(c, v)| EmpiricalCdf::from_samples(&v).map(|cdf| (c, cdf)))
            .collect();
        Some(Self { cells, domain })
    }
}
