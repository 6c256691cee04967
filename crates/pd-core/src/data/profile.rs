//! Variable type detection and correlation extraction from uploaded data
//!
//! Applies the cardinality heuristic per column: 2 distinct values make a
//! binary variable, a small number of distinct values makes a factor, and
//! everything else stays continuous. Distinctness is computed over formatted
//! values so `4` and `4.0` collapse into one level.

use std::collections::BTreeMap;

use indexmap::IndexMap;

use crate::correlation::pair_key;
use crate::data::{DataValue, Dataset, FloatArray};
use crate::variable::{FactorDefinition, VariableType};

/// Which factor-detection window applies
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetectionMode {
    /// Linear-formula editing: 3..=6 distinct values make a factor
    Linear,
    /// ANOVA factor detection: 2..=12 distinct values make a factor
    Anova,
}

/// Detected type plus bookkeeping for one column
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnProfile {
    pub variable_type: VariableType,
    pub n_unique: usize,
}

/// Detect the variable type of a single column.
///
/// Missing cells are skipped; a degenerate column (fewer than 2 distinct
/// values) falls back to Continuous rather than failing.
pub fn profile_column(values: &[DataValue], mode: DetectionMode) -> ColumnProfile {
    // Distinct formatted values with per-label counts, label-sorted.
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for value in values {
        if let Some(label) = value.formatted() {
            *counts.entry(label).or_insert(0) += 1;
        }
    }
    let n_present: usize = counts.values().sum();
    let k = counts.len();

    let variable_type = match (mode, k) {
        (DetectionMode::Linear, 2) => {
            // Proportion of the alphabetically-larger label. This tie-break
            // matches the downstream simulation engine's convention; do not
            // switch to numeric ordering.
            let larger_count = counts.values().next_back().copied().unwrap_or(0);
            VariableType::Binary {
                proportion: round_to(larger_count as f64 / n_present as f64, 2),
            }
        }
        (DetectionMode::Linear, 3..=6) | (DetectionMode::Anova, 2..=12) => {
            let level_labels: Vec<String> = counts.keys().cloned().collect();
            let proportions: Vec<f64> = counts
                .values()
                .map(|&c| round_to(c as f64 / n_present as f64, 4))
                .collect();
            VariableType::Factor {
                n_levels: k,
                proportions,
                level_labels: Some(level_labels),
            }
        }
        _ => VariableType::Continuous,
    };

    ColumnProfile {
        variable_type,
        n_unique: k,
    }
}

/// Profile every column of a dataset with the linear-mode heuristic
pub fn profile_dataset(dataset: &Dataset) -> IndexMap<String, ColumnProfile> {
    let mut profiles = IndexMap::new();
    for name in dataset.column_names() {
        if let Some(values) = dataset.column(&name) {
            profiles.insert(name, profile_column(values, DetectionMode::Linear));
        }
    }
    profiles
}

/// Detect columns usable as ANOVA factors (2..=12 distinct levels).
///
/// The dependent-variable column is excluded from consideration.
pub fn detect_anova_factors(dataset: &Dataset, dep_var: &str) -> Vec<FactorDefinition> {
    let mut factors = Vec::new();
    for name in dataset.column_names() {
        if name == dep_var {
            continue;
        }
        let Some(values) = dataset.column(&name) else {
            continue;
        };
        let profile = profile_column(values, DetectionMode::Anova);
        if let VariableType::Factor {
            n_levels,
            proportions,
            level_labels,
        } = profile.variable_type
        {
            factors.push(FactorDefinition {
                name,
                n_levels,
                proportions,
                level_labels,
            });
        }
    }
    factors
}

/// Compute pairwise Pearson correlations among the given columns.
///
/// Only columns present in the dataset with every value numeric participate.
/// Coefficients are rounded to 2 decimals and stored under the canonical
/// pair key; a coefficient that rounds to exactly 0.0 (or is undefined for
/// a zero-variance column) is omitted — absence means "no override".
pub fn data_correlations(dataset: &Dataset, variables: &[String]) -> IndexMap<String, f64> {
    let arrays: Vec<(&String, FloatArray)> = variables
        .iter()
        .filter_map(|name| {
            let values = dataset.column(name)?;
            let numeric: Option<Vec<f64>> = values.iter().map(DataValue::as_number).collect();
            Some((name, FloatArray::from(numeric?)))
        })
        .collect();

    let mut correlations = IndexMap::new();
    for (i, (a, xs)) in arrays.iter().enumerate() {
        for (b, ys) in arrays.iter().skip(i + 1) {
            let Some(r) = pearson(xs, ys) else {
                continue;
            };
            let rounded = round_to(r, 2);
            if rounded != 0.0 {
                correlations.insert(pair_key(a, b), rounded);
            }
        }
    }
    correlations
}

/// Pearson correlation coefficient; None when undefined (zero variance,
/// fewer than 2 observations).
fn pearson(x: &FloatArray, y: &FloatArray) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let mean_x = x.mean()?;
    let mean_y = y.mean()?;
    let dx = x.mapv(|v| v - mean_x);
    let dy = y.mapv(|v| v - mean_y);
    let cov = dx.dot(&dy);
    let ss_x = dx.dot(&dx);
    let ss_y = dy.dot(&dy);
    if ss_x == 0.0 || ss_y == 0.0 {
        return None;
    }
    Some(cov / (ss_x * ss_y).sqrt())
}

pub(crate) fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}
