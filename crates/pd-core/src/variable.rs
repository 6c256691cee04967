//! Variable type declarations for model predictors
//!
//! The tagged union here is the source of truth for how a predictor expands
//! into model terms: continuous and binary variables pass through unchanged,
//! factors expand into dummy-coded terms.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Declared type of a single predictor
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VariableType {
    /// Standard-normal continuous predictor
    Continuous,
    /// Binary predictor with the proportion of ones
    Binary { proportion: f64 },
    /// Categorical predictor with `n_levels` levels.
    ///
    /// When `level_labels` is present it has exactly `n_levels` entries and
    /// its first entry is the reference level; otherwise levels are the
    /// integers 1..=n_levels with level 1 as reference.
    Factor {
        n_levels: usize,
        proportions: Vec<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        level_labels: Option<Vec<String>>,
    },
}

impl VariableType {
    /// Short tag used in expanded-term type maps
    pub fn tag(&self) -> &'static str {
        match self {
            VariableType::Continuous => "continuous",
            VariableType::Binary { .. } => "binary",
            VariableType::Factor { .. } => "factor",
        }
    }

    pub fn is_factor(&self) -> bool {
        matches!(self, VariableType::Factor { .. })
    }

    /// Continuous and binary variables can carry pairwise correlations;
    /// factors and interaction terms never do.
    pub fn is_correlable(&self) -> bool {
        matches!(self, VariableType::Continuous | VariableType::Binary { .. })
    }
}

impl Default for VariableType {
    fn default() -> Self {
        VariableType::Continuous
    }
}

/// Raw factor definition as entered in the ANOVA editor or detected from data
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FactorDefinition {
    pub name: String,
    pub n_levels: usize,
    pub proportions: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level_labels: Option<Vec<String>>,
}

impl FactorDefinition {
    /// Convert to the registry's tagged-union representation
    pub fn to_variable_type(&self) -> VariableType {
        VariableType::Factor {
            n_levels: self.n_levels,
            proportions: self.proportions.clone(),
            level_labels: self.level_labels.clone(),
        }
    }
}

/// Per-predictor type declarations, preserving entry order
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeRegistry {
    entries: IndexMap<String, VariableType>,
}

impl TypeRegistry {
    const CONTINUOUS: VariableType = VariableType::Continuous;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, variable_type: VariableType) {
        self.entries.insert(name.into(), variable_type);
    }

    pub fn get(&self, name: &str) -> Option<&VariableType> {
        self.entries.get(name)
    }

    /// Fail-open lookup: a predictor with no declaration is Continuous.
    ///
    /// A missing declaration should never block analysis.
    pub fn lookup(&self, name: &str) -> &VariableType {
        self.entries.get(name).unwrap_or(&Self::CONTINUOUS)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<VariableType> {
        self.entries.shift_remove(name)
    }

    /// Drop declarations for predictors no longer in the model
    pub fn retain_names(&mut self, names: &[String]) {
        self.entries.retain(|name, _| names.contains(name));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &VariableType)> {
        self.entries.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl FromIterator<(String, VariableType)> for TypeRegistry {
    fn from_iter<I: IntoIterator<Item = (String, VariableType)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
