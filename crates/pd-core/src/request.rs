//! Analysis request building
//!
//! Turns a `ModelSnapshot` plus per-run parameters into the structured
//! request handed to the statistics engine: the four clause specs
//! (variable types, effects, correlations, clusters) in the engine's
//! configuration syntax, every run setting, and the ordered expanded-term
//! list used to render results back.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::cluster::ClusterConfig;
use crate::correlation::{split_pair_key, PreservationMode};
use crate::expand::expand;
use crate::state::{ModelSnapshot, RunSettings, ScenarioConfig};
use crate::variable::VariableType;

/// What the run is solving for
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RunMode {
    /// Power at a fixed sample size
    Power { sample_size: u32 },
    /// Sweep sample sizes until target power is reached
    SampleSize { from_size: u32, to_size: u32, by: u32 },
}

/// Per-run parameters from the analysis surface
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunParams {
    #[serde(flatten)]
    pub mode: RunMode,
    /// Multiple-comparison correction, e.g. "Benjamini-Hochberg"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correction: Option<String>,
    /// Which test drives the run ("all" or a specific term)
    pub target_test: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_formula: Option<String>,
    /// Include the scenario perturbation breakdown
    #[serde(default)]
    pub scenarios: bool,
}

impl RunParams {
    pub fn power(sample_size: u32) -> Self {
        RunParams {
            mode: RunMode::Power { sample_size },
            correction: None,
            target_test: "all".to_string(),
            test_formula: None,
            scenarios: false,
        }
    }

    pub fn sample_size(from_size: u32, to_size: u32, by: u32) -> Self {
        RunParams {
            mode: RunMode::SampleSize {
                from_size,
                to_size,
                by,
            },
            correction: None,
            target_test: "all".to_string(),
            test_formula: None,
            scenarios: false,
        }
    }
}

/// Everything the engine needs for one run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub formula: String,
    /// `name=(binary, p)` / `name=(factor, ...)` clauses, comma-joined
    pub variable_type_spec: String,
    /// `name=value` clauses for nonzero effects
    pub effects_spec: String,
    /// `corr(a, b)=v` clauses in canonical key order
    pub correlation_spec: String,
    pub cluster_configs: Vec<ClusterConfig>,
    /// Data columns re-supplied to the engine by the caller
    pub uploaded_columns: Vec<String>,
    pub preserve_correlation: PreservationMode,
    /// Factors whose reference differs from their first data label
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub factor_references: IndexMap<String, String>,
    pub settings: RunSettings,
    pub scenario_configs: IndexMap<String, ScenarioConfig>,
    pub params: RunParams,
    /// Expanded term names, in order, for rendering engine results
    pub term_order: Vec<String>,
}

impl AnalysisRequest {
    /// Build a request from a snapshot.
    ///
    /// When data is uploaded, columns present in the dataset are excluded
    /// from the variable-type spec — their types come from the engine's own
    /// data-upload path, and a redundant clause would shadow the
    /// data-derived level labels with integer-indexed dummies.
    pub fn build(snapshot: &ModelSnapshot, params: RunParams) -> Self {
        let overrides = if snapshot.factor_reference_levels.is_empty() {
            None
        } else {
            Some(&snapshot.factor_reference_levels)
        };
        let term_order = expand(&snapshot.predictors, &snapshot.variable_types, overrides).names();

        AnalysisRequest {
            formula: snapshot.formula.clone(),
            variable_type_spec: variable_type_spec(snapshot),
            effects_spec: effects_spec(&snapshot.effects),
            correlation_spec: correlation_spec(&snapshot.correlations),
            cluster_configs: snapshot.cluster_configs.clone(),
            uploaded_columns: snapshot.uploaded_columns.clone(),
            preserve_correlation: snapshot.preserve_correlation,
            factor_references: non_default_references(snapshot),
            settings: snapshot.settings.clone(),
            scenario_configs: snapshot.scenario_configs.clone(),
            params,
            term_order,
        }
    }
}

fn variable_type_spec(snapshot: &ModelSnapshot) -> String {
    let mut clauses: Vec<String> = Vec::new();
    for (name, variable_type) in snapshot.variable_types.iter() {
        if snapshot.uploaded_columns.iter().any(|c| c == name) {
            continue;
        }
        match variable_type {
            VariableType::Continuous => {}
            VariableType::Binary { proportion } => {
                clauses.push(format!("{}=(binary, {})", name, proportion));
            }
            VariableType::Factor {
                n_levels,
                proportions,
                ..
            } => {
                if proportions.is_empty() {
                    clauses.push(format!("{}=(factor, {})", name, n_levels));
                } else {
                    let props: Vec<String> = proportions.iter().map(f64::to_string).collect();
                    clauses.push(format!("{}=(factor, {})", name, props.join(", ")));
                }
            }
        }
    }
    clauses.join(", ")
}

fn effects_spec(effects: &IndexMap<String, f64>) -> String {
    let clauses: Vec<String> = effects
        .iter()
        .filter(|(_, value)| **value != 0.0)
        .map(|(name, value)| format!("{}={}", name, value))
        .collect();
    clauses.join(", ")
}

fn correlation_spec(correlations: &IndexMap<String, f64>) -> String {
    let clauses: Vec<String> = correlations
        .iter()
        .filter_map(|(key, value)| {
            let (a, b) = split_pair_key(key)?;
            Some(format!("corr({}, {})={}", a, b, value))
        })
        .collect();
    clauses.join(", ")
}

/// References that differ from the factor's first data label; default
/// references need no clause at all.
fn non_default_references(snapshot: &ModelSnapshot) -> IndexMap<String, String> {
    snapshot
        .factor_reference_levels
        .iter()
        .filter(|(name, reference)| {
            snapshot
                .factor_level_labels
                .get(*name)
                .and_then(|labels| labels.first())
                .map(|first| first != *reference)
                .unwrap_or(false)
        })
        .map(|(name, reference)| (name.clone(), reference.clone()))
        .collect()
}
