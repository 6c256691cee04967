//! Serializable model snapshot
//!
//! The snapshot is the only form of the model that crosses a thread
//! boundary or reaches disk. It records the uploaded dataset's column names
//! but never its values.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::cluster::ClusterConfig;
use crate::correlation::PreservationMode;
use crate::state::settings::{RunSettings, ScenarioConfig};
use crate::state::ModelType;
use crate::variable::{FactorDefinition, TypeRegistry};

/// Plain value copy of a `ModelState`, minus the raw dataset
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub model_type: ModelType,
    pub formula: String,
    pub dep_var: String,
    pub predictors: Vec<String>,
    pub variable_types: TypeRegistry,
    pub effects: IndexMap<String, f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub anova_factors: Vec<FactorDefinition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub anova_interactions: Vec<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub factor_reference_levels: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub factor_level_labels: IndexMap<String, Vec<String>>,
    /// Column names only, never values
    #[serde(default)]
    pub uploaded_columns: Vec<String>,
    pub preserve_correlation: PreservationMode,
    /// The reconciled editor map: data-derived values overlaid by user
    /// edits. Restored as user edits, since the data itself never is.
    #[serde(default)]
    pub correlations: IndexMap<String, f64>,
    #[serde(default)]
    pub cluster_configs: Vec<ClusterConfig>,
    #[serde(flatten)]
    pub settings: RunSettings,
    pub scenario_configs: IndexMap<String, ScenarioConfig>,
}
