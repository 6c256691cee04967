//! The mutable model aggregate behind the editing surface
//!
//! `ModelState` is the single source of truth for the session. Editors never
//! mutate fields directly; every change goes through an `apply_*` operation
//! which returns an `EditOutcome` describing the resulting expanded-term
//! list, so the caller can redraw whatever depends on it. Snapshots are
//! plain serde values carrying everything except the raw dataset.

mod settings;
mod snapshot;

#[cfg(test)]
mod tests;

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::cluster::{build_cluster_configs, ClusterConfig};
use crate::correlation::{CorrelationReconciler, PreservationMode, Reconciled};
use crate::data::{data_correlations, profile_column, Dataset, DetectionMode};
use crate::expand::{expand, Expansion};
use crate::formula::{build_anova_formula, FormulaError, ParsedFormula, RandomEffect};
use crate::variable::{FactorDefinition, TypeRegistry, VariableType};

pub use settings::{
    default_scenarios, DistributionFamily, ParallelMode, RunSettings, ScenarioConfig,
    SCENARIO_ORDER,
};
pub use snapshot::ModelSnapshot;

/// Which editing surface is active
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    #[default]
    LinearRegression,
    Anova,
}

/// What an edit produced: the authoritative expanded-term list and its
/// parallel type map. Callers redraw from this instead of listening on a
/// signal graph.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EditOutcome {
    pub expanded_terms: Vec<String>,
    pub term_types: IndexMap<String, &'static str>,
}

impl EditOutcome {
    fn from_expansion(expansion: &Expansion) -> Self {
        EditOutcome {
            expanded_terms: expansion.names(),
            term_types: expansion.type_map(),
        }
    }
}

/// The session's model aggregate
#[derive(Clone, Debug, Default)]
pub struct ModelState {
    model_type: ModelType,
    formula: String,
    dep_var: String,
    predictors: Vec<String>,
    random_effects: Vec<RandomEffect>,
    registry: TypeRegistry,
    effects: IndexMap<String, f64>,
    reconciler: CorrelationReconciler,
    cluster_configs: Vec<ClusterConfig>,
    dataset: Option<Dataset>,
    data_file_path: Option<String>,
    anova_factors: Vec<FactorDefinition>,
    anova_interactions: Vec<String>,
    factor_reference_levels: IndexMap<String, String>,
    factor_level_labels: IndexMap<String, Vec<String>>,
    settings: RunSettings,
    scenario_configs: IndexMap<String, ScenarioConfig>,
}

impl ModelState {
    /// Empty state at session start
    pub fn new() -> Self {
        ModelState {
            scenario_configs: default_scenarios(),
            ..ModelState::default()
        }
    }

    pub fn model_type(&self) -> ModelType {
        self.model_type
    }

    pub fn formula(&self) -> &str {
        &self.formula
    }

    pub fn dep_var(&self) -> &str {
        &self.dep_var
    }

    pub fn predictors(&self) -> &[String] {
        &self.predictors
    }

    pub fn random_effects(&self) -> &[RandomEffect] {
        &self.random_effects
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn effects(&self) -> &IndexMap<String, f64> {
        &self.effects
    }

    pub fn cluster_configs(&self) -> &[ClusterConfig] {
        &self.cluster_configs
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    pub fn data_file_path(&self) -> Option<&str> {
        self.data_file_path.as_deref()
    }

    pub fn anova_factors(&self) -> &[FactorDefinition] {
        &self.anova_factors
    }

    pub fn anova_interactions(&self) -> &[String] {
        &self.anova_interactions
    }

    pub fn factor_level_labels(&self) -> &IndexMap<String, Vec<String>> {
        &self.factor_level_labels
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Settings are free-form; range constraints live at the input widgets.
    pub fn settings_mut(&mut self) -> &mut RunSettings {
        &mut self.settings
    }

    pub fn scenario_configs(&self) -> &IndexMap<String, ScenarioConfig> {
        &self.scenario_configs
    }

    pub fn scenario_configs_mut(&mut self) -> &mut IndexMap<String, ScenarioConfig> {
        &mut self.scenario_configs
    }

    /// The current expansion of the predictor list.
    ///
    /// Reference-level overrides apply whenever the user (or a data upload)
    /// recorded explicit references.
    pub fn expansion(&self) -> Expansion {
        let overrides = if self.factor_reference_levels.is_empty() {
            None
        } else {
            Some(&self.factor_reference_levels)
        };
        expand(&self.predictors, &self.registry, overrides)
    }

    /// Non-interaction predictors that can carry pairwise correlations
    pub fn correlable_variables(&self) -> Vec<String> {
        self.predictors
            .iter()
            .filter(|p| !p.contains(':'))
            .filter(|p| self.registry.lookup(p).is_correlable())
            .cloned()
            .collect()
    }

    /// Parse and apply a formula edit.
    ///
    /// A parse failure unsets the formula (empty predictor list) and is
    /// returned for inline display; the rest of the state is left pruned
    /// and consistent.
    pub fn apply_formula(&mut self, text: &str) -> Result<EditOutcome, FormulaError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            self.clear_formula();
            return Ok(EditOutcome::default());
        }
        match ParsedFormula::parse(trimmed) {
            Ok(parsed) => {
                self.formula = trimmed.to_string();
                self.dep_var = parsed.dep_var;
                self.predictors = parsed.predictors;
                self.random_effects = parsed.random_effects;
                self.cluster_configs =
                    build_cluster_configs(&self.random_effects, &self.cluster_configs);
                self.prune_to_model_variables();
                log::debug!(
                    "formula applied: {} predictors, {} random effects",
                    self.predictors.len(),
                    self.random_effects.len()
                );
                Ok(EditOutcome::from_expansion(&self.expansion()))
            }
            Err(err) => {
                // The formula is unset until corrected, but declared types
                // survive so a fixed typo gets its declarations back.
                self.unset_formula();
                Err(err)
            }
        }
    }

    /// Replace the full type registry (the type-editor commits wholesale)
    pub fn apply_types(&mut self, registry: TypeRegistry) -> EditOutcome {
        self.registry = registry;
        self.sync_effects();
        EditOutcome::from_expansion(&self.expansion())
    }

    /// Change a single predictor's declared type
    pub fn apply_type(&mut self, name: impl Into<String>, variable_type: VariableType) -> EditOutcome {
        self.registry.insert(name, variable_type);
        self.sync_effects();
        EditOutcome::from_expansion(&self.expansion())
    }

    /// Record an effect size for an expanded term.
    ///
    /// Returns false (and changes nothing) when the term is not part of the
    /// current expansion.
    pub fn apply_effect(&mut self, term: &str, value: f64) -> bool {
        if !self.expansion().contains(term) {
            log::warn!("effect edit for unknown term {:?} ignored", term);
            return false;
        }
        self.effects.insert(term.to_string(), value);
        true
    }

    pub fn preservation_mode(&self) -> PreservationMode {
        self.reconciler.mode()
    }

    pub fn set_preservation_mode(&mut self, mode: PreservationMode) {
        self.reconciler.set_mode(mode);
    }

    /// Capture a correlation edit from the editor grid
    pub fn apply_correlation_edit(&mut self, a: &str, b: &str, value: f64) {
        self.reconciler.on_user_edit(a, b, value);
    }

    /// Reconciled correlations for the current correlable variables
    pub fn correlations(&self) -> Reconciled {
        self.reconciler.reconcile(&self.correlable_variables())
    }

    /// Profile an uploaded dataset and fold the findings into the model.
    ///
    /// Detected types overwrite declarations for predictors present as
    /// columns; factor levels from data record their labels and reference;
    /// empirical correlations replace the data-derived map.
    pub fn apply_data_upload(&mut self, dataset: Dataset, path: impl Into<String>) -> EditOutcome {
        for name in self.model_variables() {
            let Some(values) = dataset.column(&name) else {
                continue;
            };
            let profile = profile_column(values, DetectionMode::Linear);
            if let VariableType::Factor {
                level_labels: Some(labels),
                ..
            } = &profile.variable_type
            {
                self.factor_level_labels.insert(name.clone(), labels.clone());
                self.factor_reference_levels
                    .entry(name.clone())
                    .or_insert_with(|| labels[0].clone());
            }
            self.registry.insert(name, profile.variable_type);
        }

        let correlable = self.correlable_variables();
        self.reconciler
            .set_data_derived(data_correlations(&dataset, &correlable));
        self.reconciler
            .set_data_backed(dataset.column_names().into_iter().collect());

        log::info!(
            "data upload: {} columns, {} rows",
            dataset.n_columns(),
            dataset.n_rows()
        );
        self.data_file_path = Some(path.into());
        self.dataset = Some(dataset);
        self.sync_effects();
        EditOutcome::from_expansion(&self.expansion())
    }

    /// Forget the uploaded dataset; declared types survive
    pub fn clear_data(&mut self) -> EditOutcome {
        self.dataset = None;
        self.data_file_path = None;
        self.reconciler.set_data_derived(IndexMap::new());
        self.reconciler.set_data_backed(BTreeSet::new());
        EditOutcome::from_expansion(&self.expansion())
    }

    /// Variables backed by an uploaded data column
    pub fn data_backed_variables(&self) -> BTreeSet<String> {
        self.dataset
            .as_ref()
            .map(|d| d.column_names().into_iter().collect())
            .unwrap_or_default()
    }

    /// Replace the cluster config for its grouping variable.
    ///
    /// Returns false when no random effect with that grouping exists.
    pub fn apply_cluster_edit(&mut self, config: ClusterConfig) -> bool {
        match self
            .cluster_configs
            .iter_mut()
            .find(|c| c.grouping_var == config.grouping_var)
        {
            Some(slot) => {
                *slot = config;
                true
            }
            None => {
                log::warn!(
                    "cluster edit for unknown grouping {:?} ignored",
                    config.grouping_var
                );
                false
            }
        }
    }

    /// Commit the ANOVA editor: factors, selected interactions and explicit
    /// reference levels define the whole model.
    pub fn apply_anova_model(
        &mut self,
        dep_var: impl Into<String>,
        factors: Vec<FactorDefinition>,
        interactions: Vec<String>,
        reference_levels: IndexMap<String, String>,
    ) -> EditOutcome {
        self.model_type = ModelType::Anova;
        self.dep_var = dep_var.into();
        let factor_names: Vec<String> = factors.iter().map(|f| f.name.clone()).collect();
        self.formula = build_anova_formula(&self.dep_var, &factor_names, &interactions);
        self.predictors = factor_names
            .into_iter()
            .chain(interactions.iter().cloned())
            .collect();
        self.registry = factors
            .iter()
            .map(|f| (f.name.clone(), f.to_variable_type()))
            .collect();
        self.factor_level_labels = factors
            .iter()
            .filter_map(|f| Some((f.name.clone(), f.level_labels.clone()?)))
            .collect();
        self.factor_reference_levels = reference_levels;
        self.anova_factors = factors;
        self.anova_interactions = interactions;
        self.random_effects.clear();
        self.cluster_configs.clear();
        self.reset_correlations_for_anova();
        self.sync_effects();
        EditOutcome::from_expansion(&self.expansion())
    }

    /// Switch between the two mutually exclusive editing surfaces.
    ///
    /// The formula, dependent variable, predictors, effects and registry are
    /// fully reset; uploaded data and run settings survive.
    pub fn switch_model_type(&mut self, model_type: ModelType) -> EditOutcome {
        if self.model_type == model_type {
            return EditOutcome::from_expansion(&self.expansion());
        }
        log::info!("model type switched to {:?}", model_type);
        self.model_type = model_type;
        self.clear_formula();
        self.anova_factors.clear();
        self.anova_interactions.clear();
        self.factor_reference_levels.clear();
        self.factor_level_labels.clear();
        if model_type == ModelType::Anova {
            self.reset_correlations_for_anova();
        }
        EditOutcome::default()
    }

    /// Plain serializable copy of everything except the dataset itself
    pub fn snapshot(&self) -> ModelSnapshot {
        ModelSnapshot {
            model_type: self.model_type,
            formula: self.formula.clone(),
            dep_var: self.dep_var.clone(),
            predictors: self.predictors.clone(),
            variable_types: self.registry.clone(),
            effects: self.effects.clone(),
            anova_factors: self.anova_factors.clone(),
            anova_interactions: self.anova_interactions.clone(),
            factor_reference_levels: self.factor_reference_levels.clone(),
            factor_level_labels: self.factor_level_labels.clone(),
            uploaded_columns: self
                .dataset
                .as_ref()
                .map(Dataset::column_names)
                .unwrap_or_default(),
            preserve_correlation: self.reconciler.mode(),
            // The merged editor map, not just the user edits: data-derived
            // values must reach the engine and survive restore.
            correlations: self.correlations().canonical,
            cluster_configs: self.cluster_configs.clone(),
            settings: self.settings.clone(),
            scenario_configs: self.scenario_configs.clone(),
        }
    }

    /// Replace the state from a history snapshot.
    ///
    /// The dataset is never restored; only the recorded file path is kept
    /// for user reference. The formula is re-parsed to recover random-effect
    /// structure (a stale unparsable formula leaves it empty).
    pub fn restore(&mut self, snapshot: ModelSnapshot, data_file_path: Option<String>) {
        self.model_type = snapshot.model_type;
        self.formula = snapshot.formula;
        self.dep_var = snapshot.dep_var;
        self.predictors = snapshot.predictors;
        self.random_effects = ParsedFormula::parse(&self.formula)
            .map(|parsed| parsed.random_effects)
            .unwrap_or_default();
        self.registry = snapshot.variable_types;
        self.effects = snapshot.effects;
        self.anova_factors = snapshot.anova_factors;
        self.anova_interactions = snapshot.anova_interactions;
        self.factor_reference_levels = snapshot.factor_reference_levels;
        self.factor_level_labels = snapshot.factor_level_labels;
        self.cluster_configs = snapshot.cluster_configs;
        self.settings = snapshot.settings;
        self.scenario_configs = snapshot.scenario_configs;
        self.dataset = None;
        self.data_file_path = data_file_path;
        self.reconciler = CorrelationReconciler::new();
        self.reconciler.set_mode(snapshot.preserve_correlation);
        self.reconciler.set_user_edits(snapshot.correlations);
    }

    fn unset_formula(&mut self) {
        self.formula.clear();
        self.dep_var.clear();
        self.predictors.clear();
        self.random_effects.clear();
        self.cluster_configs.clear();
        self.effects.clear();
    }

    fn clear_formula(&mut self) {
        self.unset_formula();
        self.registry.clear();
    }

    /// ANOVA models carry no correlation structure: factors are never
    /// correlable, so stale linear-mode edits must not reach a request.
    fn reset_correlations_for_anova(&mut self) {
        self.reconciler.clear_user_edits();
        self.reconciler.set_mode(PreservationMode::No);
    }

    /// Base variable names appearing anywhere in the predictor list
    fn model_variables(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for predictor in &self.predictors {
            for part in predictor.split(':') {
                if !names.iter().any(|n| n == part) {
                    names.push(part.to_string());
                }
            }
        }
        names
    }

    fn prune_to_model_variables(&mut self) {
        let names = self.model_variables();
        self.registry.retain_names(&names);
        self.factor_reference_levels.retain(|name, _| names.contains(name));
        self.factor_level_labels.retain(|name, _| names.contains(name));
        self.sync_effects();
    }

    /// Effect keys are always a subset of the current expansion
    fn sync_effects(&mut self) {
        let expansion = self.expansion();
        self.effects.retain(|term, _| expansion.contains(term));
    }
}
