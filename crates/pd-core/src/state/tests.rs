use indexmap::IndexMap;

use crate::cluster::ClusterSize;
use crate::correlation::PreservationMode;
use crate::data::{DataValue, Dataset};
use crate::formula::FormulaError;
use crate::request::{AnalysisRequest, RunParams};
use crate::state::{ModelState, ModelType};
use crate::variable::{FactorDefinition, VariableType};

fn state_with_formula(formula: &str) -> ModelState {
    let mut state = ModelState::new();
    state.apply_formula(formula).expect("formula should parse");
    state
}

#[test]
fn new_state_is_empty_with_scenario_presets() {
    let state = ModelState::new();
    assert_eq!(state.model_type(), ModelType::LinearRegression);
    assert_eq!(state.formula(), "");
    assert!(state.predictors().is_empty());
    assert!(state.effects().is_empty());
    assert_eq!(state.scenario_configs().len(), 3);
    assert_eq!(state.preservation_mode(), PreservationMode::Partial);
}

#[test]
fn apply_formula_sets_predictors_and_returns_expansion() {
    let mut state = ModelState::new();
    let outcome = state
        .apply_formula("score = study_hours + received_help")
        .unwrap();
    assert_eq!(state.dep_var(), "score");
    assert_eq!(outcome.expanded_terms, vec!["study_hours", "received_help"]);
    assert_eq!(outcome.term_types["study_hours"], "continuous");
}

#[test]
fn parse_failure_unsets_the_formula() {
    let mut state = state_with_formula("y = x1 + x2");
    let err = state.apply_formula("y = +").unwrap_err();
    assert!(matches!(err, FormulaError::Syntax { .. }));
    assert_eq!(state.formula(), "");
    assert!(state.predictors().is_empty());
    assert!(state.effects().is_empty());
}

#[test]
fn blank_formula_clears_the_model() {
    let mut state = state_with_formula("y = x1");
    state.apply_effect("x1", 0.5);
    let outcome = state.apply_formula("   ").unwrap();
    assert!(outcome.expanded_terms.is_empty());
    assert!(state.effects().is_empty());
}

#[test]
fn effects_are_pruned_when_a_predictor_disappears() {
    let mut state = state_with_formula("y = x1 + x2");
    assert!(state.apply_effect("x1", 0.5));
    assert!(state.apply_effect("x2", 0.3));
    state.apply_formula("y = x1").unwrap();
    assert_eq!(state.effects().len(), 1);
    assert_eq!(state.effects()["x1"], 0.5);
}

#[test]
fn effect_edits_for_unknown_terms_are_rejected() {
    let mut state = state_with_formula("y = x1");
    assert!(!state.apply_effect("x9", 0.5));
    assert!(state.effects().is_empty());
}

#[test]
fn retyping_a_predictor_drops_its_stale_effect() {
    let mut state = state_with_formula("y = x1");
    state.apply_effect("x1", 0.5);
    // x1 becomes a factor; the bare term no longer exists.
    let outcome = state.apply_type(
        "x1",
        VariableType::Factor {
            n_levels: 3,
            proportions: vec![0.4, 0.3, 0.3],
            level_labels: None,
        },
    );
    assert_eq!(outcome.expanded_terms, vec!["x1[2]", "x1[3]"]);
    assert!(state.effects().is_empty());
}

#[test]
fn formula_with_random_effects_builds_cluster_configs() {
    let state = state_with_formula("y = x1 + (1|school/classroom)");
    let configs = state.cluster_configs();
    assert_eq!(configs.len(), 2);
    assert!(matches!(configs[0].size, ClusterSize::NClusters(_)));
    assert!(matches!(configs[1].size, ClusterSize::NPerParent(_)));
    assert_eq!(configs[1].parent_var, Some("school".to_string()));
}

#[test]
fn cluster_edits_survive_formula_changes() {
    let mut state = state_with_formula("y = x1 + (1|school)");
    let mut config = state.cluster_configs()[0].clone();
    config.icc = 0.45;
    assert!(state.apply_cluster_edit(config));
    state.apply_formula("y = x1 + x2 + (1|school)").unwrap();
    assert_eq!(state.cluster_configs()[0].icc, 0.45);
}

#[test]
fn cluster_edit_for_unknown_grouping_is_rejected() {
    let mut state = state_with_formula("y = x1 + (1|school)");
    let mut config = state.cluster_configs()[0].clone();
    config.grouping_var = "site".to_string();
    assert!(!state.apply_cluster_edit(config));
}

#[test]
fn data_upload_profiles_predictor_columns() {
    let mut state = state_with_formula("y = am + origin");
    let dataset = Dataset::from_columns([
        (
            "am",
            vec![
                DataValue::Number(0.0),
                DataValue::Number(1.0),
                DataValue::Number(1.0),
                DataValue::Number(1.0),
            ],
        ),
        (
            "origin",
            vec![
                DataValue::Text("Europe".into()),
                DataValue::Text("Japan".into()),
                DataValue::Text("USA".into()),
                DataValue::Text("Japan".into()),
            ],
        ),
    ])
    .unwrap();
    let outcome = state.apply_data_upload(dataset, "/tmp/cars.csv");
    assert_eq!(
        state.registry().get("am"),
        Some(&VariableType::Binary { proportion: 0.75 })
    );
    assert_eq!(
        outcome.expanded_terms,
        vec!["am", "origin[Japan]", "origin[USA]"]
    );
    assert_eq!(state.data_file_path(), Some("/tmp/cars.csv"));
    assert!(state.data_backed_variables().contains("am"));
    assert_eq!(
        state.factor_level_labels()["origin"],
        vec!["Europe", "Japan", "USA"]
    );
}

#[test]
fn data_upload_feeds_the_reconciler() {
    let mut state = state_with_formula("y = x1 + x2");
    // Enough distinct values that both columns stay continuous.
    let xs: Vec<f64> = (1..=8).map(|i| i as f64).collect();
    let ys: Vec<f64> = xs.iter().map(|v| v * 2.0).collect();
    let dataset = Dataset::from_columns([
        ("x1", xs.into_iter().map(DataValue::from).collect()),
        ("x2", ys.into_iter().map(DataValue::from).collect()),
    ])
    .unwrap();
    state.apply_data_upload(dataset, "/tmp/data.csv");
    let out = state.correlations();
    assert_eq!(out.canonical.get("x1,x2"), Some(&1.0));

    state.clear_data();
    let out = state.correlations();
    assert!(out.canonical.is_empty());
    assert!(state.data_backed_variables().is_empty());
}

#[test]
fn data_derived_correlations_reach_snapshot_and_request() {
    let mut state = state_with_formula("y = x1 + x2");
    let xs: Vec<f64> = (1..=8).map(|i| i as f64).collect();
    let ys: Vec<f64> = xs.iter().map(|v| v * 2.0).collect();
    let dataset = Dataset::from_columns([
        ("x1", xs.into_iter().map(DataValue::from).collect()),
        ("x2", ys.into_iter().map(DataValue::from).collect()),
    ])
    .unwrap();
    state.apply_data_upload(dataset, "/tmp/data.csv");

    // Partial mode with no user edits: the empirical value alone must make
    // it into the snapshot and the engine request.
    let snapshot = state.snapshot();
    assert_eq!(snapshot.correlations.get("x1,x2"), Some(&1.0));
    let request = AnalysisRequest::build(&snapshot, RunParams::power(100));
    assert_eq!(request.correlation_spec, "corr(x1, x2)=1");

    // Restoring the snapshot keeps the merged map even without the data.
    let mut restored = ModelState::new();
    restored.restore(snapshot, Some("/tmp/data.csv".to_string()));
    assert_eq!(restored.correlations().canonical.get("x1,x2"), Some(&1.0));
}

#[test]
fn user_edit_overrides_data_in_snapshot_correlations() {
    let mut state = state_with_formula("y = x1 + x2");
    let xs: Vec<f64> = (1..=8).map(|i| i as f64).collect();
    let ys: Vec<f64> = xs.iter().map(|v| v * 2.0).collect();
    let dataset = Dataset::from_columns([
        ("x1", xs.into_iter().map(DataValue::from).collect()),
        ("x2", ys.into_iter().map(DataValue::from).collect()),
    ])
    .unwrap();
    state.apply_data_upload(dataset, "/tmp/data.csv");
    state.apply_correlation_edit("x1", "x2", 0.3);
    assert_eq!(state.snapshot().correlations.get("x1,x2"), Some(&0.3));
}

#[test]
fn correlation_edits_go_through_the_reconciler() {
    let mut state = state_with_formula("y = x1 + x2");
    state.apply_correlation_edit("x2", "x1", 0.4);
    let out = state.correlations();
    assert_eq!(out.canonical.get("x1,x2"), Some(&0.4));
}

#[test]
fn anova_model_defines_formula_registry_and_references() {
    let mut state = ModelState::new();
    state.switch_model_type(ModelType::Anova);
    let factors = vec![
        FactorDefinition {
            name: "dose".to_string(),
            n_levels: 3,
            proportions: vec![0.34, 0.33, 0.33],
            level_labels: Some(vec!["low".into(), "mid".into(), "high".into()]),
        },
        FactorDefinition {
            name: "sex".to_string(),
            n_levels: 2,
            proportions: vec![0.5, 0.5],
            level_labels: None,
        },
    ];
    let references: IndexMap<String, String> =
        [("dose".to_string(), "mid".to_string())].into_iter().collect();
    let outcome = state.apply_anova_model(
        "score",
        factors,
        vec!["dose:sex".to_string()],
        references,
    );
    assert_eq!(state.formula(), "score = dose + sex + dose:sex");
    // The explicit reference override picks "mid" instead of the first label.
    assert_eq!(
        outcome.expanded_terms,
        vec![
            "dose[low]",
            "dose[high]",
            "sex[2]",
            "dose[low]:sex",
            "dose[high]:sex",
            "dose:sex[2]"
        ]
    );
}

#[test]
fn switching_model_type_is_a_full_reset() {
    let mut state = state_with_formula("y = x1 + (1|g)");
    state.apply_effect("x1", 0.5);
    let outcome = state.switch_model_type(ModelType::Anova);
    assert!(outcome.expanded_terms.is_empty());
    assert_eq!(state.model_type(), ModelType::Anova);
    assert_eq!(state.formula(), "");
    assert!(state.predictors().is_empty());
    assert!(state.effects().is_empty());
    assert!(state.registry().is_empty());
    assert!(state.cluster_configs().is_empty());
}

#[test]
fn anova_surface_drops_linear_correlation_edits() {
    let mut state = state_with_formula("y = x1 + x2");
    state.apply_correlation_edit("x1", "x2", 0.4);
    state.switch_model_type(ModelType::Anova);
    state.apply_anova_model(
        "score",
        vec![FactorDefinition {
            name: "dose".to_string(),
            n_levels: 3,
            proportions: vec![0.34, 0.33, 0.33],
            level_labels: None,
        }],
        vec![],
        indexmap::IndexMap::new(),
    );
    assert_eq!(state.preservation_mode(), PreservationMode::No);
    assert!(state.correlations().canonical.is_empty());
    let snapshot = state.snapshot();
    assert!(snapshot.correlations.is_empty());
    let request = AnalysisRequest::build(&snapshot, RunParams::power(100));
    assert_eq!(request.correlation_spec, "");
}

#[test]
fn declared_types_survive_a_parse_failure() {
    let mut state = state_with_formula("y = x1");
    state.apply_type(
        "x1",
        VariableType::Factor {
            n_levels: 3,
            proportions: vec![0.4, 0.3, 0.3],
            level_labels: None,
        },
    );
    // Mid-edit typo: the formula is unset, the declaration is not.
    assert!(state.apply_formula("y = x1 +").is_err());
    assert!(state.predictors().is_empty());
    assert!(state.registry().contains("x1"));
    // Correcting the formula gets the factor expansion back.
    let outcome = state.apply_formula("y = x1").unwrap();
    assert_eq!(outcome.expanded_terms, vec!["x1[2]", "x1[3]"]);
}

#[test]
fn switching_to_the_same_type_changes_nothing() {
    let mut state = state_with_formula("y = x1");
    state.apply_effect("x1", 0.3);
    state.switch_model_type(ModelType::LinearRegression);
    assert_eq!(state.formula(), "y = x1");
    assert_eq!(state.effects()["x1"], 0.3);
}

#[test]
fn snapshot_round_trips_through_json() {
    let mut state = state_with_formula("y = x1 + group + (1|school)");
    state.apply_type(
        "group",
        VariableType::Factor {
            n_levels: 3,
            proportions: vec![0.2, 0.3, 0.5],
            level_labels: None,
        },
    );
    state.apply_effect("x1", 0.5);
    state.apply_effect("group[2]", -0.25);
    state.set_preservation_mode(PreservationMode::No);
    state.apply_correlation_edit("x1", "group", 0.15);
    state.settings_mut().n_simulations = 5000;
    state.settings_mut().seed = 99;

    let snapshot = state.snapshot();
    let json = serde_json::to_string_pretty(&snapshot).unwrap();
    let decoded = serde_json::from_str(&json).unwrap();
    assert_eq!(snapshot, decoded);

    let mut restored = ModelState::new();
    restored.restore(decoded, Some("/tmp/old.csv".to_string()));
    assert_eq!(restored.formula(), state.formula());
    assert_eq!(restored.predictors(), state.predictors());
    assert_eq!(restored.effects(), state.effects());
    assert_eq!(restored.registry(), state.registry());
    assert_eq!(restored.cluster_configs(), state.cluster_configs());
    assert_eq!(restored.settings(), state.settings());
    assert_eq!(restored.preservation_mode(), PreservationMode::No);
    assert_eq!(
        restored.correlations().canonical.get("group,x1"),
        Some(&0.15)
    );
    // Random-effect structure is recovered by re-parsing the formula.
    assert_eq!(restored.random_effects(), state.random_effects());
}

#[test]
fn snapshot_records_column_names_but_restore_drops_data() {
    let mut state = state_with_formula("y = x1");
    let dataset = Dataset::from_columns([(
        "x1",
        vec![1.0, 2.0, 3.0].into_iter().map(DataValue::from).collect::<Vec<_>>(),
    )])
    .unwrap();
    state.apply_data_upload(dataset, "/tmp/data.csv");

    let snapshot = state.snapshot();
    assert_eq!(snapshot.uploaded_columns, vec!["x1"]);

    let mut restored = ModelState::new();
    restored.restore(snapshot, Some("/tmp/data.csv".to_string()));
    assert!(restored.dataset().is_none());
    assert_eq!(restored.data_file_path(), Some("/tmp/data.csv"));
}
