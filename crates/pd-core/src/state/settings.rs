//! Run settings and scenario perturbation presets

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Where the engine is allowed to parallelize
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParallelMode {
    Off,
    On,
    /// Parallelize only the expensive mixed-model runs
    #[default]
    #[serde(rename = "mixedmodels")]
    MixedModelsOnly,
}

/// Simulation settings passed through to the engine
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunSettings {
    pub n_simulations: u32,
    pub n_simulations_mixed_model: u32,
    pub alpha: f64,
    pub target_power: f64,
    pub seed: u64,
    /// Fraction of failed simulations tolerated before the run aborts
    pub max_failed_simulations: f64,
    pub parallel: ParallelMode,
    pub n_cores: usize,
}

impl Default for RunSettings {
    fn default() -> Self {
        RunSettings {
            n_simulations: 1600,
            n_simulations_mixed_model: 800,
            alpha: 0.05,
            target_power: 80.0,
            seed: 2137,
            max_failed_simulations: 0.03,
            parallel: ParallelMode::MixedModelsOnly,
            n_cores: default_n_cores(),
        }
    }
}

/// Half the machine's logical cores, at least one
fn default_n_cores() -> usize {
    let available = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4);
    (available / 2).max(1)
}

/// Distribution family used for perturbed random effects and residuals
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionFamily {
    #[default]
    Normal,
    HeavyTailed,
}

/// One scenario's perturbation parameters.
///
/// The first four apply to every model; the rest are consumed only by
/// mixed-model runs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub heterogeneity: f64,
    pub heteroskedasticity: f64,
    pub correlation_noise_sd: f64,
    pub distribution_change_prob: f64,
    pub icc_noise_sd: f64,
    pub random_effect_dist: DistributionFamily,
    pub random_effect_df: u32,
    pub residual_dist: DistributionFamily,
    pub residual_change_prob: f64,
    pub residual_df: u32,
}

/// Fixed scenario key order: increasing deviation from model assumptions
pub const SCENARIO_ORDER: [&str; 3] = ["optimistic", "realistic", "doomer"];

/// The three scenario presets in their fixed order
pub fn default_scenarios() -> IndexMap<String, ScenarioConfig> {
    let optimistic = ScenarioConfig {
        heterogeneity: 0.0,
        heteroskedasticity: 0.0,
        correlation_noise_sd: 0.0,
        distribution_change_prob: 0.0,
        icc_noise_sd: 0.0,
        random_effect_dist: DistributionFamily::Normal,
        random_effect_df: 5,
        residual_dist: DistributionFamily::Normal,
        residual_change_prob: 0.0,
        residual_df: 10,
    };
    let realistic = ScenarioConfig {
        heterogeneity: 0.2,
        heteroskedasticity: 0.1,
        correlation_noise_sd: 0.2,
        distribution_change_prob: 0.3,
        icc_noise_sd: 0.15,
        random_effect_dist: DistributionFamily::HeavyTailed,
        random_effect_df: 5,
        residual_dist: DistributionFamily::HeavyTailed,
        residual_change_prob: 0.3,
        residual_df: 10,
    };
    let doomer = ScenarioConfig {
        heterogeneity: 0.4,
        heteroskedasticity: 0.2,
        correlation_noise_sd: 0.4,
        distribution_change_prob: 0.6,
        icc_noise_sd: 0.30,
        random_effect_dist: DistributionFamily::HeavyTailed,
        random_effect_df: 3,
        residual_dist: DistributionFamily::HeavyTailed,
        residual_change_prob: 0.8,
        residual_df: 5,
    };
    [
        ("optimistic".to_string(), optimistic),
        ("realistic".to_string(), realistic),
        ("doomer".to_string(), doomer),
    ]
    .into_iter()
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_defaults_match_the_editing_surface() {
        let settings = RunSettings::default();
        assert_eq!(settings.n_simulations, 1600);
        assert_eq!(settings.n_simulations_mixed_model, 800);
        assert_eq!(settings.alpha, 0.05);
        assert_eq!(settings.target_power, 80.0);
        assert_eq!(settings.seed, 2137);
        assert_eq!(settings.max_failed_simulations, 0.03);
        assert_eq!(settings.parallel, ParallelMode::MixedModelsOnly);
        assert!(settings.n_cores >= 1);
    }

    #[test]
    fn scenario_presets_come_in_fixed_order() {
        let scenarios = default_scenarios();
        assert_eq!(
            scenarios.keys().cloned().collect::<Vec<_>>(),
            SCENARIO_ORDER.to_vec()
        );
        assert_eq!(scenarios["optimistic"].heterogeneity, 0.0);
        assert_eq!(scenarios["realistic"].icc_noise_sd, 0.15);
        assert_eq!(scenarios["doomer"].residual_df, 5);
        assert_eq!(
            scenarios["doomer"].random_effect_dist,
            DistributionFamily::HeavyTailed
        );
    }

    #[test]
    fn parallel_mode_serializes_to_lowercase_tokens() {
        assert_eq!(
            serde_json::to_string(&ParallelMode::MixedModelsOnly).unwrap(),
            "\"mixedmodels\""
        );
        assert_eq!(serde_json::to_string(&ParallelMode::Off).unwrap(), "\"off\"");
    }
}
