//! Cluster configuration for random-effect groupings
//!
//! Every random-effect grouping variable carries one `ClusterConfig` that the
//! editing surface exposes: intraclass correlation, cluster count (or
//! per-parent count for nested groupings) and, for random slopes, the slope
//! variance parameters. Rebuilding the config list after a formula edit
//! preserves the user's settings for groupings that survive the edit.

use serde::{Deserialize, Serialize};

use crate::formula::{RandomEffect, RandomEffectKind};

pub const DEFAULT_ICC: f64 = 0.2;
pub const DEFAULT_N_CLUSTERS: u32 = 20;
pub const DEFAULT_N_PER_PARENT: u32 = 3;
pub const DEFAULT_SLOPE_VARIANCE: f64 = 0.1;
pub const DEFAULT_SLOPE_INTERCEPT_CORR: f64 = 0.0;

/// How the number of groups is specified.
///
/// Top-level groupings count clusters directly; nested child groupings count
/// children per parent cluster. Exactly one of the two applies, so the
/// serialized form carries exactly one of the keys.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterSize {
    NClusters(u32),
    NPerParent(u32),
}

/// Simulation parameters for one random-effect grouping
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub grouping_var: String,
    pub icc: f64,
    #[serde(flatten)]
    pub size: ClusterSize,
    /// Present only for random-slope groupings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slope_variance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slope_intercept_corr: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub slope_vars: Vec<String>,
    /// Parent grouping for nested child groupings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_var: Option<String>,
}

impl ClusterConfig {
    /// Default configuration for a freshly parsed random effect
    pub fn from_random_effect(effect: &RandomEffect) -> Self {
        let size = if effect.parent_var.is_some() {
            ClusterSize::NPerParent(DEFAULT_N_PER_PARENT)
        } else {
            ClusterSize::NClusters(DEFAULT_N_CLUSTERS)
        };
        let has_slopes = effect.kind == RandomEffectKind::RandomSlope;
        ClusterConfig {
            grouping_var: effect.grouping_var.clone(),
            icc: DEFAULT_ICC,
            size,
            slope_variance: has_slopes.then_some(DEFAULT_SLOPE_VARIANCE),
            slope_intercept_corr: has_slopes.then_some(DEFAULT_SLOPE_INTERCEPT_CORR),
            slope_vars: effect.slope_vars.clone(),
            parent_var: effect.parent_var.clone(),
        }
    }

    pub fn is_nested_child(&self) -> bool {
        self.parent_var.is_some()
    }

    pub fn has_slopes(&self) -> bool {
        !self.slope_vars.is_empty()
    }
}

/// Rebuild the cluster-config list for a new set of random effects.
///
/// Groupings already configured keep their numeric settings (structure still
/// follows the new effect); groupings that disappeared are dropped, new ones
/// get defaults. Output order follows the random-effect order.
pub fn build_cluster_configs(
    effects: &[RandomEffect],
    previous: &[ClusterConfig],
) -> Vec<ClusterConfig> {
    effects
        .iter()
        .map(|effect| {
            let mut config = ClusterConfig::from_random_effect(effect);
            if let Some(prior) = previous.iter().find(|c| c.grouping_var == effect.grouping_var) {
                config.icc = prior.icc;
                // Size carries over only when the nesting shape is unchanged.
                match (config.size, prior.size) {
                    (ClusterSize::NClusters(_), ClusterSize::NClusters(n)) => {
                        config.size = ClusterSize::NClusters(n);
                    }
                    (ClusterSize::NPerParent(_), ClusterSize::NPerParent(n)) => {
                        config.size = ClusterSize::NPerParent(n);
                    }
                    _ => {}
                }
                if config.slope_variance.is_some() && prior.slope_variance.is_some() {
                    config.slope_variance = prior.slope_variance;
                    config.slope_intercept_corr = prior.slope_intercept_corr;
                }
            }
            config
        })
        .collect()
}
