//! Correlation pair keys and the data/user correlation reconciler
//!
//! Two correlation maps exist at any time: one derived from uploaded data,
//! one holding direct user edits. The reconciler owns both privately and is
//! the only place they are merged; the preservation mode decides how much of
//! the empirical structure wins.

use std::collections::BTreeSet;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Canonical key for an unordered variable pair: names sorted
/// alphabetically, joined by a comma.
pub fn pair_key(a: &str, b: &str) -> String {
    if a <= b {
        format!("{},{}", a, b)
    } else {
        format!("{},{}", b, a)
    }
}

/// Split a canonical pair key back into its two variable names
pub fn split_pair_key(key: &str) -> Option<(&str, &str)> {
    key.split_once(',')
}

/// How much of the dataset's empirical correlation structure is imposed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreservationMode {
    /// Data-backed pairs are locked to their empirical values
    Strict,
    /// Data values pre-fill the editor but user edits win
    #[default]
    Partial,
    /// Empirical structure is ignored entirely
    No,
}

impl fmt::Display for PreservationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PreservationMode::Strict => "strict",
            PreservationMode::Partial => "partial",
            PreservationMode::No => "no",
        };
        write!(f, "{}", s)
    }
}

/// Output of a reconciliation pass
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Reconciled {
    /// The canonical correlation map handed to the analysis engine
    pub canonical: IndexMap<String, f64>,
    /// Pair keys that are not user-editable
    pub locked: BTreeSet<String>,
    /// Whether the correlation editor is enabled at all
    pub enabled: bool,
}

/// State machine merging data-derived and user-edited correlations.
///
/// The two maps are private; external code mutates them only through
/// `set_data_derived` (profiler output) and `on_user_edit` (editor input).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CorrelationReconciler {
    data_derived: IndexMap<String, f64>,
    user_edits: IndexMap<String, f64>,
    mode: PreservationMode,
    data_backed: BTreeSet<String>,
}

impl CorrelationReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> PreservationMode {
        self.mode
    }

    /// Switch preservation mode.
    ///
    /// Entering partial mode prunes user edits that exactly equal the
    /// corresponding data value — an edit only counts as a user decision if
    /// it diverges from the data. Data-derived values are never discarded.
    pub fn set_mode(&mut self, mode: PreservationMode) {
        self.mode = mode;
        if mode == PreservationMode::Partial {
            let data = &self.data_derived;
            self.user_edits
                .retain(|key, value| data.get(key) != Some(&*value));
        }
    }

    /// Replace the data-derived map (written only by the profiler)
    pub fn set_data_derived(&mut self, correlations: IndexMap<String, f64>) {
        self.data_derived = correlations;
    }

    /// Replace the set of variables present as empirical-data columns
    pub fn set_data_backed(&mut self, variables: BTreeSet<String>) {
        self.data_backed = variables;
    }

    /// Replace the user-edit map wholesale (snapshot restore)
    pub fn set_user_edits(&mut self, correlations: IndexMap<String, f64>) {
        self.user_edits = correlations;
    }

    pub fn clear_user_edits(&mut self) {
        self.user_edits.clear();
    }

    fn is_data_backed_pair(&self, key: &str) -> bool {
        split_pair_key(key)
            .map(|(a, b)| self.data_backed.contains(a) || self.data_backed.contains(b))
            .unwrap_or(false)
    }

    /// Capture a single user edit according to the current mode
    pub fn on_user_edit(&mut self, a: &str, b: &str, value: f64) {
        let key = pair_key(a, b);
        match self.mode {
            PreservationMode::Partial => {
                // Only divergence from data is a real user edit.
                let data_value = self.data_derived.get(&key).copied().unwrap_or(0.0);
                if value != data_value {
                    self.user_edits.insert(key, value);
                } else {
                    self.user_edits.shift_remove(&key);
                }
            }
            PreservationMode::Strict => {
                if self.is_data_backed_pair(&key) {
                    log::debug!("ignoring edit to locked pair {}", key);
                    return;
                }
                if value != 0.0 {
                    self.user_edits.insert(key, value);
                } else {
                    self.user_edits.shift_remove(&key);
                }
            }
            PreservationMode::No => {
                self.user_edits.insert(key, value);
            }
        }
    }

    /// Merge the two maps for the given correlable variables.
    ///
    /// Strict mode with no data-backed variable behaves as fully disabled.
    pub fn reconcile(&self, variables: &[String]) -> Reconciled {
        match self.mode {
            PreservationMode::No => Reconciled {
                canonical: self.user_edits.clone(),
                locked: BTreeSet::new(),
                enabled: true,
            },
            PreservationMode::Partial => Reconciled {
                canonical: self.overlay(),
                locked: BTreeSet::new(),
                enabled: true,
            },
            PreservationMode::Strict => {
                let any_backed = variables.iter().any(|v| self.data_backed.contains(v));
                if !any_backed {
                    return Reconciled {
                        canonical: IndexMap::new(),
                        locked: BTreeSet::new(),
                        enabled: false,
                    };
                }
                let mut locked = BTreeSet::new();
                for (i, a) in variables.iter().enumerate() {
                    for b in variables.iter().skip(i + 1) {
                        if self.data_backed.contains(a) || self.data_backed.contains(b) {
                            locked.insert(pair_key(a, b));
                        }
                    }
                }
                Reconciled {
                    canonical: self.overlay(),
                    locked,
                    enabled: true,
                }
            }
        }
    }

    /// Data-derived values overlaid by user edits (user wins on conflict)
    fn overlay(&self) -> IndexMap<String, f64> {
        let mut merged = self.data_derived.clone();
        for (key, value) in &self.user_edits {
            merged.insert(key.clone(), *value);
        }
        merged
    }
}
