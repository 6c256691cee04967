//! Predictor expansion into dummy-coded model terms
//!
//! Takes the ordered raw predictor list plus the type registry and produces
//! the ordered expanded term list consumed by the effects editor and the
//! analysis request builder. Expansion is deterministic: level order follows
//! `level_labels` when present, ascending integer index otherwise, and
//! predictor order is never reordered.

use indexmap::IndexMap;

use crate::variable::{TypeRegistry, VariableType};

/// One dummy-coded output term
#[derive(Clone, Debug, PartialEq)]
pub struct ExpandedTerm {
    /// Display name, e.g. `origin[Japan]` or `origin[Japan]:hp`
    pub display_name: String,
    /// "continuous" | "binary" | "factor"
    pub underlying_type: &'static str,
    /// The raw predictor this term was expanded from
    pub source_predictor: String,
}

/// Ordered expansion result
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Expansion {
    pub terms: Vec<ExpandedTerm>,
}

impl Expansion {
    /// Expanded display names in order
    pub fn names(&self) -> Vec<String> {
        self.terms.iter().map(|t| t.display_name.clone()).collect()
    }

    /// Parallel map from expanded name to underlying type tag
    pub fn type_map(&self) -> IndexMap<String, &'static str> {
        self.terms
            .iter()
            .map(|t| (t.display_name.clone(), t.underlying_type))
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.terms.iter().any(|t| t.display_name == name)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Expand predictors left-to-right into dummy-coded terms.
///
/// `reference_overrides` maps a factor name to an explicit reference level
/// (ANOVA mode); when absent the reference is the first label, or level 1
/// for label-less factors.
pub fn expand(
    predictors: &[String],
    registry: &TypeRegistry,
    reference_overrides: Option<&IndexMap<String, String>>,
) -> Expansion {
    let mut terms = Vec::new();
    for name in predictors {
        if name.contains(':') {
            expand_interaction(name, registry, reference_overrides, &mut terms);
        } else {
            expand_single(name, registry, reference_overrides, &mut terms);
        }
    }
    Expansion { terms }
}

/// Non-reference dummy suffixes for a factor, in deterministic level order
fn dummy_levels(
    name: &str,
    n_levels: usize,
    level_labels: Option<&Vec<String>>,
    reference_overrides: Option<&IndexMap<String, String>>,
) -> Vec<String> {
    match level_labels {
        Some(labels) if !labels.is_empty() => {
            let reference = reference_overrides
                .and_then(|overrides| overrides.get(name))
                .filter(|r| labels.contains(r))
                .cloned()
                .unwrap_or_else(|| labels[0].clone());
            labels
                .iter()
                .filter(|label| **label != reference)
                .cloned()
                .collect()
        }
        // Synthetic factor: level 1 is the reference, dummies 2..=n_levels.
        _ => (2..=n_levels).map(|lvl| lvl.to_string()).collect(),
    }
}

fn expand_single(
    name: &str,
    registry: &TypeRegistry,
    reference_overrides: Option<&IndexMap<String, String>>,
    terms: &mut Vec<ExpandedTerm>,
) {
    let variable_type = registry.lookup(name);
    match variable_type {
        VariableType::Factor {
            n_levels,
            level_labels,
            ..
        } => {
            for level in dummy_levels(name, *n_levels, level_labels.as_ref(), reference_overrides) {
                terms.push(ExpandedTerm {
                    display_name: format!("{}[{}]", name, level),
                    underlying_type: "factor",
                    source_predictor: name.to_string(),
                });
            }
        }
        _ => terms.push(ExpandedTerm {
            display_name: name.to_string(),
            underlying_type: variable_type.tag(),
            source_predictor: name.to_string(),
        }),
    }
}

fn expand_interaction(
    name: &str,
    registry: &TypeRegistry,
    reference_overrides: Option<&IndexMap<String, String>>,
    terms: &mut Vec<ExpandedTerm>,
) {
    let components: Vec<&str> = name.split(':').collect();
    let factor_positions: Vec<usize> = components
        .iter()
        .enumerate()
        .filter(|(_, comp)| registry.lookup(comp).is_factor())
        .map(|(idx, _)| idx)
        .collect();

    if factor_positions.is_empty() {
        terms.push(ExpandedTerm {
            display_name: name.to_string(),
            underlying_type: "continuous",
            source_predictor: name.to_string(),
        });
        return;
    }

    // Expand one factor component at a time, holding the other components at
    // their base name. The downstream engine expects this contract; it is
    // not a full Cartesian product across factor components.
    for &position in &factor_positions {
        let component = components[position];
        let (n_levels, level_labels) = match registry.lookup(component) {
            VariableType::Factor {
                n_levels,
                level_labels,
                ..
            } => (*n_levels, level_labels.as_ref()),
            _ => continue,
        };
        for level in dummy_levels(component, n_levels, level_labels, reference_overrides) {
            let mut parts: Vec<String> = components.iter().map(|c| c.to_string()).collect();
            parts[position] = format!("{}[{}]", component, level);
            terms.push(ExpandedTerm {
                display_name: parts.join(":"),
                underlying_type: "factor",
                source_predictor: name.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(entries: &[(&str, VariableType)]) -> TypeRegistry {
        entries
            .iter()
            .map(|(name, vt)| (name.to_string(), vt.clone()))
            .collect()
    }

    fn names(predictors: &[&str], registry: &TypeRegistry) -> Vec<String> {
        let predictors: Vec<String> = predictors.iter().map(|p| p.to_string()).collect();
        expand(&predictors, registry, None).names()
    }

    fn labelled_factor(labels: &[&str]) -> VariableType {
        VariableType::Factor {
            n_levels: labels.len(),
            proportions: vec![1.0 / labels.len() as f64; labels.len()],
            level_labels: Some(labels.iter().map(|l| l.to_string()).collect()),
        }
    }

    fn synthetic_factor(n_levels: usize) -> VariableType {
        VariableType::Factor {
            n_levels,
            proportions: vec![1.0 / n_levels as f64; n_levels],
            level_labels: None,
        }
    }

    #[test]
    fn continuous_and_binary_pass_through() {
        let reg = registry(&[
            ("x1", VariableType::Continuous),
            ("x2", VariableType::Binary { proportion: 0.5 }),
        ]);
        let expansion = expand(
            &["x1".to_string(), "x2".to_string()],
            &reg,
            None,
        );
        assert_eq!(expansion.names(), vec!["x1", "x2"]);
        assert_eq!(expansion.terms[0].underlying_type, "continuous");
        assert_eq!(expansion.terms[1].underlying_type, "binary");
    }

    #[test]
    fn labelled_factor_skips_reference() {
        let reg = registry(&[("origin", labelled_factor(&["Europe", "Japan", "USA"]))]);
        assert_eq!(
            names(&["origin"], &reg),
            vec!["origin[Japan]", "origin[USA]"]
        );
    }

    #[test]
    fn synthetic_factor_uses_integer_levels() {
        let reg = registry(&[("group", synthetic_factor(3))]);
        assert_eq!(names(&["group"], &reg), vec!["group[2]", "group[3]"]);
    }

    #[test]
    fn factor_with_k_levels_emits_k_minus_one_dummies() {
        for k in 2..=6 {
            let reg = registry(&[("f", synthetic_factor(k))]);
            assert_eq!(names(&["f"], &reg).len(), k - 1);
        }
    }

    #[test]
    fn interaction_expands_one_factor_at_a_time() {
        let reg = registry(&[
            ("origin", labelled_factor(&["Europe", "Japan", "USA"])),
            ("hp", VariableType::Continuous),
        ]);
        let expansion = expand(&["origin:hp".to_string()], &reg, None);
        assert_eq!(
            expansion.names(),
            vec!["origin[Japan]:hp", "origin[USA]:hp"]
        );
        assert!(expansion
            .terms
            .iter()
            .all(|t| t.underlying_type == "factor"));
        assert!(expansion
            .terms
            .iter()
            .all(|t| t.source_predictor == "origin:hp"));
    }

    #[test]
    fn interaction_of_two_factors_is_not_a_cartesian_product() {
        let reg = registry(&[
            ("a", labelled_factor(&["lo", "hi"])),
            ("b", synthetic_factor(3)),
        ]);
        // One dummy row per non-reference level per factor component.
        assert_eq!(
            names(&["a:b"], &reg),
            vec!["a[hi]:b", "a:b[2]", "a:b[3]"]
        );
    }

    #[test]
    fn interaction_without_factors_passes_through_as_continuous() {
        let reg = registry(&[
            ("x1", VariableType::Continuous),
            ("x2", VariableType::Continuous),
        ]);
        let expansion = expand(&["x1:x2".to_string()], &reg, None);
        assert_eq!(expansion.names(), vec!["x1:x2"]);
        assert_eq!(expansion.terms[0].underlying_type, "continuous");
    }

    #[test]
    fn unknown_predictor_defaults_to_continuous() {
        let reg = TypeRegistry::new();
        let expansion = expand(&["mystery".to_string()], &reg, None);
        assert_eq!(expansion.names(), vec!["mystery"]);
        assert_eq!(expansion.terms[0].underlying_type, "continuous");
    }

    #[test]
    fn expansion_is_idempotent() {
        let reg = registry(&[
            ("origin", labelled_factor(&["Europe", "Japan", "USA"])),
            ("hp", VariableType::Continuous),
        ]);
        let predictors = vec!["hp".to_string(), "origin".to_string(), "origin:hp".to_string()];
        let first = expand(&predictors, &reg, None);
        let second = expand(&predictors, &reg, None);
        assert_eq!(first, second);
        assert_eq!(first.names(), second.names());
    }

    #[test]
    fn reference_override_changes_emitted_levels() {
        let reg = registry(&[("origin", labelled_factor(&["Europe", "Japan", "USA"]))]);
        let overrides: IndexMap<String, String> =
            [("origin".to_string(), "USA".to_string())].into_iter().collect();
        let expansion = expand(&["origin".to_string()], &reg, Some(&overrides));
        assert_eq!(
            expansion.names(),
            vec!["origin[Europe]", "origin[Japan]"]
        );
    }

    #[test]
    fn reference_never_appears_as_a_term() {
        let reg = registry(&[("origin", labelled_factor(&["Europe", "Japan", "USA"]))]);
        let expansion = expand(&["origin".to_string()], &reg, None);
        assert!(!expansion.contains("origin[Europe]"));
    }
}
