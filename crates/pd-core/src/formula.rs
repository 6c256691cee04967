//! Model formula parsing
//!
//! This module parses the formula syntax used by the power-analysis engine:
//! `score = study_hours + received_help + study_hours:received_help` with
//! optional random-effect groups such as `(1|school)`, `(1|school/classroom)`
//! and `(1 + x1|school)`. Both `=` and `~` separate the dependent variable
//! from the right-hand side. `a*b` shorthand is pre-expanded into main
//! effects plus all interaction combinations.

pub mod error;
mod parser;


use serde::{Deserialize, Serialize};

pub use error::{FormulaError, FormulaResult};
pub use parser::FormulaParser;

/// Kind of a parsed random-effect descriptor
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RandomEffectKind {
    RandomIntercept,
    RandomSlope,
}

/// One random-effect term parsed from the formula.
///
/// Nested groups `(1|a/b)` produce two descriptors: the parent intercept on
/// `a`, and a child on `a:b` with `parent_var` set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RandomEffect {
    #[serde(rename = "type")]
    pub kind: RandomEffectKind,
    pub grouping_var: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub slope_vars: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_var: Option<String>,
}

/// A successfully parsed model formula
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParsedFormula {
    /// Dependent variable (left-hand side)
    pub dep_var: String,
    /// Ordered fixed-effect predictors, `*` shorthand already expanded and
    /// duplicates removed (first occurrence wins)
    pub predictors: Vec<String>,
    /// Random-effect descriptors, nested groups split into parent and child
    pub random_effects: Vec<RandomEffect>,
    /// Original formula string
    pub original: String,
}

impl ParsedFormula {
    /// Parse a formula from a string
    pub fn parse(formula: &str) -> FormulaResult<Self> {
        FormulaParser::parse(formula)
    }

    /// Predictors excluding `:`-joined interaction terms
    pub fn base_predictors(&self) -> Vec<String> {
        self.predictors
            .iter()
            .filter(|p| !p.contains(':'))
            .cloned()
            .collect()
    }
}

impl std::str::FromStr for ParsedFormula {
    type Err = FormulaError;

    fn from_str(s: &str) -> FormulaResult<Self> {
        ParsedFormula::parse(s)
    }
}

/// Build the canonical formula string for an ANOVA model: the dependent
/// variable, each factor as a main effect, then the selected interactions.
pub fn build_anova_formula(dep_var: &str, factors: &[String], interactions: &[String]) -> String {
    let mut terms: Vec<&str> = factors.iter().map(String::as_str).collect();
    terms.extend(interactions.iter().map(String::as_str));
    if terms.is_empty() {
        return String::new();
    }
    format!("{} = {}", dep_var, terms.join(" + "))
}
