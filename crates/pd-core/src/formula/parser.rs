//! Hand-rolled character-level parser for model formulas

use std::iter::Peekable;
use std::str::Chars;

use crate::formula::error::{FormulaError, FormulaResult};
use crate::formula::{ParsedFormula, RandomEffect, RandomEffectKind};

/// Formula parser
pub struct FormulaParser<'a> {
    chars: Peekable<Chars<'a>>,
    original: String,
    position: usize,
}

impl<'a> FormulaParser<'a> {
    /// Create a new parser
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            original: input.to_string(),
            position: 0,
        }
    }

    /// Parse a formula
    pub fn parse(formula: &str) -> FormulaResult<ParsedFormula> {
        let mut parser = FormulaParser::new(formula);
        parser.parse_formula()
    }

    fn parse_formula(&mut self) -> FormulaResult<ParsedFormula> {
        self.skip_whitespace();
        if self.chars.peek().is_none() {
            return Err(FormulaError::Empty);
        }

        let dep_var = self.parse_identifier()?;

        // Separator: '=' or '~'
        self.skip_whitespace();
        match self.next_char() {
            Some('=') | Some('~') => {}
            _ => return Err(FormulaError::MissingSeparator),
        }

        let mut predictors: Vec<String> = Vec::new();
        let mut random_effects: Vec<RandomEffect> = Vec::new();

        loop {
            self.skip_whitespace();
            if self.chars.peek().is_none() {
                break;
            }

            match self.peek_char() {
                Some('(') => {
                    let parsed = self.parse_random_group()?;
                    random_effects.extend(parsed);
                }
                Some(c) if c.is_ascii_digit() => {
                    // Bare intercept literal (0 or 1): consumed and ignored.
                    let literal = self.parse_digits();
                    if literal != "0" && literal != "1" {
                        return Err(FormulaError::syntax(
                            self.position,
                            format!("Unexpected numeric term '{}'", literal),
                        ));
                    }
                }
                Some(c) if c.is_alphabetic() => {
                    predictors.extend(self.parse_product_term()?);
                }
                Some(c) => {
                    return Err(FormulaError::syntax(
                        self.position,
                        format!("Unexpected character '{}' in term", c),
                    ));
                }
                None => break,
            }

            self.skip_whitespace();
            match self.peek_char() {
                Some('+') => {
                    self.next_char();
                    self.skip_whitespace();
                    if self.chars.peek().is_none() {
                        return Err(FormulaError::syntax(self.position, "Expected term after '+'"));
                    }
                }
                Some(c) => {
                    return Err(FormulaError::syntax(
                        self.position,
                        format!("Expected '+' between terms, found '{}'", c),
                    ));
                }
                None => break,
            }
        }

        // Deduplicate preserving first-occurrence order.
        let mut seen = std::collections::HashSet::new();
        predictors.retain(|p| seen.insert(p.clone()));

        Ok(ParsedFormula {
            dep_var,
            predictors,
            random_effects,
            original: self.original.clone(),
        })
    }

    /// Parse a fixed-effect term: a `:`-chain, optionally `*`-joined with
    /// further chains, in which case the star shorthand is expanded into
    /// main effects plus every interaction combination.
    fn parse_product_term(&mut self) -> FormulaResult<Vec<String>> {
        let mut segments = vec![self.parse_colon_chain()?];

        loop {
            self.skip_whitespace();
            if self.peek_char() == Some('*') {
                self.next_char();
                self.skip_whitespace();
                segments.push(self.parse_colon_chain()?);
            } else {
                break;
            }
        }

        if segments.len() == 1 {
            return Ok(segments);
        }
        Ok(expand_star(&segments))
    }

    /// Parse `a` or `a:b:c`
    fn parse_colon_chain(&mut self) -> FormulaResult<String> {
        let mut parts = vec![self.parse_identifier()?];
        loop {
            self.skip_whitespace();
            if self.peek_char() == Some(':') {
                self.next_char();
                self.skip_whitespace();
                parts.push(self.parse_identifier()?);
            } else {
                break;
            }
        }
        Ok(parts.join(":"))
    }

    /// Parse a parenthesized random-effect group.
    ///
    /// `(1|g)` random intercept; `(1|a/b)` nested intercepts; `(1 + x|g)`
    /// random slope on x.
    fn parse_random_group(&mut self) -> FormulaResult<Vec<RandomEffect>> {
        self.next_char(); // consume '('

        // Left of '|': intercept markers and slope variables.
        let mut slope_vars: Vec<String> = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek_char() {
                Some(c) if c.is_ascii_digit() => {
                    let literal = self.parse_digits();
                    if literal != "0" && literal != "1" {
                        return Err(FormulaError::random_effect(format!(
                            "unexpected literal '{}' before '|'",
                            literal
                        )));
                    }
                }
                Some(c) if c.is_alphabetic() => {
                    slope_vars.push(self.parse_identifier()?);
                }
                _ => {
                    return Err(FormulaError::random_effect(
                        "expected '1' or a slope variable before '|'",
                    ));
                }
            }
            self.skip_whitespace();
            match self.peek_char() {
                Some('+') => {
                    self.next_char();
                }
                Some('|') => break,
                Some(c) => {
                    return Err(FormulaError::random_effect(format!(
                        "unexpected '{}' before '|'",
                        c
                    )));
                }
                None => {
                    return Err(FormulaError::random_effect("unterminated random-effect term"));
                }
            }
        }
        self.next_char(); // consume '|'

        // Right of '|': grouping variable, optionally nested with '/'.
        self.skip_whitespace();
        let grouping = self.parse_identifier()?;
        self.skip_whitespace();
        let nested_child = if self.peek_char() == Some('/') {
            self.next_char();
            self.skip_whitespace();
            Some(self.parse_identifier()?)
        } else {
            None
        };

        self.skip_whitespace();
        match self.next_char() {
            Some(')') => {}
            _ => {
                return Err(FormulaError::random_effect(
                    "expected ')' closing random-effect term",
                ));
            }
        }

        match (nested_child, slope_vars.is_empty()) {
            (Some(child), true) => Ok(vec![
                RandomEffect {
                    kind: RandomEffectKind::RandomIntercept,
                    grouping_var: grouping.clone(),
                    slope_vars: Vec::new(),
                    parent_var: None,
                },
                RandomEffect {
                    kind: RandomEffectKind::RandomIntercept,
                    grouping_var: format!("{}:{}", grouping, child),
                    slope_vars: Vec::new(),
                    parent_var: Some(grouping),
                },
            ]),
            (Some(_), false) => Err(FormulaError::random_effect(
                "random slopes are not supported on nested groupings",
            )),
            (None, true) => Ok(vec![RandomEffect {
                kind: RandomEffectKind::RandomIntercept,
                grouping_var: grouping,
                slope_vars: Vec::new(),
                parent_var: None,
            }]),
            (None, false) => Ok(vec![RandomEffect {
                kind: RandomEffectKind::RandomSlope,
                grouping_var: grouping,
                slope_vars,
                parent_var: None,
            }]),
        }
    }

    /// Parse an identifier (letter start, then alphanumeric, '_' or '.')
    fn parse_identifier(&mut self) -> FormulaResult<String> {
        let start_pos = self.position;
        let mut ident = String::new();

        match self.next_char() {
            Some(c) if c.is_alphabetic() => ident.push(c),
            Some(c) => {
                return Err(FormulaError::syntax(
                    start_pos,
                    format!("Identifier must start with a letter, found '{}'", c),
                ));
            }
            None => {
                return Err(FormulaError::syntax(
                    start_pos,
                    "Unexpected end of input, expected identifier",
                ));
            }
        }

        while let Some(&c) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' || c == '.' {
                ident.push(c);
                self.next_char();
            } else {
                break;
            }
        }

        Ok(ident)
    }

    fn parse_digits(&mut self) -> String {
        let mut literal = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() {
                literal.push(c);
                self.next_char();
            } else {
                break;
            }
        }
        literal
    }

    fn skip_whitespace(&mut self) {
        while let Some(&c) = self.chars.peek() {
            if c.is_whitespace() {
                self.next_char();
            } else {
                break;
            }
        }
    }

    fn next_char(&mut self) -> Option<char> {
        let c = self.chars.next();
        if c.is_some() {
            self.position += 1;
        }
        c
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }
}

/// Expand `a*b*c` segments into main effects plus all `:` combinations,
/// ordered by combination size then left-to-right.
fn expand_star(segments: &[String]) -> Vec<String> {
    let mut result: Vec<String> = segments.to_vec();
    for size in 2..=segments.len() {
        combinations(segments, size, &mut result);
    }
    result
}

/// Push every `size`-combination of segments (lexicographic index order),
/// joined by ':'
fn combinations(segments: &[String], size: usize, result: &mut Vec<String>) {
    let n = segments.len();
    let mut indices: Vec<usize> = (0..size).collect();
    loop {
        result.push(
            indices
                .iter()
                .map(|&i| segments[i].as_str())
                .collect::<Vec<_>>()
                .join(":"),
        );
        // Advance to the next combination.
        let mut i = size;
        loop {
            if i == 0 {
                return;
            }
            i -= 1;
            if indices[i] != i + n - size {
                break;
            }
            if i == 0 {
                return;
            }
        }
        indices[i] += 1;
        for j in i + 1..size {
            indices[j] = indices[j - 1] + 1;
        }
    }
}
