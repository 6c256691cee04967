//! Formula-specific error types
//!
//! Parse failures are recoverable validation errors: the editing surface
//! reports them inline and treats the formula as unset until corrected.

use thiserror::Error;

/// Errors that can occur while parsing a model formula
#[derive(Debug, Error, PartialEq)]
pub enum FormulaError {
    /// Syntax errors in the formula string
    #[error("Syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },

    /// Empty formula text
    #[error("Empty formula")]
    Empty,

    /// Missing `=` or `~` between dependent variable and predictors
    #[error("Expected '=' or '~' after dependent variable")]
    MissingSeparator,

    /// A random-effect group that cannot be interpreted
    #[error("Invalid random-effect term: {message}")]
    InvalidRandomEffect { message: String },
}

impl FormulaError {
    /// Create a syntax error at a position
    pub fn syntax(position: usize, message: impl Into<String>) -> Self {
        FormulaError::Syntax {
            position,
            message: message.into(),
        }
    }

    /// Create a random-effect error
    pub fn random_effect(message: impl Into<String>) -> Self {
        FormulaError::InvalidRandomEffect {
            message: message.into(),
        }
    }
}

/// Result type alias for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;
