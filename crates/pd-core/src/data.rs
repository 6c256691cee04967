//! Empirical dataset handling for powerdesk
//!
//! This module provides the column-oriented dataset uploaded by the user and
//! the profiler that infers variable types and pairwise correlations from it.

mod dataset;
mod profile;


// Re-exports
pub use dataset::{DataValue, Dataset};
pub use profile::{
    data_correlations, detect_anova_factors, profile_column, profile_dataset, ColumnProfile,
    DetectionMode,
};

/// Type alias matching the numeric layer used throughout the crate
pub type FloatArray = ndarray::Array1<f64>;

/// Error types specific to dataset operations
#[derive(thiserror::Error, Debug)]
pub enum DataError {
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: String, actual: String },

    #[error("Duplicate column name: {0}")]
    DuplicateColumn(String),
}

/// Result type for dataset operations
pub type Result<T> = std::result::Result<T, DataError>;
