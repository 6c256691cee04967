//! Dataset structure holding uploaded empirical data
//!
//! A Dataset is a column-oriented table of raw values as read from a CSV
//! upload. Columns keep their entry order; values are either numeric or text.

use indexmap::IndexMap;

use super::{DataError, Result};

/// A single raw cell value from an uploaded dataset
#[derive(Clone, Debug, PartialEq)]
pub enum DataValue {
    /// Numeric value (NaN encodes a missing cell)
    Number(f64),
    /// Text value (the empty string encodes a missing cell)
    Text(String),
}

impl DataValue {
    /// Check whether this cell is missing
    pub fn is_missing(&self) -> bool {
        match self {
            DataValue::Number(v) => v.is_nan(),
            DataValue::Text(s) => s.is_empty(),
        }
    }

    /// Return the value as a float, if numeric and present
    pub fn as_number(&self) -> Option<f64> {
        match self {
            DataValue::Number(v) if !v.is_nan() => Some(*v),
            _ => None,
        }
    }

    /// Canonical display form used for level detection.
    ///
    /// A float equal to its own integer truncation renders as the integer
    /// string (`4.0` -> `"4"`), so `4` and `4.0` never produce two distinct
    /// factor levels. Returns `None` for missing cells.
    pub fn formatted(&self) -> Option<String> {
        match self {
            DataValue::Number(v) => {
                if v.is_nan() {
                    None
                } else if v.is_finite() && *v == v.trunc() {
                    Some(format!("{}", *v as i64))
                } else {
                    Some(format!("{}", v))
                }
            }
            DataValue::Text(s) => {
                if s.is_empty() {
                    None
                } else {
                    Some(s.clone())
                }
            }
        }
    }
}

impl From<f64> for DataValue {
    fn from(v: f64) -> Self {
        DataValue::Number(v)
    }
}

impl From<&str> for DataValue {
    fn from(s: &str) -> Self {
        DataValue::Text(s.to_string())
    }
}

/// A column-oriented dataset with ordered column names
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    columns: IndexMap<String, Vec<DataValue>>,
}

impl Dataset {
    /// Create an empty dataset
    pub fn new() -> Self {
        Self {
            columns: IndexMap::new(),
        }
    }

    /// Build a dataset from named columns, validating equal lengths
    pub fn from_columns<I, S>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<DataValue>)>,
        S: Into<String>,
    {
        let mut ds = Dataset::new();
        for (name, values) in columns {
            ds.insert_column(name.into(), values)?;
        }
        Ok(ds)
    }

    /// Add a column, validating its length against existing columns
    pub fn insert_column(&mut self, name: String, values: Vec<DataValue>) -> Result<()> {
        if self.columns.contains_key(&name) {
            return Err(DataError::DuplicateColumn(name));
        }
        if let Some(n) = self.columns.values().next().map(Vec::len) {
            if values.len() != n {
                return Err(DataError::DimensionMismatch {
                    expected: format!("{} rows", n),
                    actual: format!("{} rows", values.len()),
                });
            }
        }
        self.columns.insert(name, values);
        Ok(())
    }

    /// Number of rows (zero when no columns)
    pub fn n_rows(&self) -> usize {
        self.columns.values().next().map_or(0, Vec::len)
    }

    /// Number of columns
    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// Column names in entry order
    pub fn column_names(&self) -> Vec<String> {
        self.columns.keys().cloned().collect()
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> Option<&[DataValue]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// Check if a column exists
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Names of columns without any missing values.
    ///
    /// Only these columns are offered for quick-add in the editing surface;
    /// the profiler itself still runs on every column.
    pub fn complete_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|(_, values)| !values.iter().any(DataValue::is_missing))
            .map(|(name, _)| name.clone())
            .collect()
    }
}
