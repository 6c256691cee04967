use crate::data::DataError;
use crate::formula::FormulaError;

#[derive(thiserror::Error, Debug)]
pub enum PowerdeskError {
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Formula error: {0}")]
    Formula(#[from] FormulaError),

    #[error("State error: {0}")]
    State(String),
}

pub type Result<T> = std::result::Result<T, PowerdeskError>;
