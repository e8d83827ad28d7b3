//! Typed input-validation faults raised by the loader, cleaner and segmenter

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    #[error("Input is missing required column '{0}'")]
    MissingColumn(String),

    #[error("Line {line}: column '{column}' must not be empty")]
    MissingValue { line: usize, column: &'static str },

    #[error("Line {line}: invalid {column} value '{value}'")]
    InvalidNumber {
        line: usize,
        column: &'static str,
        value: String,
    },

    #[error("Line {line}: invalid SeniorCitizen flag '{value}'")]
    InvalidFlag { line: usize, value: String },

    #[error("Line {line}: churn label must be 'Yes' or 'No', got '{value}'")]
    InvalidChurnLabel { line: usize, value: String },

    #[error("TotalCharges has no numeric values to compute a median from")]
    NoTotalCharges,

    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),
}
