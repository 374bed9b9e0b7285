//! Error types for Sitebook core operations

use thiserror::Error;

/// Validation errors raised before a request is ever built.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required parameter missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Required parameters missing: {}", fields.join(", "))]
    RequiredFieldsMissing { fields: Vec<String> },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ValidationError {
    /// Build from the list a filter reports as missing.
    pub fn missing(fields: &[&str]) -> Self {
        match fields {
            [single] => Self::RequiredFieldMissing {
                field: (*single).to_string(),
            },
            many => Self::RequiredFieldsMissing {
                fields: many.iter().map(|f| f.to_string()).collect(),
            },
        }
    }
}

/// Decimal money parsing errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Not a decimal amount: {value:?}")]
    NotDecimal { value: String },

    #[error("Amount out of range: {value}")]
    Overflow { value: String },
}

/// Selection persistence errors.
#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("Invalid site selection: {value:?}")]
    Invalid { value: String },

    #[error("Selection store IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Selection store serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Master error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Money error: {0}")]
    Money(#[from] MoneyError),

    #[error("Selection error: {0}")]
    Selection(#[from] SelectionError),
}

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
