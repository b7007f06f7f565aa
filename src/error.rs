//! Error handling for NEAD read and write operations.
//!
//! Every failure is fatal to the operation that raised it: a read either
//! yields a complete [`Dataset`](crate::Dataset) or one of these errors, and a
//! write either replaces the output file or leaves it untouched.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NeadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Malformed header at line {line}: {reason}")]
    MalformedHeader { line: usize, reason: String },

    #[error("Missing required header attribute '{name}'")]
    MissingRequiredAttribute { name: String },

    #[error("Attribute '{name}' has {found} values but {expected} fields are declared")]
    VectorLengthMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("Malformed data row at line {line}: {reason}")]
    MalformedRow { line: usize, reason: String },

    #[error("Unit conversion not possible for column '{column}': {reason}")]
    MissingUnitMetadata { column: String, reason: String },

    #[error("Index column position {position} is out of range for {count} columns")]
    IndexOutOfRange { position: usize, count: usize },

    #[error("Date/time parsing failed for column '{column}' value '{value}'")]
    DateTimeParsing {
        column: String,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Field '{field}' is declared in the header but missing from the table")]
    MissingField { field: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl NeadError {
    pub(crate) fn malformed_header(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedHeader {
            line,
            reason: reason.into(),
        }
    }

    pub(crate) fn missing_attribute(name: impl Into<String>) -> Self {
        Self::MissingRequiredAttribute { name: name.into() }
    }

    pub(crate) fn missing_unit_metadata(
        column: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::MissingUnitMetadata {
            column: column.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, NeadError>;
