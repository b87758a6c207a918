//! Error types for rqb.
//!
//! SQL generation itself never fails. Errors only come from decoding query
//! records, parsing CLI shorthand, loading configuration and talking to the
//! database.

use thiserror::Error;

/// The main error type for rqb operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to parse a shorthand argument.
    #[error("Parse error at position {position}: {message}")]
    Parse { position: usize, message: String },

    /// Not one of the supported comparison operators.
    #[error("Invalid operator: '{0}'. Expected one of: =, !=, <, >, <=, >=, LIKE, IN, IS NULL, IS NOT NULL")]
    InvalidOperator(String),

    /// Not one of the supported aggregations.
    #[error("Invalid aggregation: '{0}'. Expected: COUNT, SUM, AVG, MIN, or MAX")]
    InvalidAggregation(String),

    /// Not ASC or DESC.
    #[error("Invalid sort direction: '{0}'. Expected: ASC or DESC")]
    InvalidDirection(String),

    /// Resolved SQL was blank.
    #[error("Query is empty")]
    EmptyQuery,

    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution error.
    #[error("Execution error: {0}")]
    Execution(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a parse error at the given position.
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            position,
            message: message.into(),
        }
    }
}

/// Result type alias for rqb operations.
pub type Result<T> = std::result::Result<T, Error>;
