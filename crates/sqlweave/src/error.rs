//! Error types for sqlweave

use thiserror::Error;

/// Result type alias for sqlweave operations
pub type QbResult<T> = Result<T, QbError>;

/// Errors raised while building or compiling a query.
///
/// None of these are retryable: they describe a query that cannot be turned
/// into SQL, and no SQL is produced when one is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QbError {
    /// No table statement was given to a query that needs one
    #[error("No table specified")]
    NoTableSpecified,

    /// A write statement was compiled without any data
    #[error("No data given")]
    NoDataGiven,

    /// Binding kind is missing or not one of string/bool/int/float/json
    #[error("Invalid binding kind: {0}")]
    InvalidBindingKind(String),

    /// String does not follow the `column->node->node` grammar
    #[error("Invalid JSON selector: {0}")]
    InvalidJsonSelector(String),

    /// Criteria statement shape does not match any compilation branch
    #[error("Malformed criteria: {0}")]
    MalformedCriteria(String),

    /// The query type cannot be compiled from the given statements
    #[error("Unsupported query type: {0}")]
    UnsupportedQueryType(String),

    /// A statement failed its construction-time validation
    #[error("Invalid statement: {0}")]
    InvalidStatement(String),

    /// Error reported by an executor
    #[error("Execution error: {0}")]
    Execution(String),

    /// Compiler configuration could not be parsed
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl QbError {
    /// Create a malformed criteria error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedCriteria(message.into())
    }

    /// Create an invalid statement error
    pub fn invalid_statement(message: impl Into<String>) -> Self {
        Self::InvalidStatement(message.into())
    }

    /// Create an execution error
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Check if this error came from the executor rather than the compiler
    pub fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }
}
