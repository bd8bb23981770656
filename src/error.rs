//! Error types for lambdaql.

use thiserror::Error;

/// The main error type for lambdaql operations.
///
/// Errors are `Clone` so a descriptor can keep the failure of a bad fragment
/// and report it on every `compile()` until the clause is replaced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    /// A predicate, selector or key fragment could not be parsed.
    #[error("Parse error at position {position} in `{fragment}`: {message}")]
    Parse {
        fragment: String,
        position: usize,
        message: String,
    },

    /// Operator present in the tree but absent from the SQL mapping table.
    #[error("Unsupported operator: '{0}'")]
    UnsupportedOperator(String),

    /// Method call outside the supported vocabulary.
    #[error("Unsupported call: {name}() ({reason})")]
    UnsupportedCall { name: String, reason: String },

    /// Structurally valid tree that has no SQL rendering.
    #[error("Invalid expression: {0}")]
    InvalidExpression(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Execution error: {0}")]
    Execution(String),
}

impl QueryError {
    /// Create a parse error for `fragment` at the given byte position.
    pub fn parse(fragment: impl Into<String>, position: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            fragment: fragment.into(),
            position,
            message: message.into(),
        }
    }

    /// Create an unsupported call error.
    pub fn unsupported_call(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsupportedCall {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }
}

/// Result type alias for lambdaql operations.
pub type QueryResult<T> = Result<T, QueryError>;
