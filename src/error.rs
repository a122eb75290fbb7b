//! Error types for scoped extraction.
//!
//! A single public error enum covers everything a caller can get wrong:
//! malformed scope input, sandbox failures, and missing handler
//! collaborators. Malformed HTML and invalid CSS selectors are not
//! errors; they quietly yield empty output or no matches.

/// Error type for extraction operations.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The scope argument could not be parsed or failed validation.
    #[error("invalid scope: {0}")]
    InvalidScope(String),

    /// A function scope failed: pre-validation, syntax error, thrown
    /// exception, or timeout.
    #[error("function scope failed: {0}")]
    FunctionScope(String),

    /// A `handler` scope could not be resolved because no handler
    /// collaborator is available or it did not recognize the id.
    #[error("handler lookup is not available")]
    HandlerUnavailable,
}

/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractError>;
