use thiserror::Error;

/// Errors raised below the database layer.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Malformed client input, such as a non-numeric query parameter.
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(&'static str),
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
