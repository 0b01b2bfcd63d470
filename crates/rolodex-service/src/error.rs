use std::collections::BTreeMap;

use thiserror::Error;

/// Service layer errors - combines all error types
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    DatabaseError(#[from] rolodex_db::error::DbError),

    #[error(transparent)]
    CoreError(#[from] rolodex_core::error::CoreError),

    #[error("Diesel error: {0}")]
    DieselError(#[from] diesel::result::Error),

    #[error("One or more validation errors occurred.")]
    Validation(ValidationErrors),

    /// An operation refused with per-field reasons, such as a failed
    /// registration.
    #[error("{message}")]
    Rejected {
        message: String,
        errors: ValidationErrors,
    },

    /// A malformed request that is not tied to a single field.
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Capacity exceeded: {0}")]
    CapacityExceeded(String),

    #[error("{0}")]
    InvalidCredentials(String),

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl ServiceError {
    /// Wraps collected field errors under a summary message.
    #[must_use]
    pub fn rejected(message: impl Into<String>, errors: ValidationErrors) -> Self {
        Self::Rejected {
            message: message.into(),
            errors,
        }
    }

    /// Shorthand for a validation failure on a single field.
    #[must_use]
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::default();
        errors.add(field, message);
        Self::Validation(errors)
    }
}

/// Returned when the id in the URL and the id in the body disagree.
pub const ID_MISMATCH: &str = "The id in the URL does not match the id in the body.";

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Field name to messages, rendered as the `errors` object of a 400 response.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_owned())
            .or_default()
            .push(message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// ## Summary
    /// Converts the collected messages into a result.
    ///
    /// ## Errors
    /// Returns [`ServiceError::Validation`] if any message was added.
    pub fn into_result(self) -> ServiceResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::Validation(self))
        }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}
