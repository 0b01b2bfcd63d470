use salvo::http::StatusCode;
use salvo::writing::Json;
use salvo::{Depot, Request, Response, Writer, async_trait};
use serde::Serialize;
use thiserror::Error;

use rolodex_core::error::CoreError;
use rolodex_db::error::DbError;
use rolodex_service::error::{ServiceError, ValidationErrors};

const INTERNAL_ERROR_MESSAGE: &str = "An unexpected error occurred.";
const UNAVAILABLE_MESSAGE: &str = "The service is temporarily unavailable.";

/// Application-level errors (HTTP layer)
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    ServiceError(#[from] ServiceError),

    #[error(transparent)]
    DatabaseError(#[from] DbError),

    #[error(transparent)]
    CoreError(#[from] CoreError),

    /// A query string or body that could not be read.
    #[error("{0}")]
    BadRequest(String),
}

pub type AppResult<T> = std::result::Result<T, AppError>;

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<ValidationErrors>,
}

fn db_status(err: &DbError) -> StatusCode {
    match err {
        DbError::PoolError(_) => StatusCode::SERVICE_UNAVAILABLE,
        DbError::CoreError(core) => core_status(core),
        DbError::DatabaseError(_) | DbError::MigrationError(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn core_status(err: &CoreError) -> StatusCode {
    match err {
        CoreError::ValidationError(_) => StatusCode::BAD_REQUEST,
        CoreError::InvariantViolation(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn service_status(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::Validation(_)
        | ServiceError::Rejected { .. }
        | ServiceError::InvalidRequest(_)
        | ServiceError::Conflict(_)
        | ServiceError::CapacityExceeded(_)
        | ServiceError::InvalidCredentials(_)
        | ServiceError::InvalidToken => StatusCode::BAD_REQUEST,
        ServiceError::NotAuthenticated => StatusCode::UNAUTHORIZED,
        ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::DatabaseError(db) => db_status(db),
        ServiceError::CoreError(core) => core_status(core),
        ServiceError::DieselError(_) | ServiceError::InvalidConfiguration(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl AppError {
    /// ## Summary
    /// Returns the HTTP status this error is reported with.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ServiceError(err) => service_status(err),
            Self::DatabaseError(err) => db_status(err),
            Self::CoreError(err) => core_status(err),
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// ## Summary
    /// Builds the client-facing body. Details of server-side failures are
    /// replaced by a generic message.
    #[must_use]
    pub fn into_body(self) -> ErrorBody {
        let status = self.status_code();
        if status == StatusCode::SERVICE_UNAVAILABLE {
            return ErrorBody {
                message: UNAVAILABLE_MESSAGE.to_string(),
                errors: None,
            };
        }
        if status.is_server_error() {
            return ErrorBody {
                message: INTERNAL_ERROR_MESSAGE.to_string(),
                errors: None,
            };
        }

        match self {
            Self::ServiceError(ServiceError::Validation(errors)) => ErrorBody {
                message: ServiceError::Validation(ValidationErrors::default()).to_string(),
                errors: Some(errors),
            },
            Self::ServiceError(ServiceError::Rejected { message, errors }) => ErrorBody {
                message,
                errors: Some(errors),
            },
            Self::ServiceError(
                ServiceError::InvalidRequest(message)
                | ServiceError::NotFound(message)
                | ServiceError::Forbidden(message)
                | ServiceError::Conflict(message)
                | ServiceError::CapacityExceeded(message)
                | ServiceError::InvalidCredentials(message)
                | ServiceError::CoreError(CoreError::ValidationError(message)),
            )
            | Self::CoreError(CoreError::ValidationError(message))
            | Self::BadRequest(message) => ErrorBody {
                message,
                errors: None,
            },
            other => ErrorBody {
                message: other.to_string(),
                errors: None,
            },
        }
    }

    /// ## Summary
    /// Writes the status and JSON body of this error into `res`.
    ///
    /// ## Side Effects
    /// Logs server-side failures at `error` and client failures at `debug`.
    pub fn render_into(self, res: &mut Response) {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = ?self, status = %status, "Request failed");
        } else {
            tracing::debug!(error = %self, status = %status, "Request rejected");
        }

        res.status_code(status);
        res.render(Json(self.into_body()));
    }
}

#[async_trait]
impl Writer for AppError {
    async fn write(self, _req: &mut Request, _depot: &mut Depot, res: &mut Response) {
        self.render_into(res);
    }
}
