use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::auth::credentials::CredentialError;

/// AppError
///
/// Request-terminating failures. Each variant maps to one HTTP status in `into_response`.
#[derive(Debug, Error)]
pub enum AppError {
    /// The caller is not allowed to perform a privileged operation.
    #[error("forbidden")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    /// A required form field was blank after sanitization.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource already exists (e.g. a post with the same title).
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("session error: {0}")]
    Session(#[from] jsonwebtoken::errors::Error),
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;

impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict(db.constraint().unwrap_or("unique constraint").to_string())
            }
            _ => AppError::Database(error),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Credential(_) | AppError::Session(_) => {
                tracing::error!(error = %self, "request failed");
                return (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response();
            }
        };
        (status, self.to_string()).into_response()
    }
}
