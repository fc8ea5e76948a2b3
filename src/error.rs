use crate::domain::models::booking::StatusPair;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Resource not found: {0}")]
    NotFound(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Cannot {action} booking in state {current}")]
    InvalidStateTransition {
        action: &'static str,
        current: StatusPair,
    },
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("External service failure: {0}")]
    ExternalService(String),
    #[error("External data inconsistency: {0}")]
    ExternalInconsistency(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Errors that never reach the caller of a lifecycle action; they are
    /// logged where they occur and the committed transition stands.
    pub fn is_absorbed(&self) -> bool {
        matches!(self, AppError::ExternalService(_) | AppError::ExternalInconsistency(_))
    }

    pub fn is_unique_violation(&self) -> bool {
        if let AppError::Database(e) = self
            && let Some(db_err) = e.as_database_error()
        {
            let code = db_err.code().unwrap_or_default();
            // 2067 = SQLite Unique Constraint
            // 23505 = PostgreSQL Unique Violation
            return code == "2067" || code == "23505";
        }
        false
    }
}

pub(crate) fn db_error(e: sqlx::Error) -> AppError {
    error!("Database error: {:?}", e);
    AppError::Database(e)
}
