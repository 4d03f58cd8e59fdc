//! Domain errors for the trial simulation engine.

use thiserror::Error;
use uuid::Uuid;

/// Domain-level errors that can occur while orchestrating a trial session.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Case not found: {0}")]
    CaseNotFound(String),

    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("An invocation is already in flight for this session")]
    InvocationInFlight,

    #[error("Case has not been accepted yet")]
    CaseNotAccepted,

    #[error("Generation backend error: {0}")]
    Backend(String),

    #[error("Invocation cancelled by session reset")]
    Cancelled,

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    /// Whether the caller may simply retry the same operation.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DomainError::Backend(_) | DomainError::DatabaseError(_)
        )
    }
}

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}
