use thiserror::Error;

use crate::actor_framework::FrameworkError;

/// Errors that can occur during account operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum UserError {
    #[error("User not found: {0}")]
    NotFound(String),
    #[error("User with this email already exists")]
    AlreadyExists(String),
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Account is deactivated")]
    Inactive,
    #[error("Password hashing failed: {0}")]
    PasswordHash(String),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<FrameworkError> for UserError {
    fn from(err: FrameworkError) -> Self {
        match err {
            FrameworkError::NotFound { id, .. } => UserError::NotFound(id),
            FrameworkError::AlreadyExists { key, .. } => UserError::AlreadyExists(key),
            FrameworkError::Rejected(msg) => UserError::ValidationError(msg),
            other => UserError::ActorCommunicationError(other.to_string()),
        }
    }
}
