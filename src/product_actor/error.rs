use thiserror::Error;

use crate::actor_framework::FrameworkError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProductError {
    #[error("Product not found: {0}")]
    NotFound(String),
    #[error("Product {0} is no longer available")]
    Inactive(String),
    #[error("Insufficient stock for {name}. Available: {available}, Requested: {requested}")]
    InsufficientStock { name: String, available: u32, requested: u32 },
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Could not allocate a SKU: {0}")]
    SkuAllocation(String),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<FrameworkError> for ProductError {
    fn from(err: FrameworkError) -> Self {
        match err {
            FrameworkError::NotFound { id, .. } => ProductError::NotFound(id),
            FrameworkError::Rejected(msg) => ProductError::ValidationError(msg),
            other => ProductError::ActorCommunicationError(other.to_string()),
        }
    }
}
