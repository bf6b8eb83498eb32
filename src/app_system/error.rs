use thiserror::Error;

use crate::order_actor::OrderError;
use crate::product_actor::ProductError;
use crate::user_actor::UserError;

/// Errors that can occur while issuing sequence values.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SequenceError {
    #[error("Sequence {0} is exhausted")]
    Exhausted(String),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

/// Any failure a caller of the system can see.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AppError {
    #[error(transparent)]
    User(#[from] UserError),
    #[error(transparent)]
    Product(#[from] ProductError),
    #[error(transparent)]
    Order(#[from] OrderError),
    #[error(transparent)]
    Sequence(#[from] SequenceError),
    #[error("System shutdown failed: {0}")]
    Shutdown(String),
}
