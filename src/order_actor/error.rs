use std::fmt::Display;

use thiserror::Error;
use tracing::error;

use crate::actor_framework::FrameworkError;
use crate::app_system::SequenceError;
use crate::product_actor::ProductError;

/// Errors that can occur during order operations.
///
/// Everything except `Internal` is detected before any mutation and carries
/// enough detail for the caller to fix the request.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrderError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    ValidationError(String),
    #[error("Insufficient stock for {product_name}. Available: {available}, Requested: {requested}")]
    InsufficientStock {
        product_name: String,
        available: u32,
        requested: u32,
    },
    #[error("An internal error occurred")]
    Internal,
}

impl OrderError {
    pub fn order_not_found(order_id: &str) -> Self {
        OrderError::NotFound(format!("Order {order_id} not found"))
    }

    pub fn product_not_found(sku: &str) -> Self {
        OrderError::NotFound(format!("Product with SKU {sku} not found"))
    }

    /// Log an unexpected failure and hide it behind a generic error.
    pub fn internal(context: &str, cause: impl Display) -> Self {
        error!(%cause, context, "Unexpected failure during order processing");
        OrderError::Internal
    }
}

impl From<ProductError> for OrderError {
    fn from(err: ProductError) -> Self {
        match err {
            ProductError::NotFound(sku) | ProductError::Inactive(sku) => OrderError::product_not_found(&sku),
            ProductError::InsufficientStock { name, available, requested } => OrderError::InsufficientStock {
                product_name: name,
                available,
                requested,
            },
            ProductError::ValidationError(msg) => OrderError::ValidationError(msg),
            other => OrderError::internal("product store", other),
        }
    }
}

impl From<FrameworkError> for OrderError {
    fn from(err: FrameworkError) -> Self {
        match err {
            FrameworkError::NotFound { id, .. } => OrderError::order_not_found(&id),
            FrameworkError::Rejected(msg) => OrderError::ValidationError(msg),
            other => OrderError::internal("order store", other),
        }
    }
}

impl From<SequenceError> for OrderError {
    fn from(err: SequenceError) -> Self {
        OrderError::internal("sequence generator", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_message() {
        let err = OrderError::InsufficientStock {
            product_name: "P".into(),
            available: 2,
            requested: 3,
        };
        assert_eq!(err.to_string(), "Insufficient stock for P. Available: 2, Requested: 3");
    }

    #[test]
    fn test_product_errors_map_to_order_taxonomy() {
        assert_eq!(
            OrderError::from(ProductError::Inactive("PROD00009".into())),
            OrderError::NotFound("Product with SKU PROD00009 not found".into())
        );
        assert_eq!(
            OrderError::from(ProductError::ActorCommunicationError("Actor closed".into())),
            OrderError::Internal
        );
        assert_eq!(OrderError::Internal.to_string(), "An internal error occurred");
    }
}
