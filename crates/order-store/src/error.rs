use common::OrderUid;
use thiserror::Error;

/// Errors that can occur when interacting with the order store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The order (or one of its required sub-records) was not found.
    #[error("Order not found: {0}")]
    NotFound(OrderUid),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The operation exceeded the store's configured timeout.
    #[error("Store operation timed out")]
    Timeout,

    /// The record violates an aggregate invariant and was rejected.
    #[error("Invalid order record: {0}")]
    InvalidRecord(String),
}

/// Result type for order store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
