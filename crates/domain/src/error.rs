//! Domain error types.

use common::{Classify, ErrorKind, OrderId};
use thiserror::Error;

use crate::order::{OrderNumber, OrderStatus};

/// A status change that is not in the transition table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid status transition: {from} -> {to}")]
pub struct TransitionError {
    pub from: &'static str,
    pub to: &'static str,
}

impl Classify for TransitionError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidTransition
    }
}

/// An unknown status name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown status: {0}")]
pub struct ParseStatusError(pub String);

impl Classify for ParseStatusError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidArgument
    }
}

/// A malformed order draft.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid {field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

impl Classify for ValidationError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidArgument
    }
}

/// Errors that can occur when interacting with the order store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No order with this id.
    #[error("Order not found: {0}")]
    NotFound(OrderId),

    /// The conditional status update found the order in another status.
    #[error("Order {order_id} is {actual}, expected {expected}")]
    StatusConflict {
        order_id: OrderId,
        expected: OrderStatus,
        actual: OrderStatus,
    },

    /// Another order already carries this number.
    #[error("Duplicate order number: {0}")]
    DuplicateOrderNumber(OrderNumber),

    /// A stored row could not be mapped back to the domain.
    #[error("Corrupt order row: {0}")]
    Corrupt(String),

    /// The store could not be reached.
    #[error("Order store unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl Classify for StoreError {
    fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::StatusConflict { .. } => ErrorKind::InvalidTransition,
            StoreError::Unavailable(_) => ErrorKind::Unavailable,
            StoreError::DuplicateOrderNumber(_)
            | StoreError::Corrupt(_)
            | StoreError::Database(_)
            | StoreError::Migration(_) => ErrorKind::Internal,
        }
    }
}

impl From<ParseStatusError> for StoreError {
    fn from(e: ParseStatusError) -> Self {
        StoreError::Corrupt(e.to_string())
    }
}

/// Result type for order store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
