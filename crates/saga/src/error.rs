//! Order orchestration error types.

use common::{Classify, ErrorKind, OrderId, PagingError, ProductId};
use domain::{OrderStatus, StoreError, TransitionError, ValidationError};
use inventory::InventoryError;
use thiserror::Error;

/// Errors that can occur during order orchestration.
#[derive(Debug, Error)]
pub enum OrderingError {
    /// The order draft failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// An argument other than the draft was malformed.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Stock could not be deducted for one line of the order.
    #[error("Cannot reserve product {product_id}: {source}")]
    Stock {
        product_id: ProductId,
        #[source]
        source: InventoryError,
    },

    /// The status is only reachable through its own saga step.
    #[error("Status {0} cannot be set directly")]
    ReservedStatus(OrderStatus),

    /// Order not found, or not visible to the caller.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The requested status change is not in the transition table.
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// The order store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Invalid paging parameters.
    #[error(transparent)]
    Paging(#[from] PagingError),
}

impl Classify for OrderingError {
    fn kind(&self) -> ErrorKind {
        match self {
            OrderingError::Validation(_)
            | OrderingError::InvalidArgument(_)
            | OrderingError::ReservedStatus(_)
            | OrderingError::Paging(_) => ErrorKind::InvalidArgument,
            OrderingError::Stock { source, .. } => source.kind(),
            OrderingError::OrderNotFound(_) => ErrorKind::NotFound,
            OrderingError::Transition(_) => ErrorKind::InvalidTransition,
            OrderingError::Store(e) => e.kind(),
        }
    }
}

/// Convenience type alias for orchestration results.
pub type Result<T> = std::result::Result<T, OrderingError>;
