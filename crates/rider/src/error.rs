//! Rider service error types.

use common::{Classify, ErrorKind, OrderId, PagingError, RiderId, ServiceError};
use domain::{DeliveryStatus, OrderStatus, ParseStatusError, TransitionError};
use thiserror::Error;

/// Errors that can occur in the rider service.
#[derive(Debug, Error)]
pub enum RiderError {
    /// No rider with this id.
    #[error("Rider not found: {0}")]
    RiderNotFound(RiderId),

    /// The rider is offline and cannot take orders.
    #[error("Rider {0} is offline")]
    Offline(RiderId),

    /// No delivery assignment exists for the order.
    #[error("No delivery assignment for order {0}")]
    AssignmentNotFound(OrderId),

    /// Another rider claimed the order first.
    #[error("Order {0} is already claimed by a rider")]
    AlreadyClaimed(OrderId),

    /// The assignment belongs to another rider, or to none.
    #[error("Order {order_id} not found for rider {rider_id}")]
    NotAssigned { rider_id: RiderId, order_id: OrderId },

    /// The order is not in the status this step requires.
    #[error("Order {order_id} is {actual}, expected {expected}")]
    OrderNotReady {
        order_id: OrderId,
        expected: OrderStatus,
        actual: OrderStatus,
    },

    /// The conditional sub-status update found the assignment elsewhere.
    #[error("Delivery for order {order_id} is {actual}, expected {expected}")]
    StatusConflict {
        order_id: OrderId,
        expected: DeliveryStatus,
        actual: DeliveryStatus,
    },

    /// The delivery sub-status cannot move this way.
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// Malformed input.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A rider or delivery store could not be reached.
    #[error("Rider store unavailable: {0}")]
    Unavailable(String),

    /// The order service refused or failed the call.
    #[error("Order service: {0}")]
    Order(ServiceError),

    /// Invalid paging parameters.
    #[error(transparent)]
    Paging(#[from] PagingError),

    /// A stored row could not be mapped back to the domain.
    #[error("Corrupt delivery row: {0}")]
    Corrupt(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl Classify for RiderError {
    fn kind(&self) -> ErrorKind {
        match self {
            RiderError::RiderNotFound(_)
            | RiderError::AssignmentNotFound(_)
            | RiderError::NotAssigned { .. } => ErrorKind::NotFound,
            RiderError::Offline(_)
            | RiderError::AlreadyClaimed(_)
            | RiderError::OrderNotReady { .. }
            | RiderError::StatusConflict { .. }
            | RiderError::Transition(_) => ErrorKind::InvalidTransition,
            RiderError::InvalidArgument(_) | RiderError::Paging(_) => ErrorKind::InvalidArgument,
            RiderError::Unavailable(_) => ErrorKind::Unavailable,
            RiderError::Order(e) => e.kind,
            RiderError::Corrupt(_) | RiderError::Database(_) | RiderError::Migration(_) => {
                ErrorKind::Internal
            }
        }
    }

    fn to_service_error(&self) -> ServiceError {
        match self {
            // Already sanitized by the order service.
            RiderError::Order(e) => e.clone(),
            other => match other.kind() {
                ErrorKind::Internal => {
                    tracing::error!(error = %other, "internal rider service error");
                    ServiceError::internal()
                }
                kind => ServiceError::new(kind, other.to_string()),
            },
        }
    }
}

impl From<ServiceError> for RiderError {
    fn from(e: ServiceError) -> Self {
        RiderError::Order(e)
    }
}

impl From<ParseStatusError> for RiderError {
    fn from(e: ParseStatusError) -> Self {
        RiderError::Corrupt(e.to_string())
    }
}

/// Convenience type alias for rider service results.
pub type Result<T> = std::result::Result<T, RiderError>;
