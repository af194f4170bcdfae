//! Merchant service error types.

use common::{Classify, ErrorKind, MerchantId, OrderId, PagingError, ServiceError};
use thiserror::Error;

/// Errors that can occur in the merchant service.
#[derive(Debug, Error)]
pub enum MerchantError {
    /// No merchant with this id.
    #[error("Merchant not found: {0}")]
    NotFound(MerchantId),

    /// The merchant is closed and cannot take orders.
    #[error("Merchant {0} is closed")]
    Closed(MerchantId),

    /// The order was placed with another merchant.
    #[error("Order {order_id} not found for merchant {merchant_id}")]
    NotOwner {
        merchant_id: MerchantId,
        order_id: OrderId,
    },

    /// Malformed input.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The merchant directory could not be reached.
    #[error("Merchant store unavailable: {0}")]
    Unavailable(String),

    /// The order service refused or failed the call.
    #[error("Order service: {0}")]
    Order(ServiceError),

    /// Invalid paging parameters.
    #[error(transparent)]
    Paging(#[from] PagingError),
}

impl Classify for MerchantError {
    fn kind(&self) -> ErrorKind {
        match self {
            MerchantError::NotFound(_) | MerchantError::NotOwner { .. } => ErrorKind::NotFound,
            MerchantError::Closed(_) => ErrorKind::InvalidTransition,
            MerchantError::InvalidArgument(_) | MerchantError::Paging(_) => {
                ErrorKind::InvalidArgument
            }
            MerchantError::Unavailable(_) => ErrorKind::Unavailable,
            MerchantError::Order(e) => e.kind,
        }
    }

    fn to_service_error(&self) -> ServiceError {
        match self {
            // Already sanitized by the order service.
            MerchantError::Order(e) => e.clone(),
            other => match other.kind() {
                ErrorKind::Internal => ServiceError::internal(),
                kind => ServiceError::new(kind, other.to_string()),
            },
        }
    }
}

impl From<ServiceError> for MerchantError {
    fn from(e: ServiceError) -> Self {
        MerchantError::Order(e)
    }
}

/// Convenience type alias for merchant service results.
pub type Result<T> = std::result::Result<T, MerchantError>;
