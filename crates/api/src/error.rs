//! API error types with HTTP response mapping.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use common::{Classify, ErrorKind, PagingError, ServiceError};
use inventory::InventoryError;
use merchant::MerchantError;
use rider::RiderError;
use saga::OrderingError;
use thiserror::Error;

/// API-level error type that maps to HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request body or parameters could not be read.
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error(transparent)]
    Ordering(#[from] OrderingError),

    #[error(transparent)]
    Merchant(#[from] MerchantError),

    #[error(transparent)]
    Rider(#[from] RiderError),

    #[error(transparent)]
    Paging(#[from] PagingError),
}

impl Classify for ApiError {
    fn kind(&self) -> ErrorKind {
        match self {
            ApiError::BadRequest(_) => ErrorKind::InvalidArgument,
            ApiError::Inventory(e) => e.kind(),
            ApiError::Ordering(e) => e.kind(),
            ApiError::Merchant(e) => e.kind(),
            ApiError::Rider(e) => e.kind(),
            ApiError::Paging(e) => e.kind(),
        }
    }

    fn to_service_error(&self) -> ServiceError {
        match self {
            ApiError::BadRequest(msg) => ServiceError::invalid_argument(msg.clone()),
            ApiError::Inventory(e) => e.to_service_error(),
            ApiError::Ordering(e) => e.to_service_error(),
            ApiError::Merchant(e) => e.to_service_error(),
            ApiError::Rider(e) => e.to_service_error(),
            ApiError::Paging(e) => e.to_service_error(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// HTTP status for an error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidTransition | ErrorKind::OutOfStock => StatusCode::CONFLICT,
        ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error = self.to_service_error();
        let body = serde_json::json!({
            "error": error.message,
            "kind": error.kind.as_str(),
        });
        (status_for(error.kind), axum::Json(body)).into_response()
    }
}
