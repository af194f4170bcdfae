//! Error taxonomy shared across service boundaries.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification of a failure, independent of the service that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input. Fails fast with no side effects.
    InvalidArgument,

    /// A referenced entity does not exist.
    NotFound,

    /// A status precondition was not met.
    InvalidTransition,

    /// Not enough stock to satisfy a deduction.
    OutOfStock,

    /// A downstream call failed. Never retried automatically.
    Unavailable,

    /// Unexpected failure. Details are logged, never sent to the caller.
    Internal,
}

impl ErrorKind {
    /// Returns the kind name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidTransition => "invalid_transition",
            ErrorKind::OutOfStock => "out_of_stock",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A classified error with a human-readable message.
///
/// This is the only error shape that crosses a service boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct ServiceError {
    pub kind: ErrorKind,
    pub message: String,
}

/// Message used in place of internal error details.
pub const INTERNAL_MESSAGE: &str = "internal error";

impl ServiceError {
    /// Creates a service error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn invalid_transition(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidTransition, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unavailable, message)
    }

    /// An internal error. The message is always the generic one.
    pub fn internal() -> Self {
        Self::new(ErrorKind::Internal, INTERNAL_MESSAGE)
    }
}

/// Maps an error onto the shared taxonomy.
///
/// Implementations match every variant so that adding one forces a decision
/// about its classification.
pub trait Classify: std::error::Error {
    /// Returns the classification of this error.
    fn kind(&self) -> ErrorKind;

    /// Converts this error into the shape sent across a service boundary.
    ///
    /// Internal errors are logged here and replaced with a generic message.
    fn to_service_error(&self) -> ServiceError {
        match self.kind() {
            ErrorKind::Internal => {
                tracing::error!(error = %self, "internal error withheld from caller");
                ServiceError::internal()
            }
            kind => ServiceError::new(kind, self.to_string()),
        }
    }
}

impl Classify for ServiceError {
    fn kind(&self) -> ErrorKind {
        self.kind
    }

    fn to_service_error(&self) -> ServiceError {
        self.clone()
    }
}
