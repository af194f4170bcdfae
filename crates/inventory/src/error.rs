use common::{Classify, ErrorKind, ProductId};
use thiserror::Error;

/// Errors that can occur when interacting with the inventory ledger.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// No ledger row exists for the product.
    #[error("Product not found: {0}")]
    NotFound(ProductId),

    /// The product does not have enough stock for the requested deduction.
    #[error("Out of stock for product {product_id}: requested {requested}, available {available}")]
    OutOfStock {
        product_id: ProductId,
        requested: u32,
        available: i64,
    },

    /// Quantities must be positive.
    #[error("Invalid quantity: {0} (must be greater than 0)")]
    InvalidQuantity(u32),

    /// Stock levels must not be negative.
    #[error("Invalid stock level: {0} (must not be negative)")]
    InvalidStock(i64),

    /// The ledger could not be reached.
    #[error("Inventory ledger unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl Classify for InventoryError {
    fn kind(&self) -> ErrorKind {
        match self {
            InventoryError::NotFound(_) => ErrorKind::NotFound,
            InventoryError::OutOfStock { .. } => ErrorKind::OutOfStock,
            InventoryError::InvalidQuantity(_) | InventoryError::InvalidStock(_) => {
                ErrorKind::InvalidArgument
            }
            InventoryError::Unavailable(_) => ErrorKind::Unavailable,
            InventoryError::Database(_) | InventoryError::Migration(_) => ErrorKind::Internal,
        }
    }
}

/// Result type for inventory ledger operations.
pub type Result<T> = std::result::Result<T, InventoryError>;
