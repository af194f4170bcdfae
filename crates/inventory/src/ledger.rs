use std::sync::Arc;

use async_trait::async_trait;
use common::ProductId;

use crate::{InventoryItem, Result};

/// Core trait for inventory ledger implementations.
///
/// All implementations must be thread-safe (Send + Sync). Concurrent
/// `deduct_stock` calls against the same product serialize; stock never
/// goes negative.
#[async_trait]
pub trait StockLedger: Send + Sync {
    /// Removes `quantity` units from a product.
    ///
    /// The row is locked exclusively for the whole read-check-write. Fails
    /// with `NotFound` if the product has no row and with `OutOfStock` if
    /// the stock is smaller than `quantity`; neither failure changes the row.
    ///
    /// Returns the row after the deduction.
    async fn deduct_stock(&self, product_id: ProductId, quantity: u32) -> Result<InventoryItem>;

    /// Adds `quantity` units back to a product as one atomic increment.
    ///
    /// This is the compensating action for `deduct_stock`. It has no
    /// precondition beyond the row existing (`NotFound` otherwise).
    async fn restore_stock(&self, product_id: ProductId, quantity: u32) -> Result<InventoryItem>;

    /// Reads the current row for a product.
    async fn get_item(&self, product_id: ProductId) -> Result<Option<InventoryItem>>;

    /// Creates or overwrites the row for a product.
    async fn put_item(&self, product_id: ProductId, stock: i64) -> Result<InventoryItem>;
}

#[async_trait]
impl<L> StockLedger for Arc<L>
where
    L: StockLedger + ?Sized,
{
    async fn deduct_stock(&self, product_id: ProductId, quantity: u32) -> Result<InventoryItem> {
        (**self).deduct_stock(product_id, quantity).await
    }

    async fn restore_stock(&self, product_id: ProductId, quantity: u32) -> Result<InventoryItem> {
        (**self).restore_stock(product_id, quantity).await
    }

    async fn get_item(&self, product_id: ProductId) -> Result<Option<InventoryItem>> {
        (**self).get_item(product_id).await
    }

    async fn put_item(&self, product_id: ProductId, stock: i64) -> Result<InventoryItem> {
        (**self).put_item(product_id, stock).await
    }
}
