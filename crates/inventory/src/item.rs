//! Ledger row for a single product.

use chrono::{DateTime, Utc};
use common::ProductId;
use serde::{Deserialize, Serialize};

use crate::error::{InventoryError, Result};

/// Stock held for one product.
///
/// `sold_out` is derived from `stock` and recomputed by every mutation;
/// it is never set independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub product_id: ProductId,
    pub stock: i64,
    pub sold_out: bool,
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    /// Creates a ledger row with the given stock level.
    pub fn new(product_id: ProductId, stock: i64) -> Result<Self> {
        if stock < 0 {
            return Err(InventoryError::InvalidStock(stock));
        }
        Ok(Self {
            product_id,
            stock,
            sold_out: stock <= 0,
            updated_at: Utc::now(),
        })
    }

    /// Removes `quantity` units, failing without change if stock is short.
    pub fn deduct(&mut self, quantity: u32) -> Result<()> {
        ensure_positive(quantity)?;
        if self.stock < i64::from(quantity) {
            return Err(InventoryError::OutOfStock {
                product_id: self.product_id,
                requested: quantity,
                available: self.stock,
            });
        }
        self.stock -= i64::from(quantity);
        self.recompute_sold_out();
        Ok(())
    }

    /// Adds `quantity` units back.
    pub fn restore(&mut self, quantity: u32) -> Result<()> {
        ensure_positive(quantity)?;
        self.stock += i64::from(quantity);
        self.recompute_sold_out();
        Ok(())
    }

    /// Re-derives the sold-out flag and touches the update timestamp.
    pub fn recompute_sold_out(&mut self) {
        self.sold_out = self.stock <= 0;
        self.updated_at = Utc::now();
    }
}

/// Rejects zero quantities before any row is touched.
pub fn ensure_positive(quantity: u32) -> Result<()> {
    if quantity == 0 {
        return Err(InventoryError::InvalidQuantity(quantity));
    }
    Ok(())
}
