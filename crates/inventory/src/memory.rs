use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use common::ProductId;
use tokio::sync::{Mutex, RwLock};

use crate::{
    InventoryError, InventoryItem, Result, StockLedger,
    item::ensure_positive,
};

#[derive(Debug, Default)]
struct Faults {
    unavailable: bool,
    fail_restore: HashSet<ProductId>,
    restore_calls: usize,
}

/// In-memory stock ledger for tests and single-process deployments.
///
/// Every product row sits behind its own mutex, held across the whole
/// read-check-write of a deduction. Deductions against different products
/// proceed in parallel.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStockLedger {
    rows: Arc<RwLock<HashMap<ProductId, Arc<Mutex<InventoryItem>>>>>,
    faults: Arc<Mutex<Faults>>,
}

impl InMemoryStockLedger {
    /// Creates a new empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call fail with `Unavailable` while set.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.faults.lock().await.unavailable = unavailable;
    }

    /// Makes restorations of the given product fail with `Unavailable`.
    pub async fn fail_restore_for(&self, product_id: ProductId) {
        self.faults.lock().await.fail_restore.insert(product_id);
    }

    /// Returns how many restorations were attempted, failed ones included.
    pub async fn restore_calls(&self) -> usize {
        self.faults.lock().await.restore_calls
    }

    /// Returns the current stock for a product, if it has a row.
    pub async fn stock_of(&self, product_id: ProductId) -> Option<i64> {
        let row = self.rows.read().await.get(&product_id).cloned()?;
        let item = row.lock().await;
        Some(item.stock)
    }

    async fn check_available(&self) -> Result<()> {
        if self.faults.lock().await.unavailable {
            return Err(InventoryError::Unavailable(
                "in-memory ledger marked unavailable".to_string(),
            ));
        }
        Ok(())
    }

    async fn row(&self, product_id: ProductId) -> Result<Arc<Mutex<InventoryItem>>> {
        self.rows
            .read()
            .await
            .get(&product_id)
            .cloned()
            .ok_or(InventoryError::NotFound(product_id))
    }
}

#[async_trait]
impl StockLedger for InMemoryStockLedger {
    #[tracing::instrument(skip(self))]
    async fn deduct_stock(&self, product_id: ProductId, quantity: u32) -> Result<InventoryItem> {
        ensure_positive(quantity)?;
        self.check_available().await?;

        let row = self.row(product_id).await?;
        let mut item = row.lock().await;
        if let Err(e) = item.deduct(quantity) {
            if matches!(e, InventoryError::OutOfStock { .. }) {
                metrics::counter!("stock_out_of_stock_total").increment(1);
            }
            return Err(e);
        }

        metrics::counter!("stock_deductions_total").increment(1);
        Ok(item.clone())
    }

    #[tracing::instrument(skip(self))]
    async fn restore_stock(&self, product_id: ProductId, quantity: u32) -> Result<InventoryItem> {
        ensure_positive(quantity)?;
        {
            let mut faults = self.faults.lock().await;
            faults.restore_calls += 1;
            if faults.unavailable || faults.fail_restore.contains(&product_id) {
                return Err(InventoryError::Unavailable(format!(
                    "restore of product {product_id} failed"
                )));
            }
        }

        let row = self.row(product_id).await?;
        let mut item = row.lock().await;
        item.restore(quantity)?;
        Ok(item.clone())
    }

    async fn get_item(&self, product_id: ProductId) -> Result<Option<InventoryItem>> {
        self.check_available().await?;
        let Some(row) = self.rows.read().await.get(&product_id).cloned() else {
            return Ok(None);
        };
        let item = row.lock().await;
        Ok(Some(item.clone()))
    }

    #[tracing::instrument(skip(self))]
    async fn put_item(&self, product_id: ProductId, stock: i64) -> Result<InventoryItem> {
        self.check_available().await?;
        let item = InventoryItem::new(product_id, stock)?;

        let row = {
            let mut rows = self.rows.write().await;
            Arc::clone(
                rows.entry(product_id)
                    .or_insert_with(|| Arc::new(Mutex::new(item.clone()))),
            )
        };
        let mut current = row.lock().await;
        *current = item;
        Ok(current.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::future::join_all;

    fn pid(n: i64) -> ProductId {
        ProductId::new(n)
    }

    #[tokio::test]
    async fn test_deduct_and_restore() {
        let ledger = InMemoryStockLedger::new();
        ledger.put_item(pid(1), 5).await.unwrap();

        let item = ledger.deduct_stock(pid(1), 3).await.unwrap();
        assert_eq!(item.stock, 2);
        assert!(!item.sold_out);

        let item = ledger.restore_stock(pid(1), 3).await.unwrap();
        assert_eq!(item.stock, 5);
    }

    #[tokio::test]
    async fn test_deduct_unknown_product() {
        let ledger = InMemoryStockLedger::new();
        let result = ledger.deduct_stock(pid(42), 1).await;
        assert!(matches!(result, Err(InventoryError::NotFound(p)) if p == pid(42)));
    }

    #[tokio::test]
    async fn test_out_of_stock_leaves_row_unchanged() {
        let ledger = InMemoryStockLedger::new();
        ledger.put_item(pid(1), 2).await.unwrap();

        let result = ledger.deduct_stock(pid(1), 3).await;
        assert!(matches!(result, Err(InventoryError::OutOfStock { .. })));
        assert_eq!(ledger.stock_of(pid(1)).await, Some(2));
    }

    #[tokio::test]
    async fn test_deduct_to_zero_sets_sold_out() {
        let ledger = InMemoryStockLedger::new();
        ledger.put_item(pid(1), 2).await.unwrap();

        let item = ledger.deduct_stock(pid(1), 2).await.unwrap();
        assert_eq!(item.stock, 0);
        assert!(item.sold_out);

        let item = ledger.restore_stock(pid(1), 1).await.unwrap();
        assert!(!item.sold_out);
    }

    #[tokio::test]
    async fn test_restore_unknown_product() {
        let ledger = InMemoryStockLedger::new();
        let result = ledger.restore_stock(pid(9), 1).await;
        assert!(matches!(result, Err(InventoryError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_zero_quantity_rejected() {
        let ledger = InMemoryStockLedger::new();
        ledger.put_item(pid(1), 2).await.unwrap();
        assert!(matches!(
            ledger.deduct_stock(pid(1), 0).await,
            Err(InventoryError::InvalidQuantity(0))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_deductions_never_oversell() {
        let ledger = InMemoryStockLedger::new();
        ledger.put_item(pid(1), 10).await.unwrap();

        let tasks = (0..10).map(|_| {
            let ledger = ledger.clone();
            tokio::spawn(async move { ledger.deduct_stock(pid(1), 3).await })
        });
        let results = join_all(tasks).await;

        let succeeded = results
            .iter()
            .filter(|r| matches!(r, Ok(Ok(_))))
            .count();
        let out_of_stock = results
            .iter()
            .filter(|r| matches!(r, Ok(Err(InventoryError::OutOfStock { .. }))))
            .count();

        assert_eq!(succeeded, 3);
        assert_eq!(out_of_stock, 7);
        assert_eq!(ledger.stock_of(pid(1)).await, Some(1));
    }

    #[tokio::test]
    async fn test_put_item_overwrites() {
        let ledger = InMemoryStockLedger::new();
        ledger.put_item(pid(1), 2).await.unwrap();
        ledger.put_item(pid(1), 7).await.unwrap();

        let item = ledger.get_item(pid(1)).await.unwrap().unwrap();
        assert_eq!(item.stock, 7);
        assert!(ledger.get_item(pid(2)).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_first_puts_store_what_they_return() {
        for product in 1..=20 {
            let ledger = InMemoryStockLedger::new();
            let tasks = (1..=8).map(|stock| {
                let ledger = ledger.clone();
                tokio::spawn(async move { ledger.put_item(pid(product), stock).await })
            });
            let returned: Vec<i64> = join_all(tasks)
                .await
                .into_iter()
                .map(|r| r.unwrap().unwrap().stock)
                .collect();

            let mut sorted = returned.clone();
            sorted.sort_unstable();
            assert_eq!(sorted, (1..=8).collect::<Vec<_>>());

            // The row holds one of the written values and the next put wins.
            let stored = ledger.stock_of(pid(product)).await.unwrap();
            assert!(returned.contains(&stored));
            let item = ledger.put_item(pid(product), 42).await.unwrap();
            assert_eq!(item.stock, 42);
            assert_eq!(ledger.stock_of(pid(product)).await, Some(42));
            assert_eq!(ledger.rows.read().await.len(), 1);
        }
    }

    #[tokio::test]
    async fn test_fault_injection() {
        let ledger = InMemoryStockLedger::new();
        ledger.put_item(pid(1), 2).await.unwrap();
        ledger.fail_restore_for(pid(1)).await;

        let result = ledger.restore_stock(pid(1), 1).await;
        assert!(matches!(result, Err(InventoryError::Unavailable(_))));
        assert_eq!(ledger.restore_calls().await, 1);

        ledger.set_unavailable(true).await;
        assert!(matches!(
            ledger.deduct_stock(pid(1), 1).await,
            Err(InventoryError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_shared_through_arc_dyn() {
        let ledger: Arc<dyn StockLedger> = Arc::new(InMemoryStockLedger::new());
        ledger.put_item(pid(3), 1).await.unwrap();
        ledger.deduct_stock(pid(3), 1).await.unwrap();
        assert!(ledger.get_item(pid(3)).await.unwrap().unwrap().sold_out);
    }
}
