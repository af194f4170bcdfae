use async_trait::async_trait;
use common::ProductId;
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{
    InventoryError, InventoryItem, Result, StockLedger,
    item::ensure_positive,
};

/// PostgreSQL-backed stock ledger.
///
/// Deduction runs `SELECT ... FOR UPDATE` inside a transaction so the row
/// stays locked until the new stock is written. Restoration is a single
/// `stock = stock + n` update.
#[derive(Clone)]
pub struct PostgresStockLedger {
    pool: PgPool,
}

impl PostgresStockLedger {
    /// Creates a new PostgreSQL stock ledger.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs the inventory migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        let mut migrator = sqlx::migrate!("../../migrations/inventory");
        migrator.set_ignore_missing(true);
        migrator.run(&self.pool).await?;
        Ok(())
    }

    fn row_to_item(row: PgRow) -> Result<InventoryItem> {
        Ok(InventoryItem {
            product_id: ProductId::new(row.try_get("product_id")?),
            stock: row.try_get("stock")?,
            sold_out: row.try_get("sold_out")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl StockLedger for PostgresStockLedger {
    #[tracing::instrument(skip(self))]
    async fn deduct_stock(&self, product_id: ProductId, quantity: u32) -> Result<InventoryItem> {
        ensure_positive(quantity)?;

        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            SELECT product_id, stock, sold_out, updated_at
            FROM inventory_items
            WHERE product_id = $1
            FOR UPDATE
            "#,
        )
        .bind(product_id.get())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Err(InventoryError::NotFound(product_id));
        };
        let mut item = Self::row_to_item(row)?;

        if let Err(e) = item.deduct(quantity) {
            if matches!(e, InventoryError::OutOfStock { .. }) {
                metrics::counter!("stock_out_of_stock_total").increment(1);
            }
            // Dropping the transaction rolls back and releases the lock.
            return Err(e);
        }

        sqlx::query(
            r#"
            UPDATE inventory_items
            SET stock = $1, sold_out = $2, updated_at = $3
            WHERE product_id = $4
            "#,
        )
        .bind(item.stock)
        .bind(item.sold_out)
        .bind(item.updated_at)
        .bind(product_id.get())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        metrics::counter!("stock_deductions_total").increment(1);
        Ok(item)
    }

    #[tracing::instrument(skip(self))]
    async fn restore_stock(&self, product_id: ProductId, quantity: u32) -> Result<InventoryItem> {
        ensure_positive(quantity)?;

        let row = sqlx::query(
            r#"
            UPDATE inventory_items
            SET stock = stock + $1,
                sold_out = (stock + $1) <= 0,
                updated_at = NOW()
            WHERE product_id = $2
            RETURNING product_id, stock, sold_out, updated_at
            "#,
        )
        .bind(i64::from(quantity))
        .bind(product_id.get())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_item(row),
            None => Err(InventoryError::NotFound(product_id)),
        }
    }

    async fn get_item(&self, product_id: ProductId) -> Result<Option<InventoryItem>> {
        let row = sqlx::query(
            r#"
            SELECT product_id, stock, sold_out, updated_at
            FROM inventory_items
            WHERE product_id = $1
            "#,
        )
        .bind(product_id.get())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_item).transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn put_item(&self, product_id: ProductId, stock: i64) -> Result<InventoryItem> {
        let item = InventoryItem::new(product_id, stock)?;

        let row = sqlx::query(
            r#"
            INSERT INTO inventory_items (product_id, stock, sold_out, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (product_id) DO UPDATE
            SET stock = EXCLUDED.stock,
                sold_out = EXCLUDED.sold_out,
                updated_at = EXCLUDED.updated_at
            RETURNING product_id, stock, sold_out, updated_at
            "#,
        )
        .bind(item.product_id.get())
        .bind(item.stock)
        .bind(item.sold_out)
        .bind(item.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_item(row)
    }
}
