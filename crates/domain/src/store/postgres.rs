use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use common::{CustomerId, MerchantId, OrderId, Page, PageRequest, ProductId};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};

use super::{OrderFilter, OrderStore, creation_operator};
use crate::error::{Result, StoreError};
use crate::order::{
    Money, Order, OrderLine, OrderNumber, OrderStatus, StatusChange, StatusTransition, ValidOrder,
};

const ORDER_COLUMNS: &str = "id, order_number, customer_id, customer_name, customer_phone, \
     merchant_id, merchant_name, total_cents, address, expected_time, status, remark, \
     created_at, updated_at";

const LINE_COLUMNS: &str =
    "id, order_id, product_id, product_name, unit_price_cents, quantity, line_total_cents";

// Optional filters: a NULL parameter matches every row.
const FILTER_CLAUSE: &str = "($1::BIGINT IS NULL OR customer_id = $1) \
     AND ($2::BIGINT IS NULL OR merchant_id = $2) \
     AND ($3::TEXT IS NULL OR status = $3) \
     AND ($4::TEXT IS NULL OR strpos(address, $4) > 0)";

/// PostgreSQL-backed order store.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs the order migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        let mut migrator = sqlx::migrate!("../../migrations/orders");
        migrator.set_ignore_missing(true);
        migrator.run(&self.pool).await?;
        Ok(())
    }

    fn row_to_header(row: &PgRow) -> Result<Order> {
        let status: String = row.try_get("status")?;
        Ok(Order {
            id: OrderId::new(row.try_get("id")?),
            number: OrderNumber::new(row.try_get::<String, _>("order_number")?),
            customer_id: CustomerId::new(row.try_get("customer_id")?),
            customer_name: row.try_get("customer_name")?,
            customer_phone: row.try_get("customer_phone")?,
            merchant_id: MerchantId::new(row.try_get("merchant_id")?),
            merchant_name: row.try_get("merchant_name")?,
            lines: Vec::new(),
            total: Money::from_cents(row.try_get("total_cents")?),
            address: row.try_get("address")?,
            expected_time: row.try_get("expected_time")?,
            status: status.parse()?,
            remark: row.try_get("remark")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_line(row: &PgRow) -> Result<OrderLine> {
        let quantity: i64 = row.try_get("quantity")?;
        Ok(OrderLine {
            id: row.try_get("id")?,
            order_id: OrderId::new(row.try_get("order_id")?),
            product_id: ProductId::new(row.try_get("product_id")?),
            product_name: row.try_get("product_name")?,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
            quantity: u32::try_from(quantity)
                .map_err(|_| StoreError::Corrupt(format!("line quantity {quantity}")))?,
            line_total: Money::from_cents(row.try_get("line_total_cents")?),
        })
    }

    fn row_to_change(row: &PgRow) -> Result<StatusChange> {
        let from: Option<String> = row.try_get("from_status")?;
        let to: String = row.try_get("to_status")?;
        Ok(StatusChange {
            order_id: OrderId::new(row.try_get("order_id")?),
            from: from.map(|s| s.parse()).transpose()?,
            to: to.parse()?,
            operator: row.try_get("operator")?,
            remark: row.try_get("remark")?,
            changed_at: row.try_get("changed_at")?,
        })
    }

    async fn insert_change(
        tx: &mut Transaction<'_, Postgres>,
        change: &StatusChange,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO order_status_changes (order_id, from_status, to_status, operator, remark, changed_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(change.order_id.get())
        .bind(change.from.map(|s| s.as_str()))
        .bind(change.to.as_str())
        .bind(&change.operator)
        .bind(&change.remark)
        .bind(change.changed_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn lines_for(&self, order_ids: &[i64]) -> Result<HashMap<OrderId, Vec<OrderLine>>> {
        let sql = format!(
            "SELECT {LINE_COLUMNS} FROM order_lines WHERE order_id = ANY($1) ORDER BY id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(order_ids)
            .fetch_all(&self.pool)
            .await?;

        let mut by_order: HashMap<OrderId, Vec<OrderLine>> = HashMap::new();
        for row in &rows {
            let line = Self::row_to_line(row)?;
            by_order.entry(line.order_id).or_default().push(line);
        }
        Ok(by_order)
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    #[tracing::instrument(skip(self, order), fields(customer_id = %order.customer_id()))]
    async fn create(&self, order: &ValidOrder, number: &OrderNumber) -> Result<Order> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            INSERT INTO orders (order_number, customer_id, customer_name, customer_phone,
                                merchant_id, merchant_name, total_cents, address, expected_time,
                                status, remark, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, '', $11, $11)
            RETURNING id
            "#,
        )
        .bind(number.as_str())
        .bind(order.customer_id().get())
        .bind(order.customer_name())
        .bind(order.customer_phone())
        .bind(order.merchant_id().get())
        .bind(order.merchant_name())
        .bind(order.total().cents())
        .bind(order.address())
        .bind(order.expected_time())
        .bind(OrderStatus::PendingAcceptance.as_str())
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("unique_order_number")
            {
                return StoreError::DuplicateOrderNumber(number.clone());
            }
            StoreError::Database(e)
        })?;
        let id = OrderId::new(row.try_get("id")?);

        let mut lines = Vec::with_capacity(order.lines().len());
        for line in order.lines() {
            let line_id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO order_lines (order_id, product_id, product_name, unit_price_cents,
                                         quantity, line_total_cents)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id
                "#,
            )
            .bind(id.get())
            .bind(line.product_id.get())
            .bind(&line.product_name)
            .bind(line.unit_price.cents())
            .bind(i64::from(line.quantity))
            .bind(line.line_total.cents())
            .fetch_one(&mut *tx)
            .await?;

            lines.push(OrderLine {
                id: line_id,
                order_id: id,
                product_id: line.product_id,
                product_name: line.product_name.clone(),
                unit_price: line.unit_price,
                quantity: line.quantity,
                line_total: line.line_total,
            });
        }

        Self::insert_change(
            &mut tx,
            &StatusChange {
                order_id: id,
                from: None,
                to: OrderStatus::PendingAcceptance,
                operator: creation_operator(order.customer_id()),
                remark: String::new(),
                changed_at: now,
            },
        )
        .await?;

        tx.commit().await?;

        Ok(Order {
            id,
            number: number.clone(),
            customer_id: order.customer_id(),
            customer_name: order.customer_name().to_string(),
            customer_phone: order.customer_phone().to_string(),
            merchant_id: order.merchant_id(),
            merchant_name: order.merchant_name().to_string(),
            lines,
            total: order.total(),
            address: order.address().to_string(),
            expected_time: order.expected_time().map(str::to_string),
            status: OrderStatus::PendingAcceptance,
            remark: String::new(),
            created_at: now,
            updated_at: now,
        })
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut order = Self::row_to_header(&row)?;
        order.lines = self
            .lines_for(&[id.get()])
            .await?
            .remove(&id)
            .unwrap_or_default();
        Ok(Some(order))
    }

    #[tracing::instrument(skip(self))]
    async fn apply_transition(
        &self,
        id: OrderId,
        transition: StatusTransition,
        operator: &str,
        remark: &str,
    ) -> Result<Order> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            UPDATE orders
            SET status = $1,
                remark = CASE WHEN $2 = '' THEN remark ELSE $2 END,
                updated_at = $3
            WHERE id = $4 AND status = $5
            RETURNING {ORDER_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(transition.to().as_str())
            .bind(remark)
            .bind(now)
            .bind(id.get())
            .bind(transition.from().as_str())
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = row else {
            let current: Option<String> =
                sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
                    .bind(id.get())
                    .fetch_optional(&mut *tx)
                    .await?;
            return match current {
                None => Err(StoreError::NotFound(id)),
                Some(actual) => Err(StoreError::StatusConflict {
                    order_id: id,
                    expected: transition.from(),
                    actual: actual.parse()?,
                }),
            };
        };
        let mut order = Self::row_to_header(&row)?;

        Self::insert_change(
            &mut tx,
            &StatusChange {
                order_id: id,
                from: Some(transition.from()),
                to: transition.to(),
                operator: operator.to_string(),
                remark: remark.to_string(),
                changed_at: now,
            },
        )
        .await?;

        tx.commit().await?;

        order.lines = self
            .lines_for(&[id.get()])
            .await?
            .remove(&id)
            .unwrap_or_default();
        Ok(order)
    }

    async fn history(&self, id: OrderId) -> Result<Vec<StatusChange>> {
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM orders WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(StoreError::NotFound(id));
        }

        let rows = sqlx::query(
            r#"
            SELECT order_id, from_status, to_status, operator, remark, changed_at
            FROM order_status_changes
            WHERE order_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(id.get())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_change).collect()
    }

    async fn list(&self, filter: &OrderFilter, page: PageRequest) -> Result<Page<Order>> {
        let customer = filter.customer_id.map(|id| id.get());
        let merchant = filter.merchant_id.map(|id| id.get());
        let status = filter.status.map(|s| s.as_str());
        let area = filter.address_contains.as_deref();

        let count_sql = format!("SELECT COUNT(*) FROM orders WHERE {FILTER_CLAUSE}");
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(customer)
            .bind(merchant)
            .bind(status)
            .bind(area)
            .fetch_one(&self.pool)
            .await?;

        let list_sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE {FILTER_CLAUSE} \
             ORDER BY id DESC LIMIT $5 OFFSET $6"
        );
        let rows = sqlx::query(&list_sql)
            .bind(customer)
            .bind(merchant)
            .bind(status)
            .bind(area)
            .bind(i64::try_from(page.limit()).unwrap_or(i64::MAX))
            .bind(i64::try_from(page.offset()).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;

        let mut orders = rows
            .iter()
            .map(Self::row_to_header)
            .collect::<Result<Vec<_>>>()?;

        let ids: Vec<i64> = orders.iter().map(|o| o.id.get()).collect();
        let mut lines = self.lines_for(&ids).await?;
        for order in &mut orders {
            order.lines = lines.remove(&order.id).unwrap_or_default();
        }

        Ok(Page::new(
            orders,
            u64::try_from(total).unwrap_or_default(),
            page,
        ))
    }
}
