use async_trait::async_trait;
use chrono::Utc;
use common::{MerchantId, OrderId, Page, PageRequest, RiderId};
use domain::{DeliveryStatus, DeliveryTransition, Money, OrderNumber};
use sqlx::{PgPool, Row, postgres::PgRow};

use super::{DeliveryStore, NewAssignment};
use crate::error::{Result, RiderError};
use crate::model::DeliveryAssignment;

const COLUMNS: &str = "id, order_id, order_number, rider_id, merchant_id, merchant_name, \
     address, total_cents, status, accepted_at, picked_up_at, delivered_at, created_at, \
     updated_at";

/// PostgreSQL-backed delivery assignment store.
#[derive(Clone)]
pub struct PostgresDeliveryStore {
    pool: PgPool,
}

impl PostgresDeliveryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs the delivery migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        let mut migrator = sqlx::migrate!("../../migrations/delivery");
        migrator.set_ignore_missing(true);
        migrator.run(&self.pool).await?;
        Ok(())
    }

    fn row_to_assignment(row: &PgRow) -> Result<DeliveryAssignment> {
        let status: String = row.try_get("status")?;
        Ok(DeliveryAssignment {
            id: row.try_get("id")?,
            order_id: OrderId::new(row.try_get("order_id")?),
            order_number: OrderNumber::new(row.try_get::<String, _>("order_number")?),
            rider_id: row.try_get::<Option<i64>, _>("rider_id")?.map(RiderId::new),
            merchant_id: MerchantId::new(row.try_get("merchant_id")?),
            merchant_name: row.try_get("merchant_name")?,
            address: row.try_get("address")?,
            total: Money::from_cents(row.try_get("total_cents")?),
            status: status.parse()?,
            accepted_at: row.try_get("accepted_at")?,
            picked_up_at: row.try_get("picked_up_at")?,
            delivered_at: row.try_get("delivered_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    /// Explains why a conditional update matched no row.
    async fn conflict(
        &self,
        order_id: OrderId,
        rider_id: RiderId,
        expected: DeliveryStatus,
    ) -> RiderError {
        match self.get(order_id).await {
            Ok(None) => RiderError::AssignmentNotFound(order_id),
            Ok(Some(current)) if !current.is_held_by(rider_id) => {
                RiderError::NotAssigned { rider_id, order_id }
            }
            Ok(Some(current)) => RiderError::StatusConflict {
                order_id,
                expected,
                actual: current.status,
            },
            Err(e) => e,
        }
    }
}

#[async_trait]
impl DeliveryStore for PostgresDeliveryStore {
    #[tracing::instrument(skip(self, new), fields(order_id = %new.order_id))]
    async fn open(&self, new: NewAssignment) -> Result<DeliveryAssignment> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO delivery_assignments (order_id, order_number, merchant_id, merchant_name,
                                              address, total_cents, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            ON CONFLICT (order_id) DO NOTHING
            "#,
        )
        .bind(new.order_id.get())
        .bind(new.order_number.as_str())
        .bind(new.merchant_id.get())
        .bind(&new.merchant_name)
        .bind(&new.address)
        .bind(new.total.cents())
        .bind(DeliveryStatus::AwaitingPickup.as_str())
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get(new.order_id)
            .await?
            .ok_or(RiderError::AssignmentNotFound(new.order_id))
    }

    #[tracing::instrument(skip(self))]
    async fn claim(&self, order_id: OrderId, rider_id: RiderId) -> Result<DeliveryAssignment> {
        let now = Utc::now();
        let sql = format!(
            r#"
            UPDATE delivery_assignments
            SET rider_id = $1, status = $2, accepted_at = $3, updated_at = $3
            WHERE order_id = $4 AND rider_id IS NULL
            RETURNING {COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(rider_id.get())
            .bind(DeliveryStatus::AwaitingPickup.as_str())
            .bind(now)
            .bind(order_id.get())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Self::row_to_assignment(&row),
            None => match self.get(order_id).await? {
                None => Err(RiderError::AssignmentNotFound(order_id)),
                Some(_) => Err(RiderError::AlreadyClaimed(order_id)),
            },
        }
    }

    #[tracing::instrument(skip(self))]
    async fn release(&self, order_id: OrderId, rider_id: RiderId) -> Result<DeliveryAssignment> {
        let sql = format!(
            r#"
            UPDATE delivery_assignments
            SET rider_id = NULL, accepted_at = NULL, updated_at = $1
            WHERE order_id = $2 AND rider_id = $3 AND status = $4
            RETURNING {COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(Utc::now())
            .bind(order_id.get())
            .bind(rider_id.get())
            .bind(DeliveryStatus::AwaitingPickup.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Self::row_to_assignment(&row),
            None => Err(self
                .conflict(order_id, rider_id, DeliveryStatus::AwaitingPickup)
                .await),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn apply_transition(
        &self,
        order_id: OrderId,
        rider_id: RiderId,
        transition: DeliveryTransition,
    ) -> Result<DeliveryAssignment> {
        let Some(mut next) = self.get(order_id).await? else {
            return Err(RiderError::AssignmentNotFound(order_id));
        };
        next.apply(transition, Utc::now());

        let sql = format!(
            r#"
            UPDATE delivery_assignments
            SET status = $1, picked_up_at = $2, delivered_at = $3, updated_at = $4
            WHERE order_id = $5 AND rider_id = $6 AND status = $7
            RETURNING {COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(next.status.as_str())
            .bind(next.picked_up_at)
            .bind(next.delivered_at)
            .bind(next.updated_at)
            .bind(order_id.get())
            .bind(rider_id.get())
            .bind(transition.from().as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Self::row_to_assignment(&row),
            None => Err(self.conflict(order_id, rider_id, transition.from()).await),
        }
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<DeliveryAssignment>> {
        let sql = format!("SELECT {COLUMNS} FROM delivery_assignments WHERE order_id = $1");
        let row = sqlx::query(&sql)
            .bind(order_id.get())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_assignment).transpose()
    }

    async fn list_by_rider(
        &self,
        rider_id: RiderId,
        status: Option<DeliveryStatus>,
        page: PageRequest,
    ) -> Result<Page<DeliveryAssignment>> {
        let status = status.map(|s| s.as_str());

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM delivery_assignments \
             WHERE rider_id = $1 AND ($2::TEXT IS NULL OR status = $2)",
        )
        .bind(rider_id.get())
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        let sql = format!(
            "SELECT {COLUMNS} FROM delivery_assignments \
             WHERE rider_id = $1 AND ($2::TEXT IS NULL OR status = $2) \
             ORDER BY id DESC LIMIT $3 OFFSET $4"
        );
        let rows = sqlx::query(&sql)
            .bind(rider_id.get())
            .bind(status)
            .bind(i64::try_from(page.limit()).unwrap_or(i64::MAX))
            .bind(i64::try_from(page.offset()).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;

        let items = rows
            .iter()
            .map(Self::row_to_assignment)
            .collect::<Result<Vec<_>>>()?;
        Ok(Page::new(
            items,
            u64::try_from(total).unwrap_or_default(),
            page,
        ))
    }
}
