//! The order operations other services depend on.

use std::sync::Arc;

use async_trait::async_trait;
use common::{OrderId, Page, PageRequest, ServiceError};
use domain::{Order, OrderFilter, OrderStatus};

/// Order service as seen from the merchant and rider services.
///
/// Errors are already classified: callers can branch on
/// [`ServiceError::kind`] but never see internal detail. An in-process
/// [`crate::OrderOrchestrator`] and a remote client implement the same trait.
#[async_trait]
pub trait OrderClient: Send + Sync {
    /// Loads an order with its lines.
    async fn get_order(&self, order_id: OrderId) -> Result<Order, ServiceError>;

    /// Moves an order to `status` through the single status chokepoint.
    async fn update_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
        operator: &str,
        remark: &str,
    ) -> Result<Order, ServiceError>;

    /// Lists orders matching `filter`, newest first.
    async fn list_orders(
        &self,
        filter: OrderFilter,
        page: PageRequest,
    ) -> Result<Page<Order>, ServiceError>;
}

#[async_trait]
impl<C> OrderClient for Arc<C>
where
    C: OrderClient + ?Sized,
{
    async fn get_order(&self, order_id: OrderId) -> Result<Order, ServiceError> {
        (**self).get_order(order_id).await
    }

    async fn update_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
        operator: &str,
        remark: &str,
    ) -> Result<Order, ServiceError> {
        (**self)
            .update_status(order_id, status, operator, remark)
            .await
    }

    async fn list_orders(
        &self,
        filter: OrderFilter,
        page: PageRequest,
    ) -> Result<Page<Order>, ServiceError> {
        (**self).list_orders(filter, page).await
    }
}
