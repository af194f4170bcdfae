//! Persistence for orders, their lines and their status history.

mod memory;
mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use common::{CustomerId, MerchantId, OrderId, Page, PageRequest};

pub use memory::InMemoryOrderStore;
pub use postgres::PostgresOrderStore;

use crate::error::Result;
use crate::order::{Order, OrderNumber, OrderStatus, StatusChange, StatusTransition, ValidOrder};

/// Selection criteria for listing orders. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub customer_id: Option<CustomerId>,
    pub merchant_id: Option<MerchantId>,
    pub status: Option<OrderStatus>,
    /// Substring the delivery address must contain.
    pub address_contains: Option<String>,
}

impl OrderFilter {
    pub fn for_customer(customer_id: CustomerId) -> Self {
        Self {
            customer_id: Some(customer_id),
            ..Self::default()
        }
    }

    pub fn for_merchant(merchant_id: MerchantId) -> Self {
        Self {
            merchant_id: Some(merchant_id),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: Option<OrderStatus>) -> Self {
        self.status = status;
        self
    }

    pub fn with_address_containing(mut self, area: Option<String>) -> Self {
        self.address_contains = area.filter(|a| !a.trim().is_empty());
        self
    }

    /// Returns true if `order` satisfies every set criterion.
    pub fn matches(&self, order: &Order) -> bool {
        self.customer_id.is_none_or(|id| order.customer_id == id)
            && self.merchant_id.is_none_or(|id| order.merchant_id == id)
            && self.status.is_none_or(|s| order.status == s)
            && self
                .address_contains
                .as_deref()
                .is_none_or(|area| order.address.contains(area))
    }
}

/// Storage for the order aggregate.
///
/// All implementations must be thread-safe (Send + Sync). Status is only
/// ever written through [`OrderStore::apply_transition`], which is a
/// compare-and-swap on the current status.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a validated order with its lines and its initial history
    /// row in one local transaction. Status starts at `PendingAcceptance`.
    async fn create(&self, order: &ValidOrder, number: &OrderNumber) -> Result<Order>;

    /// Loads an order with its lines.
    async fn get(&self, id: OrderId) -> Result<Option<Order>>;

    /// Applies a checked status change if the order is still in
    /// `transition.from()`, recording a history row in the same transaction.
    ///
    /// An empty `remark` leaves the stored remark unchanged. Fails with
    /// `NotFound` if the order is absent and `StatusConflict` if its status
    /// moved.
    async fn apply_transition(
        &self,
        id: OrderId,
        transition: StatusTransition,
        operator: &str,
        remark: &str,
    ) -> Result<Order>;

    /// Returns the status history, oldest first.
    async fn history(&self, id: OrderId) -> Result<Vec<StatusChange>>;

    /// Lists matching orders, newest first.
    async fn list(&self, filter: &OrderFilter, page: PageRequest) -> Result<Page<Order>>;
}

#[async_trait]
impl<S> OrderStore for Arc<S>
where
    S: OrderStore + ?Sized,
{
    async fn create(&self, order: &ValidOrder, number: &OrderNumber) -> Result<Order> {
        (**self).create(order, number).await
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>> {
        (**self).get(id).await
    }

    async fn apply_transition(
        &self,
        id: OrderId,
        transition: StatusTransition,
        operator: &str,
        remark: &str,
    ) -> Result<Order> {
        (**self).apply_transition(id, transition, operator, remark).await
    }

    async fn history(&self, id: OrderId) -> Result<Vec<StatusChange>> {
        (**self).history(id).await
    }

    async fn list(&self, filter: &OrderFilter, page: PageRequest) -> Result<Page<Order>> {
        (**self).list(filter, page).await
    }
}

/// Operator recorded on the history row written at creation.
pub(crate) fn creation_operator(customer_id: CustomerId) -> String {
    format!("user_{customer_id}")
}
