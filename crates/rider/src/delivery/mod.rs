//! Delivery assignment storage.
//!
//! Every write is conditional: a claim only lands on an unassigned row, and
//! a sub-status change only lands when the row is held by the caller and
//! still in the transition's starting status.

mod memory;
mod postgres;

pub use memory::InMemoryDeliveryStore;
pub use postgres::PostgresDeliveryStore;

use std::sync::Arc;

use async_trait::async_trait;
use common::{MerchantId, OrderId, Page, PageRequest, RiderId};
use domain::{DeliveryStatus, DeliveryTransition, Money, Order, OrderNumber};

use crate::error::Result;
use crate::model::DeliveryAssignment;

/// The order snapshot an assignment is opened from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAssignment {
    pub order_id: OrderId,
    pub order_number: OrderNumber,
    pub merchant_id: MerchantId,
    pub merchant_name: String,
    pub address: String,
    pub total: Money,
}

impl From<&Order> for NewAssignment {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id,
            order_number: order.number.clone(),
            merchant_id: order.merchant_id,
            merchant_name: order.merchant_name.clone(),
            address: order.address.clone(),
            total: order.total,
        }
    }
}

#[async_trait]
pub trait DeliveryStore: Send + Sync {
    /// Returns the order's assignment, creating it unassigned if absent.
    async fn open(&self, new: NewAssignment) -> Result<DeliveryAssignment>;

    /// Assigns `rider_id` if nobody holds the order yet.
    ///
    /// Fails with `AlreadyClaimed` when another claim won.
    async fn claim(&self, order_id: OrderId, rider_id: RiderId) -> Result<DeliveryAssignment>;

    /// Undoes a claim still awaiting pickup.
    async fn release(&self, order_id: OrderId, rider_id: RiderId) -> Result<DeliveryAssignment>;

    /// Moves the sub-status of an assignment held by `rider_id`.
    ///
    /// Accepts both checked transitions and their rewinds.
    async fn apply_transition(
        &self,
        order_id: OrderId,
        rider_id: RiderId,
        transition: DeliveryTransition,
    ) -> Result<DeliveryAssignment>;

    async fn get(&self, order_id: OrderId) -> Result<Option<DeliveryAssignment>>;

    /// Lists the rider's assignments, newest first.
    async fn list_by_rider(
        &self,
        rider_id: RiderId,
        status: Option<DeliveryStatus>,
        page: PageRequest,
    ) -> Result<Page<DeliveryAssignment>>;
}

#[async_trait]
impl<D> DeliveryStore for Arc<D>
where
    D: DeliveryStore + ?Sized,
{
    async fn open(&self, new: NewAssignment) -> Result<DeliveryAssignment> {
        (**self).open(new).await
    }

    async fn claim(&self, order_id: OrderId, rider_id: RiderId) -> Result<DeliveryAssignment> {
        (**self).claim(order_id, rider_id).await
    }

    async fn release(&self, order_id: OrderId, rider_id: RiderId) -> Result<DeliveryAssignment> {
        (**self).release(order_id, rider_id).await
    }

    async fn apply_transition(
        &self,
        order_id: OrderId,
        rider_id: RiderId,
        transition: DeliveryTransition,
    ) -> Result<DeliveryAssignment> {
        (**self)
            .apply_transition(order_id, rider_id, transition)
            .await
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<DeliveryAssignment>> {
        (**self).get(order_id).await
    }

    async fn list_by_rider(
        &self,
        rider_id: RiderId,
        status: Option<DeliveryStatus>,
        page: PageRequest,
    ) -> Result<Page<DeliveryAssignment>> {
        (**self).list_by_rider(rider_id, status, page).await
    }
}
