//! Rider-side order flow.
//!
//! Each step changes the delivery assignment first and then mirrors it into
//! the order status. If the order side refuses, the assignment change is
//! undone best-effort and the refusal is returned.

use common::{OrderId, Page, PageRequest, RiderId};
use domain::{DeliveryStatus, Order, OrderFilter, OrderStatus};
use saga::OrderClient;

use crate::delivery::{DeliveryStore, NewAssignment};
use crate::directory::RiderStore;
use crate::error::{Result, RiderError};
use crate::model::{DeliveryAssignment, Rider, RiderStatus};

pub struct RiderService<R, D, O>
where
    R: RiderStore,
    D: DeliveryStore,
    O: OrderClient,
{
    riders: R,
    deliveries: D,
    orders: O,
}

impl<R, D, O> RiderService<R, D, O>
where
    R: RiderStore,
    D: DeliveryStore,
    O: OrderClient,
{
    pub fn new(riders: R, deliveries: D, orders: O) -> Self {
        Self {
            riders,
            deliveries,
            orders,
        }
    }

    /// Registers a rider.
    #[tracing::instrument(skip(self))]
    pub async fn register(&self, name: &str, status: RiderStatus) -> Result<Rider> {
        if name.trim().chars().count() < 2 {
            return Err(RiderError::InvalidArgument(
                "rider name must be at least 2 characters".to_string(),
            ));
        }
        let rider = self.riders.create(name.trim(), status).await?;
        tracing::info!(rider_id = %rider.id, "rider registered");
        Ok(rider)
    }

    pub async fn get_rider(&self, rider_id: RiderId) -> Result<Rider> {
        self.riders
            .get(rider_id)
            .await?
            .ok_or(RiderError::RiderNotFound(rider_id))
    }

    #[tracing::instrument(skip(self))]
    pub async fn set_status(&self, rider_id: RiderId, status: RiderStatus) -> Result<Rider> {
        self.riders.set_status(rider_id, status).await
    }

    /// Claims an accepted order for an online rider and moves the order to
    /// `OutForDelivery`.
    ///
    /// Two riders racing for the same order: exactly one claim lands, the
    /// other gets `AlreadyClaimed`. A claim whose order update fails is
    /// released again.
    #[tracing::instrument(skip(self))]
    pub async fn accept_order(
        &self,
        rider_id: RiderId,
        order_id: OrderId,
    ) -> Result<DeliveryAssignment> {
        let rider = self.get_rider(rider_id).await?;
        if !rider.is_online() {
            return Err(RiderError::Offline(rider_id));
        }

        let order = self.orders.get_order(order_id).await?;
        ensure_status(&order, OrderStatus::Accepted)?;

        self.deliveries.open(NewAssignment::from(&order)).await?;
        let assignment = self.deliveries.claim(order_id, rider_id).await?;

        if let Err(e) = self
            .orders
            .update_status(order_id, OrderStatus::OutForDelivery, &rider.operator(), "")
            .await
        {
            tracing::warn!(%rider_id, %order_id, error = %e, "order update refused, releasing claim");
            if let Err(release_err) = self.deliveries.release(order_id, rider_id).await {
                tracing::error!(
                    %rider_id,
                    %order_id,
                    error = %release_err,
                    "failed to release delivery claim"
                );
                metrics::counter!("delivery_compensation_failures_total", "step" => "release")
                    .increment(1);
            }
            return Err(e.into());
        }

        if let Err(e) = self.riders.increment_order_count(rider_id).await {
            tracing::warn!(%rider_id, error = %e, "rider order counter not updated");
        }
        metrics::counter!("delivery_steps_total", "step" => "accept").increment(1);
        tracing::info!(%rider_id, %order_id, "order claimed by rider");

        Ok(assignment)
    }

    /// Marks a claimed order as picked up from the merchant.
    #[tracing::instrument(skip(self))]
    pub async fn mark_picked_up(
        &self,
        rider_id: RiderId,
        order_id: OrderId,
    ) -> Result<DeliveryAssignment> {
        self.get_rider(rider_id).await?;
        let assignment = self.held_assignment(rider_id, order_id).await?;

        let order = self.orders.get_order(order_id).await?;
        ensure_status(&order, OrderStatus::OutForDelivery)?;

        let transition = assignment.status.transition_to(DeliveryStatus::InTransit)?;
        let assignment = self
            .deliveries
            .apply_transition(order_id, rider_id, transition)
            .await?;

        metrics::counter!("delivery_steps_total", "step" => "pickup").increment(1);
        tracing::info!(%rider_id, %order_id, "order picked up");
        Ok(assignment)
    }

    /// Marks an order delivered and completes it.
    ///
    /// The sub-status is rewound to `InTransit` when the order service
    /// refuses the completion.
    #[tracing::instrument(skip(self))]
    pub async fn mark_delivered(
        &self,
        rider_id: RiderId,
        order_id: OrderId,
    ) -> Result<DeliveryAssignment> {
        let rider = self.get_rider(rider_id).await?;
        let assignment = self.held_assignment(rider_id, order_id).await?;

        let transition = assignment.status.transition_to(DeliveryStatus::Delivered)?;
        let assignment = self
            .deliveries
            .apply_transition(order_id, rider_id, transition)
            .await?;

        if let Err(e) = self
            .orders
            .update_status(order_id, OrderStatus::Completed, &rider.operator(), "")
            .await
        {
            tracing::warn!(%rider_id, %order_id, error = %e, "order completion refused, rewinding delivery");
            if let Err(rewind_err) = self
                .deliveries
                .apply_transition(order_id, rider_id, transition.rewind())
                .await
            {
                tracing::error!(
                    %rider_id,
                    %order_id,
                    error = %rewind_err,
                    "failed to rewind delivery status"
                );
                metrics::counter!("delivery_compensation_failures_total", "step" => "rewind")
                    .increment(1);
            }
            return Err(e.into());
        }

        metrics::counter!("delivery_steps_total", "step" => "deliver").increment(1);
        tracing::info!(%rider_id, %order_id, "order delivered");
        Ok(assignment)
    }

    /// Lists the rider's deliveries, newest first, optionally by sub-status.
    pub async fn list_orders(
        &self,
        rider_id: RiderId,
        status: Option<DeliveryStatus>,
        page: PageRequest,
    ) -> Result<Page<DeliveryAssignment>> {
        self.get_rider(rider_id).await?;
        self.deliveries.list_by_rider(rider_id, status, page).await
    }

    /// Lists accepted orders waiting for a rider, optionally by area.
    ///
    /// `area` is matched as a substring of the delivery address.
    pub async fn list_pending(&self, area: Option<String>, page: PageRequest) -> Result<Page<Order>> {
        let filter = OrderFilter::default()
            .with_status(Some(OrderStatus::Accepted))
            .with_address_containing(area);
        Ok(self.orders.list_orders(filter, page).await?)
    }

    async fn held_assignment(
        &self,
        rider_id: RiderId,
        order_id: OrderId,
    ) -> Result<DeliveryAssignment> {
        let assignment = self
            .deliveries
            .get(order_id)
            .await?
            .ok_or(RiderError::AssignmentNotFound(order_id))?;
        if !assignment.is_held_by(rider_id) {
            return Err(RiderError::NotAssigned { rider_id, order_id });
        }
        Ok(assignment)
    }
}

fn ensure_status(order: &Order, expected: OrderStatus) -> Result<()> {
    if order.status != expected {
        return Err(RiderError::OrderNotReady {
            order_id: order.id,
            expected,
            actual: order.status,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use common::{Classify, ErrorKind, ServiceError};

    use crate::delivery::InMemoryDeliveryStore;
    use crate::directory::InMemoryRiderStore;

    struct Unreachable;

    #[async_trait]
    impl OrderClient for Unreachable {
        async fn get_order(&self, _: OrderId) -> std::result::Result<Order, ServiceError> {
            Err(ServiceError::unavailable("order service unreachable"))
        }

        async fn update_status(
            &self,
            _: OrderId,
            _: OrderStatus,
            _: &str,
            _: &str,
        ) -> std::result::Result<Order, ServiceError> {
            Err(ServiceError::unavailable("order service unreachable"))
        }

        async fn list_orders(
            &self,
            _: OrderFilter,
            _: PageRequest,
        ) -> std::result::Result<Page<Order>, ServiceError> {
            Err(ServiceError::unavailable("order service unreachable"))
        }
    }

    fn service() -> (
        RiderService<InMemoryRiderStore, InMemoryDeliveryStore, Unreachable>,
        InMemoryRiderStore,
    ) {
        let riders = InMemoryRiderStore::new();
        let service = RiderService::new(riders.clone(), InMemoryDeliveryStore::new(), Unreachable);
        (service, riders)
    }

    #[tokio::test]
    async fn test_offline_rider_cannot_accept() {
        let (service, riders) = service();
        let rider = riders.create("Li Wei", RiderStatus::Offline).await.unwrap();

        let err = service
            .accept_order(rider.id, OrderId::new(1))
            .await
            .unwrap_err();
        assert!(matches!(err, RiderError::Offline(_)));
    }

    #[tokio::test]
    async fn test_unreachable_order_service() {
        let (service, riders) = service();
        let rider = riders.create("Li Wei", RiderStatus::Online).await.unwrap();

        let err = service
            .accept_order(rider.id, OrderId::new(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unavailable);
    }

    #[tokio::test]
    async fn test_pickup_without_assignment() {
        let (service, riders) = service();
        let rider = riders.create("Li Wei", RiderStatus::Online).await.unwrap();

        let err = service
            .mark_picked_up(rider.id, OrderId::new(1))
            .await
            .unwrap_err();
        assert!(matches!(err, RiderError::AssignmentNotFound(_)));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_unknown_rider() {
        let (service, _) = service();
        let err = service
            .list_orders(RiderId::new(3), None, PageRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RiderError::RiderNotFound(_)));
    }

    #[tokio::test]
    async fn test_register_requires_name() {
        let (service, _) = service();
        assert!(matches!(
            service.register("x", RiderStatus::Online).await,
            Err(RiderError::InvalidArgument(_))
        ));
    }
}
