use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{OrderId, Page, PageRequest, RiderId};
use domain::{DeliveryStatus, DeliveryTransition};
use tokio::sync::RwLock;

use super::{DeliveryStore, NewAssignment};
use crate::error::{Result, RiderError};
use crate::model::DeliveryAssignment;

#[derive(Debug, Default)]
struct State {
    assignments: BTreeMap<OrderId, DeliveryAssignment>,
    next_id: i64,
    unavailable: bool,
    fail_on_release: bool,
}

impl State {
    fn check(&self) -> Result<()> {
        if self.unavailable {
            return Err(RiderError::Unavailable("delivery store offline".to_string()));
        }
        Ok(())
    }

    fn held_by(
        &mut self,
        order_id: OrderId,
        rider_id: RiderId,
    ) -> Result<&mut DeliveryAssignment> {
        let assignment = self
            .assignments
            .get_mut(&order_id)
            .ok_or(RiderError::AssignmentNotFound(order_id))?;
        if !assignment.is_held_by(rider_id) {
            return Err(RiderError::NotAssigned { rider_id, order_id });
        }
        Ok(assignment)
    }
}

/// In-memory delivery assignment store.
///
/// A single write lock serializes every conditional update, which gives the
/// same claim-once guarantee as the conditional `UPDATE` in PostgreSQL.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDeliveryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryDeliveryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call fail with `Unavailable` while set.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.write().await.unavailable = unavailable;
    }

    /// Makes `release` fail while set.
    pub async fn set_fail_on_release(&self, fail: bool) {
        self.state.write().await.fail_on_release = fail;
    }
}

#[async_trait]
impl DeliveryStore for InMemoryDeliveryStore {
    async fn open(&self, new: NewAssignment) -> Result<DeliveryAssignment> {
        let mut state = self.state.write().await;
        state.check()?;
        if let Some(existing) = state.assignments.get(&new.order_id) {
            return Ok(existing.clone());
        }

        state.next_id += 1;
        let now = Utc::now();
        let assignment = DeliveryAssignment {
            id: state.next_id,
            order_id: new.order_id,
            order_number: new.order_number,
            rider_id: None,
            merchant_id: new.merchant_id,
            merchant_name: new.merchant_name,
            address: new.address,
            total: new.total,
            status: DeliveryStatus::AwaitingPickup,
            accepted_at: None,
            picked_up_at: None,
            delivered_at: None,
            created_at: now,
            updated_at: now,
        };
        state
            .assignments
            .insert(assignment.order_id, assignment.clone());
        Ok(assignment)
    }

    async fn claim(&self, order_id: OrderId, rider_id: RiderId) -> Result<DeliveryAssignment> {
        let mut state = self.state.write().await;
        state.check()?;
        let assignment = state
            .assignments
            .get_mut(&order_id)
            .ok_or(RiderError::AssignmentNotFound(order_id))?;
        if assignment.is_claimed() {
            return Err(RiderError::AlreadyClaimed(order_id));
        }
        assignment.claim(rider_id, Utc::now());
        Ok(assignment.clone())
    }

    async fn release(&self, order_id: OrderId, rider_id: RiderId) -> Result<DeliveryAssignment> {
        let mut state = self.state.write().await;
        state.check()?;
        if state.fail_on_release {
            return Err(RiderError::Unavailable("release rejected".to_string()));
        }
        let assignment = state.held_by(order_id, rider_id)?;
        if assignment.status != DeliveryStatus::AwaitingPickup {
            return Err(RiderError::StatusConflict {
                order_id,
                expected: DeliveryStatus::AwaitingPickup,
                actual: assignment.status,
            });
        }
        assignment.release(Utc::now());
        Ok(assignment.clone())
    }

    async fn apply_transition(
        &self,
        order_id: OrderId,
        rider_id: RiderId,
        transition: DeliveryTransition,
    ) -> Result<DeliveryAssignment> {
        let mut state = self.state.write().await;
        state.check()?;
        let assignment = state.held_by(order_id, rider_id)?;
        if assignment.status != transition.from() {
            return Err(RiderError::StatusConflict {
                order_id,
                expected: transition.from(),
                actual: assignment.status,
            });
        }
        assignment.apply(transition, Utc::now());
        Ok(assignment.clone())
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<DeliveryAssignment>> {
        let state = self.state.read().await;
        state.check()?;
        Ok(state.assignments.get(&order_id).cloned())
    }

    async fn list_by_rider(
        &self,
        rider_id: RiderId,
        status: Option<DeliveryStatus>,
        page: PageRequest,
    ) -> Result<Page<DeliveryAssignment>> {
        let state = self.state.read().await;
        state.check()?;
        let mut matching: Vec<DeliveryAssignment> = state
            .assignments
            .values()
            .filter(|a| a.is_held_by(rider_id))
            .filter(|a| status.is_none_or(|s| a.status == s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(page.apply(matching))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::MerchantId;
    use domain::{Money, OrderNumber};

    fn new_assignment(order_id: i64) -> NewAssignment {
        NewAssignment {
            order_id: OrderId::new(order_id),
            order_number: OrderNumber::new(format!("20240101{order_id:04}")),
            merchant_id: MerchantId::new(1),
            merchant_name: "Noodle House".to_string(),
            address: "12 Harbour Road".to_string(),
            total: Money::from_cents(2500),
        }
    }

    #[tokio::test]
    async fn test_open_is_idempotent() {
        let store = InMemoryDeliveryStore::new();
        let first = store.open(new_assignment(1)).await.unwrap();
        let second = store.open(new_assignment(1)).await.unwrap();
        assert_eq!(first.id, second.id);
        assert!(!first.is_claimed());
    }

    #[tokio::test]
    async fn test_second_claim_loses() {
        let store = InMemoryDeliveryStore::new();
        store.open(new_assignment(1)).await.unwrap();

        store.claim(OrderId::new(1), RiderId::new(1)).await.unwrap();
        let err = store
            .claim(OrderId::new(1), RiderId::new(2))
            .await
            .unwrap_err();
        assert!(matches!(err, RiderError::AlreadyClaimed(_)));
    }

    #[tokio::test]
    async fn test_concurrent_claims_have_one_winner() {
        let store = InMemoryDeliveryStore::new();
        store.open(new_assignment(1)).await.unwrap();

        let handles: Vec<_> = (1..=8)
            .map(|rider| {
                let store = store.clone();
                tokio::spawn(async move { store.claim(OrderId::new(1), RiderId::new(rider)).await })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_transition_requires_holder_and_status() {
        let store = InMemoryDeliveryStore::new();
        store.open(new_assignment(1)).await.unwrap();
        store.claim(OrderId::new(1), RiderId::new(1)).await.unwrap();

        let deliver = DeliveryStatus::InTransit
            .transition_to(DeliveryStatus::Delivered)
            .unwrap();
        assert!(matches!(
            store
                .apply_transition(OrderId::new(1), RiderId::new(1), deliver)
                .await,
            Err(RiderError::StatusConflict { .. })
        ));

        let pickup = DeliveryStatus::AwaitingPickup
            .transition_to(DeliveryStatus::InTransit)
            .unwrap();
        assert!(matches!(
            store
                .apply_transition(OrderId::new(1), RiderId::new(2), pickup)
                .await,
            Err(RiderError::NotAssigned { .. })
        ));

        let a = store
            .apply_transition(OrderId::new(1), RiderId::new(1), pickup)
            .await
            .unwrap();
        assert_eq!(a.status, DeliveryStatus::InTransit);
    }

    #[tokio::test]
    async fn test_release_only_before_pickup() {
        let store = InMemoryDeliveryStore::new();
        store.open(new_assignment(1)).await.unwrap();
        store.claim(OrderId::new(1), RiderId::new(1)).await.unwrap();

        let released = store
            .release(OrderId::new(1), RiderId::new(1))
            .await
            .unwrap();
        assert!(!released.is_claimed());

        store.claim(OrderId::new(1), RiderId::new(2)).await.unwrap();
        let pickup = DeliveryStatus::AwaitingPickup
            .transition_to(DeliveryStatus::InTransit)
            .unwrap();
        store
            .apply_transition(OrderId::new(1), RiderId::new(2), pickup)
            .await
            .unwrap();
        assert!(matches!(
            store.release(OrderId::new(1), RiderId::new(2)).await,
            Err(RiderError::StatusConflict { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_by_rider_filters_and_orders() {
        let store = InMemoryDeliveryStore::new();
        for order in 1..=3 {
            store.open(new_assignment(order)).await.unwrap();
            store
                .claim(OrderId::new(order), RiderId::new(1))
                .await
                .unwrap();
        }
        store.open(new_assignment(4)).await.unwrap();
        store.claim(OrderId::new(4), RiderId::new(2)).await.unwrap();

        let page = store
            .list_by_rider(RiderId::new(1), None, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items[0].order_id, OrderId::new(3));

        let page = store
            .list_by_rider(
                RiderId::new(1),
                Some(DeliveryStatus::InTransit),
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(page.total, 0);
    }
}
