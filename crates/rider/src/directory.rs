//! Rider directory storage.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::RiderId;
use tokio::sync::RwLock;

use crate::error::{Result, RiderError};
use crate::model::{Rider, RiderStatus};

/// Storage for the rider directory.
#[async_trait]
pub trait RiderStore: Send + Sync {
    /// Registers a rider and assigns its id.
    async fn create(&self, name: &str, status: RiderStatus) -> Result<Rider>;

    async fn get(&self, id: RiderId) -> Result<Option<Rider>>;

    async fn set_status(&self, id: RiderId, status: RiderStatus) -> Result<Rider>;

    /// Adds one to the rider's order counter.
    async fn increment_order_count(&self, id: RiderId) -> Result<()>;
}

#[async_trait]
impl<R> RiderStore for Arc<R>
where
    R: RiderStore + ?Sized,
{
    async fn create(&self, name: &str, status: RiderStatus) -> Result<Rider> {
        (**self).create(name, status).await
    }

    async fn get(&self, id: RiderId) -> Result<Option<Rider>> {
        (**self).get(id).await
    }

    async fn set_status(&self, id: RiderId, status: RiderStatus) -> Result<Rider> {
        (**self).set_status(id, status).await
    }

    async fn increment_order_count(&self, id: RiderId) -> Result<()> {
        (**self).increment_order_count(id).await
    }
}

#[derive(Debug, Default)]
struct State {
    riders: BTreeMap<RiderId, Rider>,
    next_id: i64,
    fail_on_increment: bool,
}

/// In-memory rider directory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRiderStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryRiderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `increment_order_count` fail while set.
    pub async fn set_fail_on_increment(&self, fail: bool) {
        self.state.write().await.fail_on_increment = fail;
    }
}

#[async_trait]
impl RiderStore for InMemoryRiderStore {
    async fn create(&self, name: &str, status: RiderStatus) -> Result<Rider> {
        let mut state = self.state.write().await;
        state.next_id += 1;
        let rider = Rider {
            id: RiderId::new(state.next_id),
            name: name.to_string(),
            status,
            order_count: 0,
        };
        state.riders.insert(rider.id, rider.clone());
        Ok(rider)
    }

    async fn get(&self, id: RiderId) -> Result<Option<Rider>> {
        Ok(self.state.read().await.riders.get(&id).cloned())
    }

    async fn set_status(&self, id: RiderId, status: RiderStatus) -> Result<Rider> {
        let mut state = self.state.write().await;
        let rider = state
            .riders
            .get_mut(&id)
            .ok_or(RiderError::RiderNotFound(id))?;
        rider.status = status;
        Ok(rider.clone())
    }

    async fn increment_order_count(&self, id: RiderId) -> Result<()> {
        let mut state = self.state.write().await;
        if state.fail_on_increment {
            return Err(RiderError::Unavailable(
                "order counter update rejected".to_string(),
            ));
        }
        let rider = state
            .riders
            .get_mut(&id)
            .ok_or(RiderError::RiderNotFound(id))?;
        rider.order_count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_go_online() {
        let store = InMemoryRiderStore::new();
        let rider = store.create("Li Wei", RiderStatus::Offline).await.unwrap();
        assert_eq!(rider.id, RiderId::new(1));
        assert!(!rider.is_online());

        let rider = store.set_status(rider.id, RiderStatus::Online).await.unwrap();
        assert!(rider.is_online());
        assert_eq!(rider.operator(), "rider_1");
    }

    #[tokio::test]
    async fn test_counter_failure_flag() {
        let store = InMemoryRiderStore::new();
        let rider = store.create("Li Wei", RiderStatus::Online).await.unwrap();

        store.set_fail_on_increment(true).await;
        assert!(store.increment_order_count(rider.id).await.is_err());
        store.set_fail_on_increment(false).await;
        store.increment_order_count(rider.id).await.unwrap();

        assert_eq!(store.get(rider.id).await.unwrap().unwrap().order_count, 1);
    }
}
