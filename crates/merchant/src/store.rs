//! Merchant directory storage.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::MerchantId;
use tokio::sync::RwLock;

use crate::error::{MerchantError, Result};
use crate::model::Merchant;

/// Storage for the merchant directory.
#[async_trait]
pub trait MerchantStore: Send + Sync {
    /// Registers a merchant and assigns its id.
    async fn create(&self, name: &str, is_open: bool) -> Result<Merchant>;

    async fn get(&self, id: MerchantId) -> Result<Option<Merchant>>;

    /// Opens or closes a merchant.
    async fn set_open(&self, id: MerchantId, is_open: bool) -> Result<Merchant>;

    /// Adds one to the merchant's order counter.
    async fn increment_order_count(&self, id: MerchantId) -> Result<()>;
}

#[async_trait]
impl<M> MerchantStore for Arc<M>
where
    M: MerchantStore + ?Sized,
{
    async fn create(&self, name: &str, is_open: bool) -> Result<Merchant> {
        (**self).create(name, is_open).await
    }

    async fn get(&self, id: MerchantId) -> Result<Option<Merchant>> {
        (**self).get(id).await
    }

    async fn set_open(&self, id: MerchantId, is_open: bool) -> Result<Merchant> {
        (**self).set_open(id, is_open).await
    }

    async fn increment_order_count(&self, id: MerchantId) -> Result<()> {
        (**self).increment_order_count(id).await
    }
}

#[derive(Debug, Default)]
struct State {
    merchants: BTreeMap<MerchantId, Merchant>,
    next_id: i64,
    fail_on_increment: bool,
}

/// In-memory merchant directory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMerchantStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryMerchantStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `increment_order_count` fail while set.
    pub async fn set_fail_on_increment(&self, fail: bool) {
        self.state.write().await.fail_on_increment = fail;
    }
}

#[async_trait]
impl MerchantStore for InMemoryMerchantStore {
    async fn create(&self, name: &str, is_open: bool) -> Result<Merchant> {
        let mut state = self.state.write().await;
        state.next_id += 1;
        let merchant = Merchant {
            id: MerchantId::new(state.next_id),
            name: name.to_string(),
            is_open,
            order_count: 0,
        };
        state.merchants.insert(merchant.id, merchant.clone());
        Ok(merchant)
    }

    async fn get(&self, id: MerchantId) -> Result<Option<Merchant>> {
        Ok(self.state.read().await.merchants.get(&id).cloned())
    }

    async fn set_open(&self, id: MerchantId, is_open: bool) -> Result<Merchant> {
        let mut state = self.state.write().await;
        let merchant = state
            .merchants
            .get_mut(&id)
            .ok_or(MerchantError::NotFound(id))?;
        merchant.is_open = is_open;
        Ok(merchant.clone())
    }

    async fn increment_order_count(&self, id: MerchantId) -> Result<()> {
        let mut state = self.state.write().await;
        if state.fail_on_increment {
            return Err(MerchantError::Unavailable(
                "order counter update rejected".to_string(),
            ));
        }
        let merchant = state
            .merchants
            .get_mut(&id)
            .ok_or(MerchantError::NotFound(id))?;
        merchant.order_count += 1;
        Ok(())
    }
}
