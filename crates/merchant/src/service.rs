//! Merchant-side order decisions.

use common::{MerchantId, OrderId, Page, PageRequest};
use domain::{Order, OrderFilter, OrderStatus};
use saga::OrderClient;

use crate::error::{MerchantError, Result};
use crate::model::Merchant;
use crate::store::MerchantStore;

const MIN_REASON_CHARS: usize = 2;
const MAX_REASON_CHARS: usize = 128;

/// Merchant service: checks merchant preconditions locally, then asks the
/// order service to change the order status.
pub struct MerchantService<M, O>
where
    M: MerchantStore,
    O: OrderClient,
{
    merchants: M,
    orders: O,
}

impl<M, O> MerchantService<M, O>
where
    M: MerchantStore,
    O: OrderClient,
{
    pub fn new(merchants: M, orders: O) -> Self {
        Self { merchants, orders }
    }

    /// Registers a merchant.
    #[tracing::instrument(skip(self))]
    pub async fn register(&self, name: &str, is_open: bool) -> Result<Merchant> {
        if name.trim().chars().count() < 2 {
            return Err(MerchantError::InvalidArgument(
                "merchant name must be at least 2 characters".to_string(),
            ));
        }
        let merchant = self.merchants.create(name.trim(), is_open).await?;
        tracing::info!(merchant_id = %merchant.id, "merchant registered");
        Ok(merchant)
    }

    pub async fn get_merchant(&self, merchant_id: MerchantId) -> Result<Merchant> {
        self.merchants
            .get(merchant_id)
            .await?
            .ok_or(MerchantError::NotFound(merchant_id))
    }

    /// Opens or closes a merchant for new orders.
    #[tracing::instrument(skip(self))]
    pub async fn set_open(&self, merchant_id: MerchantId, is_open: bool) -> Result<Merchant> {
        self.merchants.set_open(merchant_id, is_open).await
    }

    /// Accepts a pending order. The merchant must be open.
    ///
    /// The merchant's order counter is bumped afterwards, best-effort.
    #[tracing::instrument(skip(self))]
    pub async fn accept_order(&self, merchant_id: MerchantId, order_id: OrderId) -> Result<Order> {
        let merchant = self.get_merchant(merchant_id).await?;
        if !merchant.is_open {
            return Err(MerchantError::Closed(merchant_id));
        }
        self.ensure_owned(merchant_id, order_id).await?;

        let order = self
            .orders
            .update_status(order_id, OrderStatus::Accepted, &merchant.operator(), "")
            .await?;

        if let Err(e) = self.merchants.increment_order_count(merchant_id).await {
            tracing::warn!(%merchant_id, error = %e, "merchant order counter not updated");
        }
        metrics::counter!("merchant_decisions_total", "decision" => "accept").increment(1);
        tracing::info!(%merchant_id, %order_id, "order accepted by merchant");

        Ok(order)
    }

    /// Rejects a pending order with a reason of 2 to 128 characters.
    #[tracing::instrument(skip(self))]
    pub async fn reject_order(
        &self,
        merchant_id: MerchantId,
        order_id: OrderId,
        reason: &str,
    ) -> Result<Order> {
        let len = reason.trim().chars().count();
        if !(MIN_REASON_CHARS..=MAX_REASON_CHARS).contains(&len) {
            return Err(MerchantError::InvalidArgument(format!(
                "reject reason must be {MIN_REASON_CHARS} to {MAX_REASON_CHARS} characters"
            )));
        }

        let merchant = self.get_merchant(merchant_id).await?;
        self.ensure_owned(merchant_id, order_id).await?;

        let order = self
            .orders
            .update_status(
                order_id,
                OrderStatus::Rejected,
                &merchant.operator(),
                reason.trim(),
            )
            .await?;

        metrics::counter!("merchant_decisions_total", "decision" => "reject").increment(1);
        tracing::info!(%merchant_id, %order_id, "order rejected by merchant");

        Ok(order)
    }

    /// Lists the merchant's orders, newest first, optionally by status.
    pub async fn list_orders(
        &self,
        merchant_id: MerchantId,
        status: Option<OrderStatus>,
        page: PageRequest,
    ) -> Result<Page<Order>> {
        self.get_merchant(merchant_id).await?;
        let filter = OrderFilter::for_merchant(merchant_id).with_status(status);
        Ok(self.orders.list_orders(filter, page).await?)
    }

    async fn ensure_owned(&self, merchant_id: MerchantId, order_id: OrderId) -> Result<()> {
        let order = self.orders.get_order(order_id).await?;
        if !order.is_for_merchant(merchant_id) {
            return Err(MerchantError::NotOwner {
                merchant_id,
                order_id,
            });
        }
        Ok(())
    }
}
