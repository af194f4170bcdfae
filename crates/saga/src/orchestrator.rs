//! Order orchestrator: creation with stock reservation, status changes and
//! cancellation with stock restoration.

use async_trait::async_trait;
use chrono::Utc;
use common::{Classify, CustomerId, OrderId, Page, PageRequest, ProductId, ServiceError};
use domain::{
    Order, OrderDraft, OrderFilter, OrderNumber, OrderStatus, OrderStore, StatusChange,
};
use inventory::StockLedger;
use serde::Serialize;

use crate::client::OrderClient;
use crate::error::{OrderingError, Result};

/// Identifiers returned by a successful order creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedOrder {
    pub order_id: OrderId,
    pub order_number: OrderNumber,
}

/// Why reserved stock is being given back.
#[derive(Debug, Clone, Copy)]
enum Compensation {
    /// A later line could not be deducted.
    DeductionFailed,
    /// The order could not be persisted.
    PersistFailed,
    /// The customer cancelled the order.
    Cancelled,
}

impl Compensation {
    fn as_str(&self) -> &'static str {
        match self {
            Compensation::DeductionFailed => "deduction_failed",
            Compensation::PersistFailed => "persist_failed",
            Compensation::Cancelled => "cancelled",
        }
    }
}

fn char_len(s: &str) -> usize {
    s.trim().chars().count()
}

/// Coordinates the inventory ledger and the order store.
///
/// There is no shared transaction between the two. Each saga step that
/// fails after stock was deducted triggers a single best-effort restore of
/// that stock; restore failures are logged and counted, never retried and
/// never reported to the caller in place of the original error.
pub struct OrderOrchestrator<L, S>
where
    L: StockLedger,
    S: OrderStore,
{
    ledger: L,
    store: S,
}

impl<L, S> OrderOrchestrator<L, S>
where
    L: StockLedger,
    S: OrderStore,
{
    /// Creates a new orchestrator over the given ledger and store.
    pub fn new(ledger: L, store: S) -> Self {
        Self { ledger, store }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates an order, reserving stock for every line first.
    ///
    /// Lines are deducted one at a time. If a deduction fails, every line
    /// deducted so far is restored and no order is written. If persisting
    /// the order fails, every line is restored and the persistence error is
    /// returned.
    #[tracing::instrument(
        skip(self, draft),
        fields(customer_id = %draft.customer_id, merchant_id = %draft.merchant_id)
    )]
    pub async fn create_order(&self, draft: OrderDraft) -> Result<CreatedOrder> {
        let start = std::time::Instant::now();
        let order = draft.validate()?;

        let mut reserved: Vec<(ProductId, u32)> = Vec::with_capacity(order.lines().len());
        for line in order.lines() {
            if let Err(source) = self
                .ledger
                .deduct_stock(line.product_id, line.quantity)
                .await
            {
                tracing::warn!(
                    product_id = %line.product_id,
                    quantity = line.quantity,
                    error = %source,
                    reserved_lines = reserved.len(),
                    "stock deduction failed"
                );
                self.restore(&reserved, Compensation::DeductionFailed).await;
                metrics::counter!("order_create_failed_total", "reason" => "stock").increment(1);
                return Err(OrderingError::Stock {
                    product_id: line.product_id,
                    source,
                });
            }
            reserved.push((line.product_id, line.quantity));
        }

        let number = OrderNumber::generate(Utc::now());
        let created = match self.store.create(&order, &number).await {
            Ok(created) => created,
            Err(e) => {
                tracing::error!(
                    order_number = %number,
                    error = %e,
                    "order persistence failed after stock was reserved"
                );
                self.restore(&reserved, Compensation::PersistFailed).await;
                metrics::counter!("order_create_failed_total", "reason" => "persist")
                    .increment(1);
                return Err(e.into());
            }
        };

        metrics::counter!("orders_created_total").increment(1);
        metrics::histogram!("order_create_duration_seconds")
            .record(start.elapsed().as_secs_f64());
        tracing::info!(
            order_id = %created.id,
            order_number = %created.number,
            total = %created.total,
            "order created"
        );

        Ok(CreatedOrder {
            order_id: created.id,
            order_number: created.number,
        })
    }

    /// Moves an order to `to` if the transition table allows it.
    ///
    /// `Cancelled` is refused here: only [`Self::cancel_order`] may set it,
    /// since cancelling gives stock back.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(
        &self,
        order_id: OrderId,
        to: OrderStatus,
        operator: &str,
        remark: &str,
    ) -> Result<Order> {
        if to == OrderStatus::Cancelled {
            return Err(OrderingError::ReservedStatus(to));
        }
        if char_len(operator) < 2 {
            return Err(OrderingError::InvalidArgument(
                "operator must be at least 2 characters".to_string(),
            ));
        }

        let current = self
            .store
            .get(order_id)
            .await?
            .ok_or(OrderingError::OrderNotFound(order_id))?;
        self.apply_status(&current, to, operator, remark).await
    }

    /// Cancels a customer's order and gives its stock back.
    ///
    /// The status swap happens first. Stock is restored only once the order
    /// is really `Cancelled`, line by line, logging and skipping lines that
    /// fail. A swap lost to a concurrent change restores nothing.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(
        &self,
        order_id: OrderId,
        customer_id: CustomerId,
        reason: &str,
    ) -> Result<Order> {
        if char_len(reason) < 2 {
            return Err(OrderingError::InvalidArgument(
                "cancel reason must be at least 2 characters".to_string(),
            ));
        }

        // Someone else's order is reported as missing.
        let order = self
            .store
            .get(order_id)
            .await?
            .filter(|o| o.is_owned_by(customer_id))
            .ok_or(OrderingError::OrderNotFound(order_id))?;

        let cancelled = self
            .apply_status(
                &order,
                OrderStatus::Cancelled,
                &format!("user_{customer_id}"),
                reason,
            )
            .await?;

        let lines: Vec<(ProductId, u32)> = order
            .lines
            .iter()
            .map(|l| (l.product_id, l.quantity))
            .collect();
        let failed = self.restore(&lines, Compensation::Cancelled).await;
        if failed > 0 {
            tracing::warn!(%order_id, failed, "order cancelled with stock partly unrestored");
        }

        Ok(cancelled)
    }

    /// Checks `current.status -> to` against the transition table and writes
    /// it, conditional on the status still being the one observed.
    async fn apply_status(
        &self,
        current: &Order,
        to: OrderStatus,
        operator: &str,
        remark: &str,
    ) -> Result<Order> {
        let order_id = current.id;
        let transition = current.status.transition_to(to)?;

        let updated = self
            .store
            .apply_transition(order_id, transition, operator, remark)
            .await?;

        metrics::counter!(
            "order_status_transitions_total",
            "from" => transition.from().as_str(),
            "to" => transition.to().as_str()
        )
        .increment(1);
        tracing::info!(
            %order_id,
            from = %transition.from(),
            to = %transition.to(),
            operator,
            "order status changed"
        );

        Ok(updated)
    }

    /// Loads an order with its lines.
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order> {
        self.store
            .get(order_id)
            .await?
            .ok_or(OrderingError::OrderNotFound(order_id))
    }

    /// Returns the status history of an order, oldest first.
    pub async fn order_history(&self, order_id: OrderId) -> Result<Vec<StatusChange>> {
        match self.store.history(order_id).await {
            Err(domain::StoreError::NotFound(id)) => Err(OrderingError::OrderNotFound(id)),
            other => Ok(other?),
        }
    }

    /// Lists orders matching `filter`, newest first.
    pub async fn list_orders(&self, filter: &OrderFilter, page: PageRequest) -> Result<Page<Order>> {
        Ok(self.store.list(filter, page).await?)
    }

    /// Restores each `(product, quantity)` once. Failures are logged and
    /// counted; the caller's outcome does not depend on them.
    async fn restore(&self, lines: &[(ProductId, u32)], why: Compensation) -> usize {
        let mut failures = 0;
        for &(product_id, quantity) in lines {
            metrics::counter!("stock_compensations_total", "reason" => why.as_str())
                .increment(1);
            if let Err(e) = self.ledger.restore_stock(product_id, quantity).await {
                failures += 1;
                metrics::counter!("stock_compensation_failures_total", "reason" => why.as_str())
                    .increment(1);
                tracing::error!(
                    %product_id,
                    quantity,
                    reason = why.as_str(),
                    error = %e,
                    "stock restore failed, stock stays reserved"
                );
            }
        }
        failures
    }
}

#[async_trait]
impl<L, S> OrderClient for OrderOrchestrator<L, S>
where
    L: StockLedger,
    S: OrderStore,
{
    async fn get_order(&self, order_id: OrderId) -> std::result::Result<Order, ServiceError> {
        OrderOrchestrator::get_order(self, order_id)
            .await
            .map_err(|e| e.to_service_error())
    }

    async fn update_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
        operator: &str,
        remark: &str,
    ) -> std::result::Result<Order, ServiceError> {
        OrderOrchestrator::update_status(self, order_id, status, operator, remark)
            .await
            .map_err(|e| e.to_service_error())
    }

    async fn list_orders(
        &self,
        filter: OrderFilter,
        page: PageRequest,
    ) -> std::result::Result<Page<Order>, ServiceError> {
        OrderOrchestrator::list_orders(self, &filter, page)
            .await
            .map_err(|e| e.to_service_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{ErrorKind, MerchantId};
    use domain::{InMemoryOrderStore, LineDraft, Money, StatusTransition, StoreError, ValidOrder};
    use inventory::{InMemoryStockLedger, InventoryError};

    type TestOrchestrator = OrderOrchestrator<InMemoryStockLedger, InMemoryOrderStore>;

    async fn setup(stock: &[(i64, i64)]) -> (TestOrchestrator, InMemoryStockLedger, InMemoryOrderStore) {
        let ledger = InMemoryStockLedger::new();
        let store = InMemoryOrderStore::new();
        for &(product, qty) in stock {
            ledger.put_item(ProductId::new(product), qty).await.unwrap();
        }
        (
            OrderOrchestrator::new(ledger.clone(), store.clone()),
            ledger,
            store,
        )
    }

    fn draft(lines: &[(i64, u32)]) -> OrderDraft {
        OrderDraft {
            customer_id: CustomerId::new(7),
            customer_name: "Alice".to_string(),
            customer_phone: "13800138000".to_string(),
            merchant_id: MerchantId::new(3),
            merchant_name: "Noodle House".to_string(),
            lines: lines
                .iter()
                .map(|&(p, q)| {
                    LineDraft::new(ProductId::new(p), format!("Dish {p}"), Money::from_cents(1000), q)
                })
                .collect(),
            address: "12 Harbour Road".to_string(),
            expected_time: None,
        }
    }

    #[tokio::test]
    async fn test_create_order_deducts_stock() {
        let (orchestrator, ledger, _) = setup(&[(1, 5), (2, 5)]).await;

        let created = orchestrator.create_order(draft(&[(1, 2), (2, 1)])).await.unwrap();

        assert_eq!(ledger.stock_of(ProductId::new(1)).await, Some(3));
        assert_eq!(ledger.stock_of(ProductId::new(2)).await, Some(4));
        let order = orchestrator.get_order(created.order_id).await.unwrap();
        assert_eq!(order.total, Money::from_cents(3000));
        assert_eq!(order.number, created.order_number);
    }

    #[tokio::test]
    async fn test_invalid_draft_has_no_side_effects() {
        let (orchestrator, ledger, store) = setup(&[(1, 5)]).await;
        let mut d = draft(&[(1, 2)]);
        d.customer_phone = "12345".to_string();

        let err = orchestrator.create_order(d).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(ledger.stock_of(ProductId::new(1)).await, Some(5));
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_failed_deduction_restores_earlier_lines() {
        let (orchestrator, ledger, store) = setup(&[(1, 5), (2, 2)]).await;

        let err = orchestrator
            .create_order(draft(&[(1, 3), (2, 10)]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OrderingError::Stock {
                source: InventoryError::OutOfStock { .. },
                ..
            }
        ));
        assert_eq!(ledger.stock_of(ProductId::new(1)).await, Some(5));
        assert_eq!(ledger.stock_of(ProductId::new(2)).await, Some(2));
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_product_is_not_found() {
        let (orchestrator, ledger, _) = setup(&[(1, 5)]).await;

        let err = orchestrator
            .create_order(draft(&[(1, 1), (99, 1)]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(ledger.stock_of(ProductId::new(1)).await, Some(5));
    }

    #[tokio::test]
    async fn test_persist_failure_restores_everything() {
        let (orchestrator, ledger, store) = setup(&[(1, 5), (2, 5)]).await;
        store.set_fail_on_create(true).await;

        let err = orchestrator
            .create_order(draft(&[(1, 2), (2, 3)]))
            .await
            .unwrap_err();

        assert!(matches!(err, OrderingError::Store(_)));
        assert_eq!(ledger.stock_of(ProductId::new(1)).await, Some(5));
        assert_eq!(ledger.stock_of(ProductId::new(2)).await, Some(5));
    }

    #[tokio::test]
    async fn test_restore_failure_does_not_mask_original_error() {
        let (orchestrator, ledger, store) = setup(&[(1, 5), (2, 5)]).await;
        store.set_fail_on_create(true).await;
        ledger.fail_restore_for(ProductId::new(1)).await;

        let err = orchestrator
            .create_order(draft(&[(1, 2), (2, 3)]))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Unavailable);
        assert!(matches!(err, OrderingError::Store(_)));
        // Product 1 stays reserved, product 2 was still restored.
        assert_eq!(ledger.stock_of(ProductId::new(1)).await, Some(3));
        assert_eq!(ledger.stock_of(ProductId::new(2)).await, Some(5));
        assert_eq!(ledger.restore_calls().await, 2);
    }

    #[tokio::test]
    async fn test_update_status_rejects_illegal_transition() {
        let (orchestrator, _, _) = setup(&[(1, 5)]).await;
        let created = orchestrator.create_order(draft(&[(1, 1)])).await.unwrap();

        let err = orchestrator
            .update_status(created.order_id, OrderStatus::Completed, "merchant_3", "")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    }

    #[tokio::test]
    async fn test_update_status_requires_operator() {
        let (orchestrator, _, _) = setup(&[(1, 5)]).await;
        let created = orchestrator.create_order(draft(&[(1, 1)])).await.unwrap();

        let err = orchestrator
            .update_status(created.order_id, OrderStatus::Accepted, "m", "")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn test_update_status_missing_order() {
        let (orchestrator, _, _) = setup(&[]).await;
        let err = orchestrator
            .update_status(OrderId::new(5), OrderStatus::Accepted, "merchant_3", "")
            .await
            .unwrap_err();
        assert!(matches!(err, OrderingError::OrderNotFound(_)));
    }

    #[tokio::test]
    async fn test_cancel_restores_each_line_once() {
        let (orchestrator, ledger, _) = setup(&[(1, 5), (2, 5)]).await;
        let created = orchestrator
            .create_order(draft(&[(1, 2), (2, 3)]))
            .await
            .unwrap();

        let cancelled = orchestrator
            .cancel_order(created.order_id, CustomerId::new(7), "changed my mind")
            .await
            .unwrap();

        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(cancelled.remark, "changed my mind");
        assert_eq!(ledger.stock_of(ProductId::new(1)).await, Some(5));
        assert_eq!(ledger.stock_of(ProductId::new(2)).await, Some(5));
        assert_eq!(ledger.restore_calls().await, 2);

        let history = orchestrator.order_history(created.order_id).await.unwrap();
        assert_eq!(history.last().unwrap().operator, "user_7");
    }

    #[tokio::test]
    async fn test_cancel_after_accept_is_rejected_without_restoring() {
        let (orchestrator, ledger, _) = setup(&[(1, 5)]).await;
        let created = orchestrator.create_order(draft(&[(1, 2)])).await.unwrap();
        orchestrator
            .update_status(created.order_id, OrderStatus::Accepted, "merchant_3", "")
            .await
            .unwrap();

        let err = orchestrator
            .cancel_order(created.order_id, CustomerId::new(7), "too slow")
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
        assert_eq!(ledger.stock_of(ProductId::new(1)).await, Some(3));
        assert_eq!(ledger.restore_calls().await, 0);
    }

    #[tokio::test]
    async fn test_update_status_refuses_cancelled() {
        let (orchestrator, ledger, store) = setup(&[(1, 5)]).await;
        let created = orchestrator.create_order(draft(&[(1, 2)])).await.unwrap();

        let err = orchestrator
            .update_status(created.order_id, OrderStatus::Cancelled, "user_7", "bye")
            .await
            .unwrap_err();

        assert!(matches!(err, OrderingError::ReservedStatus(OrderStatus::Cancelled)));
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        let order = store.get(created.order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::PendingAcceptance);
        assert_eq!(ledger.stock_of(ProductId::new(1)).await, Some(3));
    }

    #[tokio::test]
    async fn test_order_client_refuses_cancelled() {
        let (orchestrator, _, _) = setup(&[(1, 5)]).await;
        let created = orchestrator.create_order(draft(&[(1, 2)])).await.unwrap();
        let client: &dyn OrderClient = &orchestrator;

        let err = client
            .update_status(created.order_id, OrderStatus::Cancelled, "rider_1", "")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
    }

    /// Lets a merchant accept the order right before a cancel is written.
    struct AcceptedUnderneath(InMemoryOrderStore);

    #[async_trait]
    impl OrderStore for AcceptedUnderneath {
        async fn create(&self, order: &ValidOrder, number: &OrderNumber) -> domain::Result<Order> {
            self.0.create(order, number).await
        }

        async fn get(&self, id: OrderId) -> domain::Result<Option<Order>> {
            self.0.get(id).await
        }

        async fn apply_transition(
            &self,
            id: OrderId,
            transition: StatusTransition,
            operator: &str,
            remark: &str,
        ) -> domain::Result<Order> {
            if transition.to() == OrderStatus::Cancelled {
                let accept = transition
                    .from()
                    .transition_to(OrderStatus::Accepted)
                    .unwrap();
                self.0.apply_transition(id, accept, "merchant_3", "").await?;
            }
            self.0.apply_transition(id, transition, operator, remark).await
        }

        async fn history(&self, id: OrderId) -> domain::Result<Vec<StatusChange>> {
            self.0.history(id).await
        }

        async fn list(&self, filter: &OrderFilter, page: PageRequest) -> domain::Result<Page<Order>> {
            self.0.list(filter, page).await
        }
    }

    #[tokio::test]
    async fn test_cancel_losing_to_accept_keeps_stock_reserved() {
        let ledger = InMemoryStockLedger::new();
        ledger.put_item(ProductId::new(1), 5).await.unwrap();
        let inner = InMemoryOrderStore::new();
        let orchestrator =
            OrderOrchestrator::new(ledger.clone(), AcceptedUnderneath(inner.clone()));
        let created = orchestrator.create_order(draft(&[(1, 2)])).await.unwrap();

        let err = orchestrator
            .cancel_order(created.order_id, CustomerId::new(7), "changed my mind")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OrderingError::Store(StoreError::StatusConflict {
                actual: OrderStatus::Accepted,
                ..
            })
        ));
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
        let order = inner.get(created.order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Accepted);
        assert_eq!(ledger.stock_of(ProductId::new(1)).await, Some(3));
        assert_eq!(ledger.restore_calls().await, 0);
    }

    #[tokio::test]
    async fn test_second_cancel_restores_nothing() {
        let (orchestrator, ledger, _) = setup(&[(1, 5)]).await;
        let created = orchestrator.create_order(draft(&[(1, 2)])).await.unwrap();

        orchestrator
            .cancel_order(created.order_id, CustomerId::new(7), "changed my mind")
            .await
            .unwrap();
        let err = orchestrator
            .cancel_order(created.order_id, CustomerId::new(7), "really")
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
        assert_eq!(ledger.stock_of(ProductId::new(1)).await, Some(5));
        assert_eq!(ledger.restore_calls().await, 1);
    }

    #[tokio::test]
    async fn test_cancel_someone_elses_order_is_not_found() {
        let (orchestrator, _, _) = setup(&[(1, 5)]).await;
        let created = orchestrator.create_order(draft(&[(1, 2)])).await.unwrap();

        let err = orchestrator
            .cancel_order(created.order_id, CustomerId::new(8), "not mine")
            .await
            .unwrap_err();
        assert!(matches!(err, OrderingError::OrderNotFound(_)));
    }

    #[tokio::test]
    async fn test_cancel_rejected_order() {
        let (orchestrator, ledger, _) = setup(&[(1, 5)]).await;
        let created = orchestrator.create_order(draft(&[(1, 2)])).await.unwrap();
        orchestrator
            .update_status(created.order_id, OrderStatus::Rejected, "merchant_3", "closed")
            .await
            .unwrap();

        orchestrator
            .cancel_order(created.order_id, CustomerId::new(7), "rejected anyway")
            .await
            .unwrap();
        assert_eq!(ledger.stock_of(ProductId::new(1)).await, Some(5));
    }

    #[tokio::test]
    async fn test_cancel_requires_reason() {
        let (orchestrator, _, _) = setup(&[(1, 5)]).await;
        let created = orchestrator.create_order(draft(&[(1, 2)])).await.unwrap();

        let err = orchestrator
            .cancel_order(created.order_id, CustomerId::new(7), " ")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn test_order_client_returns_classified_errors() {
        let (orchestrator, _, _) = setup(&[]).await;
        let client: &dyn OrderClient = &orchestrator;

        let err = client.get_order(OrderId::new(1)).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }
}
