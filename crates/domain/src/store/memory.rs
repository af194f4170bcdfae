use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{OrderId, Page, PageRequest};
use tokio::sync::RwLock;

use super::{OrderFilter, OrderStore, creation_operator};
use crate::error::{Result, StoreError};
use crate::order::{
    Order, OrderLine, OrderNumber, OrderStatus, StatusChange, StatusTransition, ValidOrder,
};

#[derive(Debug, Default)]
struct State {
    orders: BTreeMap<OrderId, Order>,
    history: HashMap<OrderId, Vec<StatusChange>>,
    numbers: HashSet<OrderNumber>,
    next_order_id: i64,
    next_line_id: i64,
    fail_on_create: bool,
}

/// In-memory order store for testing and single-process deployments.
///
/// Every operation runs under one write lock, which gives the same
/// all-or-nothing behavior as the PostgreSQL transaction.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `create` fail with `Unavailable` while set.
    pub async fn set_fail_on_create(&self, fail: bool) {
        self.state.write().await.fail_on_create = fail;
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    #[tracing::instrument(skip(self, order), fields(customer_id = %order.customer_id()))]
    async fn create(&self, order: &ValidOrder, number: &OrderNumber) -> Result<Order> {
        let mut state = self.state.write().await;

        if state.fail_on_create {
            return Err(StoreError::Unavailable(
                "in-memory order store rejected create".to_string(),
            ));
        }
        if state.numbers.contains(number) {
            return Err(StoreError::DuplicateOrderNumber(number.clone()));
        }

        state.next_order_id += 1;
        let id = OrderId::new(state.next_order_id);
        let now = Utc::now();

        let mut lines = Vec::with_capacity(order.lines().len());
        for line in order.lines() {
            state.next_line_id += 1;
            lines.push(OrderLine {
                id: state.next_line_id,
                order_id: id,
                product_id: line.product_id,
                product_name: line.product_name.clone(),
                unit_price: line.unit_price,
                quantity: line.quantity,
                line_total: line.line_total,
            });
        }

        let record = Order {
            id,
            number: number.clone(),
            customer_id: order.customer_id(),
            customer_name: order.customer_name().to_string(),
            customer_phone: order.customer_phone().to_string(),
            merchant_id: order.merchant_id(),
            merchant_name: order.merchant_name().to_string(),
            lines,
            total: order.total(),
            address: order.address().to_string(),
            expected_time: order.expected_time().map(str::to_string),
            status: OrderStatus::PendingAcceptance,
            remark: String::new(),
            created_at: now,
            updated_at: now,
        };

        state.numbers.insert(number.clone());
        state.history.insert(
            id,
            vec![StatusChange {
                order_id: id,
                from: None,
                to: OrderStatus::PendingAcceptance,
                operator: creation_operator(order.customer_id()),
                remark: String::new(),
                changed_at: now,
            }],
        );
        state.orders.insert(id, record.clone());

        Ok(record)
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.state.read().await.orders.get(&id).cloned())
    }

    #[tracing::instrument(skip(self))]
    async fn apply_transition(
        &self,
        id: OrderId,
        transition: StatusTransition,
        operator: &str,
        remark: &str,
    ) -> Result<Order> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let order = state.orders.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if order.status != transition.from() {
            return Err(StoreError::StatusConflict {
                order_id: id,
                expected: transition.from(),
                actual: order.status,
            });
        }

        let now = Utc::now();
        order.status = transition.to();
        if !remark.is_empty() {
            order.remark = remark.to_string();
        }
        order.updated_at = now;
        let updated = order.clone();

        state.history.entry(id).or_default().push(StatusChange {
            order_id: id,
            from: Some(transition.from()),
            to: transition.to(),
            operator: operator.to_string(),
            remark: remark.to_string(),
            changed_at: now,
        });

        Ok(updated)
    }

    async fn history(&self, id: OrderId) -> Result<Vec<StatusChange>> {
        let state = self.state.read().await;
        if !state.orders.contains_key(&id) {
            return Err(StoreError::NotFound(id));
        }
        Ok(state.history.get(&id).cloned().unwrap_or_default())
    }

    async fn list(&self, filter: &OrderFilter, page: PageRequest) -> Result<Page<Order>> {
        let state = self.state.read().await;
        // Ids are assigned in creation order, so reverse id order is newest first.
        let matching: Vec<Order> = state
            .orders
            .values()
            .rev()
            .filter(|o| filter.matches(o))
            .cloned()
            .collect();
        Ok(page.apply(matching))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{LineDraft, Money, OrderDraft};
    use common::{CustomerId, MerchantId, ProductId};

    fn valid_order(customer: i64, merchant: i64, address: &str) -> ValidOrder {
        OrderDraft {
            customer_id: CustomerId::new(customer),
            customer_name: "Alice".to_string(),
            customer_phone: "13800138000".to_string(),
            merchant_id: MerchantId::new(merchant),
            merchant_name: "Noodle House".to_string(),
            lines: vec![LineDraft::new(
                ProductId::new(1),
                "Beef noodles",
                Money::from_cents(1800),
                2,
            )],
            address: address.to_string(),
            expected_time: Some("12:30".to_string()),
        }
        .validate()
        .unwrap()
    }

    async fn create(store: &InMemoryOrderStore, customer: i64, merchant: i64) -> Order {
        store
            .create(
                &valid_order(customer, merchant, "12 Harbour Road"),
                &OrderNumber::generate(Utc::now()),
            )
            .await
            .unwrap()
    }

    fn transition(from: OrderStatus, to: OrderStatus) -> StatusTransition {
        from.transition_to(to).unwrap()
    }

    #[tokio::test]
    async fn test_create_assigns_ids_and_history() {
        let store = InMemoryOrderStore::new();
        let order = create(&store, 7, 3).await;

        assert_eq!(order.id, OrderId::new(1));
        assert_eq!(order.status, OrderStatus::PendingAcceptance);
        assert_eq!(order.total, Money::from_cents(3600));
        assert_eq!(order.lines.len(), 1);
        assert_eq!(order.lines[0].order_id, order.id);

        let history = store.history(order.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].from, None);
        assert_eq!(history[0].operator, "user_7");
    }

    #[tokio::test]
    async fn test_duplicate_number_rejected() {
        let store = InMemoryOrderStore::new();
        let number = OrderNumber::generate(Utc::now());
        let order = valid_order(7, 3, "12 Harbour Road");

        store.create(&order, &number).await.unwrap();
        let result = store.create(&order, &number).await;
        assert!(matches!(result, Err(StoreError::DuplicateOrderNumber(_))));
        assert_eq!(store.order_count().await, 1);
    }

    #[tokio::test]
    async fn test_apply_transition_is_compare_and_swap() {
        let store = InMemoryOrderStore::new();
        let order = create(&store, 7, 3).await;

        let accept = transition(OrderStatus::PendingAcceptance, OrderStatus::Accepted);
        let updated = store
            .apply_transition(order.id, accept, "merchant_3", "")
            .await
            .unwrap();
        assert_eq!(updated.status, OrderStatus::Accepted);

        // Same observed status again loses the swap.
        let reject = transition(OrderStatus::PendingAcceptance, OrderStatus::Rejected);
        let result = store
            .apply_transition(order.id, reject, "merchant_3", "closing")
            .await;
        assert!(matches!(
            result,
            Err(StoreError::StatusConflict {
                actual: OrderStatus::Accepted,
                ..
            })
        ));

        assert_eq!(store.history(order.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_remark_keeps_existing() {
        let store = InMemoryOrderStore::new();
        let order = create(&store, 7, 3).await;

        let reject = transition(OrderStatus::PendingAcceptance, OrderStatus::Rejected);
        store
            .apply_transition(order.id, reject, "merchant_3", "sold out")
            .await
            .unwrap();

        let cancel = transition(OrderStatus::Rejected, OrderStatus::Cancelled);
        let updated = store
            .apply_transition(order.id, cancel, "user_7", "")
            .await
            .unwrap();
        assert_eq!(updated.remark, "sold out");
    }

    #[tokio::test]
    async fn test_missing_order() {
        let store = InMemoryOrderStore::new();
        let accept = transition(OrderStatus::PendingAcceptance, OrderStatus::Accepted);
        assert!(matches!(
            store.apply_transition(OrderId::new(9), accept, "x1", "").await,
            Err(StoreError::NotFound(_))
        ));
        assert!(store.get(OrderId::new(9)).await.unwrap().is_none());
        assert!(matches!(
            store.history(OrderId::new(9)).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_filters_and_orders_newest_first() {
        let store = InMemoryOrderStore::new();
        let first = create(&store, 7, 3).await;
        let second = create(&store, 7, 4).await;
        let third = create(&store, 8, 3).await;

        let page = store
            .list(&OrderFilter::for_customer(CustomerId::new(7)), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].id, second.id);
        assert_eq!(page.items[1].id, first.id);

        let page = store
            .list(&OrderFilter::for_merchant(MerchantId::new(3)), PageRequest::default())
            .await
            .unwrap();
        let ids: Vec<_> = page.items.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![third.id, first.id]);

        let page = store
            .list(
                &OrderFilter::default().with_status(Some(OrderStatus::Accepted)),
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn test_list_by_address_substring() {
        let store = InMemoryOrderStore::new();
        store
            .create(
                &valid_order(7, 3, "4 Market Street, Eastside"),
                &OrderNumber::generate(Utc::now()),
            )
            .await
            .unwrap();
        create(&store, 7, 3).await;

        let filter =
            OrderFilter::default().with_address_containing(Some("Eastside".to_string()));
        let page = store.list(&filter, PageRequest::default()).await.unwrap();
        assert_eq!(page.total, 1);

        let blank = OrderFilter::default().with_address_containing(Some("  ".to_string()));
        assert_eq!(blank.address_contains, None);
    }

    #[tokio::test]
    async fn test_fail_on_create() {
        let store = InMemoryOrderStore::new();
        store.set_fail_on_create(true).await;
        let result = store
            .create(
                &valid_order(7, 3, "12 Harbour Road"),
                &OrderNumber::generate(Utc::now()),
            )
            .await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        assert_eq!(store.order_count().await, 0);
    }
}
