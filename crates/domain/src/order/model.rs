//! Persisted order records.

use chrono::{DateTime, Utc};
use common::{CustomerId, MerchantId, OrderId, ProductId};
use serde::{Deserialize, Serialize};

use super::{Money, OrderNumber, OrderStatus};

/// A persisted order line. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: i64,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub line_total: Money,
}

/// A persisted order: header plus lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub number: OrderNumber,
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub customer_phone: String,
    pub merchant_id: MerchantId,
    pub merchant_name: String,
    pub lines: Vec<OrderLine>,
    pub total: Money,
    pub address: String,
    pub expected_time: Option<String>,
    pub status: OrderStatus,
    pub remark: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Returns true if the order was placed by `customer_id`.
    pub fn is_owned_by(&self, customer_id: CustomerId) -> bool {
        self.customer_id == customer_id
    }

    /// Returns true if the order was placed with `merchant_id`.
    pub fn is_for_merchant(&self, merchant_id: MerchantId) -> bool {
        self.merchant_id == merchant_id
    }
}

/// One entry of an order's status audit trail.
///
/// `from` is absent for the row written when the order is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub order_id: OrderId,
    pub from: Option<OrderStatus>,
    pub to: OrderStatus,
    pub operator: String,
    pub remark: String,
    pub changed_at: DateTime<Utc>,
}
