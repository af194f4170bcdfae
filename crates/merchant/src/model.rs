use common::MerchantId;
use serde::{Deserialize, Serialize};

/// A merchant as held by the merchant directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Merchant {
    pub id: MerchantId,
    pub name: String,
    pub is_open: bool,
    /// Accepted orders. Approximate: incremented best-effort after the
    /// order status change succeeded.
    pub order_count: u64,
}

impl Merchant {
    /// Operator string recorded on status changes made by this merchant.
    pub fn operator(&self) -> String {
        format!("merchant_{}", self.id)
    }
}
