//! Order drafts as submitted by a customer, and their validation.

use common::{CustomerId, MerchantId, ProductId};
use serde::{Deserialize, Serialize};

use super::Money;
use crate::error::ValidationError;

/// One requested line of a new order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineDraft {
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: u32,
}

impl LineDraft {
    pub fn new(
        product_id: ProductId,
        product_name: impl Into<String>,
        unit_price: Money,
        quantity: u32,
    ) -> Self {
        Self {
            product_id,
            product_name: product_name.into(),
            unit_price,
            quantity,
        }
    }
}

/// A new order as submitted, before validation.
///
/// There is no total field: totals are always computed from the lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub customer_phone: String,
    pub merchant_id: MerchantId,
    pub merchant_name: String,
    pub lines: Vec<LineDraft>,
    pub address: String,
    #[serde(default)]
    pub expected_time: Option<String>,
}

/// A line that passed validation, with its total computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub line_total: Money,
}

/// An order draft that passed validation.
///
/// Only obtainable from [`OrderDraft::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidOrder {
    draft: OrderDraft,
    lines: Vec<ValidLine>,
    total: Money,
}

impl ValidOrder {
    pub fn customer_id(&self) -> CustomerId {
        self.draft.customer_id
    }

    pub fn customer_name(&self) -> &str {
        &self.draft.customer_name
    }

    pub fn customer_phone(&self) -> &str {
        &self.draft.customer_phone
    }

    pub fn merchant_id(&self) -> MerchantId {
        self.draft.merchant_id
    }

    pub fn merchant_name(&self) -> &str {
        &self.draft.merchant_name
    }

    pub fn address(&self) -> &str {
        &self.draft.address
    }

    pub fn expected_time(&self) -> Option<&str> {
        self.draft.expected_time.as_deref()
    }

    pub fn lines(&self) -> &[ValidLine] {
        &self.lines
    }

    pub fn total(&self) -> Money {
        self.total
    }
}

fn char_len(s: &str) -> usize {
    s.trim().chars().count()
}

/// Mainland mobile number: 11 digits, `1` then `3`-`9`.
fn is_mobile_number(phone: &str) -> bool {
    let bytes = phone.as_bytes();
    bytes.len() == 11
        && bytes.iter().all(u8::is_ascii_digit)
        && bytes[0] == b'1'
        && (b'3'..=b'9').contains(&bytes[1])
}

impl OrderDraft {
    /// Checks the draft shape and computes line totals and the order total.
    ///
    /// Pure: nothing is reserved or written.
    pub fn validate(self) -> Result<ValidOrder, ValidationError> {
        if !self.customer_id.is_valid() {
            return Err(ValidationError::new("customer_id", "must be greater than 0"));
        }
        if char_len(&self.customer_name) < 2 {
            return Err(ValidationError::new(
                "customer_name",
                "must be at least 2 characters",
            ));
        }
        if !is_mobile_number(&self.customer_phone) {
            return Err(ValidationError::new(
                "customer_phone",
                "must be an 11-digit mobile number",
            ));
        }
        if !self.merchant_id.is_valid() {
            return Err(ValidationError::new("merchant_id", "must be greater than 0"));
        }
        if char_len(&self.merchant_name) == 0 {
            return Err(ValidationError::new("merchant_name", "must not be empty"));
        }
        if self.lines.is_empty() {
            return Err(ValidationError::new("lines", "order must have at least one line"));
        }
        if char_len(&self.address) < 5 {
            return Err(ValidationError::new(
                "address",
                "must be at least 5 characters",
            ));
        }

        let mut lines = Vec::with_capacity(self.lines.len());
        let mut total = Money::zero();
        for (index, line) in self.lines.iter().enumerate() {
            let valid = validate_line(index, line)?;
            total = total.checked_add(valid.line_total).ok_or_else(|| {
                ValidationError::new("lines", "order total overflows")
            })?;
            lines.push(valid);
        }

        Ok(ValidOrder {
            draft: self,
            lines,
            total,
        })
    }
}

fn validate_line(index: usize, line: &LineDraft) -> Result<ValidLine, ValidationError> {
    if !line.product_id.is_valid() {
        return Err(ValidationError::new(
            "product_id",
            format!("line {index}: must be greater than 0"),
        ));
    }
    if char_len(&line.product_name) < 2 {
        return Err(ValidationError::new(
            "product_name",
            format!("line {index}: must be at least 2 characters"),
        ));
    }
    if !line.unit_price.is_positive() {
        return Err(ValidationError::new(
            "unit_price",
            format!("line {index}: must be greater than 0"),
        ));
    }
    if line.quantity == 0 {
        return Err(ValidationError::new(
            "quantity",
            format!("line {index}: must be greater than 0"),
        ));
    }
    let line_total = line
        .unit_price
        .checked_multiply(line.quantity)
        .ok_or_else(|| ValidationError::new("quantity", format!("line {index}: total overflows")))?;

    Ok(ValidLine {
        product_id: line.product_id,
        product_name: line.product_name.clone(),
        unit_price: line.unit_price,
        quantity: line.quantity,
        line_total,
    })
}
