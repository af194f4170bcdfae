//! Delivery sub-status carried by a rider's assignment.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ParseStatusError, TransitionError};
use crate::order::OrderStatus;

/// Progress of a delivery once a rider has claimed it.
///
/// ```text
/// AwaitingPickup ──► InTransit ──► Delivered
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DeliveryStatus {
    #[default]
    AwaitingPickup,
    InTransit,
    Delivered,
}

impl DeliveryStatus {
    pub const ALL: [DeliveryStatus; 3] = [
        DeliveryStatus::AwaitingPickup,
        DeliveryStatus::InTransit,
        DeliveryStatus::Delivered,
    ];

    /// Returns the next status in the linear progression.
    pub fn next(&self) -> Option<DeliveryStatus> {
        match self {
            DeliveryStatus::AwaitingPickup => Some(DeliveryStatus::InTransit),
            DeliveryStatus::InTransit => Some(DeliveryStatus::Delivered),
            DeliveryStatus::Delivered => None,
        }
    }

    /// Validates a move to `to`.
    pub fn transition_to(self, to: DeliveryStatus) -> Result<DeliveryTransition, TransitionError> {
        if self.next() == Some(to) {
            Ok(DeliveryTransition { from: self, to })
        } else {
            Err(TransitionError {
                from: self.as_str(),
                to: to.as_str(),
            })
        }
    }

    /// The order status that must accompany this delivery status.
    pub fn order_status(&self) -> OrderStatus {
        match self {
            DeliveryStatus::AwaitingPickup | DeliveryStatus::InTransit => {
                OrderStatus::OutForDelivery
            }
            DeliveryStatus::Delivered => OrderStatus::Completed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::AwaitingPickup => "AwaitingPickup",
            DeliveryStatus::InTransit => "InTransit",
            DeliveryStatus::Delivered => "Delivered",
        }
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DeliveryStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DeliveryStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseStatusError(s.to_string()))
    }
}

/// A checked delivery status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryTransition {
    from: DeliveryStatus,
    to: DeliveryStatus,
}

impl DeliveryTransition {
    pub fn from(&self) -> DeliveryStatus {
        self.from
    }

    pub fn to(&self) -> DeliveryStatus {
        self.to
    }

    /// The transition that undoes this one.
    ///
    /// Only used to roll back a sub-status whose mirrored order update
    /// failed, so it bypasses the forward-only rule.
    pub fn rewind(&self) -> DeliveryTransition {
        DeliveryTransition {
            from: self.to,
            to: self.from,
        }
    }
}
