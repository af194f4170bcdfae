//! Order status state machine.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ParseStatusError, TransitionError};

/// The status of an order in its lifecycle.
///
/// State transitions:
/// ```text
/// PendingAcceptance ──► Accepted ──► OutForDelivery ──► Completed
///        │
///        ├──► Rejected ──┐
///        │               ▼
///        └──────────► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Created with stock reserved, waiting for the merchant.
    #[default]
    PendingAcceptance,

    /// The merchant accepted the order.
    Accepted,

    /// A rider has claimed the delivery.
    OutForDelivery,

    /// Delivered (terminal state).
    Completed,

    /// The merchant rejected the order. Can still be cancelled.
    Rejected,

    /// Cancelled by the customer (terminal state).
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::PendingAcceptance,
        OrderStatus::Accepted,
        OrderStatus::OutForDelivery,
        OrderStatus::Completed,
        OrderStatus::Rejected,
        OrderStatus::Cancelled,
    ];

    /// Returns true if `to` is directly reachable from this status.
    pub fn can_transition_to(&self, to: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, to),
            (PendingAcceptance, Accepted)
                | (PendingAcceptance, Rejected)
                | (PendingAcceptance, Cancelled)
                | (Accepted, OutForDelivery)
                | (OutForDelivery, Completed)
                | (Rejected, Cancelled)
        )
    }

    /// Validates a move to `to` and returns the only value the order store
    /// accepts for a status update.
    pub fn transition_to(self, to: OrderStatus) -> Result<StatusTransition, TransitionError> {
        if self.can_transition_to(to) {
            Ok(StatusTransition { from: self, to })
        } else {
            Err(TransitionError {
                from: self.as_str(),
                to: to.as_str(),
            })
        }
    }

    /// Returns true if the customer may cancel in this status.
    pub fn is_cancellable(&self) -> bool {
        self.can_transition_to(OrderStatus::Cancelled)
    }

    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PendingAcceptance => "PendingAcceptance",
            OrderStatus::Accepted => "Accepted",
            OrderStatus::OutForDelivery => "OutForDelivery",
            OrderStatus::Completed => "Completed",
            OrderStatus::Rejected => "Rejected",
            OrderStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseStatusError(s.to_string()))
    }
}

/// A checked order status change.
///
/// Only obtainable from [`OrderStatus::transition_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTransition {
    from: OrderStatus,
    to: OrderStatus,
}

impl StatusTransition {
    /// The status the order must still be in for the update to apply.
    pub fn from(&self) -> OrderStatus {
        self.from
    }

    pub fn to(&self) -> OrderStatus {
        self.to
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_is_pending() {
        assert_eq!(OrderStatus::default(), OrderStatus::PendingAcceptance);
    }

    #[test]
    fn test_transition_table() {
        use OrderStatus::*;
        let legal = [
            (PendingAcceptance, Accepted),
            (PendingAcceptance, Rejected),
            (PendingAcceptance, Cancelled),
            (Accepted, OutForDelivery),
            (OutForDelivery, Completed),
            (Rejected, Cancelled),
        ];

        for from in OrderStatus::ALL {
            for to in OrderStatus::ALL {
                let expected = legal.contains(&(from, to));
                assert_eq!(
                    from.transition_to(to).is_ok(),
                    expected,
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn test_completed_cannot_go_back_to_accepted() {
        let err = OrderStatus::Completed
            .transition_to(OrderStatus::Accepted)
            .unwrap_err();
        assert_eq!(err.from, "Completed");
        assert_eq!(err.to, "Accepted");
    }

    #[test]
    fn test_transition_carries_endpoints() {
        let t = OrderStatus::Accepted
            .transition_to(OrderStatus::OutForDelivery)
            .unwrap();
        assert_eq!(t.from(), OrderStatus::Accepted);
        assert_eq!(t.to(), OrderStatus::OutForDelivery);
    }

    #[test]
    fn test_cancellable_statuses() {
        assert!(OrderStatus::PendingAcceptance.is_cancellable());
        assert!(OrderStatus::Rejected.is_cancellable());
        assert!(!OrderStatus::Accepted.is_cancellable());
        assert!(!OrderStatus::OutForDelivery.is_cancellable());
        assert!(!OrderStatus::Completed.is_cancellable());
        assert!(!OrderStatus::Cancelled.is_cancellable());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(OrderStatus::Completed.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Rejected.is_terminal());
    }

    #[test]
    fn test_parse_round_trips_names() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("Shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_wire_name_is_variant_name() {
        let json = serde_json::to_string(&OrderStatus::OutForDelivery).unwrap();
        assert_eq!(json, "\"OutForDelivery\"");
    }
}
